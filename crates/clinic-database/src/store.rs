//! 关系型存储抽象接口
//!
//! 业务层通过该接口访问账户、档案、时段、预约和刷新令牌，
//! 生产环境由 PostgreSQL 实现，测试使用内存实现。

use async_trait::async_trait;
use clinic_core::models::*;
use clinic_core::Result;
use uuid::Uuid;

use crate::models::*;

#[async_trait]
pub trait ClinicStore: Send + Sync {
    // ========== 账户相关操作 ==========

    async fn create_account(&self, account: &NewAccount) -> Result<Account>;
    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>>;
    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>>;
    async fn username_exists(&self, username: &str) -> Result<bool>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
    async fn phone_exists(&self, phone: &str) -> Result<bool>;
    async fn update_account_contact(&self, id: Uuid, email: &str, phone: &str) -> Result<()>;
    async fn delete_account(&self, id: Uuid) -> Result<()>;

    // ========== 医生档案相关操作 ==========

    async fn create_doctor(&self, doctor: &NewDoctor) -> Result<DoctorProfile>;
    async fn find_doctor_by_id(&self, id: Uuid) -> Result<Option<DoctorProfile>>;
    async fn find_doctor_by_account(&self, account_id: Uuid) -> Result<Option<DoctorProfile>>;
    async fn find_doctors_by_specialty(&self, specialty: &str) -> Result<Vec<DoctorProfile>>;
    async fn list_doctors(&self) -> Result<Vec<DoctorProfile>>;
    async fn update_doctor_specialty(&self, id: Uuid, specialty: &str) -> Result<()>;
    /// 级联删除医生的时段与预约
    async fn delete_doctor(&self, id: Uuid) -> Result<()>;

    // ========== 患者档案相关操作 ==========

    async fn create_patient(&self, patient: &NewPatient) -> Result<PatientProfile>;
    async fn find_patient_by_id(&self, id: Uuid) -> Result<Option<PatientProfile>>;
    async fn find_patient_by_account(&self, account_id: Uuid) -> Result<Option<PatientProfile>>;
    async fn list_patients(&self) -> Result<Vec<PatientProfile>>;
    async fn update_patient_profile(
        &self,
        id: Uuid,
        gender: Gender,
        date_of_birth: chrono::NaiveDate,
    ) -> Result<()>;
    async fn delete_patient(&self, id: Uuid) -> Result<()>;

    // ========== 时段相关操作 ==========

    async fn create_slot(&self, slot: &NewSlot) -> Result<AvailabilitySlot>;
    async fn find_slot_by_id(&self, id: Uuid) -> Result<Option<AvailabilitySlot>>;
    async fn slots_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilitySlot>>;
    async fn slots_by_doctor_and_day(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
    ) -> Result<Vec<AvailabilitySlot>>;
    async fn slot_exists(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
        start: chrono::NaiveTime,
        end: chrono::NaiveTime,
    ) -> Result<bool>;
    async fn available_slots_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilitySlot>>;
    /// 幂等设置时段的预订标记，调用方负责事务边界
    async fn set_slot_reserved(&self, slot_id: Uuid, reserved: bool) -> Result<()>;

    // ========== 预约相关操作 ==========

    /// 原子预订：在单个事务中检查时段无 BOOKED 预约、
    /// 条件更新 `reserved = TRUE WHERE reserved = FALSE` 并插入预约记录。
    /// 两个并发预订者最多一个成功，失败方返回资源冲突错误。
    async fn reserve_and_book(&self, appointment: &NewAppointment) -> Result<Appointment>;
    async fn find_appointment_by_id(&self, id: Uuid) -> Result<Option<Appointment>>;
    async fn appointments_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>>;
    async fn appointments_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>>;
    async fn booked_appointment_exists(&self, slot_id: Uuid) -> Result<bool>;
    /// 在单个事务中写入终态并释放时段。
    /// 终态写入带 `status = 'BOOKED'` 条件，预约已离开 BOOKED
    /// 时返回状态错误且不触碰时段，并发的完成/取消只有一方成功。
    async fn finish_appointment(
        &self,
        appointment_id: Uuid,
        slot_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<()>;

    // ========== 刷新令牌相关操作 ==========

    async fn create_refresh_token(&self, token: &NewRefreshToken) -> Result<RefreshToken>;
    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>>;
    async fn delete_refresh_token(&self, token: &str) -> Result<()>;
    async fn delete_refresh_tokens_for_account(&self, account_id: Uuid) -> Result<()>;
}
