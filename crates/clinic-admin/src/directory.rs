//! 账户开通与医生目录服务
//!
//! 管理员创建管理员/医生/患者账户并维护档案；
//! 患者侧的按专科检索也由本服务提供，检索结果经目录缓存加速。

use chrono::NaiveDate;
use clinic_auth::hash_password;
use clinic_core::utils::parse_hm;
use clinic_core::{Account, CallerIdentity, ClinicError, DayOfWeek, Gender, Result, Role};
use clinic_database::{ClinicStore, NewAccount, NewDoctor, NewPatient};
use clinic_records::DocumentStore;
use clinic_workflow::SlotService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::DirectoryCache;

/// 新管理员开通请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewAdminRequest {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// 新医生开通请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewDoctorRequest {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub specialty: String,
    /// 可选的初始出诊时段，开通时一并排班
    #[serde(default)]
    pub slots: Vec<InitialSlotRequest>,
}

/// 开通医生时附带的初始时段
#[derive(Debug, Clone, Deserialize)]
pub struct InitialSlotRequest {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

/// 新患者开通请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatientRequest {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
}

/// 医生目录条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDirectoryEntry {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub specialty: String,
}

/// 患者目录条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDirectoryEntry {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
}

/// 账户开通与目录服务
pub struct DirectoryService {
    store: Arc<dyn ClinicStore>,
    documents: Arc<dyn DocumentStore>,
    slots: SlotService,
    cache: Arc<DirectoryCache>,
}

impl DirectoryService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        documents: Arc<dyn DocumentStore>,
        cache: Arc<DirectoryCache>,
    ) -> Self {
        // 初始排班复用排班服务的全部校验
        let slots = SlotService::new(store.clone());
        Self {
            store,
            documents,
            slots,
            cache,
        }
    }

    /// 开通管理员账户
    pub async fn create_admin(
        &self,
        caller: &CallerIdentity,
        request: &NewAdminRequest,
    ) -> Result<Account> {
        ensure_admin(caller)?;
        let account = self
            .create_account(
                &request.username,
                &request.email,
                &request.phone,
                &request.password,
                Role::Admin,
            )
            .await?;
        tracing::info!(username = %account.username, "Admin account created");
        Ok(account)
    }

    /// 开通医生账户并建立档案
    pub async fn create_doctor(
        &self,
        caller: &CallerIdentity,
        request: &NewDoctorRequest,
    ) -> Result<DoctorDirectoryEntry> {
        ensure_admin(caller)?;
        if request.specialty.trim().is_empty() {
            return Err(ClinicError::Validation("specialty is required".into()));
        }
        // 初始时段先整体解析，格式错误时不落任何数据
        let initial_slots = parse_initial_slots(&request.slots)?;

        let account = self
            .create_account(
                &request.username,
                &request.email,
                &request.phone,
                &request.password,
                Role::Doctor,
            )
            .await?;

        let doctor = self
            .store
            .create_doctor(&NewDoctor {
                id: Uuid::new_v4(),
                account_id: account.id,
                specialty: request.specialty.clone(),
            })
            .await?;

        for (day, start, end) in initial_slots {
            self.slots
                .create_slot(caller, doctor.id, day, start, end)
                .await?;
        }

        self.cache.evict(&doctor.specialty).await;
        tracing::info!(username = %account.username, specialty = %doctor.specialty, "Doctor account created");

        Ok(DoctorDirectoryEntry {
            id: doctor.id,
            username: account.username,
            email: account.email,
            specialty: doctor.specialty,
        })
    }

    /// 开通患者账户并建立档案
    pub async fn create_patient(
        &self,
        caller: &CallerIdentity,
        request: &NewPatientRequest,
    ) -> Result<PatientDirectoryEntry> {
        ensure_admin(caller)?;

        let account = self
            .create_account(
                &request.username,
                &request.email,
                &request.phone,
                &request.password,
                Role::Patient,
            )
            .await?;

        let patient = self
            .store
            .create_patient(&NewPatient {
                id: Uuid::new_v4(),
                account_id: account.id,
                gender: request.gender,
                date_of_birth: request.date_of_birth,
            })
            .await?;

        tracing::info!(username = %account.username, "Patient account created");

        Ok(PatientDirectoryEntry {
            id: patient.id,
            username: account.username,
            email: account.email,
            gender: patient.gender,
            date_of_birth: patient.date_of_birth,
        })
    }

    /// 更新医生联系方式与专科
    pub async fn update_doctor(
        &self,
        caller: &CallerIdentity,
        doctor_id: Uuid,
        email: &str,
        phone: &str,
        specialty: &str,
    ) -> Result<()> {
        ensure_admin(caller)?;

        let doctor = self
            .store
            .find_doctor_by_id(doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;
        let account = self
            .store
            .find_account_by_id(doctor.account_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor account not found".into()))?;

        self.check_contact_change(&account, email, phone).await?;

        self.store
            .update_account_contact(account.id, email, phone)
            .await?;
        self.store
            .update_doctor_specialty(doctor.id, specialty)
            .await?;
        // 新旧专科的缓存都可能变化
        self.cache.evict(&doctor.specialty).await;
        self.cache.evict(specialty).await;
        Ok(())
    }

    /// 更新患者联系方式与档案
    pub async fn update_patient(
        &self,
        caller: &CallerIdentity,
        patient_id: Uuid,
        email: &str,
        phone: &str,
        gender: Gender,
        date_of_birth: NaiveDate,
    ) -> Result<()> {
        ensure_admin(caller)?;

        let patient = self
            .store
            .find_patient_by_id(patient_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Patient not found".into()))?;
        let account = self
            .store
            .find_account_by_id(patient.account_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Patient account not found".into()))?;

        self.check_contact_change(&account, email, phone).await?;

        self.store
            .update_account_contact(account.id, email, phone)
            .await?;
        self.store
            .update_patient_profile(patient.id, gender, date_of_birth)
            .await?;
        Ok(())
    }

    /// 删除医生账户、档案及其级联数据
    pub async fn delete_doctor(&self, caller: &CallerIdentity, doctor_id: Uuid) -> Result<()> {
        ensure_admin(caller)?;

        let doctor = self
            .store
            .find_doctor_by_id(doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;

        self.store.delete_doctor(doctor.id).await?;
        self.store.delete_account(doctor.account_id).await?;
        self.cache.evict(&doctor.specialty).await;

        tracing::info!(doctor_id = %doctor_id, "Doctor deleted");
        Ok(())
    }

    /// 删除患者账户、档案及其级联数据
    pub async fn delete_patient(&self, caller: &CallerIdentity, patient_id: Uuid) -> Result<()> {
        ensure_admin(caller)?;

        let patient = self
            .store
            .find_patient_by_id(patient_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Patient not found".into()))?;

        // 临床文档随患者一并清除
        self.documents.delete_prescriptions_for_patient(patient.id).await?;
        self.documents
            .delete_medical_records_for_patient(patient.id)
            .await?;
        self.store.delete_patient(patient.id).await?;
        self.store.delete_account(patient.account_id).await?;

        tracing::info!(patient_id = %patient_id, "Patient deleted");
        Ok(())
    }

    /// 医生目录
    pub async fn list_doctors(&self, caller: &CallerIdentity) -> Result<Vec<DoctorDirectoryEntry>> {
        ensure_admin(caller)?;

        let doctors = self.store.list_doctors().await?;
        let mut entries = Vec::with_capacity(doctors.len());
        for doctor in doctors {
            entries.push(self.doctor_entry(doctor).await?);
        }
        Ok(entries)
    }

    /// 患者目录
    pub async fn list_patients(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<PatientDirectoryEntry>> {
        ensure_admin(caller)?;

        let patients = self.store.list_patients().await?;
        let mut entries = Vec::with_capacity(patients.len());
        for patient in patients {
            let account = self
                .store
                .find_account_by_id(patient.account_id)
                .await?
                .ok_or_else(|| ClinicError::NotFound("Patient account not found".into()))?;
            entries.push(PatientDirectoryEntry {
                id: patient.id,
                username: account.username,
                email: account.email,
                gender: patient.gender,
                date_of_birth: patient.date_of_birth,
            });
        }
        Ok(entries)
    }

    /// 按专科检索医生（大小写不敏感）
    ///
    /// 无匹配返回资源未找到错误。结果按专科缓存，目录写入后失效。
    pub async fn search_doctors_by_specialty(
        &self,
        specialty: &str,
    ) -> Result<Vec<DoctorDirectoryEntry>> {
        if specialty.trim().is_empty() {
            return Err(ClinicError::Validation("specialty is required".into()));
        }

        if let Some(cached) = self.cache.get(specialty).await {
            return Ok(cached);
        }

        let doctors = self.store.find_doctors_by_specialty(specialty).await?;
        if doctors.is_empty() {
            return Err(ClinicError::NotFound(format!(
                "no doctors found for specialty: {}",
                specialty
            )));
        }

        let mut entries = Vec::with_capacity(doctors.len());
        for doctor in doctors {
            entries.push(self.doctor_entry(doctor).await?);
        }

        self.cache.put(specialty, entries.clone()).await;
        Ok(entries)
    }

    async fn doctor_entry(
        &self,
        doctor: clinic_core::DoctorProfile,
    ) -> Result<DoctorDirectoryEntry> {
        let account = self
            .store
            .find_account_by_id(doctor.account_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor account not found".into()))?;
        Ok(DoctorDirectoryEntry {
            id: doctor.id,
            username: account.username,
            email: account.email,
            specialty: doctor.specialty,
        })
    }

    async fn create_account(
        &self,
        username: &str,
        email: &str,
        phone: &str,
        password: &str,
        role: Role,
    ) -> Result<Account> {
        if username.trim().is_empty() || email.trim().is_empty() || phone.trim().is_empty() {
            return Err(ClinicError::Validation(
                "username, email and phone are required".into(),
            ));
        }
        if password.len() < 6 {
            return Err(ClinicError::Validation(
                "password must be at least 6 characters".into(),
            ));
        }

        if self.store.username_exists(username).await? {
            return Err(ClinicError::Conflict("Username already exists".into()));
        }
        if self.store.email_exists(email).await? {
            return Err(ClinicError::Conflict("Email already exists".into()));
        }
        if self.store.phone_exists(phone).await? {
            return Err(ClinicError::Conflict("Phone number already exists".into()));
        }

        self.store
            .create_account(&NewAccount {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                password_hash: hash_password(password)?,
                role,
                enabled: true,
            })
            .await
    }

    async fn check_contact_change(
        &self,
        account: &Account,
        email: &str,
        phone: &str,
    ) -> Result<()> {
        if email != account.email && self.store.email_exists(email).await? {
            return Err(ClinicError::Conflict("Email already exists".into()));
        }
        if phone != account.phone && self.store.phone_exists(phone).await? {
            return Err(ClinicError::Conflict("Phone number already exists".into()));
        }
        Ok(())
    }
}

fn ensure_admin(caller: &CallerIdentity) -> Result<()> {
    if caller.role != Role::Admin {
        return Err(ClinicError::Permission(
            "only admins can manage the directory".into(),
        ));
    }
    Ok(())
}

fn parse_initial_slots(
    requests: &[InitialSlotRequest],
) -> Result<Vec<(DayOfWeek, chrono::NaiveTime, chrono::NaiveTime)>> {
    let mut parsed = Vec::with_capacity(requests.len());
    for slot in requests {
        let day = DayOfWeek::parse(&slot.day_of_week.to_uppercase()).ok_or_else(|| {
            ClinicError::Validation(format!("invalid day of week: {}", slot.day_of_week))
        })?;
        let start = parse_hm(&slot.start_time).ok_or_else(|| {
            ClinicError::Validation(format!("invalid time: {}", slot.start_time))
        })?;
        let end = parse_hm(&slot.end_time)
            .ok_or_else(|| ClinicError::Validation(format!("invalid time: {}", slot.end_time)))?;
        parsed.push((day, start, end));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::utils::format_hm;
    use clinic_database::MemoryStore;
    use clinic_records::{MemoryDocumentStore, NewPrescription};

    fn admin() -> CallerIdentity {
        CallerIdentity {
            account_id: Uuid::new_v4(),
            role: Role::Admin,
        }
    }

    fn service_with_backends() -> (DirectoryService, Arc<MemoryStore>, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryStore::new());
        let documents = Arc::new(MemoryDocumentStore::new());
        let service = DirectoryService::new(
            store.clone(),
            documents.clone(),
            Arc::new(DirectoryCache::new()),
        );
        (service, store, documents)
    }

    fn service() -> DirectoryService {
        service_with_backends().0
    }

    fn doctor_request(username: &str, specialty: &str) -> NewDoctorRequest {
        NewDoctorRequest {
            username: username.to_string(),
            email: format!("{}@clinic.test", username),
            phone: format!("1{:010}", username.len()),
            password: "s3cret".to_string(),
            specialty: specialty.to_string(),
            slots: Vec::new(),
        }
    }

    fn slot_request(day: &str, start: &str, end: &str) -> InitialSlotRequest {
        InitialSlotRequest {
            day_of_week: day.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_doctor_and_search() {
        let service = service();
        let caller = admin();

        service
            .create_doctor(&caller, &doctor_request("dr_chen", "Cardiology"))
            .await
            .unwrap();

        // 检索大小写不敏感
        let found = service.search_doctors_by_specialty("cardiology").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "dr_chen");

        // 无匹配返回 NotFound
        let result = service.search_doctors_by_specialty("Neurology").await;
        assert!(matches!(result, Err(ClinicError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let service = service();
        let caller = admin();

        service
            .create_doctor(&caller, &doctor_request("dr_chen", "Cardiology"))
            .await
            .unwrap();

        let mut dup = doctor_request("dr_chen", "Dermatology");
        dup.email = "other@clinic.test".to_string();
        dup.phone = "19999999999".to_string();
        let result = service.create_doctor(&caller, &dup).await;
        assert!(matches!(result, Err(ClinicError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_non_admin_rejected() {
        let service = service();
        let caller = CallerIdentity {
            account_id: Uuid::new_v4(),
            role: Role::Patient,
        };

        let result = service
            .create_doctor(&caller, &doctor_request("dr_chen", "Cardiology"))
            .await;
        assert!(matches!(result, Err(ClinicError::Permission(_))));
    }

    #[tokio::test]
    async fn test_delete_doctor_evicts_cache() {
        let service = service();
        let caller = admin();

        let created = service
            .create_doctor(&caller, &doctor_request("dr_chen", "Cardiology"))
            .await
            .unwrap();
        service.search_doctors_by_specialty("Cardiology").await.unwrap();

        service.delete_doctor(&caller, created.id).await.unwrap();

        // 缓存已失效，重新检索反映删除
        let result = service.search_doctors_by_specialty("Cardiology").await;
        assert!(matches!(result, Err(ClinicError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let service = service();
        let caller = admin();

        let mut request = doctor_request("dr_chen", "Cardiology");
        request.password = "123".to_string();
        let result = service.create_doctor(&caller, &request).await;
        assert!(matches!(result, Err(ClinicError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_doctor_with_initial_slots() {
        let (service, store, _) = service_with_backends();
        let caller = admin();

        let mut request = doctor_request("dr_chen", "Cardiology");
        request.slots = vec![
            slot_request("MONDAY", "09:00", "10:00"),
            slot_request("wednesday", "14:00", "15:30"),
        ];
        let created = service.create_doctor(&caller, &request).await.unwrap();

        let slots = store.slots_by_doctor(created.id).await.unwrap();
        assert_eq!(slots.len(), 2);
        assert!(slots
            .iter()
            .any(|s| s.day_of_week == DayOfWeek::Monday && format_hm(s.start_time) == "09:00"));
        assert!(slots
            .iter()
            .any(|s| s.day_of_week == DayOfWeek::Wednesday && format_hm(s.end_time) == "15:30"));
    }

    #[tokio::test]
    async fn test_create_doctor_with_bad_initial_slot_rejected() {
        let (service, store, _) = service_with_backends();
        let caller = admin();

        let mut request = doctor_request("dr_chen", "Cardiology");
        request.slots = vec![slot_request("FUNDAY", "09:00", "10:00")];
        let result = service.create_doctor(&caller, &request).await;
        assert!(matches!(result, Err(ClinicError::Validation(_))));

        // 时段解析失败时连账户都不创建
        assert!(store
            .find_account_by_username("dr_chen")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_patient_purges_documents() {
        let (service, _, documents) = service_with_backends();
        let caller = admin();

        let patient = service
            .create_patient(
                &caller,
                &NewPatientRequest {
                    username: "alice".to_string(),
                    email: "alice@clinic.test".to_string(),
                    phone: "13800000000".to_string(),
                    password: "s3cret".to_string(),
                    gender: Gender::Female,
                    date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 12).unwrap(),
                },
            )
            .await
            .unwrap();

        documents
            .create_prescription(&NewPrescription {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                doctor_id: Uuid::new_v4(),
                appointment_id: Uuid::new_v4(),
                notes: "Rest and hydration".to_string(),
                medicines: vec!["Ibuprofen".to_string()],
            })
            .await
            .unwrap();

        service.delete_patient(&caller, patient.id).await.unwrap();

        let remaining = documents.prescriptions_by_patient(patient.id).await.unwrap();
        assert!(remaining.is_empty());
    }
}
