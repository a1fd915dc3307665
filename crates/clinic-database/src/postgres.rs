//! PostgreSQL 存储实现

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use clinic_core::models::*;
use clinic_core::{ClinicError, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::connection::DatabasePool;
use crate::models::*;
use crate::store::ClinicStore;

/// 基于 PostgreSQL 的存储实现
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: &DatabasePool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        // 创建账户表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY,
                username VARCHAR(64) UNIQUE NOT NULL,
                email VARCHAR(255) UNIQUE NOT NULL,
                phone VARCHAR(32) UNIQUE NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(16) NOT NULL,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(&self.pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建医生档案表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS doctors (
                id UUID PRIMARY KEY,
                account_id UUID UNIQUE NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                specialty VARCHAR(255) NOT NULL
            )
        "#).execute(&self.pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建患者档案表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                id UUID PRIMARY KEY,
                account_id UUID UNIQUE NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                gender VARCHAR(8) NOT NULL,
                date_of_birth DATE NOT NULL
            )
        "#).execute(&self.pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建时段表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS availability_slots (
                id UUID PRIMARY KEY,
                doctor_id UUID NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
                day_of_week VARCHAR(10) NOT NULL,
                start_time TIME NOT NULL,
                end_time TIME NOT NULL,
                reserved BOOLEAN NOT NULL DEFAULT FALSE
            )
        "#).execute(&self.pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建预约表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS appointments (
                id UUID PRIMARY KEY,
                doctor_id UUID NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
                patient_id UUID NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
                slot_id UUID NOT NULL REFERENCES availability_slots(id) ON DELETE CASCADE,
                appointment_time TIMESTAMP NOT NULL,
                status VARCHAR(16) NOT NULL DEFAULT 'BOOKED'
            )
        "#).execute(&self.pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建刷新令牌表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS refresh_tokens (
                id UUID PRIMARY KEY,
                account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                token VARCHAR(128) UNIQUE NOT NULL,
                expires_at TIMESTAMP WITH TIME ZONE NOT NULL
            )
        "#).execute(&self.pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建索引以优化查询性能
        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_accounts_username ON accounts(username)",
            "CREATE INDEX IF NOT EXISTS idx_doctors_account_id ON doctors(account_id)",
            "CREATE INDEX IF NOT EXISTS idx_doctors_specialty ON doctors(LOWER(specialty))",
            "CREATE INDEX IF NOT EXISTS idx_patients_account_id ON patients(account_id)",
            "CREATE INDEX IF NOT EXISTS idx_slots_doctor_id ON availability_slots(doctor_id)",
            "CREATE INDEX IF NOT EXISTS idx_slots_doctor_day ON availability_slots(doctor_id, day_of_week)",
            "CREATE INDEX IF NOT EXISTS idx_appointments_doctor_id ON appointments(doctor_id)",
            "CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_appointments_slot_status ON appointments(slot_id, status)",
            "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_token ON refresh_tokens(token)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }
}

#[async_trait]
impl ClinicStore for PostgresStore {
    // ========== 账户相关操作 ==========

    async fn create_account(&self, account: &NewAccount) -> Result<Account> {
        let row = sqlx::query_as::<_, DbAccount>(r#"
            INSERT INTO accounts (id, username, email, phone, password_hash, role, enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
        "#)
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(Account::from(row))
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let result = sqlx::query_as::<_, DbAccount>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Account::from))
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let result = sqlx::query_as::<_, DbAccount>("SELECT * FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Account::from))
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))
    }

    async fn phone_exists(&self, phone: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE phone = $1)")
            .bind(phone)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))
    }

    async fn update_account_contact(&self, id: Uuid, email: &str, phone: &str) -> Result<()> {
        sqlx::query("UPDATE accounts SET email = $1, phone = $2 WHERE id = $3")
            .bind(email)
            .bind(phone)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete_account(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    // ========== 医生档案相关操作 ==========

    async fn create_doctor(&self, doctor: &NewDoctor) -> Result<DoctorProfile> {
        let row = sqlx::query_as::<_, DbDoctor>(r#"
            INSERT INTO doctors (id, account_id, specialty)
            VALUES ($1, $2, $3)
            RETURNING *
        "#)
        .bind(doctor.id)
        .bind(doctor.account_id)
        .bind(&doctor.specialty)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(DoctorProfile::from(row))
    }

    async fn find_doctor_by_id(&self, id: Uuid) -> Result<Option<DoctorProfile>> {
        let result = sqlx::query_as::<_, DbDoctor>("SELECT * FROM doctors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(DoctorProfile::from))
    }

    async fn find_doctor_by_account(&self, account_id: Uuid) -> Result<Option<DoctorProfile>> {
        let result = sqlx::query_as::<_, DbDoctor>("SELECT * FROM doctors WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(DoctorProfile::from))
    }

    async fn find_doctors_by_specialty(&self, specialty: &str) -> Result<Vec<DoctorProfile>> {
        let results = sqlx::query_as::<_, DbDoctor>(
            "SELECT * FROM doctors WHERE LOWER(specialty) = LOWER($1)",
        )
        .bind(specialty)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(DoctorProfile::from).collect())
    }

    async fn list_doctors(&self) -> Result<Vec<DoctorProfile>> {
        let results = sqlx::query_as::<_, DbDoctor>("SELECT * FROM doctors")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(DoctorProfile::from).collect())
    }

    async fn update_doctor_specialty(&self, id: Uuid, specialty: &str) -> Result<()> {
        sqlx::query("UPDATE doctors SET specialty = $1 WHERE id = $2")
            .bind(specialty)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<()> {
        // 外键 ON DELETE CASCADE 负责清理时段与预约
        sqlx::query("DELETE FROM doctors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    // ========== 患者档案相关操作 ==========

    async fn create_patient(&self, patient: &NewPatient) -> Result<PatientProfile> {
        let row = sqlx::query_as::<_, DbPatient>(r#"
            INSERT INTO patients (id, account_id, gender, date_of_birth)
            VALUES ($1, $2, $3, $4)
            RETURNING *
        "#)
        .bind(patient.id)
        .bind(patient.account_id)
        .bind(patient.gender.as_str())
        .bind(patient.date_of_birth)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(PatientProfile::from(row))
    }

    async fn find_patient_by_id(&self, id: Uuid) -> Result<Option<PatientProfile>> {
        let result = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(PatientProfile::from))
    }

    async fn find_patient_by_account(&self, account_id: Uuid) -> Result<Option<PatientProfile>> {
        let result = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(PatientProfile::from))
    }

    async fn list_patients(&self) -> Result<Vec<PatientProfile>> {
        let results = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(PatientProfile::from).collect())
    }

    async fn update_patient_profile(
        &self,
        id: Uuid,
        gender: Gender,
        date_of_birth: NaiveDate,
    ) -> Result<()> {
        sqlx::query("UPDATE patients SET gender = $1, date_of_birth = $2 WHERE id = $3")
            .bind(gender.as_str())
            .bind(date_of_birth)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete_patient(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    // ========== 时段相关操作 ==========

    async fn create_slot(&self, slot: &NewSlot) -> Result<AvailabilitySlot> {
        let row = sqlx::query_as::<_, DbSlot>(r#"
            INSERT INTO availability_slots (id, doctor_id, day_of_week, start_time, end_time, reserved)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING *
        "#)
        .bind(slot.id)
        .bind(slot.doctor_id)
        .bind(slot.day_of_week.as_str())
        .bind(slot.start_time)
        .bind(slot.end_time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(AvailabilitySlot::from(row))
    }

    async fn find_slot_by_id(&self, id: Uuid) -> Result<Option<AvailabilitySlot>> {
        let result =
            sqlx::query_as::<_, DbSlot>("SELECT * FROM availability_slots WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(AvailabilitySlot::from))
    }

    async fn slots_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilitySlot>> {
        let results = sqlx::query_as::<_, DbSlot>(
            "SELECT * FROM availability_slots WHERE doctor_id = $1 ORDER BY day_of_week, start_time",
        )
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(AvailabilitySlot::from).collect())
    }

    async fn slots_by_doctor_and_day(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
    ) -> Result<Vec<AvailabilitySlot>> {
        let results = sqlx::query_as::<_, DbSlot>(
            "SELECT * FROM availability_slots WHERE doctor_id = $1 AND day_of_week = $2 ORDER BY start_time",
        )
        .bind(doctor_id)
        .bind(day.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(AvailabilitySlot::from).collect())
    }

    async fn slot_exists(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<bool> {
        sqlx::query_scalar(r#"
            SELECT EXISTS(
                SELECT 1 FROM availability_slots
                WHERE doctor_id = $1 AND day_of_week = $2 AND start_time = $3 AND end_time = $4
            )
        "#)
        .bind(doctor_id)
        .bind(day.as_str())
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))
    }

    async fn available_slots_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilitySlot>> {
        let results = sqlx::query_as::<_, DbSlot>(
            "SELECT * FROM availability_slots WHERE doctor_id = $1 AND reserved = FALSE ORDER BY day_of_week, start_time",
        )
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(AvailabilitySlot::from).collect())
    }

    async fn set_slot_reserved(&self, slot_id: Uuid, reserved: bool) -> Result<()> {
        sqlx::query("UPDATE availability_slots SET reserved = $1 WHERE id = $2")
            .bind(reserved)
            .bind(slot_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    // ========== 预约相关操作 ==========

    async fn reserve_and_book(&self, appointment: &NewAppointment) -> Result<Appointment> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        // 事务内再次确认该时段没有 BOOKED 预约
        let already_booked: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM appointments WHERE slot_id = $1 AND status = 'BOOKED')",
        )
        .bind(appointment.slot_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        if already_booked {
            return Err(ClinicError::Conflict("This slot is already booked".into()));
        }

        // 条件更新关闭 check-then-reserve 的竞争窗口：
        // 并发预订者中只有一个事务能改到行，另一方影响行数为 0
        let updated = sqlx::query(
            "UPDATE availability_slots SET reserved = TRUE WHERE id = $1 AND reserved = FALSE",
        )
        .bind(appointment.slot_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?
        .rows_affected();

        if updated == 0 {
            return Err(ClinicError::Conflict("This slot is already booked".into()));
        }

        let row = sqlx::query_as::<_, DbAppointment>(r#"
            INSERT INTO appointments (id, doctor_id, patient_id, slot_id, appointment_time, status)
            VALUES ($1, $2, $3, $4, $5, 'BOOKED')
            RETURNING *
        "#)
        .bind(appointment.id)
        .bind(appointment.doctor_id)
        .bind(appointment.patient_id)
        .bind(appointment.slot_id)
        .bind(appointment.appointment_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(Appointment::from(row))
    }

    async fn find_appointment_by_id(&self, id: Uuid) -> Result<Option<Appointment>> {
        let result =
            sqlx::query_as::<_, DbAppointment>("SELECT * FROM appointments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(Appointment::from))
    }

    async fn appointments_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>> {
        let results = sqlx::query_as::<_, DbAppointment>(
            "SELECT * FROM appointments WHERE doctor_id = $1 ORDER BY appointment_time",
        )
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Appointment::from).collect())
    }

    async fn appointments_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>> {
        let results = sqlx::query_as::<_, DbAppointment>(
            "SELECT * FROM appointments WHERE patient_id = $1 ORDER BY appointment_time",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Appointment::from).collect())
    }

    async fn booked_appointment_exists(&self, slot_id: Uuid) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM appointments WHERE slot_id = $1 AND status = 'BOOKED')",
        )
        .bind(slot_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))
    }

    async fn finish_appointment(
        &self,
        appointment_id: Uuid,
        slot_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        // 条件更新保证终态只写入一次：并发的完成/取消只有一方能改到行
        let updated = sqlx::query(
            "UPDATE appointments SET status = $1 WHERE id = $2 AND status = 'BOOKED'",
        )
        .bind(status.as_str())
        .bind(appointment_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?
        .rows_affected();

        if updated == 0 {
            return Err(ClinicError::State(
                "appointment is no longer in BOOKED status".into(),
            ));
        }

        sqlx::query("UPDATE availability_slots SET reserved = FALSE WHERE id = $1")
            .bind(slot_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    // ========== 刷新令牌相关操作 ==========

    async fn create_refresh_token(&self, token: &NewRefreshToken) -> Result<RefreshToken> {
        let row = sqlx::query_as::<_, DbRefreshToken>(r#"
            INSERT INTO refresh_tokens (id, account_id, token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
        "#)
        .bind(token.id)
        .bind(token.account_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(RefreshToken::from(row))
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let result =
            sqlx::query_as::<_, DbRefreshToken>("SELECT * FROM refresh_tokens WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(result.map(RefreshToken::from))
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete_refresh_tokens_for_account(&self, account_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }
}
