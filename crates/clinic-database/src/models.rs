//! 数据库模型

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use clinic_core::models::*;
use sqlx::FromRow;
use uuid::Uuid;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库账户表
#[derive(Debug, FromRow)]
pub struct DbAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: String, // 存储为字符串，转换为Role枚举
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbAccount> for Account {
    fn from(db_account: DbAccount) -> Self {
        Account {
            id: db_account.id,
            username: db_account.username,
            email: db_account.email,
            phone: db_account.phone,
            password_hash: db_account.password_hash,
            role: Role::parse(&db_account.role).unwrap_or(Role::Patient),
            enabled: db_account.enabled,
            created_at: db_account.created_at,
        }
    }
}

/// 数据库医生档案表
#[derive(Debug, FromRow)]
pub struct DbDoctor {
    pub id: Uuid,
    pub account_id: Uuid,
    pub specialty: String,
}

impl From<DbDoctor> for DoctorProfile {
    fn from(db_doctor: DbDoctor) -> Self {
        DoctorProfile {
            id: db_doctor.id,
            account_id: db_doctor.account_id,
            specialty: db_doctor.specialty,
        }
    }
}

/// 数据库患者档案表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: Uuid,
    pub account_id: Uuid,
    pub gender: String,
    pub date_of_birth: NaiveDate,
}

impl From<DbPatient> for PatientProfile {
    fn from(db_patient: DbPatient) -> Self {
        PatientProfile {
            id: db_patient.id,
            account_id: db_patient.account_id,
            gender: Gender::parse(&db_patient.gender).unwrap_or(Gender::Other),
            date_of_birth: db_patient.date_of_birth,
        }
    }
}

/// 数据库时段表
#[derive(Debug, FromRow)]
pub struct DbSlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reserved: bool,
}

impl From<DbSlot> for AvailabilitySlot {
    fn from(db_slot: DbSlot) -> Self {
        AvailabilitySlot {
            id: db_slot.id,
            doctor_id: db_slot.doctor_id,
            day_of_week: DayOfWeek::parse(&db_slot.day_of_week).unwrap_or(DayOfWeek::Monday),
            start_time: db_slot.start_time,
            end_time: db_slot.end_time,
            reserved: db_slot.reserved,
        }
    }
}

/// 数据库预约表
#[derive(Debug, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub slot_id: Uuid,
    pub appointment_time: NaiveDateTime,
    pub status: String,
}

impl From<DbAppointment> for Appointment {
    fn from(db_appointment: DbAppointment) -> Self {
        Appointment {
            id: db_appointment.id,
            doctor_id: db_appointment.doctor_id,
            patient_id: db_appointment.patient_id,
            slot_id: db_appointment.slot_id,
            appointment_time: db_appointment.appointment_time,
            status: AppointmentStatus::parse(&db_appointment.status)
                .unwrap_or(AppointmentStatus::Booked),
        }
    }
}

/// 数据库刷新令牌表
#[derive(Debug, FromRow)]
pub struct DbRefreshToken {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<DbRefreshToken> for RefreshToken {
    fn from(db_token: DbRefreshToken) -> Self {
        RefreshToken {
            id: db_token.id,
            account_id: db_token.account_id,
            token: db_token.token,
            expires_at: db_token.expires_at,
        }
    }
}

// 插入模型 - 用于创建新记录

/// 新账户插入模型
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
}

/// 新医生档案插入模型
#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub id: Uuid,
    pub account_id: Uuid,
    pub specialty: String,
}

/// 新患者档案插入模型
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub id: Uuid,
    pub account_id: Uuid,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
}

/// 新时段插入模型
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// 新预约插入模型
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub slot_id: Uuid,
    pub appointment_time: NaiveDateTime,
}

/// 新刷新令牌插入模型
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub account_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
