//! 临床文档模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 处方
///
/// 由医生针对某次预约开具，记录药品清单与备注。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Uuid,
    pub notes: String,
    pub medicines: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// 病历条目
///
/// 每开一张处方同时生成一条病历；也可携带化验结果和附件引用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub notes: String,
    pub lab_results: Option<serde_json::Value>,
    pub attachments: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// 新处方插入模型
#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Uuid,
    pub notes: String,
    pub medicines: Vec<String>,
}

/// 新病历插入模型
#[derive(Debug, Clone)]
pub struct NewMedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub notes: String,
    pub lab_results: Option<serde_json::Value>,
    pub attachments: Option<Vec<String>>,
}

/// 数据库处方表
#[derive(Debug, FromRow)]
pub struct DbPrescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Uuid,
    pub notes: String,
    pub medicines: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbPrescription> for Prescription {
    fn from(row: DbPrescription) -> Self {
        Prescription {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            appointment_id: row.appointment_id,
            notes: row.notes,
            medicines: row.medicines,
            created_at: row.created_at,
        }
    }
}

/// 数据库病历表
#[derive(Debug, FromRow)]
pub struct DbMedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub notes: String,
    pub lab_results: Option<serde_json::Value>,
    pub attachments: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<DbMedicalRecord> for MedicalRecord {
    fn from(row: DbMedicalRecord) -> Self {
        MedicalRecord {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            notes: row.notes,
            lab_results: row.lab_results,
            attachments: row.attachments,
            created_at: row.created_at,
        }
    }
}
