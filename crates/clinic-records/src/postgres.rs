//! 临床文档 PostgreSQL 存储实现

use async_trait::async_trait;
use clinic_core::{ClinicError, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;
use crate::store::DocumentStore;

/// 基于 PostgreSQL 的临床文档存储
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建临床文档表
    pub async fn create_tables(&self) -> Result<()> {
        // 创建处方表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS prescriptions (
                id UUID PRIMARY KEY,
                patient_id UUID NOT NULL,
                doctor_id UUID NOT NULL,
                appointment_id UUID NOT NULL,
                notes TEXT NOT NULL,
                medicines TEXT[] NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(&self.pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        // 创建病历表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS medical_records (
                id UUID PRIMARY KEY,
                patient_id UUID NOT NULL,
                doctor_id UUID NOT NULL,
                notes TEXT NOT NULL,
                lab_results JSONB,
                attachments TEXT[],
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(&self.pool).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_prescriptions_patient_id ON prescriptions(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_prescriptions_doctor_id ON prescriptions(doctor_id)",
            "CREATE INDEX IF NOT EXISTS idx_medical_records_patient_id ON medical_records(patient_id)",
        ];
        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;
        }

        tracing::info!("Clinical document tables created successfully");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    // ========== 处方相关操作 ==========

    async fn create_prescription(&self, prescription: &NewPrescription) -> Result<Prescription> {
        let row = sqlx::query_as::<_, DbPrescription>(r#"
            INSERT INTO prescriptions (id, patient_id, doctor_id, appointment_id, notes, medicines)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        "#)
        .bind(prescription.id)
        .bind(prescription.patient_id)
        .bind(prescription.doctor_id)
        .bind(prescription.appointment_id)
        .bind(&prescription.notes)
        .bind(&prescription.medicines)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(Prescription::from(row))
    }

    async fn prescriptions_by_patient(&self, patient_id: Uuid) -> Result<Vec<Prescription>> {
        let results = sqlx::query_as::<_, DbPrescription>(
            "SELECT * FROM prescriptions WHERE patient_id = $1 ORDER BY created_at",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Prescription::from).collect())
    }

    async fn delete_prescriptions_for_patient(&self, patient_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM prescriptions WHERE patient_id = $1")
            .bind(patient_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }

    // ========== 病历相关操作 ==========

    async fn create_medical_record(&self, record: &NewMedicalRecord) -> Result<MedicalRecord> {
        let row = sqlx::query_as::<_, DbMedicalRecord>(r#"
            INSERT INTO medical_records (id, patient_id, doctor_id, notes, lab_results, attachments)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        "#)
        .bind(record.id)
        .bind(record.patient_id)
        .bind(record.doctor_id)
        .bind(&record.notes)
        .bind(&record.lab_results)
        .bind(&record.attachments)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(MedicalRecord::from(row))
    }

    async fn medical_records_by_patient(&self, patient_id: Uuid) -> Result<Vec<MedicalRecord>> {
        let results = sqlx::query_as::<_, DbMedicalRecord>(
            "SELECT * FROM medical_records WHERE patient_id = $1 ORDER BY created_at",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(results.into_iter().map(MedicalRecord::from).collect())
    }

    async fn delete_medical_records_for_patient(&self, patient_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM medical_records WHERE patient_id = $1")
            .bind(patient_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(())
    }
}
