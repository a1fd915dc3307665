//! 临床文档存储抽象接口

use async_trait::async_trait;
use clinic_core::Result;
use uuid::Uuid;

use crate::models::*;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ========== 处方相关操作 ==========

    async fn create_prescription(&self, prescription: &NewPrescription) -> Result<Prescription>;
    async fn prescriptions_by_patient(&self, patient_id: Uuid) -> Result<Vec<Prescription>>;
    async fn delete_prescriptions_for_patient(&self, patient_id: Uuid) -> Result<()>;

    // ========== 病历相关操作 ==========

    async fn create_medical_record(&self, record: &NewMedicalRecord) -> Result<MedicalRecord>;
    async fn medical_records_by_patient(&self, patient_id: Uuid) -> Result<Vec<MedicalRecord>>;
    async fn delete_medical_records_for_patient(&self, patient_id: Uuid) -> Result<()>;
}
