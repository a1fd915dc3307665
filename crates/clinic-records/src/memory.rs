//! 临床文档内存存储实现

use async_trait::async_trait;
use clinic_core::Result;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::*;
use crate::store::DocumentStore;

/// 内存临床文档存储，供测试与本地开发使用
#[derive(Default)]
pub struct MemoryDocumentStore {
    prescriptions: Mutex<Vec<Prescription>>,
    medical_records: Mutex<Vec<MedicalRecord>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    // ========== 处方相关操作 ==========

    async fn create_prescription(&self, prescription: &NewPrescription) -> Result<Prescription> {
        let record = Prescription {
            id: prescription.id,
            patient_id: prescription.patient_id,
            doctor_id: prescription.doctor_id,
            appointment_id: prescription.appointment_id,
            notes: prescription.notes.clone(),
            medicines: prescription.medicines.clone(),
            created_at: chrono::Utc::now(),
        };
        self.prescriptions.lock().await.push(record.clone());
        Ok(record)
    }

    async fn prescriptions_by_patient(&self, patient_id: Uuid) -> Result<Vec<Prescription>> {
        let prescriptions = self.prescriptions.lock().await;
        Ok(prescriptions
            .iter()
            .filter(|p| p.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn delete_prescriptions_for_patient(&self, patient_id: Uuid) -> Result<()> {
        self.prescriptions
            .lock()
            .await
            .retain(|p| p.patient_id != patient_id);
        Ok(())
    }

    // ========== 病历相关操作 ==========

    async fn create_medical_record(&self, record: &NewMedicalRecord) -> Result<MedicalRecord> {
        let entry = MedicalRecord {
            id: record.id,
            patient_id: record.patient_id,
            doctor_id: record.doctor_id,
            notes: record.notes.clone(),
            lab_results: record.lab_results.clone(),
            attachments: record.attachments.clone(),
            created_at: chrono::Utc::now(),
        };
        self.medical_records.lock().await.push(entry.clone());
        Ok(entry)
    }

    async fn medical_records_by_patient(&self, patient_id: Uuid) -> Result<Vec<MedicalRecord>> {
        let records = self.medical_records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn delete_medical_records_for_patient(&self, patient_id: Uuid) -> Result<()> {
        self.medical_records
            .lock()
            .await
            .retain(|r| r.patient_id != patient_id);
        Ok(())
    }
}
