//! 临床记录服务
//!
//! 医生开具处方并同步生成病历条目；就诊历史把处方与对应预约合并展示。

use clinic_core::{CallerIdentity, ClinicError, Result, Role};
use clinic_database::ClinicStore;
use clinic_records::{DocumentStore, NewMedicalRecord, NewPrescription, Prescription};
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::MedicalHistoryEntry;

/// 临床记录服务
pub struct ClinicalRecordService {
    store: Arc<dyn ClinicStore>,
    documents: Arc<dyn DocumentStore>,
}

impl ClinicalRecordService {
    pub fn new(store: Arc<dyn ClinicStore>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { store, documents }
    }

    /// 医生开具处方
    ///
    /// 处方必须挂在医生自己的预约上，且预约患者与目标患者一致。
    /// 开方成功后同步写入一条病历，备注为 "Prescription created: ..."。
    pub async fn create_prescription(
        &self,
        caller: &CallerIdentity,
        patient_id: Uuid,
        appointment_id: Uuid,
        notes: &str,
        medicines: Vec<String>,
    ) -> Result<Prescription> {
        if caller.role != Role::Doctor {
            return Err(ClinicError::Permission(
                "only doctors can create prescriptions".into(),
            ));
        }

        let doctor = self
            .store
            .find_doctor_by_account(caller.account_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor profile not found".into()))?;

        let patient = self
            .store
            .find_patient_by_id(patient_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Patient not found".into()))?;

        let appointment = self
            .store
            .find_appointment_by_id(appointment_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Appointment not found".into()))?;

        if appointment.doctor_id != doctor.id {
            return Err(ClinicError::Permission(
                "appointment belongs to a different doctor".into(),
            ));
        }
        if appointment.patient_id != patient.id {
            return Err(ClinicError::Validation(
                "appointment does not belong to this patient".into(),
            ));
        }

        if medicines.is_empty() {
            return Err(ClinicError::Validation(
                "prescription requires at least one medicine".into(),
            ));
        }

        let prescription = self
            .documents
            .create_prescription(&NewPrescription {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                doctor_id: doctor.id,
                appointment_id: appointment.id,
                notes: notes.to_string(),
                medicines,
            })
            .await?;

        // 每张处方同步生成一条病历
        self.documents
            .create_medical_record(&NewMedicalRecord {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                doctor_id: doctor.id,
                notes: format!("Prescription created: {}", notes),
                lab_results: None,
                attachments: None,
            })
            .await?;

        tracing::info!(
            prescription_id = %prescription.id,
            patient_id = %patient.id,
            doctor_id = %doctor.id,
            "Prescription created"
        );
        Ok(prescription)
    }

    /// 医生查看某位患者的就诊历史
    pub async fn doctor_medical_history(
        &self,
        caller: &CallerIdentity,
        patient_id: Uuid,
    ) -> Result<Vec<MedicalHistoryEntry>> {
        if caller.role != Role::Doctor {
            return Err(ClinicError::Permission(
                "only doctors can view patient medical history".into(),
            ));
        }

        self.store
            .find_patient_by_id(patient_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Patient not found".into()))?;

        self.history_for(patient_id).await
    }

    /// 患者查看自己的就诊历史
    pub async fn patient_medical_history(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<MedicalHistoryEntry>> {
        if caller.role != Role::Patient {
            return Err(ClinicError::Permission(
                "only patients can view their own medical history".into(),
            ));
        }

        let patient = self
            .store
            .find_patient_by_account(caller.account_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Patient profile not found".into()))?;

        self.history_for(patient.id).await
    }

    /// 把患者的处方与对应预约合并为历史条目
    ///
    /// 处方引用的预约已不存在视为数据损坏，直接返回资源未找到错误。
    async fn history_for(&self, patient_id: Uuid) -> Result<Vec<MedicalHistoryEntry>> {
        let prescriptions = self.documents.prescriptions_by_patient(patient_id).await?;

        let mut entries = Vec::with_capacity(prescriptions.len());
        for prescription in prescriptions {
            let appointment = self
                .store
                .find_appointment_by_id(prescription.appointment_id)
                .await?
                .ok_or_else(|| {
                    ClinicError::NotFound("Appointment for prescription not found".into())
                })?;

            let doctor = self
                .store
                .find_doctor_by_id(prescription.doctor_id)
                .await?
                .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;
            let doctor_account = self
                .store
                .find_account_by_id(doctor.account_id)
                .await?
                .ok_or_else(|| ClinicError::NotFound("Doctor account not found".into()))?;

            entries.push(MedicalHistoryEntry {
                prescription_id: prescription.id,
                doctor_username: doctor_account.username,
                appointment_time: appointment.appointment_time,
                appointment_status: appointment.status.as_str().to_string(),
                notes: prescription.notes,
                medicines: prescription.medicines,
            });
        }
        Ok(entries)
    }
}
