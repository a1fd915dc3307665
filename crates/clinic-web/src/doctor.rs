//! 医生接口处理器

use axum::extract::{Path, State};
use axum::{Extension, Json};
use clinic_core::CallerIdentity;
use clinic_records::Prescription;
use clinic_workflow::{AppointmentView, MedicalHistoryEntry, SlotView};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// 开方请求
#[derive(Debug, Deserialize)]
pub struct PrescriptionRequest {
    pub appointment_id: Uuid,
    pub notes: String,
    pub medicines: Vec<String>,
}

pub async fn my_appointments(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<AppointmentView>>> {
    Ok(Json(state.appointments.doctor_appointments(&caller).await?))
}

pub async fn my_available_slots(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<SlotView>>> {
    let slots = state.appointments.doctor_available_slots(&caller).await?;
    Ok(Json(slots.iter().map(SlotView::from_slot).collect()))
}

pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(appointment_id): Path<Uuid>,
) -> ApiResult<Json<AppointmentView>> {
    let view = state
        .appointments
        .mark_appointment_completed(&caller, appointment_id)
        .await?;
    Ok(Json(view))
}

pub async fn create_prescription(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<PrescriptionRequest>,
) -> ApiResult<Json<Prescription>> {
    let prescription = state
        .records
        .create_prescription(
            &caller,
            patient_id,
            request.appointment_id,
            &request.notes,
            request.medicines,
        )
        .await?;
    Ok(Json(prescription))
}

pub async fn patient_medical_history(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MedicalHistoryEntry>>> {
    let history = state
        .records
        .doctor_medical_history(&caller, patient_id)
        .await?;
    Ok(Json(history))
}
