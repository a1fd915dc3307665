//! 患者接口处理器

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use clinic_admin::DoctorDirectoryEntry;
use clinic_core::CallerIdentity;
use clinic_workflow::{AppointmentView, MedicalHistoryEntry, SlotView};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// 按专科检索参数
#[derive(Debug, Deserialize)]
pub struct SpecialtyQuery {
    pub specialty: String,
}

/// 挂号请求
#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub slot_id: Uuid,
}

pub async fn search_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SpecialtyQuery>,
) -> ApiResult<Json<Vec<DoctorDirectoryEntry>>> {
    let doctors = state
        .directory
        .search_doctors_by_specialty(&query.specialty)
        .await?;
    Ok(Json(doctors))
}

pub async fn doctor_available_slots(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> ApiResult<Json<Vec<SlotView>>> {
    let slots = state.slots.available_slots(doctor_id).await?;
    Ok(Json(slots.iter().map(SlotView::from_slot).collect()))
}

pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<BookingRequest>,
) -> ApiResult<Json<AppointmentView>> {
    let view = state
        .appointments
        .book_appointment(&caller, request.doctor_id, request.slot_id)
        .await?;
    Ok(Json(view))
}

pub async fn my_appointments(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<AppointmentView>>> {
    Ok(Json(state.appointments.patient_appointments(&caller).await?))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(appointment_id): Path<Uuid>,
) -> ApiResult<Json<AppointmentView>> {
    let view = state
        .appointments
        .cancel_appointment(&caller, appointment_id)
        .await?;
    Ok(Json(view))
}

pub async fn my_medical_history(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<MedicalHistoryEntry>>> {
    Ok(Json(state.records.patient_medical_history(&caller).await?))
}
