//! 管理员接口处理器

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::{NaiveDate, NaiveTime};
use clinic_admin::{
    DoctorDirectoryEntry, NewAdminRequest, NewDoctorRequest, NewPatientRequest,
    PatientDirectoryEntry,
};
use clinic_core::{Account, CallerIdentity, ClinicError, DayOfWeek, Gender};
use clinic_workflow::SlotView;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// 时段创建请求，时间为 HH:MM 字符串
#[derive(Debug, Deserialize)]
pub struct SlotRequest {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

/// 单日批量时段创建请求
#[derive(Debug, Deserialize)]
pub struct DaySlotsRequest {
    pub day_of_week: String,
    pub windows: Vec<WindowRequest>,
}

#[derive(Debug, Deserialize)]
pub struct WindowRequest {
    pub start_time: String,
    pub end_time: String,
}

/// 医生更新请求
#[derive(Debug, Deserialize)]
pub struct UpdateDoctorRequest {
    pub email: String,
    pub phone: String,
    pub specialty: String,
}

/// 患者更新请求
#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub email: String,
    pub phone: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
}

pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<NewAdminRequest>,
) -> ApiResult<Json<Account>> {
    let account = state.directory.create_admin(&caller, &request).await?;
    Ok(Json(account))
}

pub async fn create_doctor(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<NewDoctorRequest>,
) -> ApiResult<Json<DoctorDirectoryEntry>> {
    let entry = state.directory.create_doctor(&caller, &request).await?;
    Ok(Json(entry))
}

pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<NewPatientRequest>,
) -> ApiResult<Json<PatientDirectoryEntry>> {
    let entry = state.directory.create_patient(&caller, &request).await?;
    Ok(Json(entry))
}

pub async fn add_slot(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<SlotRequest>,
) -> ApiResult<Json<SlotView>> {
    let day = parse_day(&request.day_of_week)?;
    let start = parse_time(&request.start_time)?;
    let end = parse_time(&request.end_time)?;

    let slot = state
        .slots
        .create_slot(&caller, doctor_id, day, start, end)
        .await?;
    Ok(Json(SlotView::from_slot(&slot)))
}

pub async fn add_day_slots(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<DaySlotsRequest>,
) -> ApiResult<Json<Vec<SlotView>>> {
    let day = parse_day(&request.day_of_week)?;
    let mut windows = Vec::with_capacity(request.windows.len());
    for window in &request.windows {
        windows.push((parse_time(&window.start_time)?, parse_time(&window.end_time)?));
    }

    let slots = state
        .slots
        .add_day_slots(&caller, doctor_id, day, &windows)
        .await?;
    Ok(Json(slots.iter().map(SlotView::from_slot).collect()))
}

pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<DoctorDirectoryEntry>>> {
    Ok(Json(state.directory.list_doctors(&caller).await?))
}

pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<PatientDirectoryEntry>>> {
    Ok(Json(state.directory.list_patients(&caller).await?))
}

pub async fn update_doctor(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> ApiResult<Json<Value>> {
    state
        .directory
        .update_doctor(
            &caller,
            doctor_id,
            &request.email,
            &request.phone,
            &request.specialty,
        )
        .await?;
    Ok(Json(json!({ "message": "doctor updated" })))
}

pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> ApiResult<Json<Value>> {
    state
        .directory
        .update_patient(
            &caller,
            patient_id,
            &request.email,
            &request.phone,
            request.gender,
            request.date_of_birth,
        )
        .await?;
    Ok(Json(json!({ "message": "patient updated" })))
}

pub async fn delete_doctor(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(doctor_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state.directory.delete_doctor(&caller, doctor_id).await?;
    Ok(Json(json!({ "message": "doctor deleted" })))
}

pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state.directory.delete_patient(&caller, patient_id).await?;
    Ok(Json(json!({ "message": "patient deleted" })))
}

pub(crate) fn parse_day(s: &str) -> Result<DayOfWeek, ClinicError> {
    DayOfWeek::parse(&s.to_uppercase())
        .ok_or_else(|| ClinicError::Validation(format!("invalid day of week: {}", s)))
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime, ClinicError> {
    clinic_core::utils::parse_hm(s)
        .ok_or_else(|| ClinicError::Validation(format!("invalid time (expected HH:MM): {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("monday").unwrap(), DayOfWeek::Monday);
        assert_eq!(parse_day("FRIDAY").unwrap(), DayOfWeek::Friday);
        assert!(parse_day("someday").is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("09:30:15").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 15).unwrap()
        );
        assert!(parse_time("9am").is_err());
    }
}
