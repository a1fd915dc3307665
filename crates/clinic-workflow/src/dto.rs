//! 业务视图对象
//!
//! 面向接口层的展示结构：用户名代替内部 ID，时间统一格式化为 HH:MM。

use chrono::NaiveDateTime;
use clinic_core::utils::format_hm;
use clinic_core::{Appointment, AvailabilitySlot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 时段视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    pub id: Uuid,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub reserved: bool,
}

impl SlotView {
    pub fn from_slot(slot: &AvailabilitySlot) -> Self {
        SlotView {
            id: slot.id,
            day_of_week: slot.day_of_week.as_str().to_string(),
            start_time: format_hm(slot.start_time),
            end_time: format_hm(slot.end_time),
            reserved: slot.reserved,
        }
    }
}

/// 预约视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentView {
    pub id: Uuid,
    pub doctor_username: String,
    pub patient_username: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub appointment_time: NaiveDateTime,
    pub status: String,
}

impl AppointmentView {
    pub fn build(
        appointment: &Appointment,
        slot: &AvailabilitySlot,
        doctor_username: &str,
        patient_username: &str,
    ) -> Self {
        AppointmentView {
            id: appointment.id,
            doctor_username: doctor_username.to_string(),
            patient_username: patient_username.to_string(),
            day_of_week: slot.day_of_week.as_str().to_string(),
            start_time: format_hm(slot.start_time),
            end_time: format_hm(slot.end_time),
            appointment_time: appointment.appointment_time,
            status: appointment.status.as_str().to_string(),
        }
    }
}

/// 就诊历史条目
///
/// 把处方与其对应预约的信息合并为一条历史记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalHistoryEntry {
    pub prescription_id: Uuid,
    pub doctor_username: String,
    pub appointment_time: NaiveDateTime,
    pub appointment_status: String,
    pub notes: String,
    pub medicines: Vec<String>,
}
