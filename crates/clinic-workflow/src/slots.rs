//! 时段排班服务
//!
//! 管理员为医生维护按星期重复的出诊时段，
//! 创建时校验时间窗有效性、精确重复与区间重叠。

use chrono::NaiveTime;
use clinic_core::utils::intervals_overlap;
use clinic_core::{AvailabilitySlot, CallerIdentity, ClinicError, DayOfWeek, Result, Role};
use clinic_database::{ClinicStore, NewSlot};
use std::sync::Arc;
use uuid::Uuid;

/// 时段排班服务
pub struct SlotService {
    store: Arc<dyn ClinicStore>,
}

impl SlotService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// 为医生创建单个时段
    ///
    /// 仅管理员可调用。同一医生同一天内不允许精确重复或时间重叠的时段。
    pub async fn create_slot(
        &self,
        caller: &CallerIdentity,
        doctor_id: Uuid,
        day: DayOfWeek,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<AvailabilitySlot> {
        if caller.role != Role::Admin {
            return Err(ClinicError::Permission(
                "only admins can manage doctor slots".into(),
            ));
        }

        self.store
            .find_doctor_by_id(doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;

        if start >= end {
            return Err(ClinicError::Validation(
                "slot start time must be before end time".into(),
            ));
        }

        if self.store.slot_exists(doctor_id, day, start, end).await? {
            return Err(ClinicError::Conflict(
                "an identical slot already exists for this doctor".into(),
            ));
        }

        // 与同一天已有时段做区间重叠检查
        let existing = self.store.slots_by_doctor_and_day(doctor_id, day).await?;
        for slot in &existing {
            if intervals_overlap(start, end, slot.start_time, slot.end_time) {
                return Err(ClinicError::Conflict(format!(
                    "slot overlaps existing window {} - {}",
                    slot.start_time.format("%H:%M"),
                    slot.end_time.format("%H:%M")
                )));
            }
        }

        let slot = self
            .store
            .create_slot(&NewSlot {
                id: Uuid::new_v4(),
                doctor_id,
                day_of_week: day,
                start_time: start,
                end_time: end,
            })
            .await?;

        tracing::info!(
            doctor_id = %doctor_id,
            day = day.as_str(),
            "Availability slot created"
        );
        Ok(slot)
    }

    /// 为医生批量创建某一天的多个时段
    ///
    /// 全量校验通过后才写入：任何一个窗口非法或与批内/已有时段
    /// 冲突时整批失败，不留下部分创建的时段。
    pub async fn add_day_slots(
        &self,
        caller: &CallerIdentity,
        doctor_id: Uuid,
        day: DayOfWeek,
        windows: &[(NaiveTime, NaiveTime)],
    ) -> Result<Vec<AvailabilitySlot>> {
        if caller.role != Role::Admin {
            return Err(ClinicError::Permission(
                "only admins can manage doctor slots".into(),
            ));
        }
        if windows.is_empty() {
            return Err(ClinicError::Validation(
                "at least one time window is required".into(),
            ));
        }

        self.store
            .find_doctor_by_id(doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;

        for (start, end) in windows {
            if start >= end {
                return Err(ClinicError::Validation(
                    "slot start time must be before end time".into(),
                ));
            }
        }

        // 批内两两重叠检查，相同窗口也会互相重叠
        for (i, (start, end)) in windows.iter().enumerate() {
            for (other_start, other_end) in &windows[i + 1..] {
                if intervals_overlap(*start, *end, *other_start, *other_end) {
                    return Err(ClinicError::Conflict(format!(
                        "window {} - {} overlaps another window in the batch",
                        start.format("%H:%M"),
                        end.format("%H:%M")
                    )));
                }
            }
        }

        let existing = self.store.slots_by_doctor_and_day(doctor_id, day).await?;
        for (start, end) in windows {
            for slot in &existing {
                if intervals_overlap(*start, *end, slot.start_time, slot.end_time) {
                    return Err(ClinicError::Conflict(format!(
                        "slot overlaps existing window {} - {}",
                        slot.start_time.format("%H:%M"),
                        slot.end_time.format("%H:%M")
                    )));
                }
            }
        }

        let mut created = Vec::with_capacity(windows.len());
        for (start, end) in windows {
            let slot = self
                .store
                .create_slot(&NewSlot {
                    id: Uuid::new_v4(),
                    doctor_id,
                    day_of_week: day,
                    start_time: *start,
                    end_time: *end,
                })
                .await?;
            created.push(slot);
        }

        tracing::info!(
            doctor_id = %doctor_id,
            day = day.as_str(),
            count = created.len(),
            "Availability slots created"
        );
        Ok(created)
    }

    /// 查询医生的全部时段
    pub async fn slots_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilitySlot>> {
        self.store
            .find_doctor_by_id(doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;

        self.store.slots_by_doctor(doctor_id).await
    }

    /// 查询医生当前未被预订的时段
    pub async fn available_slots(&self, doctor_id: Uuid) -> Result<Vec<AvailabilitySlot>> {
        self.store
            .find_doctor_by_id(doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;

        self.store.available_slots_by_doctor(doctor_id).await
    }
}
