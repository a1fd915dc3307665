//! 预约生命周期服务
//!
//! 挂号、完成与取消。预订通过存储层的原子操作完成，
//! 终态变更先经过状态机校验再在单个事务中落库并释放时段。

use chrono::Utc;
use clinic_core::utils::next_occurrence_on_or_after;
use clinic_core::{
    Appointment, AvailabilitySlot, CallerIdentity, ClinicError, DoctorProfile, PatientProfile,
    Result, Role,
};
use clinic_database::{ClinicStore, NewAppointment};
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::AppointmentView;
use crate::state_machine::{AppointmentEvent, AppointmentStateMachine};

/// 预约生命周期服务
pub struct AppointmentService {
    store: Arc<dyn ClinicStore>,
    state_machine: AppointmentStateMachine,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self {
            store,
            state_machine: AppointmentStateMachine::new(),
        }
    }

    /// 患者挂号
    ///
    /// 预约时间取时段星期的下一次出现（今天即该星期则取今天），
    /// 日期与时段开始时间组合成预约时刻。时段的占用判定完全交给
    /// 存储层的原子预订，业务层的存在性检查只用于提前给出友好错误。
    pub async fn book_appointment(
        &self,
        caller: &CallerIdentity,
        doctor_id: Uuid,
        slot_id: Uuid,
    ) -> Result<AppointmentView> {
        if caller.role != Role::Patient {
            return Err(ClinicError::Permission(
                "only patients can book appointments".into(),
            ));
        }

        let patient = self.patient_profile(caller).await?;

        let doctor = self
            .store
            .find_doctor_by_id(doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;

        let slot = self
            .store
            .find_slot_by_id(slot_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Slot not found".into()))?;

        if slot.doctor_id != doctor.id {
            return Err(ClinicError::Validation(
                "slot does not belong to the requested doctor".into(),
            ));
        }

        // 提前检查给出友好错误，真正的互斥由 reserve_and_book 保证
        if slot.reserved || self.store.booked_appointment_exists(slot.id).await? {
            return Err(ClinicError::Conflict("This slot is already booked".into()));
        }

        let today = Utc::now().date_naive();
        let date = next_occurrence_on_or_after(today, slot.day_of_week);
        let appointment_time = date.and_time(slot.start_time);

        let appointment = self
            .store
            .reserve_and_book(&NewAppointment {
                id: Uuid::new_v4(),
                doctor_id: doctor.id,
                patient_id: patient.id,
                slot_id: slot.id,
                appointment_time,
            })
            .await?;

        tracing::info!(
            appointment_id = %appointment.id,
            patient_id = %patient.id,
            doctor_id = %doctor.id,
            "Appointment booked"
        );

        self.build_view(&appointment, &slot, &doctor, &patient).await
    }

    /// 医生完成预约
    ///
    /// 仅该预约的主治医生可调用；预约必须处于 BOOKED 状态
    /// 且其时段仍被占用。完成后释放时段。
    pub async fn mark_appointment_completed(
        &self,
        caller: &CallerIdentity,
        appointment_id: Uuid,
    ) -> Result<AppointmentView> {
        if caller.role != Role::Doctor {
            return Err(ClinicError::Permission(
                "only doctors can complete appointments".into(),
            ));
        }

        let doctor = self.doctor_profile(caller).await?;

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

        let slot = self
            .store
            .find_slot_by_id(appointment.slot_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Slot not found".into()))?;

        if !slot.reserved {
            return Err(ClinicError::State(
                "slot is no longer reserved for this appointment".into(),
            ));
        }

        let next = self
            .state_machine
            .transition(appointment.status, AppointmentEvent::Complete)?;
        self.store
            .finish_appointment(appointment.id, slot.id, next)
            .await?;

        tracing::info!(appointment_id = %appointment.id, "Appointment completed");

        let updated = Appointment {
            status: next,
            ..appointment
        };
        let patient = self
            .store
            .find_patient_by_id(updated.patient_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Patient not found".into()))?;
        self.build_view(&updated, &slot, &doctor, &patient).await
    }

    /// 患者取消预约
    ///
    /// 仅预约所属患者可调用；只有 BOOKED 状态可取消，
    /// 已完成或已取消的预约返回状态错误。取消后释放时段。
    pub async fn cancel_appointment(
        &self,
        caller: &CallerIdentity,
        appointment_id: Uuid,
    ) -> Result<AppointmentView> {
        if caller.role != Role::Patient {
            return Err(ClinicError::Permission(
                "only patients can cancel appointments".into(),
            ));
        }

        let patient = self.patient_profile(caller).await?;

        let appointment = self
            .store
            .find_appointment_by_id(appointment_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Appointment not found".into()))?;

        if appointment.patient_id != patient.id {
            return Err(ClinicError::Permission(
                "appointment belongs to a different patient".into(),
            ));
        }

        let next = self
            .state_machine
            .transition(appointment.status, AppointmentEvent::Cancel)?;

        let slot = self
            .store
            .find_slot_by_id(appointment.slot_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Slot not found".into()))?;

        self.store
            .finish_appointment(appointment.id, slot.id, next)
            .await?;

        tracing::info!(appointment_id = %appointment.id, "Appointment cancelled");

        let updated = Appointment {
            status: next,
            ..appointment
        };
        let doctor = self
            .store
            .find_doctor_by_id(updated.doctor_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;
        self.build_view(&updated, &slot, &doctor, &patient).await
    }

    /// 医生查看自己的预约列表
    pub async fn doctor_appointments(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<AppointmentView>> {
        if caller.role != Role::Doctor {
            return Err(ClinicError::Permission(
                "only doctors can view their appointment list".into(),
            ));
        }

        let doctor = self.doctor_profile(caller).await?;
        let appointments = self.store.appointments_by_doctor(doctor.id).await?;
        self.build_views(appointments).await
    }

    /// 患者查看自己的预约列表
    pub async fn patient_appointments(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<AppointmentView>> {
        if caller.role != Role::Patient {
            return Err(ClinicError::Permission(
                "only patients can view their appointment list".into(),
            ));
        }

        let patient = self.patient_profile(caller).await?;
        let appointments = self.store.appointments_by_patient(patient.id).await?;
        self.build_views(appointments).await
    }

    /// 医生查看自己当前未被预订的时段
    pub async fn doctor_available_slots(
        &self,
        caller: &CallerIdentity,
    ) -> Result<Vec<AvailabilitySlot>> {
        if caller.role != Role::Doctor {
            return Err(ClinicError::Permission(
                "only doctors can view their own slots".into(),
            ));
        }

        let doctor = self.doctor_profile(caller).await?;
        self.store.available_slots_by_doctor(doctor.id).await
    }

    /// 根据调用者账户解析患者档案
    pub async fn patient_profile(&self, caller: &CallerIdentity) -> Result<PatientProfile> {
        self.store
            .find_patient_by_account(caller.account_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Patient profile not found".into()))
    }

    /// 根据调用者账户解析医生档案
    pub async fn doctor_profile(&self, caller: &CallerIdentity) -> Result<DoctorProfile> {
        self.store
            .find_doctor_by_account(caller.account_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor profile not found".into()))
    }

    async fn build_views(&self, appointments: Vec<Appointment>) -> Result<Vec<AppointmentView>> {
        let mut views = Vec::with_capacity(appointments.len());
        for appointment in &appointments {
            let slot = self
                .store
                .find_slot_by_id(appointment.slot_id)
                .await?
                .ok_or_else(|| ClinicError::NotFound("Slot not found".into()))?;
            let doctor = self
                .store
                .find_doctor_by_id(appointment.doctor_id)
                .await?
                .ok_or_else(|| ClinicError::NotFound("Doctor not found".into()))?;
            let patient = self
                .store
                .find_patient_by_id(appointment.patient_id)
                .await?
                .ok_or_else(|| ClinicError::NotFound("Patient not found".into()))?;
            views.push(self.build_view(appointment, &slot, &doctor, &patient).await?);
        }
        Ok(views)
    }

    async fn build_view(
        &self,
        appointment: &Appointment,
        slot: &AvailabilitySlot,
        doctor: &DoctorProfile,
        patient: &PatientProfile,
    ) -> Result<AppointmentView> {
        let doctor_account = self
            .store
            .find_account_by_id(doctor.account_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Doctor account not found".into()))?;
        let patient_account = self
            .store
            .find_account_by_id(patient.account_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound("Patient account not found".into()))?;

        Ok(AppointmentView::build(
            appointment,
            slot,
            &doctor_account.username,
            &patient_account.username,
        ))
    }
}
