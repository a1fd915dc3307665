//! 内存存储实现
//!
//! 供测试与本地开发使用。所有数据保存在单个互斥锁保护的状态中，
//! 预订操作在持锁期间完成检查与写入，与数据库事务具有相同的互斥语义。

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use clinic_core::models::*;
use clinic_core::{ClinicError, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::*;
use crate::store::ClinicStore;

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    doctors: HashMap<Uuid, DoctorProfile>,
    patients: HashMap<Uuid, PatientProfile>,
    slots: HashMap<Uuid, AvailabilitySlot>,
    appointments: HashMap<Uuid, Appointment>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

/// 内存存储
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClinicStore for MemoryStore {
    // ========== 账户相关操作 ==========

    async fn create_account(&self, account: &NewAccount) -> Result<Account> {
        let mut state = self.state.lock().await;
        let record = Account {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            password_hash: account.password_hash.clone(),
            role: account.role,
            enabled: account.enabled,
            created_at: chrono::Utc::now(),
        };
        state.accounts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.accounts.values().any(|a| a.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.accounts.values().any(|a| a.email == email))
    }

    async fn phone_exists(&self, phone: &str) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.accounts.values().any(|a| a.phone == phone))
    }

    async fn update_account_contact(&self, id: Uuid, email: &str, phone: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(account) = state.accounts.get_mut(&id) {
            account.email = email.to_string();
            account.phone = phone.to_string();
        }
        Ok(())
    }

    async fn delete_account(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.accounts.remove(&id);
        state.refresh_tokens.retain(|_, t| t.account_id != id);
        Ok(())
    }

    // ========== 医生档案相关操作 ==========

    async fn create_doctor(&self, doctor: &NewDoctor) -> Result<DoctorProfile> {
        let mut state = self.state.lock().await;
        let record = DoctorProfile {
            id: doctor.id,
            account_id: doctor.account_id,
            specialty: doctor.specialty.clone(),
        };
        state.doctors.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_doctor_by_id(&self, id: Uuid) -> Result<Option<DoctorProfile>> {
        let state = self.state.lock().await;
        Ok(state.doctors.get(&id).cloned())
    }

    async fn find_doctor_by_account(&self, account_id: Uuid) -> Result<Option<DoctorProfile>> {
        let state = self.state.lock().await;
        Ok(state
            .doctors
            .values()
            .find(|d| d.account_id == account_id)
            .cloned())
    }

    async fn find_doctors_by_specialty(&self, specialty: &str) -> Result<Vec<DoctorProfile>> {
        let state = self.state.lock().await;
        let needle = specialty.to_lowercase();
        Ok(state
            .doctors
            .values()
            .filter(|d| d.specialty.to_lowercase() == needle)
            .cloned()
            .collect())
    }

    async fn list_doctors(&self) -> Result<Vec<DoctorProfile>> {
        let state = self.state.lock().await;
        Ok(state.doctors.values().cloned().collect())
    }

    async fn update_doctor_specialty(&self, id: Uuid, specialty: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(doctor) = state.doctors.get_mut(&id) {
            doctor.specialty = specialty.to_string();
        }
        Ok(())
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.doctors.remove(&id);
        state.slots.retain(|_, s| s.doctor_id != id);
        state.appointments.retain(|_, a| a.doctor_id != id);
        Ok(())
    }

    // ========== 患者档案相关操作 ==========

    async fn create_patient(&self, patient: &NewPatient) -> Result<PatientProfile> {
        let mut state = self.state.lock().await;
        let record = PatientProfile {
            id: patient.id,
            account_id: patient.account_id,
            gender: patient.gender,
            date_of_birth: patient.date_of_birth,
        };
        state.patients.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_patient_by_id(&self, id: Uuid) -> Result<Option<PatientProfile>> {
        let state = self.state.lock().await;
        Ok(state.patients.get(&id).cloned())
    }

    async fn find_patient_by_account(&self, account_id: Uuid) -> Result<Option<PatientProfile>> {
        let state = self.state.lock().await;
        Ok(state
            .patients
            .values()
            .find(|p| p.account_id == account_id)
            .cloned())
    }

    async fn list_patients(&self) -> Result<Vec<PatientProfile>> {
        let state = self.state.lock().await;
        Ok(state.patients.values().cloned().collect())
    }

    async fn update_patient_profile(
        &self,
        id: Uuid,
        gender: Gender,
        date_of_birth: NaiveDate,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(patient) = state.patients.get_mut(&id) {
            patient.gender = gender;
            patient.date_of_birth = date_of_birth;
        }
        Ok(())
    }

    async fn delete_patient(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.patients.remove(&id);
        state.appointments.retain(|_, a| a.patient_id != id);
        Ok(())
    }

    // ========== 时段相关操作 ==========

    async fn create_slot(&self, slot: &NewSlot) -> Result<AvailabilitySlot> {
        let mut state = self.state.lock().await;
        let record = AvailabilitySlot {
            id: slot.id,
            doctor_id: slot.doctor_id,
            day_of_week: slot.day_of_week,
            start_time: slot.start_time,
            end_time: slot.end_time,
            reserved: false,
        };
        state.slots.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_slot_by_id(&self, id: Uuid) -> Result<Option<AvailabilitySlot>> {
        let state = self.state.lock().await;
        Ok(state.slots.get(&id).cloned())
    }

    async fn slots_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilitySlot>> {
        let state = self.state.lock().await;
        let mut slots: Vec<_> = state
            .slots
            .values()
            .filter(|s| s.doctor_id == doctor_id)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.day_of_week.days_from_monday(), s.start_time));
        Ok(slots)
    }

    async fn slots_by_doctor_and_day(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
    ) -> Result<Vec<AvailabilitySlot>> {
        let state = self.state.lock().await;
        let mut slots: Vec<_> = state
            .slots
            .values()
            .filter(|s| s.doctor_id == doctor_id && s.day_of_week == day)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn slot_exists(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.slots.values().any(|s| {
            s.doctor_id == doctor_id
                && s.day_of_week == day
                && s.start_time == start
                && s.end_time == end
        }))
    }

    async fn available_slots_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilitySlot>> {
        let state = self.state.lock().await;
        let mut slots: Vec<_> = state
            .slots
            .values()
            .filter(|s| s.doctor_id == doctor_id && !s.reserved)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.day_of_week.days_from_monday(), s.start_time));
        Ok(slots)
    }

    async fn set_slot_reserved(&self, slot_id: Uuid, reserved: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(slot) = state.slots.get_mut(&slot_id) {
            slot.reserved = reserved;
        }
        Ok(())
    }

    // ========== 预约相关操作 ==========

    async fn reserve_and_book(&self, appointment: &NewAppointment) -> Result<Appointment> {
        // 持锁完成全部检查与写入，与数据库事务等价
        let mut state = self.state.lock().await;

        let already_booked = state.appointments.values().any(|a| {
            a.slot_id == appointment.slot_id && a.status == AppointmentStatus::Booked
        });
        if already_booked {
            return Err(ClinicError::Conflict("This slot is already booked".into()));
        }

        let slot = state
            .slots
            .get_mut(&appointment.slot_id)
            .ok_or_else(|| ClinicError::NotFound("Slot not found".into()))?;
        if slot.reserved {
            return Err(ClinicError::Conflict("This slot is already booked".into()));
        }
        slot.reserved = true;

        let record = Appointment {
            id: appointment.id,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            slot_id: appointment.slot_id,
            appointment_time: appointment.appointment_time,
            status: AppointmentStatus::Booked,
        };
        state.appointments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_appointment_by_id(&self, id: Uuid) -> Result<Option<Appointment>> {
        let state = self.state.lock().await;
        Ok(state.appointments.get(&id).cloned())
    }

    async fn appointments_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>> {
        let state = self.state.lock().await;
        let mut appointments: Vec<_> = state
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.appointment_time);
        Ok(appointments)
    }

    async fn appointments_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>> {
        let state = self.state.lock().await;
        let mut appointments: Vec<_> = state
            .appointments
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.appointment_time);
        Ok(appointments)
    }

    async fn booked_appointment_exists(&self, slot_id: Uuid) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state
            .appointments
            .values()
            .any(|a| a.slot_id == slot_id && a.status == AppointmentStatus::Booked))
    }

    async fn finish_appointment(
        &self,
        appointment_id: Uuid,
        slot_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<()> {
        // 持锁检查并写入，终态只能从 BOOKED 进入一次
        let mut state = self.state.lock().await;
        let appointment = state
            .appointments
            .get_mut(&appointment_id)
            .ok_or_else(|| ClinicError::NotFound("Appointment not found".into()))?;
        if appointment.status != AppointmentStatus::Booked {
            return Err(ClinicError::State(
                "appointment is no longer in BOOKED status".into(),
            ));
        }
        appointment.status = status;

        if let Some(slot) = state.slots.get_mut(&slot_id) {
            slot.reserved = false;
        }
        Ok(())
    }

    // ========== 刷新令牌相关操作 ==========

    async fn create_refresh_token(&self, token: &NewRefreshToken) -> Result<RefreshToken> {
        let mut state = self.state.lock().await;
        let record = RefreshToken {
            id: token.id,
            account_id: token.account_id,
            token: token.token.clone(),
            expires_at: token.expires_at,
        };
        state.refresh_tokens.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let state = self.state.lock().await;
        Ok(state.refresh_tokens.get(token).cloned())
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.refresh_tokens.remove(token);
        Ok(())
    }

    async fn delete_refresh_tokens_for_account(&self, account_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.refresh_tokens.retain(|_, t| t.account_id != account_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    async fn seed_booked_appointment(store: &MemoryStore) -> (Uuid, Uuid) {
        let slot_id = Uuid::new_v4();
        store
            .create_slot(&NewSlot {
                id: slot_id,
                doctor_id: Uuid::new_v4(),
                day_of_week: DayOfWeek::Monday,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            })
            .await
            .unwrap();

        let appointment = store
            .reserve_and_book(&NewAppointment {
                id: Uuid::new_v4(),
                doctor_id: Uuid::new_v4(),
                patient_id: Uuid::new_v4(),
                slot_id,
                appointment_time: NaiveDateTime::parse_from_str(
                    "2024-01-01 09:00:00",
                    "%Y-%m-%d %H:%M:%S",
                )
                .unwrap(),
            })
            .await
            .unwrap();
        (appointment.id, slot_id)
    }

    #[tokio::test]
    async fn test_finish_appointment_only_once() {
        let store = MemoryStore::new();
        let (appointment_id, slot_id) = seed_booked_appointment(&store).await;

        store
            .finish_appointment(appointment_id, slot_id, AppointmentStatus::Completed)
            .await
            .unwrap();

        // 终态写入后再次转换被拒绝，已写入的终态不被覆盖
        let result = store
            .finish_appointment(appointment_id, slot_id, AppointmentStatus::Cancelled)
            .await;
        assert!(matches!(result, Err(ClinicError::State(_))));
        let appointment = store
            .find_appointment_by_id(appointment_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_stale_finish_does_not_release_rebooked_slot() {
        let store = MemoryStore::new();
        let (appointment_id, slot_id) = seed_booked_appointment(&store).await;

        store
            .finish_appointment(appointment_id, slot_id, AppointmentStatus::Cancelled)
            .await
            .unwrap();

        // 时段被另一位患者重新预订
        store
            .reserve_and_book(&NewAppointment {
                id: Uuid::new_v4(),
                doctor_id: Uuid::new_v4(),
                patient_id: Uuid::new_v4(),
                slot_id,
                appointment_time: NaiveDateTime::parse_from_str(
                    "2024-01-08 09:00:00",
                    "%Y-%m-%d %H:%M:%S",
                )
                .unwrap(),
            })
            .await
            .unwrap();

        // 对旧预约的迟到转换不得释放已被新预约占用的时段
        let result = store
            .finish_appointment(appointment_id, slot_id, AppointmentStatus::Completed)
            .await;
        assert!(matches!(result, Err(ClinicError::State(_))));
        let slot = store.find_slot_by_id(slot_id).await.unwrap().unwrap();
        assert!(slot.reserved);
    }
}
