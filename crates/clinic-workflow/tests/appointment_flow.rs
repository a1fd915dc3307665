//! 预约生命周期集成测试
//!
//! 使用内存存储覆盖挂号、完成、取消以及并发互斥场景。

use chrono::{NaiveDate, NaiveTime};
use clinic_core::{CallerIdentity, ClinicError, DayOfWeek, Gender, Role};
use clinic_database::{ClinicStore, MemoryStore, NewAccount, NewDoctor, NewPatient, NewSlot};
use clinic_records::MemoryDocumentStore;
use clinic_workflow::{AppointmentService, ClinicalRecordService};
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    store: Arc<MemoryStore>,
    appointments: AppointmentService,
    records: ClinicalRecordService,
    doctor_caller: CallerIdentity,
    patient_caller: CallerIdentity,
    doctor_id: Uuid,
    patient_id: Uuid,
    slot_id: Uuid,
}

async fn seed_account(store: &MemoryStore, username: &str, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    store
        .create_account(&NewAccount {
            id,
            username: username.to_string(),
            email: format!("{}@clinic.test", username),
            phone: format!("1{}", &id.simple().to_string()[..10]),
            password_hash: "hash".to_string(),
            role,
            enabled: true,
        })
        .await
        .unwrap();
    id
}

async fn seed_slot(store: &MemoryStore, doctor_id: Uuid, start_h: u32) -> Uuid {
    let id = Uuid::new_v4();
    store
        .create_slot(&NewSlot {
            id,
            doctor_id,
            day_of_week: DayOfWeek::Monday,
            start_time: NaiveTime::from_hms_opt(start_h, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(start_h + 1, 0, 0).unwrap(),
        })
        .await
        .unwrap();
    id
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let documents = Arc::new(MemoryDocumentStore::new());

    let doctor_account = seed_account(&store, "dr_chen", Role::Doctor).await;
    let doctor_id = Uuid::new_v4();
    store
        .create_doctor(&NewDoctor {
            id: doctor_id,
            account_id: doctor_account,
            specialty: "Cardiology".to_string(),
        })
        .await
        .unwrap();

    let patient_account = seed_account(&store, "alice", Role::Patient).await;
    let patient_id = Uuid::new_v4();
    store
        .create_patient(&NewPatient {
            id: patient_id,
            account_id: patient_account,
            gender: Gender::Female,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 12).unwrap(),
        })
        .await
        .unwrap();

    let slot_id = seed_slot(&store, doctor_id, 9).await;

    let appointments = AppointmentService::new(store.clone());
    let records = ClinicalRecordService::new(store.clone(), documents);

    Fixture {
        store,
        appointments,
        records,
        doctor_caller: CallerIdentity {
            account_id: doctor_account,
            role: Role::Doctor,
        },
        patient_caller: CallerIdentity {
            account_id: patient_account,
            role: Role::Patient,
        },
        doctor_id,
        patient_id,
        slot_id,
    }
}

#[tokio::test]
async fn test_book_appointment_success() {
    let fx = fixture().await;

    let view = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();

    assert_eq!(view.doctor_username, "dr_chen");
    assert_eq!(view.patient_username, "alice");
    assert_eq!(view.day_of_week, "MONDAY");
    assert_eq!(view.start_time, "09:00");
    assert_eq!(view.end_time, "10:00");
    assert_eq!(view.status, "BOOKED");

    // 预订后时段被占用
    let slot = fx.store.find_slot_by_id(fx.slot_id).await.unwrap().unwrap();
    assert!(slot.reserved);
}

#[tokio::test]
async fn test_book_reserved_slot_conflicts() {
    let fx = fixture().await;

    fx.appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();

    let result = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await;
    assert!(matches!(result, Err(ClinicError::Conflict(_))));
}

#[tokio::test]
async fn test_book_requires_patient_role() {
    let fx = fixture().await;

    let result = fx
        .appointments
        .book_appointment(&fx.doctor_caller, fx.doctor_id, fx.slot_id)
        .await;
    assert!(matches!(result, Err(ClinicError::Permission(_))));
}

#[tokio::test]
async fn test_book_slot_of_other_doctor_rejected() {
    let fx = fixture().await;

    let other_account = seed_account(&fx.store, "dr_wang", Role::Doctor).await;
    let other_doctor = Uuid::new_v4();
    fx.store
        .create_doctor(&NewDoctor {
            id: other_doctor,
            account_id: other_account,
            specialty: "Dermatology".to_string(),
        })
        .await
        .unwrap();

    // 时段属于 dr_chen，却指定 dr_wang
    let result = fx
        .appointments
        .book_appointment(&fx.patient_caller, other_doctor, fx.slot_id)
        .await;
    assert!(matches!(result, Err(ClinicError::Validation(_))));
}

#[tokio::test]
async fn test_concurrent_booking_only_one_wins() {
    let fx = fixture().await;

    // 第二位患者
    let bob_account = seed_account(&fx.store, "bob", Role::Patient).await;
    fx.store
        .create_patient(&NewPatient {
            id: Uuid::new_v4(),
            account_id: bob_account,
            gender: Gender::Male,
            date_of_birth: NaiveDate::from_ymd_opt(1985, 3, 2).unwrap(),
        })
        .await
        .unwrap();
    let bob_caller = CallerIdentity {
        account_id: bob_account,
        role: Role::Patient,
    };

    let (a, b) = tokio::join!(
        fx.appointments
            .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id),
        fx.appointments
            .book_appointment(&bob_caller, fx.doctor_id, fx.slot_id),
    );

    // 两个并发预订者恰好一个成功
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(ClinicError::Conflict(_))));
}

#[tokio::test]
async fn test_complete_appointment_frees_slot() {
    let fx = fixture().await;

    let booked = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();

    let view = fx
        .appointments
        .mark_appointment_completed(&fx.doctor_caller, booked.id)
        .await
        .unwrap();
    assert_eq!(view.status, "COMPLETED");

    let slot = fx.store.find_slot_by_id(fx.slot_id).await.unwrap().unwrap();
    assert!(!slot.reserved);
}

#[tokio::test]
async fn test_complete_by_other_doctor_rejected() {
    let fx = fixture().await;

    let booked = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();

    let other_account = seed_account(&fx.store, "dr_wang", Role::Doctor).await;
    fx.store
        .create_doctor(&NewDoctor {
            id: Uuid::new_v4(),
            account_id: other_account,
            specialty: "Dermatology".to_string(),
        })
        .await
        .unwrap();
    let other_caller = CallerIdentity {
        account_id: other_account,
        role: Role::Doctor,
    };

    let result = fx
        .appointments
        .mark_appointment_completed(&other_caller, booked.id)
        .await;
    assert!(matches!(result, Err(ClinicError::Permission(_))));
}

#[tokio::test]
async fn test_cancel_appointment_frees_slot() {
    let fx = fixture().await;

    let booked = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();

    let view = fx
        .appointments
        .cancel_appointment(&fx.patient_caller, booked.id)
        .await
        .unwrap();
    assert_eq!(view.status, "CANCELLED");

    // 取消后时段可再次预订
    let slot = fx.store.find_slot_by_id(fx.slot_id).await.unwrap().unwrap();
    assert!(!slot.reserved);
    fx.appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_completed_appointment_rejected() {
    let fx = fixture().await;

    let booked = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();
    fx.appointments
        .mark_appointment_completed(&fx.doctor_caller, booked.id)
        .await
        .unwrap();

    // 已完成的预约不可取消
    let result = fx
        .appointments
        .cancel_appointment(&fx.patient_caller, booked.id)
        .await;
    assert!(matches!(result, Err(ClinicError::State(_))));
}

#[tokio::test]
async fn test_cancel_by_other_patient_rejected() {
    let fx = fixture().await;

    let booked = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();

    let bob_account = seed_account(&fx.store, "bob", Role::Patient).await;
    fx.store
        .create_patient(&NewPatient {
            id: Uuid::new_v4(),
            account_id: bob_account,
            gender: Gender::Male,
            date_of_birth: NaiveDate::from_ymd_opt(1985, 3, 2).unwrap(),
        })
        .await
        .unwrap();
    let bob_caller = CallerIdentity {
        account_id: bob_account,
        role: Role::Patient,
    };

    let result = fx.appointments.cancel_appointment(&bob_caller, booked.id).await;
    assert!(matches!(result, Err(ClinicError::Permission(_))));
}

#[tokio::test]
async fn test_prescription_and_medical_history() {
    let fx = fixture().await;

    let booked = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();

    let prescription = fx
        .records
        .create_prescription(
            &fx.doctor_caller,
            fx.patient_id,
            booked.id,
            "Take after meals",
            vec!["Aspirin".to_string(), "Vitamin C".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(prescription.medicines.len(), 2);

    // 医生视角的就诊历史
    let history = fx
        .records
        .doctor_medical_history(&fx.doctor_caller, fx.patient_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].doctor_username, "dr_chen");
    assert_eq!(history[0].notes, "Take after meals");
    assert_eq!(history[0].appointment_status, "BOOKED");

    // 患者视角与医生视角一致
    let own = fx
        .records
        .patient_medical_history(&fx.patient_caller)
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].prescription_id, history[0].prescription_id);
}

#[tokio::test]
async fn test_prescription_on_foreign_appointment_rejected() {
    let fx = fixture().await;

    let booked = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();

    let other_account = seed_account(&fx.store, "dr_wang", Role::Doctor).await;
    fx.store
        .create_doctor(&NewDoctor {
            id: Uuid::new_v4(),
            account_id: other_account,
            specialty: "Dermatology".to_string(),
        })
        .await
        .unwrap();
    let other_caller = CallerIdentity {
        account_id: other_account,
        role: Role::Doctor,
    };

    let result = fx
        .records
        .create_prescription(
            &other_caller,
            fx.patient_id,
            booked.id,
            "notes",
            vec!["Aspirin".to_string()],
        )
        .await;
    assert!(matches!(result, Err(ClinicError::Permission(_))));
}

#[tokio::test]
async fn test_concurrent_complete_and_cancel_single_winner() {
    let fx = fixture().await;

    let booked = fx
        .appointments
        .book_appointment(&fx.patient_caller, fx.doctor_id, fx.slot_id)
        .await
        .unwrap();

    // 医生完成与患者取消同时到达，终态只能写入一次
    let (complete, cancel) = tokio::join!(
        fx.appointments
            .mark_appointment_completed(&fx.doctor_caller, booked.id),
        fx.appointments.cancel_appointment(&fx.patient_caller, booked.id),
    );
    assert_eq!(complete.is_ok() as u8 + cancel.is_ok() as u8, 1);

    // 失败方没有覆盖已写入的终态
    let winner_status = if complete.is_ok() {
        "COMPLETED"
    } else {
        "CANCELLED"
    };
    let views = fx
        .appointments
        .patient_appointments(&fx.patient_caller)
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].status, winner_status);

    let slot = fx.store.find_slot_by_id(fx.slot_id).await.unwrap().unwrap();
    assert!(!slot.reserved);
}
