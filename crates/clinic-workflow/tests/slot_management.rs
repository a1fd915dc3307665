//! 时段排班集成测试

use chrono::NaiveTime;
use clinic_core::{CallerIdentity, ClinicError, DayOfWeek, Role};
use clinic_database::{ClinicStore, MemoryStore, NewAccount, NewDoctor};
use clinic_workflow::SlotService;
use std::sync::Arc;
use uuid::Uuid;

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

async fn setup() -> (SlotService, CallerIdentity, Uuid) {
    let store = Arc::new(MemoryStore::new());

    let admin_id = Uuid::new_v4();
    store
        .create_account(&NewAccount {
            id: admin_id,
            username: "admin".to_string(),
            email: "admin@clinic.test".to_string(),
            phone: "10000000000".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Admin,
            enabled: true,
        })
        .await
        .unwrap();

    let doctor_account = Uuid::new_v4();
    store
        .create_account(&NewAccount {
            id: doctor_account,
            username: "dr_chen".to_string(),
            email: "dr_chen@clinic.test".to_string(),
            phone: "10000000001".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Doctor,
            enabled: true,
        })
        .await
        .unwrap();
    let doctor_id = Uuid::new_v4();
    store
        .create_doctor(&NewDoctor {
            id: doctor_id,
            account_id: doctor_account,
            specialty: "Cardiology".to_string(),
        })
        .await
        .unwrap();

    let service = SlotService::new(store);
    let admin = CallerIdentity {
        account_id: admin_id,
        role: Role::Admin,
    };
    (service, admin, doctor_id)
}

#[tokio::test]
async fn test_create_slot_success() {
    let (service, admin, doctor_id) = setup().await;

    let slot = service
        .create_slot(&admin, doctor_id, DayOfWeek::Tuesday, t(9, 0), t(10, 0))
        .await
        .unwrap();

    assert_eq!(slot.day_of_week, DayOfWeek::Tuesday);
    assert!(!slot.reserved);
}

#[tokio::test]
async fn test_create_slot_requires_admin() {
    let (service, _admin, doctor_id) = setup().await;

    let caller = CallerIdentity {
        account_id: Uuid::new_v4(),
        role: Role::Doctor,
    };
    let result = service
        .create_slot(&caller, doctor_id, DayOfWeek::Tuesday, t(9, 0), t(10, 0))
        .await;
    assert!(matches!(result, Err(ClinicError::Permission(_))));
}

#[tokio::test]
async fn test_create_slot_invalid_window() {
    let (service, admin, doctor_id) = setup().await;

    // 开始时间必须早于结束时间
    let result = service
        .create_slot(&admin, doctor_id, DayOfWeek::Tuesday, t(10, 0), t(9, 0))
        .await;
    assert!(matches!(result, Err(ClinicError::Validation(_))));

    let result = service
        .create_slot(&admin, doctor_id, DayOfWeek::Tuesday, t(9, 0), t(9, 0))
        .await;
    assert!(matches!(result, Err(ClinicError::Validation(_))));
}

#[tokio::test]
async fn test_create_duplicate_slot_conflicts() {
    let (service, admin, doctor_id) = setup().await;

    service
        .create_slot(&admin, doctor_id, DayOfWeek::Tuesday, t(9, 0), t(10, 0))
        .await
        .unwrap();

    let result = service
        .create_slot(&admin, doctor_id, DayOfWeek::Tuesday, t(9, 0), t(10, 0))
        .await;
    assert!(matches!(result, Err(ClinicError::Conflict(_))));
}

#[tokio::test]
async fn test_create_overlapping_slot_conflicts() {
    let (service, admin, doctor_id) = setup().await;

    service
        .create_slot(&admin, doctor_id, DayOfWeek::Tuesday, t(9, 0), t(10, 0))
        .await
        .unwrap();

    // 部分重叠
    let result = service
        .create_slot(&admin, doctor_id, DayOfWeek::Tuesday, t(9, 30), t(10, 30))
        .await;
    assert!(matches!(result, Err(ClinicError::Conflict(_))));

    // 不同星期不冲突
    service
        .create_slot(&admin, doctor_id, DayOfWeek::Wednesday, t(9, 30), t(10, 30))
        .await
        .unwrap();

    // 首尾相接不算重叠
    service
        .create_slot(&admin, doctor_id, DayOfWeek::Tuesday, t(10, 0), t(11, 0))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_day_slots_batch() {
    let (service, admin, doctor_id) = setup().await;

    let created = service
        .add_day_slots(
            &admin,
            doctor_id,
            DayOfWeek::Friday,
            &[(t(9, 0), t(10, 0)), (t(10, 0), t(11, 0)), (t(14, 0), t(15, 0))],
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 3);

    let slots = service.slots_by_doctor(doctor_id).await.unwrap();
    assert_eq!(slots.len(), 3);

    let result = service
        .add_day_slots(&admin, doctor_id, DayOfWeek::Friday, &[])
        .await;
    assert!(matches!(result, Err(ClinicError::Validation(_))));
}

#[tokio::test]
async fn test_add_day_slots_all_or_nothing() {
    let (service, admin, doctor_id) = setup().await;

    // 批内含非法窗口，整批不落库
    let result = service
        .add_day_slots(
            &admin,
            doctor_id,
            DayOfWeek::Friday,
            &[(t(9, 0), t(10, 0)), (t(11, 0), t(10, 30))],
        )
        .await;
    assert!(matches!(result, Err(ClinicError::Validation(_))));
    assert!(service.slots_by_doctor(doctor_id).await.unwrap().is_empty());

    // 批内窗口互相重叠，整批不落库
    let result = service
        .add_day_slots(
            &admin,
            doctor_id,
            DayOfWeek::Friday,
            &[(t(9, 0), t(10, 0)), (t(9, 30), t(10, 30))],
        )
        .await;
    assert!(matches!(result, Err(ClinicError::Conflict(_))));
    assert!(service.slots_by_doctor(doctor_id).await.unwrap().is_empty());

    // 与已有时段重叠，已有数量不变
    service
        .create_slot(&admin, doctor_id, DayOfWeek::Friday, t(13, 0), t(14, 0))
        .await
        .unwrap();
    let result = service
        .add_day_slots(
            &admin,
            doctor_id,
            DayOfWeek::Friday,
            &[(t(8, 0), t(9, 0)), (t(13, 30), t(14, 30))],
        )
        .await;
    assert!(matches!(result, Err(ClinicError::Conflict(_))));
    assert_eq!(service.slots_by_doctor(doctor_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_doctor_not_found() {
    let (service, admin, _doctor_id) = setup().await;

    let result = service
        .create_slot(&admin, Uuid::new_v4(), DayOfWeek::Monday, t(9, 0), t(10, 0))
        .await;
    assert!(matches!(result, Err(ClinicError::NotFound(_))));

    let result = service.slots_by_doctor(Uuid::new_v4()).await;
    assert!(matches!(result, Err(ClinicError::NotFound(_))));
}
