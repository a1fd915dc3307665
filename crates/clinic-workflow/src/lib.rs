//! # Clinic 预约工作流模块
//!
//! 实现预约生命周期、时段排班与临床文档的业务规则：
//! 状态机约束、时段预订的原子性、调用者权限校验以及就诊历史汇总。

pub mod appointments;
pub mod dto;
pub mod prescriptions;
pub mod slots;
pub mod state_machine;

// 重新导出主要类型
pub use appointments::AppointmentService;
pub use dto::{AppointmentView, MedicalHistoryEntry, SlotView};
pub use prescriptions::ClinicalRecordService;
pub use slots::SlotService;
pub use state_machine::{AppointmentEvent, AppointmentStateMachine};
