//! # Clinic 临床文档模块
//!
//! 处方与病历的存储层。临床文档与预约主数据分开存放，
//! 提供独立的存储抽象以及 PostgreSQL 和内存两种实现。

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

// 重新导出主要类型
pub use memory::MemoryDocumentStore;
pub use models::{MedicalRecord, NewMedicalRecord, NewPrescription, Prescription};
pub use postgres::PostgresDocumentStore;
pub use store::DocumentStore;
