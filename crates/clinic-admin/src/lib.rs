//! # Clinic 管理模块
//!
//! 管理员侧的账户开通与目录维护：创建管理员/医生/患者账户、
//! 更新与删除档案、按专科检索医生，以及系统配置管理。

pub mod cache;
pub mod config;
pub mod directory;

// 重新导出主要类型
pub use cache::DirectoryCache;
pub use config::{AuthConfig, ClinicConfig, DatabaseConfig, ServerConfig};
pub use directory::{
    DirectoryService, DoctorDirectoryEntry, InitialSlotRequest, NewAdminRequest, NewDoctorRequest,
    NewPatientRequest, PatientDirectoryEntry,
};
