//! # Clinic Web 模块
//!
//! HTTP 接口层：认证中间件、按角色划分的路由与错误映射。

pub mod admin;
pub mod auth;
pub mod doctor;
pub mod error;
pub mod patient;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::WebServer;
pub use state::AppState;
