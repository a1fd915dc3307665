//! # Clinic 认证模块
//!
//! 负责密码哈希、JWT 访问令牌签发与校验，以及基于持久化
//! 不透明刷新令牌的登录/刷新/登出流程。

pub mod passwords;
pub mod service;
pub mod tokens;

// 重新导出主要类型
pub use passwords::{hash_password, verify_password};
pub use service::{AuthService, TokenPair};
pub use tokens::{Claims, JwtService};
