//! # Clinic 数据库模块
//!
//! 负责账户、档案、时段与预约数据的关系型存储，提供 PostgreSQL 连接池、
//! 抽象查询接口以及用于测试和数据初始化的内存实现。

pub mod connection;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

// 重新导出主要类型
pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PostgresStore;
pub use store::ClinicStore;
