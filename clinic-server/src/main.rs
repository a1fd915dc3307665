//! 诊所预约服务器主程序

use clap::Parser;
use clinic_admin::{ClinicConfig, DirectoryCache, DirectoryService};
use clinic_auth::{hash_password, AuthService, JwtService};
use clinic_core::{ClinicError, Result, Role};
use clinic_database::{ClinicStore, DatabasePool, NewAccount, PostgresStore};
use clinic_records::{DocumentStore, PostgresDocumentStore};
use clinic_web::{AppState, WebServer};
use clinic_workflow::{AppointmentService, ClinicalRecordService, SlotService};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// 诊所预约服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(about = "诊所预约挂号系统服务器")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config/clinic")]
    config: String,

    /// 服务器端口（覆盖配置文件）
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .init();

    info!("启动诊所预约服务器...");

    let mut config = ClinicConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!("服务器配置:");
    info!("  监听地址: {}:{}", config.server.host, config.server.port);
    info!("  数据库最大连接数: {}", config.database.max_connections);

    // 建立数据库连接并初始化表结构
    let pool = DatabasePool::new(
        &config.database.connection_string,
        config.database.max_connections,
    )
    .await?;

    let store = Arc::new(PostgresStore::new(&pool));
    store.create_tables().await?;

    let documents = Arc::new(PostgresDocumentStore::new(pool.pool().clone()));
    documents.create_tables().await?;

    seed_bootstrap_admin(store.as_ref(), &config).await?;

    // 组装各业务服务
    let store: Arc<dyn ClinicStore> = store;
    let documents: Arc<dyn DocumentStore> = documents;
    let cache = Arc::new(DirectoryCache::new());

    let state = Arc::new(AppState {
        auth: AuthService::new(
            store.clone(),
            JwtService::new(&config.auth.jwt_secret, config.auth.access_token_ttl_secs),
            config.auth.refresh_token_ttl_secs,
        ),
        directory: DirectoryService::new(store.clone(), documents.clone(), cache),
        slots: SlotService::new(store.clone()),
        appointments: AppointmentService::new(store.clone()),
        records: ClinicalRecordService::new(store, documents),
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ClinicError::Config(format!("invalid listen address: {}", e)))?;

    let server = WebServer::new(addr, state);
    if let Err(e) = server.run().await {
        error!("服务器启动失败: {}", e);
        return Err(e);
    }

    Ok(())
}

/// 确保初始管理员账户存在
///
/// 没有管理员就无法开通其他账户，首次启动时按配置创建。
async fn seed_bootstrap_admin(store: &PostgresStore, config: &ClinicConfig) -> Result<()> {
    let username = &config.auth.bootstrap_admin_username;
    if store.find_account_by_username(username).await?.is_some() {
        return Ok(());
    }

    store
        .create_account(&NewAccount {
            id: Uuid::new_v4(),
            username: username.clone(),
            email: format!("{}@clinic.local", username),
            phone: "00000000000".to_string(),
            password_hash: hash_password(&config.auth.bootstrap_admin_password)?,
            role: Role::Admin,
            enabled: true,
        })
        .await?;

    info!(username = %username, "Bootstrap admin account created");
    Ok(())
}
