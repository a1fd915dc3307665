//! Web服务器

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post, put};
use axum::{middleware, Router};
use clinic_core::Result;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::admin;
use crate::auth;
use crate::doctor;
use crate::patient;
use crate::state::AppState;

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        let app = Self::create_app(state);
        Self { addr, app }
    }

    fn create_app(state: Arc<AppState>) -> Router {
        Router::new()
            // 认证路由（无需token）
            .nest("/api/auth", auth_routes())
            // 角色分区路由
            .nest("/api/admin", admin_routes(state.clone()))
            .nest("/api/doctor", doctor_routes(state.clone()))
            .nest("/api/patient", patient_routes(state.clone()))
            // 健康检查
            .route("/health", get(health))
            .with_state(state)
            // 全局中间件
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(
                        CorsLayer::new()
                            .allow_origin(Any)
                            .allow_methods(Any)
                            .allow_headers(Any),
                    ),
            )
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| clinic_core::ClinicError::Internal(format!("web server failed: {}", e)))?;

        Ok(())
    }
}

/// 健康检查处理器
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// 认证路由
fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
}

/// 管理员路由
fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/create-admin", post(admin::create_admin))
        .route("/create-doctor", post(admin::create_doctor))
        .route("/create-patient", post(admin::create_patient))
        .route("/doctors", get(admin::list_doctors))
        .route("/doctors/:id", put(admin::update_doctor))
        .route("/doctors/:id", delete(admin::delete_doctor))
        .route("/doctors/:id/slots", post(admin::add_slot))
        .route("/doctors/:id/day-slots", post(admin::add_day_slots))
        .route("/patients", get(admin::list_patients))
        .route("/patients/:id", put(admin::update_patient))
        .route("/patients/:id", delete(admin::delete_patient))
        .layer(middleware::from_fn(auth::require_admin))
        .layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

/// 医生路由
fn doctor_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/appointments", get(doctor::my_appointments))
        .route("/appointments/:id/complete", put(doctor::complete_appointment))
        .route("/available-slots", get(doctor::my_available_slots))
        .route("/prescriptions/:patient_id", post(doctor::create_prescription))
        .route("/medical-history/:patient_id", get(doctor::patient_medical_history))
        .layer(middleware::from_fn(auth::require_doctor))
        .layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

/// 患者路由
fn patient_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/doctors/search", get(patient::search_doctors))
        .route("/doctors/:id/available-slots", get(patient::doctor_available_slots))
        .route("/book-appointment", post(patient::book_appointment))
        .route("/appointments", get(patient::my_appointments))
        .route("/cancel-appointment/:id", put(patient::cancel_appointment))
        .route("/medical-history", get(patient::my_medical_history))
        .layer(middleware::from_fn(auth::require_patient))
        .layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
