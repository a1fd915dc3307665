//! 认证接口与中间件
//!
//! 登录/刷新/登出处理器，以及从 Bearer 令牌解析调用者身份的中间件
//! 和按角色放行的守卫。

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use clinic_auth::TokenPair;
use clinic_core::{CallerIdentity, ClinicError, Role};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 登录请求
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 刷新/登出请求
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// 登录处理器
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let pair = state.auth.login(&request.username, &request.password).await?;
    Ok(Json(pair))
}

/// 刷新访问令牌处理器
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let pair = state.auth.refresh(&request.refresh_token).await?;
    Ok(Json(pair))
}

/// 登出处理器
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    state.auth.logout(&request.refresh_token).await?;
    Ok(Json(json!({ "message": "logged out" })))
}

/// 认证中间件
///
/// 校验 Authorization: Bearer 头并把调用者身份写入请求扩展。
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)?;
    let caller = state.auth.identity_for_token(&token).await?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Result<String, ApiError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ClinicError::InvalidToken("missing Authorization header".into()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ClinicError::InvalidToken("expected Bearer token".into()))?;
    Ok(token.to_string())
}

/// 管理员角色守卫
pub async fn require_admin(
    Extension(caller): Extension<CallerIdentity>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(caller, Role::Admin)?;
    Ok(next.run(request).await)
}

/// 医生角色守卫
pub async fn require_doctor(
    Extension(caller): Extension<CallerIdentity>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(caller, Role::Doctor)?;
    Ok(next.run(request).await)
}

/// 患者角色守卫
pub async fn require_patient(
    Extension(caller): Extension<CallerIdentity>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(caller, Role::Patient)?;
    Ok(next.run(request).await)
}

fn require_role(caller: CallerIdentity, required: Role) -> Result<(), ApiError> {
    if caller.role != required {
        return Err(ClinicError::Permission(format!(
            "requires {} role",
            required.as_str()
        ))
        .into());
    }
    Ok(())
}
