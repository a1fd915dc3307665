//! 认证服务
//!
//! 登录签发访问令牌和持久化的不透明刷新令牌；
//! 刷新只换发访问令牌，刷新令牌原样返回；登出撤销刷新令牌。

use chrono::{Duration, Utc};
use clinic_core::{CallerIdentity, ClinicError, Result, Role};
use clinic_database::{ClinicStore, NewRefreshToken};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::tokens::JwtService;

/// 刷新令牌长度（字符）
const REFRESH_TOKEN_LEN: usize = 64;

/// 登录/刷新返回的令牌对
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub role: Role,
}

/// 认证服务
pub struct AuthService {
    store: Arc<dyn ClinicStore>,
    jwt: JwtService,
    refresh_ttl_secs: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn ClinicStore>, jwt: JwtService, refresh_ttl_secs: i64) -> Self {
        Self {
            store,
            jwt,
            refresh_ttl_secs,
        }
    }

    /// 用户名密码登录
    ///
    /// 用户名不存在与密码错误返回同一个错误，不泄露账户是否存在。
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let account = self
            .store
            .find_account_by_username(username)
            .await?
            .ok_or_else(|| ClinicError::InvalidToken("invalid username or password".into()))?;

        if !crate::passwords::verify_password(password, &account.password_hash) {
            return Err(ClinicError::InvalidToken(
                "invalid username or password".into(),
            ));
        }

        if !account.enabled {
            return Err(ClinicError::Permission("account is disabled".into()));
        }

        let access_token = self.jwt.generate_access_token(&account.username, account.role)?;

        let refresh_token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REFRESH_TOKEN_LEN)
            .map(char::from)
            .collect();
        self.store
            .create_refresh_token(&NewRefreshToken {
                id: Uuid::new_v4(),
                account_id: account.id,
                token: refresh_token.clone(),
                expires_at: Utc::now() + Duration::seconds(self.refresh_ttl_secs),
            })
            .await?;

        tracing::info!(username = %account.username, "User logged in");

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            role: account.role,
        })
    }

    /// 换发访问令牌
    ///
    /// 刷新令牌不轮换：同一个刷新令牌在有效期内可多次使用，
    /// 过期的令牌被删除并返回过期错误。
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let stored = self
            .store
            .find_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| ClinicError::InvalidToken("unknown refresh token".into()))?;

        if stored.expires_at < Utc::now() {
            self.store.delete_refresh_token(refresh_token).await?;
            return Err(ClinicError::ExpiredToken("refresh token has expired".into()));
        }

        let account = self
            .store
            .find_account_by_id(stored.account_id)
            .await?
            .ok_or_else(|| ClinicError::InvalidToken("account no longer exists".into()))?;

        if !account.enabled {
            return Err(ClinicError::Permission("account is disabled".into()));
        }

        let access_token = self.jwt.generate_access_token(&account.username, account.role)?;

        Ok(TokenPair {
            access_token,
            refresh_token: stored.token,
            token_type: "Bearer".to_string(),
            role: account.role,
        })
    }

    /// 登出
    ///
    /// 幂等：令牌不存在也返回成功。
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        self.store.delete_refresh_token(refresh_token).await
    }

    /// 从访问令牌解析调用者身份
    ///
    /// 供接口层中间件使用：校验令牌、回查账户并确认仍然可用。
    pub async fn identity_for_token(&self, token: &str) -> Result<CallerIdentity> {
        let claims = self.jwt.validate_access_token(token)?;

        let account = self
            .store
            .find_account_by_username(&claims.sub)
            .await?
            .ok_or_else(|| ClinicError::InvalidToken("account no longer exists".into()))?;

        if !account.enabled {
            return Err(ClinicError::Permission("account is disabled".into()));
        }

        Ok(CallerIdentity {
            account_id: account.id,
            role: account.role,
        })
    }
}
