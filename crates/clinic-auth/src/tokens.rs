//! JWT 访问令牌
//!
//! HS256 签名。访问令牌携带用户名、角色列表与 `type` 声明，
//! 刷新凭证使用持久化的不透明令牌，不走 JWT。

use chrono::Utc;
use clinic_core::{ClinicError, Result, Role};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT 声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户名
    pub sub: String,
    /// 角色列表
    pub roles: Vec<String>,
    /// 令牌类型，访问令牌固定为 "access"
    #[serde(rename = "type")]
    pub token_type: String,
    /// 签发时间（Unix 秒）
    pub iat: i64,
    /// 过期时间（Unix 秒）
    pub exp: i64,
}

/// JWT 签发与校验服务
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs,
        }
    }

    /// 签发访问令牌
    pub fn generate_access_token(&self, username: &str, role: Role) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            roles: vec![role.as_str().to_string()],
            token_type: "access".to_string(),
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ClinicError::Internal(format!("token signing failed: {}", e)))
    }

    /// 校验访问令牌并返回声明
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ClinicError::ExpiredToken("access token has expired".into())
            }
            _ => ClinicError::InvalidToken(e.to_string()),
        })?;

        if data.claims.token_type != "access" {
            return Err(ClinicError::InvalidToken(
                "token is not an access token".into(),
            ));
        }
        Ok(data.claims)
    }
}
