//! HTTP 错误映射
//!
//! 把业务错误包装为接口层错误并映射到 HTTP 状态码。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use clinic_core::ClinicError;
use serde_json::json;

/// 接口层错误
#[derive(Debug)]
pub struct ApiError(pub ClinicError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            ClinicError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ClinicError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ClinicError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ClinicError::Permission(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ClinicError::State(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_state"),
            ClinicError::InvalidToken(_) | ClinicError::ExpiredToken(_) => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Internal server error");
        }

        let body = Json(json!({
            "error": error,
            "message": self.0.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (ClinicError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ClinicError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ClinicError::Conflict("x".into()), StatusCode::CONFLICT),
            (ClinicError::Permission("x".into()), StatusCode::FORBIDDEN),
            (ClinicError::State("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ClinicError::InvalidToken("x".into()), StatusCode::UNAUTHORIZED),
            (ClinicError::ExpiredToken("x".into()), StatusCode::UNAUTHORIZED),
            (ClinicError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
