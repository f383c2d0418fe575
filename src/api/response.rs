//! Uniform response envelope.
//!
//! Every API response is HTTP 200 with a body of
//! `{ status: { code, message, requestId, requestTime }, data, meta? }`;
//! clients branch on `status.code`.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthError;

/// Outcome classification carried in `status.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Success,
    Error,
    NotFound,
    ValidationError,
    Unauthorized,
    Forbidden,
    InvalidRequest,
    InternalError,
}

impl From<&AuthError> for ResponseCode {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::Validation(_) => Self::ValidationError,
            AuthError::Unauthorized(_) => Self::Unauthorized,
            AuthError::NotFound(_) => Self::NotFound,
            AuthError::Internal(_) => Self::InternalError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub code: ResponseCode,
    pub message: String,
    /// Fresh UUID v4 per response
    pub request_id: String,
    /// Epoch milliseconds
    pub request_time: i64,
}

/// Pagination metadata for list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: Status,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn new(code: ResponseCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: Status {
                code,
                message: message.into(),
                request_id: Uuid::new_v4().to_string(),
                request_time: Utc::now().timestamp_millis(),
            },
            data,
            meta: None,
        }
    }

    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self::new(ResponseCode::Success, message, Some(data))
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl ApiResponse<()> {
    /// Success without a payload (`data: null`).
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(ResponseCode::Success, message, None)
    }

    pub fn error(code: ResponseCode, message: impl Into<String>) -> Self {
        Self::new(code, message, None)
    }
}

impl From<AuthError> for ApiResponse<()> {
    fn from(err: AuthError) -> Self {
        Self::error(ResponseCode::from(&err), err.message())
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Auth failures render as envelopes, so handlers and the gate can use `?`.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_code_serialization() {
        assert_eq!(serde_json::to_value(ResponseCode::Success).unwrap(), json!("SUCCESS"));
        assert_eq!(
            serde_json::to_value(ResponseCode::ValidationError).unwrap(),
            json!("VALIDATION_ERROR")
        );
        assert_eq!(
            serde_json::to_value(ResponseCode::InvalidRequest).unwrap(),
            json!("INVALID_REQUEST")
        );
        assert_eq!(
            serde_json::to_value(ResponseCode::InternalError).unwrap(),
            json!("INTERNAL_ERROR")
        );
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::success("Login successful", json!({"a": 1})))
            .unwrap();

        assert_eq!(body["status"]["code"], "SUCCESS");
        assert_eq!(body["status"]["message"], "Login successful");
        assert!(Uuid::parse_str(body["status"]["requestId"].as_str().unwrap()).is_ok());
        assert!(body["status"]["requestTime"].as_i64().unwrap() > 1_600_000_000_000);
        assert_eq!(body["data"]["a"], 1);
        assert!(body.get("meta").is_none());
    }

    #[test]
    fn test_null_data_and_meta() {
        let body = serde_json::to_value(ApiResponse::ok("Logged out successfully")).unwrap();
        assert!(body["data"].is_null());

        let listed = ApiResponse::success("ok", vec![1, 2]).with_meta(Meta {
            total: 10,
            limit: 2,
            offset: 0,
        });
        let body = serde_json::to_value(listed).unwrap();
        assert_eq!(body["meta"]["total"], 10);
    }

    #[test]
    fn test_request_ids_are_fresh() {
        let a = ApiResponse::ok("a");
        let b = ApiResponse::ok("b");
        assert_ne!(a.status.request_id, b.status.request_id);
    }

    #[test]
    fn test_auth_error_mapping() {
        let cases = [
            (AuthError::validation("v"), ResponseCode::ValidationError),
            (AuthError::unauthorized("u"), ResponseCode::Unauthorized),
            (AuthError::not_found("n"), ResponseCode::NotFound),
            (AuthError::internal("i"), ResponseCode::InternalError),
        ];

        for (err, code) in cases {
            let response = ApiResponse::<()>::from(err.clone());
            assert_eq!(response.status.code, code);
            assert_eq!(response.status.message, err.message());
        }
    }
}
