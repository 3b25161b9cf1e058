//! Unified application error model and mapping helpers.
//! One enum is shared by the HTTP boundary, the account orchestrator and the
//! identity pipeline, along with the mapping to problem-object responses.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Malformed or missing input fields, reported per field.
    Validation { field_errors: BTreeMap<String, String> },
    /// Business-rule failure with a stable machine code.
    Domain { code: String, message: String },
    /// Missing credential or identity on a route that requires one.
    Auth { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn validation(field_errors: BTreeMap<String, String>) -> Self {
        AppError::Validation { field_errors }
    }
    pub fn domain<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self {
        AppError::Domain { code: code.into(), message: msg.into() }
    }
    pub fn auth<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self {
        AppError::Auth { code: code.into(), message: msg.into() }
    }
    pub fn not_found<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self {
        AppError::NotFound { code: code.into(), message: msg.into() }
    }
    pub fn internal<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self {
        AppError::Internal { code: code.into(), message: msg.into() }
    }

    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { .. } => "VALIDATION",
            AppError::Domain { code, .. }
            | AppError::Auth { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { .. } => "One or more fields have invalid values.",
            AppError::Domain { message, .. }
            | AppError::Auth { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    fn title(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "Validation Error",
            AppError::Domain { .. } => "Invalid Data Error",
            AppError::Auth { .. } => "Unauthorized",
            AppError::NotFound { .. } => "Not Found",
            AppError::Internal { .. } => "Unexpected Error",
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Domain { .. } => StatusCode::BAD_REQUEST,
            AppError::Auth { .. } => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Problem object rendered to callers. Validation failures carry a
    /// field->message map; everything else carries a machine code. Internal
    /// detail stays on the server side of the wire.
    fn problem_body(&self) -> serde_json::Value {
        match self {
            AppError::Validation { field_errors } => json!({
                "title": self.title(),
                "detail": self.message(),
                "fieldErrors": field_errors,
            }),
            AppError::Internal { .. } => json!({
                "title": self.title(),
                "detail": "An unexpected error occurred.",
                "errorCode": "INTERNAL_ERROR",
            }),
            _ => json!({
                "title": self.title(),
                "detail": self.message(),
                "errorCode": self.code_str(),
            }),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "INTERNAL_ERROR".into(), message: err.to_string() }
    }
}

impl From<crate::store::StoreError> for AppError {
    fn from(err: crate::store::StoreError) -> Self {
        AppError::Internal { code: "STORE_ERROR".into(), message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal { code, message } = &self {
            tracing::error!("internal error ({code}): {message}");
        }
        (self.http_status(), Json(self.problem_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::validation(BTreeMap::new()).http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::domain("BAD_CREDENTIALS", "no").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::auth("UNAUTHORIZED", "no").http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::not_found("USER_NOT_FOUND", "missing").http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::internal("INTERNAL_ERROR", "boom").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_body_carries_field_errors() {
        let mut fields = BTreeMap::new();
        fields.insert("email".to_string(), "must be a well-formed email address".to_string());
        let body = AppError::validation(fields).problem_body();
        assert_eq!(body["title"], "Validation Error");
        assert_eq!(body["fieldErrors"]["email"], "must be a well-formed email address");
        assert!(body.get("errorCode").is_none());
    }

    #[test]
    fn domain_body_carries_error_code() {
        let body = AppError::domain("DUPLICATE_USERNAME", "user 'bob' already exists").problem_body();
        assert_eq!(body["errorCode"], "DUPLICATE_USERNAME");
        assert_eq!(body["detail"], "user 'bob' already exists");
    }

    #[test]
    fn internal_body_does_not_leak_detail() {
        let body = AppError::internal("STORE_ERROR", "open /secret/users.json failed").problem_body();
        assert_eq!(body["errorCode"], "INTERNAL_ERROR");
        assert_eq!(body["detail"], "An unexpected error occurred.");
    }
}
