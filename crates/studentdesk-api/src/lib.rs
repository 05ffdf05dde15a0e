//! Response types shared by the StudentDesk handlers: the JSON error body,
//! per-field validation messages and [`ApiError`].

use std::collections::BTreeMap;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use studentdesk_storage::StorageError;
use thiserror::Error;

/// JSON body returned for every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
        }
    }
}

/// Messages keyed by form field name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Submitted form failed validation. `form` echoes the accepted values
    /// so the client can redisplay them beside `errors`.
    #[error("{message}")]
    InvalidForm {
        message: String,
        errors: FieldErrors,
        form: Option<Value>,
    },
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_form(message: impl Into<String>, errors: FieldErrors, form: impl Serialize) -> Self {
        Self::InvalidForm {
            message: message.into(),
            errors,
            form: serde_json::to_value(form).ok(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidForm { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_transient() {
            Self::unavailable(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = match self {
            Self::InvalidForm {
                message,
                errors,
                form,
            } => {
                let body = ErrorBody::new(status, message);
                let payload = serde_json::json!({
                    "status": body.status,
                    "error": body.error,
                    "message": body.message,
                    "errors": errors,
                    "form": form,
                });
                (status, Json(payload)).into_response()
            }
            other => (status, Json(ErrorBody::new(status, other.to_string()))).into_response(),
        };

        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}
