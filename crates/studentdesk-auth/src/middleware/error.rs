//! Error responses for authentication failures.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use studentdesk_api::ErrorBody;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::LoginRequired {
            login_path,
            return_url,
        } = &self
        {
            return Redirect::to(&login_redirect(login_path, return_url)).into_response();
        }

        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Auth failure");
        }

        let mut response = (status, Json(ErrorBody::new(status, self.to_string()))).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

/// Maps an auth error to its HTTP status.
fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::LoginRequired { .. } => StatusCode::SEE_OTHER,
        AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Validation { .. }
        | AuthError::RoleNotFound { .. }
        | AuthError::DuplicateEmail { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::RoleExists { .. } => StatusCode::CONFLICT,
        AuthError::Storage { .. } | AuthError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `login_path?ReturnUrl=<encoded>`
pub(crate) fn login_redirect(login_path: &str, return_url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(return_url.as_bytes()).collect();
    format!("{login_path}?ReturnUrl={encoded}")
}
