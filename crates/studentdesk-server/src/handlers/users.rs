//! User administration. Every action requires the `Admin` role.

use axum::{
    Form, Json,
    extract::State,
    response::Redirect,
};
use serde_json::{Value, json};
use studentdesk_api::{ApiError, FieldErrors};
use studentdesk_auth::{AuthError, Authorized, CreateUserRequest, User, require};
use tracing::info;

use crate::server::AppState;

const USER_LISTS_PATH: &str = "/Users/UserLists";

pub async fn user_lists(
    _auth: Authorized<require::UserAdmin>,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.identity.list_users().await.map_err(server_error)?;
    Ok(Json(users))
}

pub async fn create_form(
    _auth: Authorized<require::UserAdmin>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let roles: Vec<String> = state
        .identity
        .list_roles()
        .await
        .map_err(server_error)?
        .into_iter()
        .map(|role| role.name)
        .collect();

    Ok(Json(json!({
        "form": {"email": "", "role": ""},
        "roles": roles,
    })))
}

pub async fn create(
    auth: Authorized<require::UserAdmin>,
    State(state): State<AppState>,
    Form(request): Form<CreateUserRequest>,
) -> Result<Redirect, ApiError> {
    match state.identity.create_user(&request).await {
        Ok(user) => {
            info!(user_id = %user.id, by = %auth.principal.email, "User created");
            Ok(Redirect::to(USER_LISTS_PATH))
        }
        Err(e) if e.is_user_input() => {
            let mut errors = FieldErrors::new();
            if let Some(field) = field_of(&e) {
                errors.add(field, e.to_string());
            }
            // The password is never echoed back.
            let form = json!({"email": request.email, "role": request.role});
            Err(ApiError::invalid_form(e.to_string(), errors, form))
        }
        Err(e) => Err(server_error(e)),
    }
}

/// Form field an input error belongs to, if it is tied to one.
fn field_of(error: &AuthError) -> Option<&'static str> {
    match error {
        AuthError::DuplicateEmail { .. } => Some("Email"),
        AuthError::RoleNotFound { .. } => Some("Role"),
        _ => None,
    }
}

fn server_error(error: AuthError) -> ApiError {
    tracing::error!(error = %error, category = %error.category(), "Identity operation failed");
    ApiError::internal(error.to_string())
}
