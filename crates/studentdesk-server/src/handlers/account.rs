//! Sign-in, sign-out and the access-denied page.

use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use studentdesk_api::{ApiError, ErrorBody, FieldErrors};
use studentdesk_auth::{MaybePrincipal, SessionToken};
use tracing::info;

use crate::server::AppState;

/// Where a successful sign-in lands when no usable `ReturnUrl` was given.
const DEFAULT_LANDING: &str = "/Student/Index";

#[derive(Debug, Default, Deserialize)]
pub struct ReturnUrlQuery {
    #[serde(default, rename = "ReturnUrl", alias = "returnUrl")]
    pub return_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default, alias = "Email")]
    pub email: String,
    #[serde(default, alias = "Password")]
    pub password: String,
    #[serde(default, rename = "ReturnUrl", alias = "returnUrl")]
    pub return_url: Option<String>,
}

pub async fn login_form(
    MaybePrincipal(principal): MaybePrincipal,
    Query(query): Query<ReturnUrlQuery>,
) -> Json<Value> {
    Json(json!({
        "email": "",
        "returnUrl": query.return_url,
        "signedInAs": principal.map(|p| p.email),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ReturnUrlQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let return_url = form.return_url.clone().or(query.return_url);

    match state.identity.authenticate(&form.email, &form.password).await {
        Ok(user) => {
            let session = state.auth.sessions.create(&user).await;
            info!(user_id = %user.id, "User signed in");
            let jar = jar.add(state.auth.session_cookie(&session.token));
            let target = local_return_url(return_url.as_deref());
            Ok((jar, Redirect::to(target)).into_response())
        }
        Err(e) if e.is_user_input() => {
            let form = json!({"email": form.email, "returnUrl": return_url});
            Err(ApiError::invalid_form(e.to_string(), FieldErrors::new(), form))
        }
        Err(e) => {
            tracing::error!(error = %e, "Sign-in failed");
            Err(ApiError::internal(e.to_string()))
        }
    }
}

pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(token) = token {
        state.auth.sessions.remove(&token).await;
        info!("User signed out");
    }
    let jar = jar.add(state.auth.removal_cookie());
    (jar, Redirect::to(&state.auth.cookie.login_path))
}

pub async fn access_denied() -> impl IntoResponse {
    let status = StatusCode::FORBIDDEN;
    (
        status,
        Json(ErrorBody::new(
            status,
            "You do not have access to this resource.",
        )),
    )
}

/// Only same-site paths are followed after sign-in.
fn local_return_url(candidate: Option<&str>) -> &str {
    match candidate {
        Some(url) if is_local_url(url) => url,
        _ => DEFAULT_LANDING,
    }
}

fn is_local_url(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}
