//! Session cookie extraction.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};

use crate::config::CookieConfig;
use crate::policy::Principal;
use crate::session::{Session, SessionStore};

// =============================================================================
// Auth State
// =============================================================================

/// State required by the session extractors.
///
/// Include it in the application state and expose it through `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionStore,
    pub cookie: CookieConfig,
}

impl AuthState {
    pub fn new(cookie: CookieConfig) -> Self {
        Self {
            sessions: SessionStore::from_config(&cookie),
            cookie,
        }
    }

    /// Reads the session token from the request cookies.
    pub fn token_from_parts(&self, parts: &Parts) -> Option<String> {
        self.token_from_headers(&parts.headers)
    }

    fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let jar = CookieJar::from_headers(headers);
        let token = jar.get(&self.cookie.name)?.value().trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    /// Resolves the live session carried by the request, if any.
    pub async fn session_from_parts(&self, parts: &Parts) -> Option<Arc<Session>> {
        let token = self.token_from_parts(parts)?;
        let session = self.sessions.get(&token).await;
        if session.is_none() {
            tracing::debug!("Session cookie present but session expired or unknown");
        }
        session
    }

    /// Builds the cookie that carries a session token.
    pub fn session_cookie(&self, token: &str) -> Cookie<'static> {
        let max_age = cookie::time::Duration::try_from(self.cookie.expire_time)
            .unwrap_or(cookie::time::Duration::minutes(30));

        Cookie::build((self.cookie.name.clone(), token.to_string()))
            .path(self.cookie.path.clone())
            .http_only(true)
            .secure(self.cookie.secure)
            .same_site(self.same_site())
            .max_age(max_age)
            .build()
    }

    /// Builds a cookie that clears the session cookie.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build((self.cookie.name.clone(), ""))
            .path(self.cookie.path.clone())
            .http_only(true)
            .secure(self.cookie.secure)
            .same_site(self.same_site())
            .build();
        cookie.make_removal();
        cookie
    }

    fn same_site(&self) -> SameSite {
        match self.cookie.same_site.to_ascii_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        }
    }
}

// =============================================================================
// Cookie Renewal
// =============================================================================

/// Re-issues the session cookie on authenticated responses once half of its
/// lifetime has passed, so sliding sessions stay alive in the browser too.
///
/// Responses that already set the session cookie (sign-in, sign-out) are
/// left alone.
pub async fn renew_session_cookie(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    if !auth.cookie.sliding_expiration {
        return next.run(request).await;
    }

    let token = auth.token_from_headers(request.headers());
    let due = match &token {
        Some(token) => match auth.sessions.get(token).await {
            Some(session) => auth.sessions.renewal_due(&session),
            None => false,
        },
        None => false,
    };

    let mut response = next.run(request).await;
    let Some(token) = token.filter(|_| due) else {
        return response;
    };

    let prefix = format!("{}=", auth.cookie.name);
    let already_set = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .any(|value| value.to_str().is_ok_and(|v| v.starts_with(&prefix)));
    if already_set || auth.sessions.get(&token).await.is_none() {
        return response;
    }

    match HeaderValue::from_str(&auth.session_cookie(&token).to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
            tracing::debug!("Session cookie renewed");
        }
        Err(e) => tracing::warn!(error = %e, "Failed to encode renewed session cookie"),
    }
    response
}

// =============================================================================
// Extractors
// =============================================================================

/// The principal of the current request, if signed in. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);
        let principal = auth
            .session_from_parts(parts)
            .await
            .map(|session| session.principal.clone());
        Ok(Self(principal))
    }
}

/// The raw session token cookie, if present. Never rejects.
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<String>);

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(AuthState::from_ref(state).token_from_parts(parts)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::http::{Request, header::COOKIE};

    use super::*;

    fn parts_with_cookie(value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .uri("/Student/Index")
            .header(COOKIE, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_token_from_cookie_header() {
        let state = AuthState::new(CookieConfig::default());
        let parts = parts_with_cookie("theme=dark; .StudentDesk.Session=abc123; other=1");
        assert_eq!(state.token_from_parts(&parts).as_deref(), Some("abc123"));

        let parts = parts_with_cookie(".StudentDesk.Session=");
        assert!(state.token_from_parts(&parts).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let state = AuthState::new(CookieConfig::default());
        let cookie = state.session_cookie("tok").to_string();

        assert!(cookie.starts_with(".StudentDesk.Session=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=1800"));
    }

    #[test]
    fn test_insecure_cookie_when_configured() {
        let config = CookieConfig {
            secure: false,
            same_site: "strict".to_string(),
            ..CookieConfig::default()
        };
        let cookie = AuthState::new(config).session_cookie("tok").to_string();
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    mod renewal {
        use std::time::Duration;

        use axum::Router;
        use axum::body::Body;
        use axum::http::{Request, StatusCode, header};
        use axum::middleware::from_fn_with_state;
        use axum::routing::get;
        use tower::ServiceExt;

        use super::*;
        use crate::storage::{ADMIN_ROLE, User};

        fn app(auth: &AuthState) -> Router {
            Router::new()
                .route("/Student/Index", get(|| async { "ok" }))
                .layer(from_fn_with_state(auth.clone(), renew_session_cookie))
        }

        async fn get_with(router: Router, cookie: &str) -> axum::response::Response {
            router
                .oneshot(
                    Request::get("/Student/Index")
                        .header(header::COOKIE, cookie)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap()
        }

        async fn signed_in(config: CookieConfig) -> (AuthState, String) {
            let auth = AuthState::new(config);
            let user = User::builder("admin@example.com").add_role(ADMIN_ROLE).build();
            let session = auth.sessions.create(&user).await;
            let cookie = format!("{}={}", auth.cookie.name, session.token);
            (auth, cookie)
        }

        #[tokio::test]
        async fn test_cookie_reissued_past_half_lifetime() {
            let (auth, cookie) = signed_in(CookieConfig {
                expire_time: Duration::from_secs(1),
                ..CookieConfig::default()
            })
            .await;

            let response = get_with(app(&auth), &cookie).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(header::SET_COOKIE).is_none());

            tokio::time::sleep(Duration::from_millis(600)).await;
            let response = get_with(app(&auth), &cookie).await;
            let renewed = response.headers()[header::SET_COOKIE].to_str().unwrap();
            assert!(renewed.starts_with(&cookie));
            assert!(renewed.contains("Max-Age=1"));

            let response = get_with(app(&auth), &cookie).await;
            assert!(response.headers().get(header::SET_COOKIE).is_none());
        }

        #[tokio::test]
        async fn test_absolute_sessions_are_not_reissued() {
            let (auth, cookie) = signed_in(CookieConfig {
                expire_time: Duration::from_secs(1),
                sliding_expiration: false,
                ..CookieConfig::default()
            })
            .await;

            tokio::time::sleep(Duration::from_millis(600)).await;
            let response = get_with(app(&auth), &cookie).await;
            assert!(response.headers().get(header::SET_COOKIE).is_none());
        }

        #[tokio::test]
        async fn test_anonymous_requests_get_no_cookie() {
            let auth = AuthState::new(CookieConfig::default());
            let response = get_with(app(&auth), ".StudentDesk.Session=forged").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(header::SET_COOKIE).is_none());
        }
    }

    #[test]
    fn test_removal_cookie_expires() {
        let state = AuthState::new(CookieConfig::default());
        let cookie = state.removal_cookie().to_string();
        assert!(cookie.contains("Max-Age=0"));
    }
}
