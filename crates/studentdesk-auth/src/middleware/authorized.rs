//! Policy-checking extractor.
//!
//! # Example
//!
//! ```ignore
//! use studentdesk_auth::middleware::Authorized;
//! use studentdesk_auth::policy::require;
//!
//! async fn delete(auth: Authorized<require::StudentDelete>) -> String {
//!     format!("{} may delete", auth.principal.email)
//! }
//! ```

use std::marker::PhantomData;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use super::session::AuthState;
use crate::error::AuthError;
use crate::policy::{Decision, PolicyMarker, Principal};

/// Extractor that admits the request only if policy `P` allows the caller.
///
/// Rejects with `AuthError::LoginRequired` when nobody is signed in and
/// `AuthError::Forbidden` when the signed-in user fails the policy. The
/// handler body never runs in either case.
#[derive(Debug, Clone)]
pub struct Authorized<P> {
    pub principal: Principal,
    _policy: PhantomData<P>,
}

impl<P> Authorized<P> {
    fn new(principal: Principal) -> Self {
        Self {
            principal,
            _policy: PhantomData,
        }
    }
}

impl<S, P> FromRequestParts<S> for Authorized<P>
where
    S: Send + Sync,
    P: PolicyMarker,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);
        let principal = auth
            .session_from_parts(parts)
            .await
            .map(|session| session.principal.clone());

        match (P::POLICY.evaluate(principal.as_ref()), principal) {
            (Decision::Allow, Some(principal)) => Ok(Self::new(principal)),
            (Decision::Forbid, Some(principal)) => {
                tracing::debug!(
                    user_id = %principal.user_id,
                    roles = ?principal.roles,
                    policy = %P::POLICY,
                    "Access denied: policy not satisfied"
                );
                Err(AuthError::forbidden(format!(
                    "Policy '{}' is not satisfied",
                    P::POLICY
                )))
            }
            _ => {
                let return_url = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string());
                Err(AuthError::login_required(
                    auth.cookie.login_path.clone(),
                    return_url,
                ))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
