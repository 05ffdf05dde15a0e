//! Axum extractors and responses for cookie sessions and policies.

mod authorized;
mod error;
mod session;

pub use authorized::Authorized;
pub use session::{AuthState, MaybePrincipal, SessionToken, renew_session_cookie};
