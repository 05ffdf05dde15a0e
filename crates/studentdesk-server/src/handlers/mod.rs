//! HTTP handlers, grouped by controller.
//!
//! Every guarded handler takes an [`Authorized`](studentdesk_auth::Authorized)
//! extractor as its first argument, so policy checks run before the body and
//! before any store or cache access.

pub mod account;
pub mod health;
pub mod student;
pub mod users;
