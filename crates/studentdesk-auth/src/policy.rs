//! Named authorization policies.
//!
//! Every guarded action names one [`Policy`]. A policy maps to a single
//! [`Requirement`], evaluated against the signed-in [`Principal`] before the
//! action runs.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{ADMIN_ROLE, USER_ROLE, User};

/// The identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

impl Principal {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
        }
    }
}

/// What a policy demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any signed-in user.
    Authenticated,
    /// A signed-in user holding at least one of the roles.
    AnyRole(&'static [&'static str]),
}

/// Outcome of evaluating a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No signed-in user; send the client to the login page.
    Challenge,
    /// Signed in but not permitted.
    Forbid,
}

/// Policies guarding the application's actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    StudentView,
    StudentCreate,
    StudentDashboard,
    StudentEdit,
    StudentDelete,
    UserAdmin,
}

const ADMIN_ONLY: &[&str] = &[ADMIN_ROLE];
const STAFF: &[&str] = &[ADMIN_ROLE, USER_ROLE];

impl Policy {
    pub const ALL: [Policy; 6] = [
        Policy::StudentView,
        Policy::StudentCreate,
        Policy::StudentDashboard,
        Policy::StudentEdit,
        Policy::StudentDelete,
        Policy::UserAdmin,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Policy::StudentView => "StudentView",
            Policy::StudentCreate => "StudentCreate",
            Policy::StudentDashboard => "StudentDashboard",
            Policy::StudentEdit => "StudentEdit",
            Policy::StudentDelete => "StudentDelete",
            Policy::UserAdmin => "UserAdmin",
        }
    }

    #[must_use]
    pub fn requirement(self) -> Requirement {
        match self {
            Policy::StudentView => Requirement::Authenticated,
            Policy::StudentCreate | Policy::StudentDelete | Policy::UserAdmin => {
                Requirement::AnyRole(ADMIN_ONLY)
            }
            Policy::StudentDashboard | Policy::StudentEdit => Requirement::AnyRole(STAFF),
        }
    }

    /// Evaluates the policy for an optional principal.
    #[must_use]
    pub fn evaluate(self, principal: Option<&Principal>) -> Decision {
        let Some(principal) = principal else {
            return Decision::Challenge;
        };
        match self.requirement() {
            Requirement::Authenticated => Decision::Allow,
            Requirement::AnyRole(roles) if principal.has_any_role(roles) => Decision::Allow,
            Requirement::AnyRole(_) => Decision::Forbid,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-level policy selection for the [`Authorized`](crate::middleware::Authorized)
/// extractor.
pub trait PolicyMarker: Send + Sync + 'static {
    const POLICY: Policy;
}

macro_rules! policy_markers {
    ($($marker:ident),* $(,)?) => {
        /// Marker types naming each [`Policy`](super::Policy) at the type level.
        pub mod require {
            $(
                #[derive(Debug, Clone, Copy)]
                pub struct $marker;

                impl super::PolicyMarker for $marker {
                    const POLICY: super::Policy = super::Policy::$marker;
                }
            )*
        }
    };
}

policy_markers!(
    StudentView,
    StudentCreate,
    StudentDashboard,
    StudentEdit,
    StudentDelete,
    UserAdmin,
);
