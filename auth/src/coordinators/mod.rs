//! Flow coordinators.
//!
//! Three independent, stateless entry points that converge on the same
//! claim construction and storage step:
//!
//! ```text
//! LoginCoordinator      ─┐
//! ChallengeCoordinator  ─┼─→ SessionClaim → SessionStore::store
//! RefreshCoordinator    ─┘
//! ```
//!
//! None of them depend on each other. Host code composes them by holding
//! them side by side; each is request-scoped and keeps nothing between calls.

pub mod challenge;
pub mod login;
pub mod refresh;

pub use challenge::{ChallengeCoordinator, ChallengeResolution};
pub use login::{LoginCoordinator, LoginOptions, LoginOutcome};
pub use refresh::RefreshCoordinator;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Codes shared by every flow, or `None` if the flow decides.
fn shared_code(config: &AuthConfig, error: &AuthError) -> Option<String> {
    match error {
        AuthError::MissingField { field } => Some(config.code(&format!("validation.{field}.required"))),
        AuthError::ProviderUnavailable(_) => Some(config.code("provider_unavailable")),
        AuthError::SessionPersistenceFailed(_) => Some(config.code("session.persistence_failed")),
        _ => None,
    }
}

/// Reject empty input the way the request rules would.
fn require(field: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::MissingField {
            field: field.to_string(),
        })
    } else {
        Ok(())
    }
}
