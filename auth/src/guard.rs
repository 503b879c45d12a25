//! Authentication guard.
//!
//! The guard pairs remote verification with local identity resolution for a
//! named session scope (`web`, `api`, ...). Remote authentication and local
//! resolution are separate steps so that a missing local user can be
//! provisioned and resolved again without a second provider round trip.

use crate::error::{AuthError, Result};
use crate::providers::{IdentityProvider, UserStore};
use crate::state::{Credentials, LocalUser, RemoteAuthResult};

/// Session scope an attempt targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardContext {
    /// Guard name.
    pub name: String,
}

impl GuardContext {
    /// Create a guard context.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Browser session guard.
    #[must_use]
    pub fn web() -> Self {
        Self::new("web")
    }

    /// API token guard.
    #[must_use]
    pub fn api() -> Self {
        Self::new("api")
    }
}

/// Remote authentication plus local resolution.
#[derive(Debug, Clone)]
pub struct AuthGuard<I, U> {
    identity: I,
    users: U,
}

impl<I, U> AuthGuard<I, U>
where
    I: IdentityProvider,
    U: UserStore,
{
    /// Create a guard over the given capabilities.
    #[must_use]
    pub const fn new(identity: I, users: U) -> Self {
        Self { identity, users }
    }

    /// Verify credentials with the identity provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<RemoteAuthResult> {
        self.identity.authenticate(credentials).await
    }

    /// Resolve the local user for a remotely authenticated identifier.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No user matches → `AuthError::NoLocalUser`
    /// - The user store fails
    pub async fn resolve(&self, field: &str, identifier: &str) -> Result<LocalUser> {
        self.users
            .find_by_identifier(field, identifier)
            .await?
            .ok_or_else(|| AuthError::NoLocalUser {
                identifier: identifier.to_string(),
            })
    }

    /// The identity provider.
    pub const fn identity(&self) -> &I {
        &self.identity
    }

    /// The user store.
    pub const fn users(&self) -> &U {
        &self.users
    }
}
