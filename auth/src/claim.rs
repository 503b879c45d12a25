//! Session claims.
//!
//! A [`SessionClaim`] binds one local user to one issued token bundle. It can
//! only be built from a completed provider result; a pending challenge never
//! yields a claim.
//!
//! # Lifecycle
//!
//! ```text
//! Completed RemoteAuthResult + LocalUser
//!          │
//!          ▼
//!   SessionClaim::from_remote   (pure)
//!          │
//!          ▼
//!   SessionStore::store         (single call, never retried)
//!          │
//!          ▼
//!   dropped by the coordinator  (core keeps no state)
//! ```

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{LocalUser, RemoteAuthResult, TokenBundle, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flow that issued a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuingFlow {
    /// Credential login.
    Login,
    /// MFA challenge response.
    Challenge,
    /// Refresh token exchange.
    Refresh,
}

impl IssuingFlow {
    /// Flow name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Challenge => "challenge",
            Self::Refresh => "refresh",
        }
    }
}

/// The local identity a claim is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSubject {
    /// Local user ID.
    pub user_id: UserId,

    /// Field the identity was resolved by (e.g. `email`).
    pub identifier_field: String,

    /// Value of that field on the local user.
    pub identifier: Option<String>,
}

/// Normalized, storable authentication state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaim {
    /// Local identity.
    pub subject: ClaimSubject,

    /// Provider-issued tokens.
    pub tokens: TokenBundle,

    /// Flow that produced the claim.
    pub flow: IssuingFlow,

    /// Guard (session scope) the claim belongs to.
    pub guard: String,

    /// "Remember me" requested at login.
    pub remember: bool,

    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,

    /// Access token expiry, derived from `tokens.expires_in`.
    pub expires_at: DateTime<Utc>,

    /// Auxiliary claim data (e.g. `groups`).
    #[serde(default)]
    pub auxiliary: BTreeMap<String, serde_json::Value>,
}

impl SessionClaim {
    /// Build a claim from a completed token bundle.
    #[must_use]
    pub fn new(
        tokens: TokenBundle,
        user: &LocalUser,
        identifier_field: &str,
        flow: IssuingFlow,
    ) -> Self {
        let issued_at = Utc::now();
        let lifetime = i64::try_from(tokens.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(Duration::zero);
        let expires_at = issued_at.checked_add_signed(lifetime).unwrap_or(issued_at);

        Self {
            subject: ClaimSubject {
                user_id: user.user_id,
                identifier_field: identifier_field.to_string(),
                identifier: user.attribute(identifier_field).map(str::to_string),
            },
            tokens,
            flow,
            guard: String::new(),
            remember: false,
            issued_at,
            expires_at,
            auxiliary: BTreeMap::new(),
        }
    }

    /// Build a claim from a provider result.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unexpected` if the result is a pending challenge.
    pub fn from_remote(
        result: RemoteAuthResult,
        user: &LocalUser,
        identifier_field: &str,
        flow: IssuingFlow,
    ) -> Result<Self> {
        match result {
            RemoteAuthResult::Authenticated(tokens) => {
                Ok(Self::new(tokens, user, identifier_field, flow))
            }
            RemoteAuthResult::Challenge(challenge) => Err(AuthError::Unexpected(format!(
                "cannot build a session claim from pending challenge {}",
                challenge.kind.as_str()
            ))),
        }
    }

    /// Scope the claim to a guard.
    #[must_use]
    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = guard.into();
        self
    }

    /// Set the "remember me" flag.
    #[must_use]
    pub const fn with_remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// Attach auxiliary data.
    #[must_use]
    pub fn with_auxiliary(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.auxiliary.insert(key.into(), value);
        self
    }

    /// The token bundle handed back to callers.
    #[must_use]
    pub const fn bundle(&self) -> &TokenBundle {
        &self.tokens
    }

    /// Consume the claim, keeping only the token bundle.
    #[must_use]
    pub fn into_bundle(self) -> TokenBundle {
        self.tokens
    }
}

/// Whether the claim currently stored for `(user, guard)` was remembered.
///
/// A renewed claim replaces the stored one, so it inherits the flag. A failed
/// read only loses the flag; it does not fail the flow.
pub(crate) async fn remembered<S: SessionStore>(
    sessions: &S,
    user_id: UserId,
    guard: &str,
) -> Result<bool> {
    match sessions.load(user_id, guard).await {
        Ok(current) => Ok(current.is_some_and(|claim| claim.remember)),
        Err(e) if e.is_unexpected() => Err(e),
        Err(e) => {
            tracing::warn!(
                user_id = %user_id.0,
                guard = guard,
                error = %e,
                "Could not read current session claim, remember flag not carried over"
            );
            Ok(false)
        }
    }
}

/// Hand a claim to the session store.
///
/// A single call with no retry. Store failures become
/// `SessionPersistenceFailed` even though remote authentication succeeded;
/// callers recover by re-running the flow.
pub(crate) async fn store_claim<S: SessionStore>(
    sessions: &S,
    claim: SessionClaim,
) -> Result<SessionClaim> {
    match sessions.store(&claim).await {
        Ok(()) => {
            tracing::info!(
                user_id = %claim.subject.user_id.0,
                guard = %claim.guard,
                flow = claim.flow.as_str(),
                expires_at = %claim.expires_at,
                "Stored session claim"
            );
            Ok(claim)
        }
        Err(e) if e.is_unexpected() => Err(e),
        Err(e) => {
            tracing::error!(
                user_id = %claim.subject.user_id.0,
                guard = %claim.guard,
                flow = claim.flow.as_str(),
                error = %e,
                "Session store rejected claim after remote authentication succeeded"
            );
            match e {
                AuthError::SessionPersistenceFailed(reason) => {
                    Err(AuthError::SessionPersistenceFailed(reason))
                }
                other => Err(AuthError::SessionPersistenceFailed(other.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChallengeKind, PendingChallenge};

    fn user(email: &str) -> LocalUser {
        let mut attributes = BTreeMap::new();
        attributes.insert("email".to_string(), email.to_string());
        LocalUser {
            user_id: UserId::new(),
            attributes,
            created_at: Utc::now(),
        }
    }

    fn tokens() -> TokenBundle {
        TokenBundle {
            access_token: "access".to_string(),
            id_token: "id".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: 3600,
            token_type: "Bearer".to_string(),
        }
    }

    #[test]
    fn test_claim_binds_subject_and_tokens() {
        let user = user("a@x.com");
        let claim = SessionClaim::new(tokens(), &user, "email", IssuingFlow::Login)
            .with_guard("web")
            .with_remember(true);

        assert_eq!(claim.subject.user_id, user.user_id);
        assert_eq!(claim.subject.identifier.as_deref(), Some("a@x.com"));
        assert_eq!(claim.tokens, tokens());
        assert_eq!(claim.guard, "web");
        assert!(claim.remember);
        assert_eq!(claim.expires_at - claim.issued_at, Duration::seconds(3600));
    }

    #[test]
    fn test_pending_challenge_cannot_become_a_claim() {
        let pending = RemoteAuthResult::Challenge(PendingChallenge {
            session_token: "S1".to_string(),
            kind: ChallengeKind::SmsMfa,
        });

        let result = SessionClaim::from_remote(pending, &user("a@x.com"), "email", IssuingFlow::Login);
        assert!(matches!(result, Err(AuthError::Unexpected(_))));
    }

    #[test]
    fn test_missing_identifier_attribute_leaves_identifier_empty() {
        let claim = SessionClaim::new(tokens(), &user("a@x.com"), "username", IssuingFlow::Refresh);
        assert_eq!(claim.subject.identifier, None);
        assert_eq!(claim.subject.identifier_field, "username");
    }

    #[test]
    fn test_claim_serde_round_trip() {
        let claim = SessionClaim::new(tokens(), &user("a@x.com"), "email", IssuingFlow::Challenge)
            .with_auxiliary("groups", serde_json::json!([{"name": "admins"}]));

        let json = serde_json::to_string(&claim).unwrap_or_default();
        let decoded: Option<SessionClaim> = serde_json::from_str(&json).ok();
        assert_eq!(decoded, Some(claim));
    }
}
