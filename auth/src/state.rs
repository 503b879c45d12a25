//! Authentication data model.
//!
//! Ephemeral inputs (credentials, challenge contexts), provider results
//! (remote auth results, token bundles) and local identity records.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for a local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Generate a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════════════════════════════════

/// Submitted login credentials.
///
/// Lives for a single authentication attempt and is never persisted. The
/// secret is redacted from `Debug` output.
#[derive(Debug, Clone)]
pub struct Credentials {
    identifier: String,
    secret: SecretString,
    remember: bool,
}

impl Credentials {
    /// Create credentials from an identifier (username or email) and secret.
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: SecretString::from(secret.into()),
            remember: false,
        }
    }

    /// Set the "remember me" flag.
    #[must_use]
    pub const fn with_remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// The submitted identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The submitted secret.
    ///
    /// Only identity provider implementations should call this.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Whether the caller asked to be remembered.
    #[must_use]
    pub const fn remember(&self) -> bool {
        self.remember
    }

    /// The non-secret subset of the credentials, keyed by `identifier_field`.
    ///
    /// This is what gets persisted when a missing local user is provisioned.
    #[must_use]
    pub fn to_new_user(&self, identifier_field: &str) -> NewLocalUser {
        NewLocalUser::new(identifier_field, self.identifier.clone())
    }
}

/// Multi-factor challenge kind issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeKind {
    /// Code delivered by SMS.
    SmsMfa,
    /// Code from an authenticator app (TOTP).
    SoftwareTokenMfa,
    /// The provider requires a new password before completing login.
    NewPasswordRequired,
    /// Any other provider-specific challenge.
    Other(String),
}

impl ChallengeKind {
    /// Provider wire name of the challenge.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SmsMfa => "SMS_MFA",
            Self::SoftwareTokenMfa => "SOFTWARE_TOKEN_MFA",
            Self::NewPasswordRequired => "NEW_PASSWORD_REQUIRED",
            Self::Other(name) => name,
        }
    }

    /// Parse a provider challenge name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "SMS_MFA" => Self::SmsMfa,
            "SOFTWARE_TOKEN_MFA" => Self::SoftwareTokenMfa,
            "NEW_PASSWORD_REQUIRED" => Self::NewPasswordRequired,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One challenge-response round trip.
///
/// Consumed by value when submitted, so a context cannot be resubmitted
/// after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeContext {
    /// Opaque provider-issued session token of the pending challenge.
    pub session_token: String,

    /// Challenge being answered.
    pub kind: ChallengeKind,

    /// Identifier of the user answering the challenge.
    pub identifier: String,

    /// The user's response (e.g. the MFA code).
    pub response: String,

    /// "Remember me" requested with the login that raised the challenge.
    pub remember: bool,
}

impl ChallengeContext {
    /// Build a context for an MFA code response.
    #[must_use]
    pub fn mfa(
        session_token: impl Into<String>,
        response: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            session_token: session_token.into(),
            kind: ChallengeKind::SoftwareTokenMfa,
            identifier: identifier.into(),
            response: response.into(),
            remember: false,
        }
    }

    /// Carry the login's "remember me" flag onto the issued claim.
    #[must_use]
    pub const fn with_remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// Override the challenge kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ChallengeKind) -> Self {
        self.kind = kind;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Provider Results
// ═══════════════════════════════════════════════════════════════════════

/// A challenge the provider wants answered before login completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChallenge {
    /// Session token to echo back with the response.
    pub session_token: String,

    /// Challenge kind.
    pub kind: ChallengeKind,
}

/// Tokens issued by the provider for a completed authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    /// Access token.
    pub access_token: String,

    /// OIDC ID token.
    pub id_token: String,

    /// Refresh token. Providers usually omit it on refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Token type (normally `Bearer`).
    pub token_type: String,
}

/// Result of a provider call in any of the three flows.
///
/// Exactly one of pending-challenge or completed is populated; the enum makes
/// the other states unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAuthResult {
    /// A further challenge is required.
    Challenge(PendingChallenge),

    /// Authentication completed.
    Authenticated(TokenBundle),
}

impl RemoteAuthResult {
    /// The completed bundle, if any.
    #[must_use]
    pub fn into_tokens(self) -> Option<TokenBundle> {
        match self {
            Self::Authenticated(tokens) => Some(tokens),
            Self::Challenge(_) => None,
        }
    }

    /// Returns `true` if authentication completed.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Provider answer to a challenge response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeReply {
    /// Plain rejection code (e.g. `mfa_invalid`).
    Rejected(String),

    /// The provider produced an auth result.
    Completed(RemoteAuthResult),
}

/// Provider-side user record, as returned by a user lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    /// Canonical provider username. Authoritative for refresh.
    pub username: String,

    /// Provider user attributes.
    pub attributes: BTreeMap<String, String>,
}

/// Provider group membership, stripped of provider-internal attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group name.
    pub name: String,

    /// Group description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Precedence (lower wins).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precedence: Option<u32>,
}

impl Group {
    /// Create a group with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            precedence: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Local Identity
// ═══════════════════════════════════════════════════════════════════════

/// Application-level identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    /// Local user ID.
    pub user_id: UserId,

    /// User attributes keyed by field name (e.g. `email`).
    pub attributes: BTreeMap<String, String>,

    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl LocalUser {
    /// Value of an attribute, if present and non-empty.
    #[must_use]
    pub fn attribute(&self, field: &str) -> Option<&str> {
        self.attributes
            .get(field)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Attributes for a local user about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewLocalUser {
    /// Attributes keyed by field name.
    pub attributes: BTreeMap<String, String>,
}

impl NewLocalUser {
    /// Start a new record with its identifying attribute.
    #[must_use]
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(field.into(), value.into());
        Self { attributes }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(field.into(), value.into());
        self
    }
}
