//! Error types for authentication orchestration.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the login, challenge and refresh flows.
///
/// Capabilities (identity provider, user store, session store) report their
/// failures through this type as well, so that coordinators can decide which
/// failures become caller-facing responses and which propagate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// The identity provider rejected the submitted secret or token.
    #[error("{message}")]
    InvalidCredentials {
        /// Provider-supplied message.
        message: String,
    },

    /// Remote authentication succeeded but no local user matches.
    ///
    /// Recoverable through auto-provisioning.
    #[error("No local user found for {identifier}")]
    NoLocalUser {
        /// Identifier the lookup used.
        identifier: String,
    },

    /// A classified provider failure, passed through to the caller.
    #[error("{message}")]
    ProviderError {
        /// Provider error code (e.g. `UserNotFoundException`).
        code: String,
        /// Provider error message.
        message: String,
    },

    /// The provider could not be reached (transport failure, timeout).
    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    // ═══════════════════════════════════════════════════════════
    // Flow Validation Errors
    // ═══════════════════════════════════════════════════════════

    /// The provider rejected a challenge response with a code.
    #[error("Challenge response rejected: {code}")]
    InvalidChallengeResponse {
        /// Rejection code returned by the provider.
        code: String,
    },

    /// Refresh yielded no completed authentication bundle.
    #[error("Invalid refresh token response")]
    InvalidRefreshResponse,

    /// The current identity cannot be resolved to a provider username.
    #[error("Invalid username")]
    InvalidUsername,

    /// A required input field was empty.
    #[error("The {field} field is required")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Local Persistence Errors
    // ═══════════════════════════════════════════════════════════

    /// Creating a missing local user failed.
    #[error("Failed to provision local user: {0}")]
    UserProvisioningFailed(String),

    /// The user store failed.
    #[error("User store error: {0}")]
    UserStoreFailed(String),

    /// The session store rejected the claim.
    ///
    /// The provider may already consider the user authenticated.
    #[error("Failed to persist session: {0}")]
    SessionPersistenceFailed(String),

    /// Claim (de)serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Programming or contract-violation error. Never converted into a
    /// caller-facing failure.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AuthError {
    /// Returns `true` if this error is due to caller input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use federated_auth::AuthError;
    /// assert!(AuthError::InvalidRefreshResponse.is_user_error());
    /// assert!(!AuthError::Unexpected("bug".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials { .. }
                | Self::InvalidChallengeResponse { .. }
                | Self::InvalidRefreshResponse
                | Self::InvalidUsername
                | Self::MissingField { .. }
        )
    }

    /// Returns `true` if re-invoking the flow may succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use federated_auth::AuthError;
    /// assert!(AuthError::SessionPersistenceFailed("down".into()).is_retryable());
    /// assert!(!AuthError::InvalidUsername.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::SessionPersistenceFailed(_)
        )
    }

    /// Returns `true` for errors that must propagate to infrastructure.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }
}
