//! Credential login.
//!
//! # Flow
//!
//! ```text
//! 1. Validate identifier/secret
//! 2. Guard authenticates with the identity provider
//!    ├─ pending challenge → ChallengeRequired (no local work)
//!    └─ completed bundle  → continue
//! 3. Resolve local user
//!    └─ NoLocalUser + provisioning enabled → create once, resolve once more
//! 4. Build claim, attach groups, store
//! ```
//!
//! Provider failures are attributed to the identifier field, never the
//! secret field, so callers cannot tell which part was wrong.

use super::{require, shared_code};
use crate::claim::{store_claim, IssuingFlow, SessionClaim};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::groups::attach_groups;
use crate::guard::{AuthGuard, GuardContext};
use crate::providers::{IdentityProvider, SessionStore, UserStore};
use crate::response::{FailureResponse, FlowError, ResponseShape};
use crate::state::{Credentials, LocalUser, PendingChallenge, RemoteAuthResult};

/// Per-call login options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    /// Identifier field name; errors are attributed to it.
    pub identifier_field: String,

    /// Secret field name.
    pub secret_field: String,

    /// "Remember me".
    pub remember: bool,

    /// Envelope preference for failures.
    pub shape: ResponseShape,
}

impl LoginOptions {
    /// Options using the configured field names.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            identifier_field: config.identifier_field.clone(),
            secret_field: config.secret_field.clone(),
            remember: false,
            shape: ResponseShape::Structured,
        }
    }

    /// Override the field names.
    #[must_use]
    pub fn with_fields(
        mut self,
        identifier_field: impl Into<String>,
        secret_field: impl Into<String>,
    ) -> Self {
        self.identifier_field = identifier_field.into();
        self.secret_field = secret_field.into();
        self
    }

    /// Set "remember me".
    #[must_use]
    pub const fn with_remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// Set the envelope preference.
    #[must_use]
    pub const fn with_shape(mut self, shape: ResponseShape) -> Self {
        self.shape = shape;
        self
    }
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

/// Successful result of a login attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// A claim was issued and stored.
    Authenticated(SessionClaim),

    /// The provider wants a challenge answered first.
    ChallengeRequired(PendingChallenge),
}

impl LoginOutcome {
    /// The issued claim, if login completed.
    #[must_use]
    pub const fn claim(&self) -> Option<&SessionClaim> {
        match self {
            Self::Authenticated(claim) => Some(claim),
            Self::ChallengeRequired(_) => None,
        }
    }

    /// The pending challenge, if one was issued.
    #[must_use]
    pub const fn pending_challenge(&self) -> Option<&PendingChallenge> {
        match self {
            Self::Authenticated(_) => None,
            Self::ChallengeRequired(challenge) => Some(challenge),
        }
    }
}

/// Drives the credential login flow.
#[derive(Debug, Clone)]
pub struct LoginCoordinator<I, U, S> {
    guard: AuthGuard<I, U>,
    sessions: S,
    config: AuthConfig,
}

impl<I, U, S> LoginCoordinator<I, U, S>
where
    I: IdentityProvider,
    U: UserStore,
    S: SessionStore,
{
    /// Create a login coordinator.
    #[must_use]
    pub const fn new(identity: I, users: U, sessions: S, config: AuthConfig) -> Self {
        Self {
            guard: AuthGuard::new(identity, users),
            sessions,
            config,
        }
    }

    /// Attempt to log a user in.
    ///
    /// # Returns
    ///
    /// The stored claim, or the pending challenge the provider issued.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Rejected` for every failure: invalid input,
    /// provider rejections, missing local users, provisioning and storage
    /// failures. `AuthError::Unexpected` is reported with a 500 status and
    /// the generic login code; login never returns `FlowError::Fatal`.
    pub async fn attempt_login(
        &self,
        credentials: Credentials,
        guard: &GuardContext,
        options: &LoginOptions,
    ) -> std::result::Result<LoginOutcome, FlowError> {
        require(&options.identifier_field, credentials.identifier())
            .map_err(|e| self.reject(e, &options.identifier_field, options))?;
        require(&options.secret_field, credentials.secret())
            .map_err(|e| self.reject(e, &options.secret_field, options))?;

        let remember = options.remember || credentials.remember();

        let tokens = match self.guard.authenticate(&credentials).await {
            Ok(RemoteAuthResult::Authenticated(tokens)) => tokens,
            Ok(RemoteAuthResult::Challenge(challenge)) => {
                tracing::info!(
                    guard = %guard.name,
                    challenge = challenge.kind.as_str(),
                    "Login requires challenge response"
                );
                return Ok(LoginOutcome::ChallengeRequired(challenge));
            }
            Err(e) => {
                tracing::warn!(guard = %guard.name, error = %e, "Remote authentication failed");
                return Err(self.reject(e, &options.identifier_field, options));
            }
        };

        let user = self
            .resolve_or_provision(&credentials, &options.identifier_field)
            .await
            .map_err(|e| self.reject(e, &options.identifier_field, options))?;

        let claim = SessionClaim::new(tokens, &user, &options.identifier_field, IssuingFlow::Login)
            .with_guard(&guard.name)
            .with_remember(remember);

        let claim = attach_groups(self.guard.identity(), &self.config, credentials.identifier(), claim)
            .await
            .map_err(|e| self.reject(e, &options.identifier_field, options))?;

        let claim = store_claim(&self.sessions, claim)
            .await
            .map_err(|e| self.reject(e, &options.identifier_field, options))?;

        Ok(LoginOutcome::Authenticated(claim))
    }

    /// Resolve the local user, provisioning it once if allowed.
    async fn resolve_or_provision(&self, credentials: &Credentials, field: &str) -> Result<LocalUser> {
        match self.guard.resolve(field, credentials.identifier()).await {
            Err(AuthError::NoLocalUser { identifier }) => {
                tracing::warn!(
                    provisioning = self.config.provision_missing_users,
                    "Remote authentication succeeded but no local user exists"
                );

                if !self.config.provision_missing_users {
                    return Err(AuthError::NoLocalUser { identifier });
                }

                self.provision(credentials, field).await?;
                self.guard.resolve(field, credentials.identifier()).await
            }
            other => other,
        }
    }

    async fn provision(&self, credentials: &Credentials, field: &str) -> Result<LocalUser> {
        let new_user = credentials.to_new_user(field);

        match self.guard.users().create_user(&new_user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.user_id.0, field = field, "Provisioned local user");
                Ok(user)
            }
            Err(e) if e.is_unexpected() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Local user provisioning failed");
                Err(AuthError::UserProvisioningFailed(e.to_string()))
            }
        }
    }

    /// Every login failure becomes a response, `Unexpected` included (500).
    fn reject(&self, error: AuthError, field: &str, options: &LoginOptions) -> FlowError {
        if error.is_unexpected() {
            tracing::error!(error = %error, "Login failed unexpectedly");
        }
        let code = shared_code(&self.config, &error)
            .unwrap_or_else(|| self.config.code("validation.auth.failed"));
        FlowError::Rejected(FailureResponse::new(error, code, field).with_shape(options.shape))
    }
}
