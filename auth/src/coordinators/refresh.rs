//! Refresh token exchange.
//!
//! The provider's canonical username is authoritative for refresh, not the
//! application identifier used at login. The two may differ (e.g. email
//! login against a pool keyed by opaque usernames).

use super::{require, shared_code};
use crate::claim::{remembered, store_claim, IssuingFlow, SessionClaim};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::groups::attach_groups;
use crate::guard::GuardContext;
use crate::providers::{IdentityProvider, SessionStore};
use crate::response::{FailureResponse, FlowError};
use crate::state::{LocalUser, RemoteAuthResult, TokenBundle};

/// Drives the refresh token exchange.
#[derive(Debug, Clone)]
pub struct RefreshCoordinator<I, S> {
    identity: I,
    sessions: S,
    config: AuthConfig,
    guard: GuardContext,
}

impl<I, S> RefreshCoordinator<I, S>
where
    I: IdentityProvider,
    S: SessionStore,
{
    /// Create a refresh coordinator scoped to the configured default guard.
    #[must_use]
    pub fn new(identity: I, sessions: S, config: AuthConfig) -> Self {
        let guard = GuardContext::new(config.default_guard.clone());
        Self {
            identity,
            sessions,
            config,
            guard,
        }
    }

    /// Scope renewed claims to another guard.
    #[must_use]
    pub fn with_guard(mut self, guard: GuardContext) -> Self {
        self.guard = guard;
        self
    }

    /// Exchange a refresh token for the already authenticated `identity`.
    ///
    /// # Returns
    ///
    /// The renewed token bundle. The submitted refresh token is kept when the
    /// provider does not issue a new one.
    ///
    /// # Errors
    ///
    /// - `FlowError::Rejected` with `InvalidUsername`, `InvalidRefreshResponse`,
    ///   or the provider's own error code
    /// - `FlowError::Fatal` for `AuthError::Unexpected`
    pub async fn refresh(
        &self,
        identity: &LocalUser,
        refresh_token: &str,
        identifier_field: &str,
    ) -> std::result::Result<TokenBundle, FlowError> {
        self.exchange(identity, refresh_token, identifier_field)
            .await
            .map_err(|e| self.reject(e, identifier_field))
    }

    async fn exchange(
        &self,
        identity: &LocalUser,
        refresh_token: &str,
        identifier_field: &str,
    ) -> Result<TokenBundle> {
        require(&self.config.refresh_token_field, refresh_token)
            .map_err(|_| AuthError::InvalidRefreshResponse)?;

        let identifier = identity
            .attribute(identifier_field)
            .ok_or(AuthError::InvalidUsername)?;

        let provider_user = self.identity.get_user(identifier).await?;
        if provider_user.username.trim().is_empty() {
            return Err(AuthError::InvalidUsername);
        }
        let username = provider_user.username;

        let mut tokens = match self.identity.refresh_token(&username, refresh_token).await {
            Ok(Some(RemoteAuthResult::Authenticated(tokens))) => tokens,
            Ok(Some(RemoteAuthResult::Challenge(_)) | None)
            | Err(AuthError::InvalidCredentials { .. }) => {
                tracing::warn!(
                    user_id = %identity.user_id.0,
                    "Refresh yielded no authentication result"
                );
                return Err(AuthError::InvalidRefreshResponse);
            }
            Err(e) => return Err(e),
        };

        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }

        let remember = remembered(&self.sessions, identity.user_id, &self.guard.name).await?;
        let claim = SessionClaim::new(tokens, identity, identifier_field, IssuingFlow::Refresh)
            .with_guard(&self.guard.name)
            .with_remember(remember);
        let claim = attach_groups(&self.identity, &self.config, &username, claim).await?;
        let claim = store_claim(&self.sessions, claim).await?;

        Ok(claim.into_bundle())
    }

    fn reject(&self, error: AuthError, identifier_field: &str) -> FlowError {
        FlowError::from_error(error, |error| {
            let code = shared_code(&self.config, &error).unwrap_or_else(|| match &error {
                AuthError::InvalidUsername => self.config.code("validation.invalid_username"),
                AuthError::InvalidRefreshResponse => {
                    self.config.code("validation.invalid_refresh_response")
                }
                AuthError::ProviderError { code, .. } => code.clone(),
                _ => self.config.code("validation.refresh.failed"),
            });
            let field = match &error {
                AuthError::InvalidRefreshResponse => self.config.refresh_token_field.clone(),
                _ => identifier_field.to_string(),
            };
            FailureResponse::new(error, code, field)
        })
    }
}
