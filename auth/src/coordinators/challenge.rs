//! MFA challenge response.
//!
//! # State Machine
//!
//! ```text
//! AwaitingInput ──respond──→ Resolved(Success)        → claim stored, bundle returned
//!                        ├─→ Resolved(Rejected)       → "{ns}.{code}" failure
//!                        └─→ Resolved(ProviderError)  → failure with provider code
//! ```
//!
//! The [`ChallengeContext`] is consumed by the call, so the coordinator cannot
//! resubmit a session token. Rejecting a consumed token is up to the provider.

use super::{require, shared_code};
use crate::claim::{remembered, store_claim, IssuingFlow, SessionClaim};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::groups::attach_groups;
use crate::guard::GuardContext;
use crate::providers::{IdentityProvider, SessionStore, UserStore};
use crate::response::{FailureResponse, FlowError, ResponseShape};
use crate::state::{ChallengeContext, ChallengeReply, RemoteAuthResult, TokenBundle};

/// Terminal state of a challenge round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeResolution {
    /// The provider completed authentication.
    Success(TokenBundle),

    /// The provider rejected the response with a plain code.
    Rejected(String),

    /// The provider call failed.
    ProviderError(AuthError),
}

impl ChallengeResolution {
    /// Classify a provider reply.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unexpected` for reply shapes outside the provider
    /// contract (a further challenge) and for unexpected provider errors.
    pub fn from_reply(reply: Result<ChallengeReply>) -> Result<Self> {
        match reply {
            Ok(ChallengeReply::Rejected(code)) => Ok(Self::Rejected(code)),
            Ok(ChallengeReply::Completed(RemoteAuthResult::Authenticated(tokens))) => {
                Ok(Self::Success(tokens))
            }
            Ok(ChallengeReply::Completed(RemoteAuthResult::Challenge(next))) => {
                Err(AuthError::Unexpected(format!(
                    "provider answered a challenge response with another challenge ({})",
                    next.kind.as_str()
                )))
            }
            Err(e) if e.is_unexpected() => Err(e),
            Err(e) => Ok(Self::ProviderError(e)),
        }
    }
}

/// Drives the challenge-response flow.
#[derive(Debug, Clone)]
pub struct ChallengeCoordinator<I, U, S> {
    identity: I,
    users: U,
    sessions: S,
    config: AuthConfig,
    guard: GuardContext,
    shape: ResponseShape,
}

impl<I, U, S> ChallengeCoordinator<I, U, S>
where
    I: IdentityProvider,
    U: UserStore,
    S: SessionStore,
{
    /// Create a challenge coordinator scoped to the configured default guard.
    #[must_use]
    pub fn new(identity: I, users: U, sessions: S, config: AuthConfig) -> Self {
        let guard = GuardContext::new(config.default_guard.clone());
        Self {
            identity,
            users,
            sessions,
            config,
            guard,
            shape: ResponseShape::Structured,
        }
    }

    /// Scope issued claims to another guard.
    #[must_use]
    pub fn with_guard(mut self, guard: GuardContext) -> Self {
        self.guard = guard;
        self
    }

    /// Set the envelope preference for failures.
    #[must_use]
    pub fn with_shape(mut self, shape: ResponseShape) -> Self {
        self.shape = shape;
        self
    }

    /// Submit a challenge response.
    ///
    /// # Returns
    ///
    /// Only the token bundle; the normalized claim stays in the session store.
    ///
    /// # Errors
    ///
    /// - `FlowError::Rejected` for empty input, rejection codes, provider
    ///   errors, unknown local users and storage failures
    /// - `FlowError::Fatal` for unexpected reply shapes
    pub async fn respond_to_challenge(
        &self,
        challenge: ChallengeContext,
    ) -> std::result::Result<TokenBundle, FlowError> {
        let field = self.config.identifier_field.as_str();

        require("session", &challenge.session_token)
            .and_then(|()| require("value", &challenge.response))
            .and_then(|()| require(field, &challenge.identifier))
            .map_err(|e| self.reject(e))?;

        let reply = self.identity.respond_to_challenge(&challenge).await;
        let resolution = ChallengeResolution::from_reply(reply).map_err(FlowError::Fatal)?;

        match resolution {
            ChallengeResolution::Success(tokens) => self
                .complete(&challenge.identifier, challenge.remember, tokens)
                .await
                .map_err(|e| self.reject(e)),
            ChallengeResolution::Rejected(code) => {
                tracing::warn!(
                    challenge = challenge.kind.as_str(),
                    code = %code,
                    "Challenge response rejected"
                );
                Err(self.reject(AuthError::InvalidChallengeResponse { code }))
            }
            ChallengeResolution::ProviderError(e) => {
                tracing::warn!(
                    challenge = challenge.kind.as_str(),
                    error = %e,
                    "Challenge response failed at provider"
                );
                Err(self.reject(e))
            }
        }
    }

    async fn complete(
        &self,
        identifier: &str,
        remember: bool,
        tokens: TokenBundle,
    ) -> Result<TokenBundle> {
        let field = self.config.identifier_field.as_str();

        let user = self
            .users
            .find_by_identifier(field, identifier)
            .await?
            .ok_or_else(|| AuthError::NoLocalUser {
                identifier: identifier.to_string(),
            })?;

        let remember =
            remember || remembered(&self.sessions, user.user_id, &self.guard.name).await?;
        let claim = SessionClaim::new(tokens, &user, field, IssuingFlow::Challenge)
            .with_guard(&self.guard.name)
            .with_remember(remember);
        let claim = attach_groups(&self.identity, &self.config, identifier, claim).await?;
        let claim = store_claim(&self.sessions, claim).await?;

        Ok(claim.into_bundle())
    }

    fn reject(&self, error: AuthError) -> FlowError {
        FlowError::from_error(error, |error| {
            let code = shared_code(&self.config, &error).unwrap_or_else(|| match &error {
                AuthError::InvalidChallengeResponse { code }
                | AuthError::ProviderError { code, .. } => self.config.code(code),
                AuthError::NoLocalUser { .. } => self.config.code("validation.no_local_user"),
                _ => self.config.code("validation.challenge.failed"),
            });
            let field = match &error {
                AuthError::MissingField { field } => field.clone(),
                _ => self.config.identifier_field.clone(),
            };
            FailureResponse::new(error, code, field).with_shape(self.shape)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChallengeKind, PendingChallenge};

    #[test]
    fn test_resolution_classifies_replies() {
        assert_eq!(
            ChallengeResolution::from_reply(Ok(ChallengeReply::Rejected("mfa_invalid".into()))),
            Ok(ChallengeResolution::Rejected("mfa_invalid".into()))
        );

        let provider_error = AuthError::ProviderError {
            code: "CodeMismatchException".into(),
            message: "Invalid code".into(),
        };
        assert_eq!(
            ChallengeResolution::from_reply(Err(provider_error.clone())),
            Ok(ChallengeResolution::ProviderError(provider_error))
        );
    }

    #[test]
    fn test_further_challenge_is_unexpected() {
        let reply = ChallengeReply::Completed(RemoteAuthResult::Challenge(PendingChallenge {
            session_token: "S2".into(),
            kind: ChallengeKind::NewPasswordRequired,
        }));

        assert!(matches!(
            ChallengeResolution::from_reply(Ok(reply)),
            Err(AuthError::Unexpected(_))
        ));
    }
}
