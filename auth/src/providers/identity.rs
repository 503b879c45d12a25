//! Identity provider trait.

use crate::error::Result;
use crate::state::{ChallengeContext, ChallengeReply, Credentials, Group, ProviderUser, RemoteAuthResult};
use std::future::Future;

/// Remote identity provider.
///
/// Performs credential verification, challenge issuance and token
/// issuance/refresh. Implementations own timeouts; a timed-out call must
/// return `AuthError::ProviderUnavailable` rather than hang.
///
/// # Error Conventions
///
/// - Rejected secret or refresh token → `AuthError::InvalidCredentials`
/// - Classified provider failure → `AuthError::ProviderError`
/// - Transport failure or timeout → `AuthError::ProviderUnavailable`
pub trait IdentityProvider: Send + Sync {
    /// Verify credentials.
    ///
    /// # Returns
    ///
    /// Either a pending challenge or a completed token bundle.
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the credentials or fails.
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<RemoteAuthResult>> + Send;

    /// Answer a pending challenge.
    ///
    /// A session token must be accepted at most once; replay protection is
    /// the provider's responsibility.
    ///
    /// # Errors
    ///
    /// Returns error if the provider call fails. Plain rejections are
    /// reported as `ChallengeReply::Rejected`, not as errors.
    fn respond_to_challenge(
        &self,
        challenge: &ChallengeContext,
    ) -> impl Future<Output = Result<ChallengeReply>> + Send;

    /// Look up the provider-side user for an application identifier.
    ///
    /// # Errors
    ///
    /// Returns error if the user does not exist or the call fails.
    fn get_user(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<ProviderUser>> + Send;

    /// Exchange a refresh token for a renewed token bundle.
    ///
    /// # Returns
    ///
    /// `None` if the provider answered with an empty response.
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the token or fails.
    fn refresh_token(
        &self,
        username: &str,
        refresh_token: &str,
    ) -> impl Future<Output = Result<Option<RemoteAuthResult>>> + Send;

    /// List groups the user belongs to.
    ///
    /// Auxiliary metadata only; callers decide whether failures matter.
    ///
    /// # Errors
    ///
    /// Returns error if the call fails.
    fn list_groups_for_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Vec<Group>>> + Send;
}
