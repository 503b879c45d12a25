//! Auxiliary group metadata.
//!
//! Group membership is non-essential: under
//! [`AuxiliaryFailurePolicy::LogAndContinue`] a failed listing is logged and
//! the claim is issued without it.

use crate::claim::SessionClaim;
use crate::config::{AuthConfig, AuxiliaryFailurePolicy};
use crate::error::{AuthError, Result};
use crate::providers::IdentityProvider;

/// Auxiliary key groups are stored under.
pub const GROUPS_KEY: &str = "groups";

/// Fetch the user's groups and attach them to the claim.
///
/// # Errors
///
/// Returns the provider error only under `AuxiliaryFailurePolicy::Propagate`.
pub async fn attach_groups<I: IdentityProvider>(
    identity: &I,
    config: &AuthConfig,
    username: &str,
    claim: SessionClaim,
) -> Result<SessionClaim> {
    if !config.attach_groups {
        return Ok(claim);
    }

    let groups = match identity.list_groups_for_user(username).await {
        Ok(groups) => groups,
        Err(e) => {
            return match config.auxiliary_failures {
                AuxiliaryFailurePolicy::LogAndContinue => {
                    tracing::error!(
                        user_id = %claim.subject.user_id.0,
                        flow = claim.flow.as_str(),
                        error = %e,
                        "Group listing failed, issuing claim without groups"
                    );
                    Ok(claim)
                }
                AuxiliaryFailurePolicy::Propagate => Err(e),
            };
        }
    };

    let value = serde_json::to_value(&groups)
        .map_err(|e| AuthError::SerializationError(e.to_string()))?;

    tracing::debug!(
        user_id = %claim.subject.user_id.0,
        group_count = groups.len(),
        "Attached provider groups to claim"
    );

    Ok(claim.with_auxiliary(GROUPS_KEY, value))
}
