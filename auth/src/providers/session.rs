//! Session store trait.

use crate::claim::SessionClaim;
use crate::error::Result;
use crate::state::UserId;
use std::future::Future;

/// Session claim storage.
///
/// # Implementation Notes
///
/// - `store` must be idempotent; the coordinators call it once and never retry
/// - Concurrent writes for the same `(guard, user)` may resolve last-write-wins
pub trait SessionStore: Send + Sync {
    /// Store a claim, replacing any claim for the same guard and user.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn store(
        &self,
        claim: &SessionClaim,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Load the current claim for a user under a guard.
    ///
    /// # Returns
    ///
    /// `None` if no claim is stored (or it expired).
    ///
    /// # Errors
    ///
    /// Returns error if the read fails.
    fn load(
        &self,
        user_id: UserId,
        guard: &str,
    ) -> impl Future<Output = Result<Option<SessionClaim>>> + Send;
}
