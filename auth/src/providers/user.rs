//! User store trait.

use crate::error::Result;
use crate::state::{LocalUser, NewLocalUser};
use std::future::Future;

/// Local user persistence.
///
/// This trait abstracts over the application's user records. The
/// coordinators only ever read records and create missing ones; they never
/// update an existing user.
pub trait UserStore: Send + Sync {
    /// Find a user whose `field` attribute equals `value`.
    ///
    /// # Returns
    ///
    /// `None` if no user matches.
    ///
    /// # Errors
    ///
    /// Returns error if the lookup fails.
    fn find_by_identifier(
        &self,
        field: &str,
        value: &str,
    ) -> impl Future<Output = Result<Option<LocalUser>>> + Send;

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The store fails
    /// - A user with the same identifier already exists
    fn create_user(
        &self,
        user: &NewLocalUser,
    ) -> impl Future<Output = Result<LocalUser>> + Send;
}
