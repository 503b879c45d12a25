//! Mock user store for testing.

use crate::error::{AuthError, Result};
use crate::providers::UserStore;
use crate::state::{LocalUser, NewLocalUser, UserId};
use chrono::Utc;
use std::future::Future;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    users: Vec<LocalUser>,
    created: usize,
    fail_creates: bool,
    lookup_failure: Option<AuthError>,
}

/// Mock user store.
///
/// Uses in-memory storage for testing.
#[derive(Debug, Clone, Default)]
pub struct MockUserStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user. Seeded users do not count as created.
    #[must_use]
    pub fn with_user(self, user: NewLocalUser) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.users.push(LocalUser {
                user_id: UserId::new(),
                attributes: user.attributes,
                created_at: Utc::now(),
            });
        }
        self
    }

    /// Make `create_user` fail.
    pub fn set_creates_fail(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_creates = fail;
        }
    }

    /// Make `find_by_identifier` return `failure`, or succeed again with `None`.
    pub fn set_lookup_failure(&self, failure: Option<AuthError>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.lookup_failure = failure;
        }
    }

    /// Number of users created through `create_user` (for testing).
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.created).unwrap_or_default()
    }

    /// Snapshot of all users (for testing).
    #[must_use]
    pub fn users(&self) -> Vec<LocalUser> {
        self.inner
            .lock()
            .map(|inner| inner.users.clone())
            .unwrap_or_default()
    }
}

impl UserStore for MockUserStore {
    fn find_by_identifier(
        &self,
        field: &str,
        value: &str,
    ) -> impl Future<Output = Result<Option<LocalUser>>> + Send {
        let inner = Arc::clone(&self.inner);
        let field = field.to_string();
        let value = value.to_string();

        async move {
            let inner = inner
                .lock()
                .map_err(|_| AuthError::Unexpected("Mutex lock failed".to_string()))?;

            if let Some(failure) = inner.lookup_failure.clone() {
                return Err(failure);
            }

            Ok(inner
                .users
                .iter()
                .find(|user| user.attributes.get(&field) == Some(&value))
                .cloned())
        }
    }

    fn create_user(&self, user: &NewLocalUser) -> impl Future<Output = Result<LocalUser>> + Send {
        let inner = Arc::clone(&self.inner);
        let user = user.clone();

        async move {
            let mut inner = inner
                .lock()
                .map_err(|_| AuthError::Unexpected("Mutex lock failed".to_string()))?;

            if inner.fail_creates {
                return Err(AuthError::UserStoreFailed("insert failed".to_string()));
            }

            // Unique on every supplied attribute
            let duplicate = inner.users.iter().any(|existing| {
                user.attributes
                    .iter()
                    .any(|(field, value)| existing.attributes.get(field) == Some(value))
            });
            if duplicate {
                return Err(AuthError::UserStoreFailed("User already exists".to_string()));
            }

            let created = LocalUser {
                user_id: UserId::new(),
                attributes: user.attributes,
                created_at: Utc::now(),
            };
            inner.users.push(created.clone());
            inner.created += 1;

            Ok(created)
        }
    }
}
