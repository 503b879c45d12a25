//! Mock session store for testing.

use crate::claim::SessionClaim;
use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::UserId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    claims: HashMap<(UserId, String), SessionClaim>,
    writes: usize,
    failing: bool,
}

/// Mock session store.
///
/// Keeps the latest claim per `(user, guard)`, last-write-wins.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockSessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `store` call fail.
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing = failing;
        }
    }

    /// Number of stored claims (for testing).
    #[must_use]
    pub fn claim_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.claims.len()).unwrap_or_default()
    }

    /// Number of successful `store` calls (for testing).
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.writes).unwrap_or_default()
    }
}

impl SessionStore for MockSessionStore {
    fn store(&self, claim: &SessionClaim) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);
        let claim = claim.clone();

        async move {
            let mut inner = inner
                .lock()
                .map_err(|_| AuthError::Unexpected("Mutex lock failed".to_string()))?;

            if inner.failing {
                return Err(AuthError::SessionPersistenceFailed(
                    "session store unavailable".to_string(),
                ));
            }

            inner
                .claims
                .insert((claim.subject.user_id, claim.guard.clone()), claim);
            inner.writes += 1;
            Ok(())
        }
    }

    fn load(
        &self,
        user_id: UserId,
        guard: &str,
    ) -> impl Future<Output = Result<Option<SessionClaim>>> + Send {
        let inner = Arc::clone(&self.inner);
        let key = (user_id, guard.to_string());

        async move {
            let inner = inner
                .lock()
                .map_err(|_| AuthError::Unexpected("Mutex lock failed".to_string()))?;
            Ok(inner.claims.get(&key).cloned())
        }
    }
}
