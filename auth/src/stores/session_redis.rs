//! Redis-based session claim store.
//!
//! # Architecture
//!
//! - **Key**: `session_claim:{guard}:{user_id}` → JSON-serialized `SessionClaim`
//! - **TTL**: time left until the access token expires, or the remember TTL
//!   for "remember me" claims
//!
//! One key per `(guard, user)`, so concurrent writes for the same identity
//! are last-write-wins.
//!
//! # Example
//!
//! ```no_run
//! use federated_auth::stores::RedisSessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSessionStore::new("redis://127.0.0.1:6379")
//!     .await?
//!     .with_remember_ttl(chrono::Duration::days(30));
//! # Ok(())
//! # }
//! ```

use crate::claim::SessionClaim;
use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::UserId;
use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-based session claim store with TTL-based expiration.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,

    /// Lifetime of "remember me" claims.
    remember_ttl: Duration,
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            AuthError::SessionPersistenceFailed(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::SessionPersistenceFailed(format!(
                "Failed to create Redis connection manager: {e}"
            ))
        })?;

        Ok(Self {
            conn_manager,
            remember_ttl: Duration::days(14),
        })
    }

    /// Override how long "remember me" claims are kept.
    #[must_use]
    pub const fn with_remember_ttl(mut self, ttl: Duration) -> Self {
        self.remember_ttl = ttl;
        self
    }

    fn claim_key(guard: &str, user_id: &UserId) -> String {
        format!("session_claim:{guard}:{}", user_id.0)
    }
}

/// Seconds to keep a claim at `now`. Never zero, `SET EX 0` is rejected.
fn claim_ttl_seconds(claim: &SessionClaim, remember_ttl: Duration, now: DateTime<Utc>) -> u64 {
    let ttl = if claim.remember {
        remember_ttl
    } else {
        claim.expires_at.signed_duration_since(now)
    };

    u64::try_from(ttl.num_seconds()).unwrap_or(0).max(1)
}

impl SessionStore for RedisSessionStore {
    async fn store(&self, claim: &SessionClaim) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let key = Self::claim_key(&claim.guard, &claim.subject.user_id);

        let payload =
            serde_json::to_string(claim).map_err(|e| AuthError::SerializationError(e.to_string()))?;
        let ttl_seconds = claim_ttl_seconds(claim, self.remember_ttl, Utc::now());

        let _: () = conn.set_ex(&key, payload, ttl_seconds).await.map_err(|e| {
            AuthError::SessionPersistenceFailed(format!("Failed to store session claim: {e}"))
        })?;

        tracing::debug!(
            user_id = %claim.subject.user_id.0,
            guard = %claim.guard,
            ttl_seconds = ttl_seconds,
            "Stored session claim in Redis"
        );

        Ok(())
    }

    async fn load(&self, user_id: UserId, guard: &str) -> Result<Option<SessionClaim>> {
        let mut conn = self.conn_manager.clone();
        let key = Self::claim_key(guard, &user_id);

        let payload: Option<String> = conn.get(&key).await.map_err(|e| {
            AuthError::SessionPersistenceFailed(format!("Failed to load session claim: {e}"))
        })?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let claim: SessionClaim =
            serde_json::from_str(&payload).map_err(|e| AuthError::SerializationError(e.to_string()))?;

        // Redis TTL should already have removed it
        if !claim.remember && claim.expires_at < Utc::now() {
            tracing::warn!(
                user_id = %user_id.0,
                guard = guard,
                expires_at = %claim.expires_at,
                "Session claim expired"
            );
            return Ok(None);
        }

        Ok(Some(claim))
    }
}
