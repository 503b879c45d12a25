//! Storage implementations.
//!
//! - **Session Store** (Redis) - Session claims with TTL expiration

pub mod session_redis;

pub use session_redis::RedisSessionStore;
