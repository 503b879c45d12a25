//! Mock capability implementations for testing.
//!
//! This module provides simple, in-memory implementations of all capability
//! traits for use in unit and integration tests.

pub mod identity;
pub mod session;
pub mod user;

pub use identity::MockIdentityProvider;
pub use session::MockSessionStore;
pub use user::MockUserStore;
