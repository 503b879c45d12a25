//! Authentication capabilities.
//!
//! Traits for every external collaborator the coordinators talk to. The
//! coordinators depend only on these interfaces; concrete implementations are
//! injected at construction time.
//!
//! # Architecture
//!
//! ```text
//!                ┌────────────────────┐
//!                │   Coordinators     │
//!                │ login / challenge  │
//!                │     / refresh      │
//!                └───┬──────┬──────┬──┘
//!                    │      │      │
//!          ┌─────────┘      │      └──────────┐
//!          ▼                ▼                 ▼
//! ┌──────────────────┐ ┌──────────────┐ ┌──────────────┐
//! │ IdentityProvider │ │  UserStore   │ │ SessionStore │
//! │ (remote IdP)     │ │ (local users)│ │ (claims)     │
//! └──────────────────┘ └──────────────┘ └──────────────┘
//! ```
//!
//! This enables:
//! - **Testing**: in-memory mocks (`crate::mocks`)
//! - **Production**: real IdP clients, databases, Redis
//!   (`crate::stores::RedisSessionStore`)
//!
//! Implementations must be safe under concurrent use for the same identity;
//! the coordinators do not serialize calls.

pub mod identity;
pub mod session;
pub mod user;

pub use identity::IdentityProvider;
pub use session::SessionStore;
pub use user::UserStore;
