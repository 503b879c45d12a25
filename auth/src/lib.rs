//! # Federated Authentication
//!
//! Stateless orchestration of authentication against a remote identity
//! provider (Cognito-style user pools). The provider verifies credentials
//! and issues tokens; this crate maps outcomes onto local users and stores
//! a normalized session claim.
//!
//! ## Flows
//!
//! - **Login**: credentials → provider → local user (optionally provisioned)
//!   → claim, or a pending challenge
//! - **Challenge**: MFA response → provider → claim
//! - **Refresh**: refresh token + canonical provider username → renewed claim
//!
//! Every flow reports failures as a [`FailureResponse`] with a stable,
//! namespaced error code. Only `AuthError::Unexpected` escapes as a fatal
//! error.
//!
//! ## Architecture
//!
//! ```text
//! Host request → Coordinator → IdentityProvider / UserStore → SessionClaim → SessionStore
//! ```
//!
//! ## Example: Login
//!
//! ```rust,ignore
//! use federated_auth::*;
//!
//! let coordinator = LoginCoordinator::new(identity, users, sessions, AuthConfig::from_env()?);
//! let options = LoginOptions::default();
//!
//! match coordinator
//!     .attempt_login(Credentials::new("a@x.com", "secret"), &GuardContext::web(), &options)
//!     .await
//! {
//!     Ok(LoginOutcome::Authenticated(claim)) => { /* signed in */ }
//!     Ok(LoginOutcome::ChallengeRequired(challenge)) => { /* ask for MFA code */ }
//!     Err(FlowError::Rejected(failure)) => { /* render failure.envelope() */ }
//!     Err(FlowError::Fatal(e)) => return Err(e.into()),
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod claim;
pub mod config;
pub mod coordinators;
pub mod error;
pub mod groups;
pub mod guard;
pub mod providers;
pub mod response;
pub mod state;
pub mod stores;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use claim::{ClaimSubject, IssuingFlow, SessionClaim};
pub use config::{AuthConfig, AuxiliaryFailurePolicy};
pub use coordinators::{
    ChallengeCoordinator, ChallengeResolution, LoginCoordinator, LoginOptions, LoginOutcome,
    RefreshCoordinator,
};
pub use error::{AuthError, Result};
pub use guard::{AuthGuard, GuardContext};
pub use providers::{IdentityProvider, SessionStore, UserStore};
pub use response::{FailureEnvelope, FailureResponse, FlowError, ResponseShape};
pub use state::{
    ChallengeContext, ChallengeKind, ChallengeReply, Credentials, Group, LocalUser, NewLocalUser,
    PendingChallenge, ProviderUser, RemoteAuthResult, TokenBundle, UserId,
};
