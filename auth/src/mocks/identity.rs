//! Mock identity provider for testing.

use crate::error::{AuthError, Result};
use crate::providers::IdentityProvider;
use crate::state::{
    ChallengeContext, ChallengeKind, ChallengeReply, Credentials, Group, PendingChallenge,
    ProviderUser, RemoteAuthResult, TokenBundle,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Message returned for a rejected login.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Incorrect username or password.";

/// Rejection code for a wrong challenge response.
pub const MFA_INVALID: &str = "mfa_invalid";

/// Rejection code for an unknown or already consumed challenge session.
pub const SESSION_EXPIRED: &str = "session_expired";

#[derive(Debug, Clone)]
struct MockAccount {
    secret: String,
    username: String,
    mfa: Option<(String, String)>,
    groups: Vec<Group>,
}

#[derive(Debug, Clone)]
struct PendingSession {
    identifier: String,
    code: String,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, MockAccount>,
    sessions: HashMap<String, PendingSession>,
    consumed_sessions: HashSet<String>,
    refresh_tokens: HashMap<String, String>,
    refresh_calls: Vec<(String, String)>,
    unavailable: bool,
    fail_group_listing: bool,
    empty_refresh_responses: bool,
    next_challenge_reply: Option<Result<ChallengeReply>>,
    refresh_failure: Option<AuthError>,
    issued: u64,
    challenges_issued: u64,
}

impl Inner {
    fn account_for(&self, name: &str) -> Option<&MockAccount> {
        self.accounts
            .get(name)
            .or_else(|| self.accounts.values().find(|account| account.username == name))
    }

    /// The account's configured token for its first challenge, a fresh one
    /// for every later login.
    fn challenge_token(&mut self, base: &str) -> String {
        self.challenges_issued += 1;
        if self.sessions.contains_key(base) || self.consumed_sessions.contains(base) {
            format!("{base}-{}", self.challenges_issued)
        } else {
            base.to_string()
        }
    }

    fn issue_tokens(&mut self, username: &str, with_refresh: bool) -> TokenBundle {
        self.issued += 1;
        let n = self.issued;

        let refresh_token = with_refresh.then(|| {
            let token = format!("refresh-{n}");
            self.refresh_tokens.insert(token.clone(), username.to_string());
            token
        });

        TokenBundle {
            access_token: format!("access-{n}"),
            id_token: format!("id-{n}"),
            refresh_token,
            expires_in: 3600,
            token_type: "Bearer".to_string(),
        }
    }
}

/// Mock identity provider.
///
/// Holds accounts, pending challenge sessions and refresh tokens in memory.
/// Challenge sessions are consumed on successful use, so replays fail.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MockIdentityProvider {
    /// Create a provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn update(self, f: impl FnOnce(&mut Inner)) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            f(&mut inner);
        }
        self
    }

    /// Register an account whose provider username equals its identifier.
    #[must_use]
    pub fn with_account(self, identifier: &str, secret: &str) -> Self {
        let account = MockAccount {
            secret: secret.to_string(),
            username: identifier.to_string(),
            mfa: None,
            groups: Vec::new(),
        };
        self.update(|inner| {
            inner.accounts.insert(identifier.to_string(), account);
        })
    }

    /// Give an account a provider username different from its identifier.
    #[must_use]
    pub fn with_username(self, identifier: &str, username: &str) -> Self {
        self.update(|inner| {
            if let Some(account) = inner.accounts.get_mut(identifier) {
                account.username = username.to_string();
            }
        })
    }

    /// Require an MFA code at login; the challenge uses `session_token`.
    #[must_use]
    pub fn with_mfa(self, identifier: &str, code: &str, session_token: &str) -> Self {
        self.update(|inner| {
            if let Some(account) = inner.accounts.get_mut(identifier) {
                account.mfa = Some((code.to_string(), session_token.to_string()));
            }
        })
    }

    /// Set the groups an account belongs to.
    #[must_use]
    pub fn with_groups(self, identifier: &str, groups: Vec<Group>) -> Self {
        self.update(|inner| {
            if let Some(account) = inner.accounts.get_mut(identifier) {
                account.groups = groups;
            }
        })
    }

    /// Register a refresh token valid for `username`.
    #[must_use]
    pub fn with_refresh_token(self, username: &str, token: &str) -> Self {
        self.update(|inner| {
            inner.refresh_tokens.insert(token.to_string(), username.to_string());
        })
    }

    /// Simulate a transport failure on every call.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.unavailable = unavailable;
        }
    }

    /// Make group listing fail.
    pub fn set_group_listing_fails(&self, fails: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_group_listing = fails;
        }
    }

    /// Answer refresh calls with an empty response.
    pub fn set_empty_refresh_responses(&self, empty: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.empty_refresh_responses = empty;
        }
    }

    /// Answer the next challenge response with `reply`, bypassing session checks.
    pub fn set_next_challenge_reply(&self, reply: Result<ChallengeReply>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.next_challenge_reply = Some(reply);
        }
    }

    /// Make every refresh call fail with `failure`, or succeed again with `None`.
    pub fn set_refresh_failure(&self, failure: Option<AuthError>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.refresh_failure = failure;
        }
    }

    /// `(username, refresh_token)` pairs submitted so far (for testing).
    #[must_use]
    pub fn refresh_calls(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .map(|inner| inner.refresh_calls.clone())
            .unwrap_or_default()
    }

    fn unavailable() -> AuthError {
        AuthError::ProviderUnavailable("connection timed out".to_string())
    }
}

fn lock_failed() -> AuthError {
    AuthError::Unexpected("Mutex lock failed".to_string())
}

impl IdentityProvider for MockIdentityProvider {
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<RemoteAuthResult>> + Send {
        let inner = Arc::clone(&self.inner);
        let identifier = credentials.identifier().to_string();
        let secret = credentials.secret().to_string();

        async move {
            let mut inner = inner.lock().map_err(|_| lock_failed())?;

            if inner.unavailable {
                return Err(Self::unavailable());
            }

            let account = inner
                .accounts
                .get(&identifier)
                .filter(|account| account.secret == secret)
                .cloned()
                .ok_or_else(|| AuthError::InvalidCredentials {
                    message: INVALID_CREDENTIALS_MESSAGE.to_string(),
                })?;

            if let Some((code, base_token)) = account.mfa {
                let session_token = inner.challenge_token(&base_token);
                inner.sessions.insert(
                    session_token.clone(),
                    PendingSession { identifier, code },
                );
                return Ok(RemoteAuthResult::Challenge(PendingChallenge {
                    session_token,
                    kind: ChallengeKind::SoftwareTokenMfa,
                }));
            }

            Ok(RemoteAuthResult::Authenticated(
                inner.issue_tokens(&account.username, true),
            ))
        }
    }

    fn respond_to_challenge(
        &self,
        challenge: &ChallengeContext,
    ) -> impl Future<Output = Result<ChallengeReply>> + Send {
        let inner = Arc::clone(&self.inner);
        let challenge = challenge.clone();

        async move {
            let mut inner = inner.lock().map_err(|_| lock_failed())?;

            if inner.unavailable {
                return Err(Self::unavailable());
            }

            if let Some(reply) = inner.next_challenge_reply.take() {
                return reply;
            }

            if inner.consumed_sessions.contains(&challenge.session_token) {
                return Ok(ChallengeReply::Rejected(SESSION_EXPIRED.to_string()));
            }

            let Some(pending) = inner.sessions.get(&challenge.session_token).cloned() else {
                return Ok(ChallengeReply::Rejected(SESSION_EXPIRED.to_string()));
            };

            if pending.identifier != challenge.identifier || pending.code != challenge.response {
                return Ok(ChallengeReply::Rejected(MFA_INVALID.to_string()));
            }

            inner.sessions.remove(&challenge.session_token);
            inner.consumed_sessions.insert(challenge.session_token);

            let username = inner
                .account_for(&pending.identifier)
                .map_or_else(|| pending.identifier.clone(), |account| account.username.clone());

            Ok(ChallengeReply::Completed(RemoteAuthResult::Authenticated(
                inner.issue_tokens(&username, true),
            )))
        }
    }

    fn get_user(&self, identifier: &str) -> impl Future<Output = Result<ProviderUser>> + Send {
        let inner = Arc::clone(&self.inner);
        let identifier = identifier.to_string();

        async move {
            let inner = inner.lock().map_err(|_| lock_failed())?;

            if inner.unavailable {
                return Err(Self::unavailable());
            }

            let account = inner
                .account_for(&identifier)
                .ok_or_else(|| AuthError::ProviderError {
                    code: "UserNotFoundException".to_string(),
                    message: "User does not exist.".to_string(),
                })?;

            let mut attributes = BTreeMap::new();
            attributes.insert("email".to_string(), identifier.clone());

            Ok(ProviderUser {
                username: account.username.clone(),
                attributes,
            })
        }
    }

    fn refresh_token(
        &self,
        username: &str,
        refresh_token: &str,
    ) -> impl Future<Output = Result<Option<RemoteAuthResult>>> + Send {
        let inner = Arc::clone(&self.inner);
        let username = username.to_string();
        let refresh_token = refresh_token.to_string();

        async move {
            let mut inner = inner.lock().map_err(|_| lock_failed())?;
            inner
                .refresh_calls
                .push((username.clone(), refresh_token.clone()));

            if inner.unavailable {
                return Err(Self::unavailable());
            }

            if let Some(failure) = inner.refresh_failure.clone() {
                return Err(failure);
            }

            if inner.empty_refresh_responses {
                return Ok(None);
            }

            if inner.refresh_tokens.get(&refresh_token) != Some(&username) {
                return Err(AuthError::InvalidCredentials {
                    message: "Invalid Refresh Token".to_string(),
                });
            }

            Ok(Some(RemoteAuthResult::Authenticated(
                inner.issue_tokens(&username, false),
            )))
        }
    }

    fn list_groups_for_user(&self, username: &str) -> impl Future<Output = Result<Vec<Group>>> + Send {
        let inner = Arc::clone(&self.inner);
        let username = username.to_string();

        async move {
            let inner = inner.lock().map_err(|_| lock_failed())?;

            if inner.unavailable || inner.fail_group_listing {
                return Err(AuthError::ProviderUnavailable(
                    "group listing timed out".to_string(),
                ));
            }

            Ok(inner
                .account_for(&username)
                .map(|account| account.groups.clone())
                .unwrap_or_default())
        }
    }
}
