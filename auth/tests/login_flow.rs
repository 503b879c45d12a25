//! Login flow integration tests.
//!
//! Exercises `LoginCoordinator` against the in-memory mocks:
//!
//! - Local user resolution and provisioning
//! - Failure codes, attribution and envelopes
//! - Session persistence and auxiliary group handling

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use federated_auth::groups::GROUPS_KEY;
use federated_auth::mocks::identity::INVALID_CREDENTIALS_MESSAGE;
use federated_auth::mocks::{MockIdentityProvider, MockSessionStore, MockUserStore};
use federated_auth::{
    AuthConfig, AuthError, AuxiliaryFailurePolicy, Credentials, FailureEnvelope, FlowError, Group,
    GuardContext, LoginCoordinator, LoginOptions, LoginOutcome, NewLocalUser, ResponseShape,
    SessionStore,
};
use http::StatusCode;

type Coordinator = LoginCoordinator<MockIdentityProvider, MockUserStore, MockSessionStore>;

fn coordinator(
    idp: &MockIdentityProvider,
    users: &MockUserStore,
    sessions: &MockSessionStore,
    config: AuthConfig,
) -> Coordinator {
    LoginCoordinator::new(idp.clone(), users.clone(), sessions.clone(), config)
}

fn rejected(result: Result<LoginOutcome, FlowError>) -> federated_auth::FailureResponse {
    match result {
        Err(FlowError::Rejected(failure)) => failure,
        other => panic!("expected rejected login, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_resolves_existing_user_and_stores_claim() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    let users = MockUserStore::new().with_user(NewLocalUser::new("email", "a@x.com"));
    let sessions = MockSessionStore::new();
    let login = coordinator(&idp, &users, &sessions, AuthConfig::default());

    let outcome = login
        .attempt_login(
            Credentials::new("a@x.com", "p"),
            &GuardContext::web(),
            &LoginOptions::default(),
        )
        .await
        .expect("login should succeed");

    let claim = outcome.claim().expect("claim issued").clone();
    let local = users.users().remove(0);

    assert_eq!(claim.subject.user_id, local.user_id);
    assert_eq!(claim.subject.identifier.as_deref(), Some("a@x.com"));
    assert_eq!(claim.guard, "web");
    assert_eq!(claim.tokens.token_type, "Bearer");
    assert_eq!(sessions.write_count(), 1);

    let stored = sessions.load(local.user_id, "web").await.unwrap();
    assert_eq!(stored, Some(claim));
}

#[tokio::test]
async fn test_login_provisions_missing_user_exactly_once() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    let users = MockUserStore::new();
    let sessions = MockSessionStore::new();
    let login = coordinator(
        &idp,
        &users,
        &sessions,
        AuthConfig::default().with_provisioning(true),
    );
    let options = LoginOptions::default();

    let first = login
        .attempt_login(Credentials::new("a@x.com", "p"), &GuardContext::web(), &options)
        .await
        .expect("first login provisions");
    assert_eq!(users.created_count(), 1);

    let second = login
        .attempt_login(Credentials::new("a@x.com", "p"), &GuardContext::web(), &options)
        .await
        .expect("second login resolves");
    assert_eq!(users.created_count(), 1);
    assert_eq!(users.users().len(), 1);

    assert_eq!(
        first.claim().unwrap().subject.user_id,
        second.claim().unwrap().subject.user_id
    );
}

#[tokio::test]
async fn test_provisioned_user_never_holds_the_secret() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    let users = MockUserStore::new();
    let login = coordinator(
        &idp,
        &users,
        &MockSessionStore::new(),
        AuthConfig::default().with_provisioning(true),
    );

    login
        .attempt_login(
            Credentials::new("a@x.com", "p"),
            &GuardContext::web(),
            &LoginOptions::default(),
        )
        .await
        .unwrap();

    let created = users.users().remove(0);
    assert_eq!(created.attribute("email"), Some("a@x.com"));
    assert!(!created.attributes.contains_key("password"));
    assert!(created.attributes.values().all(|value| value != "p"));
}

#[tokio::test]
async fn test_missing_user_without_provisioning_is_rejected() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    let users = MockUserStore::new();
    let sessions = MockSessionStore::new();
    let login = coordinator(&idp, &users, &sessions, AuthConfig::default());

    let failure = rejected(
        login
            .attempt_login(
                Credentials::new("a@x.com", "p"),
                &GuardContext::web(),
                &LoginOptions::default(),
            )
            .await,
    );

    assert_eq!(failure.code, "cognito.validation.auth.failed");
    assert_eq!(failure.field, "email");
    assert!(matches!(failure.error, AuthError::NoLocalUser { .. }));
    assert_eq!(users.created_count(), 0);
    assert_eq!(sessions.write_count(), 0);
}

#[tokio::test]
async fn test_invalid_credentials_attributed_to_identifier() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    let users = MockUserStore::new().with_user(NewLocalUser::new("email", "a@x.com"));
    let login = coordinator(&idp, &users, &MockSessionStore::new(), AuthConfig::default());

    let structured = rejected(
        login
            .attempt_login(
                Credentials::new("a@x.com", "wrong"),
                &GuardContext::web(),
                &LoginOptions::default(),
            )
            .await,
    );
    let field_errors = rejected(
        login
            .attempt_login(
                Credentials::new("a@x.com", "wrong"),
                &GuardContext::web(),
                &LoginOptions::default().with_shape(ResponseShape::FieldErrors),
            )
            .await,
    );

    assert_eq!(structured.code, "cognito.validation.auth.failed");
    assert_eq!(structured.field, "email");
    assert_eq!(structured.status, StatusCode::BAD_REQUEST);

    let FailureEnvelope::Structured(body) = structured.envelope() else {
        panic!("expected structured envelope");
    };
    let FailureEnvelope::FieldErrors(errors) = field_errors.envelope() else {
        panic!("expected field errors envelope");
    };

    assert_eq!(body.message, INVALID_CREDENTIALS_MESSAGE);
    assert_eq!(errors.get("email").map(String::as_str), Some(INVALID_CREDENTIALS_MESSAGE));
    assert!(!errors.contains_key("password"));
}

#[tokio::test]
async fn test_custom_field_names_drive_attribution() {
    let idp = MockIdentityProvider::new().with_account("jdoe", "p");
    let users = MockUserStore::new().with_user(NewLocalUser::new("username", "jdoe"));
    let login = coordinator(&idp, &users, &MockSessionStore::new(), AuthConfig::default());
    let options = LoginOptions::default().with_fields("username", "passphrase");

    let failure = rejected(
        login
            .attempt_login(Credentials::new("jdoe", "nope"), &GuardContext::web(), &options)
            .await,
    );
    assert_eq!(failure.field, "username");

    let outcome = login
        .attempt_login(Credentials::new("jdoe", "p"), &GuardContext::web(), &options)
        .await
        .unwrap();
    assert_eq!(outcome.claim().unwrap().subject.identifier_field, "username");
}

#[tokio::test]
async fn test_empty_secret_rejected_before_provider_call() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    idp.set_unavailable(true);
    let login = coordinator(
        &idp,
        &MockUserStore::new(),
        &MockSessionStore::new(),
        AuthConfig::default(),
    );

    let failure = rejected(
        login
            .attempt_login(
                Credentials::new("a@x.com", ""),
                &GuardContext::web(),
                &LoginOptions::default(),
            )
            .await,
    );

    // A provider call would have surfaced as provider_unavailable
    assert_eq!(failure.code, "cognito.validation.password.required");
    assert_eq!(failure.field, "password");
}

#[tokio::test]
async fn test_provider_unavailable_is_service_unavailable() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    idp.set_unavailable(true);
    let login = coordinator(
        &idp,
        &MockUserStore::new(),
        &MockSessionStore::new(),
        AuthConfig::default().with_error_namespace("pool"),
    );

    let failure = rejected(
        login
            .attempt_login(
                Credentials::new("a@x.com", "p"),
                &GuardContext::web(),
                &LoginOptions::default(),
            )
            .await,
    );

    assert_eq!(failure.code, "pool.provider_unavailable");
    assert_eq!(failure.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_store_failure_after_remote_success() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    let users = MockUserStore::new().with_user(NewLocalUser::new("email", "a@x.com"));
    let sessions = MockSessionStore::new();
    sessions.set_failing(true);
    let login = coordinator(&idp, &users, &sessions, AuthConfig::default());

    let failure = rejected(
        login
            .attempt_login(
                Credentials::new("a@x.com", "p"),
                &GuardContext::web(),
                &LoginOptions::default(),
            )
            .await,
    );

    assert!(matches!(failure.error, AuthError::SessionPersistenceFailed(_)));
    assert_eq!(failure.code, "cognito.session.persistence_failed");
    assert_eq!(failure.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(sessions.claim_count(), 0);
}

#[tokio::test]
async fn test_provisioning_failure_is_rejected() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    let users = MockUserStore::new();
    users.set_creates_fail(true);
    let login = coordinator(
        &idp,
        &users,
        &MockSessionStore::new(),
        AuthConfig::default().with_provisioning(true),
    );

    let failure = rejected(
        login
            .attempt_login(
                Credentials::new("a@x.com", "p"),
                &GuardContext::web(),
                &LoginOptions::default(),
            )
            .await,
    );

    assert!(matches!(failure.error, AuthError::UserProvisioningFailed(_)));
    assert_eq!(failure.code, "cognito.validation.auth.failed");
}

#[tokio::test]
async fn test_groups_attached_to_claim() {
    let idp = MockIdentityProvider::new()
        .with_account("a@x.com", "p")
        .with_groups("a@x.com", vec![Group::named("admins")]);
    let users = MockUserStore::new().with_user(NewLocalUser::new("email", "a@x.com"));
    let login = coordinator(&idp, &users, &MockSessionStore::new(), AuthConfig::default());

    let outcome = login
        .attempt_login(
            Credentials::new("a@x.com", "p"),
            &GuardContext::web(),
            &LoginOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.claim().unwrap().auxiliary.get(GROUPS_KEY),
        Some(&serde_json::json!([{"name": "admins"}]))
    );
}

#[tokio::test]
async fn test_group_failure_logged_and_claim_still_issued() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    idp.set_group_listing_fails(true);
    let users = MockUserStore::new().with_user(NewLocalUser::new("email", "a@x.com"));
    let sessions = MockSessionStore::new();
    let login = coordinator(&idp, &users, &sessions, AuthConfig::default());

    let outcome = login
        .attempt_login(
            Credentials::new("a@x.com", "p"),
            &GuardContext::web(),
            &LoginOptions::default(),
        )
        .await
        .expect("group failure is not fatal");

    assert!(!outcome.claim().unwrap().auxiliary.contains_key(GROUPS_KEY));
    assert_eq!(sessions.write_count(), 1);
}

#[tokio::test]
async fn test_group_failure_propagates_when_configured() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    idp.set_group_listing_fails(true);
    let users = MockUserStore::new().with_user(NewLocalUser::new("email", "a@x.com"));
    let sessions = MockSessionStore::new();
    let login = coordinator(
        &idp,
        &users,
        &sessions,
        AuthConfig::default().with_auxiliary_failures(AuxiliaryFailurePolicy::Propagate),
    );

    let failure = rejected(
        login
            .attempt_login(
                Credentials::new("a@x.com", "p"),
                &GuardContext::web(),
                &LoginOptions::default(),
            )
            .await,
    );

    assert!(matches!(failure.error, AuthError::ProviderUnavailable(_)));
    assert_eq!(sessions.write_count(), 0);
}

#[tokio::test]
async fn test_challenge_required_does_no_local_work() {
    let idp = MockIdentityProvider::new()
        .with_account("a@x.com", "p")
        .with_mfa("a@x.com", "123456", "S1");
    let users = MockUserStore::new();
    let sessions = MockSessionStore::new();
    let login = coordinator(
        &idp,
        &users,
        &sessions,
        AuthConfig::default().with_provisioning(true),
    );

    let outcome = login
        .attempt_login(
            Credentials::new("a@x.com", "p"),
            &GuardContext::web(),
            &LoginOptions::default(),
        )
        .await
        .unwrap();

    let challenge = outcome.pending_challenge().expect("challenge issued");
    assert_eq!(challenge.session_token, "S1");
    assert!(outcome.claim().is_none());
    assert_eq!(users.created_count(), 0);
    assert_eq!(sessions.write_count(), 0);
}

#[tokio::test]
async fn test_guard_and_remember_scope_the_claim() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    let users = MockUserStore::new().with_user(NewLocalUser::new("email", "a@x.com"));
    let sessions = MockSessionStore::new();
    let login = coordinator(&idp, &users, &sessions, AuthConfig::default());

    let outcome = login
        .attempt_login(
            Credentials::new("a@x.com", "p").with_remember(true),
            &GuardContext::api(),
            &LoginOptions::default(),
        )
        .await
        .unwrap();

    let claim = outcome.claim().unwrap();
    assert_eq!(claim.guard, "api");
    assert!(claim.remember);
    assert!(sessions.load(claim.subject.user_id, "web").await.unwrap().is_none());
    assert!(sessions.load(claim.subject.user_id, "api").await.unwrap().is_some());
}

#[tokio::test]
async fn test_unexpected_error_still_yields_failure_response() {
    let idp = MockIdentityProvider::new().with_account("a@x.com", "p");
    let users = MockUserStore::new().with_user(NewLocalUser::new("email", "a@x.com"));
    users.set_lookup_failure(Some(AuthError::Unexpected("row decode failed".to_string())));
    let sessions = MockSessionStore::new();
    let login = coordinator(&idp, &users, &sessions, AuthConfig::default());

    let failure = rejected(
        login
            .attempt_login(
                Credentials::new("a@x.com", "p"),
                &GuardContext::web(),
                &LoginOptions::default(),
            )
            .await,
    );

    assert_eq!(failure.code, "cognito.validation.auth.failed");
    assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failure.message, "Unexpected error: row decode failed");
    assert_eq!(failure.field, "email");
    assert_eq!(sessions.write_count(), 0);
}
