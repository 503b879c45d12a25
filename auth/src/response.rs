//! Caller-facing failure responses.
//!
//! Every failure carries a stable machine-readable code and a human-readable
//! message. Two envelopes exist for the same content:
//!
//! ```text
//! Structured (API callers):      {"error": "cognito.mfa_invalid", "message": "..."}
//! FieldErrors (redirect callers): {"email": "..."}
//! ```

use crate::error::AuthError;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Envelope preference of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// `{error, message}` object.
    #[default]
    Structured,

    /// Field-keyed error set, for redirect-with-errors callers.
    FieldErrors,
}

/// Structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub error: String,

    /// Human-readable message.
    pub message: String,
}

/// Serialized failure envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FailureEnvelope {
    /// `{error, message}`.
    Structured(ErrorBody),

    /// `{field: message}`.
    FieldErrors(BTreeMap<String, String>),
}

/// A failed flow, as presented to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureResponse {
    /// Underlying error.
    pub error: AuthError,

    /// Machine-readable code.
    pub code: String,

    /// Human-readable message.
    pub message: String,

    /// Field the failure is attributed to.
    pub field: String,

    /// HTTP status for adapters.
    pub status: StatusCode,

    /// Envelope preference.
    pub shape: ResponseShape,
}

impl FailureResponse {
    /// Build a failure from an error, its code, and the attributed field.
    #[must_use]
    pub fn new(error: AuthError, code: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            message: error.to_string(),
            status: Self::status_for(&error),
            error,
            code: code.into(),
            field: field.into(),
            shape: ResponseShape::Structured,
        }
    }

    /// Set the envelope preference.
    #[must_use]
    pub const fn with_shape(mut self, shape: ResponseShape) -> Self {
        self.shape = shape;
        self
    }

    /// Transient failures are 503, everything else is a client error.
    #[must_use]
    pub const fn status_for(error: &AuthError) -> StatusCode {
        match error {
            AuthError::ProviderUnavailable(_) | AuthError::SessionPersistenceFailed(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AuthError::Unexpected(_) | AuthError::SerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Build the envelope for the configured shape.
    #[must_use]
    pub fn envelope(&self) -> FailureEnvelope {
        match self.shape {
            ResponseShape::Structured => FailureEnvelope::Structured(ErrorBody {
                error: self.code.clone(),
                message: self.message.clone(),
            }),
            ResponseShape::FieldErrors => {
                let mut errors = BTreeMap::new();
                errors.insert(self.field.clone(), self.message.clone());
                FailureEnvelope::FieldErrors(errors)
            }
        }
    }
}

/// Outcome of a failed coordinator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Caller-facing failure.
    #[error("{}", .0.message)]
    Rejected(FailureResponse),

    /// Error that must reach infrastructure-level handling (5xx).
    #[error(transparent)]
    Fatal(AuthError),
}

impl FlowError {
    /// Convert an error into a flow error. `Unexpected` stays fatal; every
    /// other error is shaped by `respond`.
    pub(crate) fn from_error<F>(error: AuthError, respond: F) -> Self
    where
        F: FnOnce(AuthError) -> FailureResponse,
    {
        if error.is_unexpected() {
            Self::Fatal(error)
        } else {
            Self::Rejected(respond(error))
        }
    }

    /// The failure response, if this is a caller-facing failure.
    #[must_use]
    pub const fn failure(&self) -> Option<&FailureResponse> {
        match self {
            Self::Rejected(failure) => Some(failure),
            Self::Fatal(_) => None,
        }
    }

    /// The underlying error.
    #[must_use]
    pub const fn error(&self) -> &AuthError {
        match self {
            Self::Rejected(failure) => &failure.error,
            Self::Fatal(error) => error,
        }
    }

    /// Returns `true` if the error must propagate.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for FailureResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, axum::Json(self.envelope())).into_response()
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for FlowError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Rejected(failure) => failure.into_response(),
            Self::Fatal(error) => {
                tracing::error!(error = %error, "Authentication flow failed unexpectedly");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_structured_envelope_serialization() {
        let failure = FailureResponse::new(
            AuthError::InvalidChallengeResponse { code: "mfa_invalid".to_string() },
            "cognito.mfa_invalid",
            "email",
        );

        let json = serde_json::to_value(failure.envelope()).unwrap_or_default();
        assert_eq!(json["error"], "cognito.mfa_invalid");
        assert_eq!(json["message"], "Challenge response rejected: mfa_invalid");
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_field_errors_envelope_serialization() {
        let failure = FailureResponse::new(
            AuthError::InvalidCredentials { message: "Incorrect username or password.".to_string() },
            "cognito.validation.auth.failed",
            "email",
        )
        .with_shape(ResponseShape::FieldErrors);

        let json = serde_json::to_value(failure.envelope()).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"email": "Incorrect username or password."}));
    }

    #[test]
    fn test_transient_failures_are_service_unavailable() {
        let failure = FailureResponse::new(
            AuthError::SessionPersistenceFailed("redis down".to_string()),
            "cognito.session.persistence_failed",
            "email",
        );
        assert_eq!(failure.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_unexpected_errors_stay_fatal() {
        let flow = FlowError::from_error(AuthError::Unexpected("bug".to_string()), |e| {
            FailureResponse::new(e, "cognito.validation.auth.failed", "email")
        });
        assert!(flow.is_fatal());
        assert!(flow.failure().is_none());

        let flow = FlowError::from_error(AuthError::InvalidUsername, |e| {
            FailureResponse::new(e, "cognito.validation.invalid_username", "email")
        });
        assert!(!flow.is_fatal());
        assert_eq!(flow.error(), &AuthError::InvalidUsername);
    }

    proptest! {
        #[test]
        fn prop_envelopes_carry_identical_message(message in ".{0,64}", field in "[a-z_]{1,16}") {
            let base = FailureResponse::new(
                AuthError::InvalidCredentials { message: message.clone() },
                "cognito.validation.auth.failed",
                field.clone(),
            );

            let structured = base.clone().with_shape(ResponseShape::Structured).envelope();
            let field_errors = base.with_shape(ResponseShape::FieldErrors).envelope();

            let FailureEnvelope::Structured(body) = structured else {
                return Err(TestCaseError::fail("expected structured envelope"));
            };
            let FailureEnvelope::FieldErrors(errors) = field_errors else {
                return Err(TestCaseError::fail("expected field errors envelope"));
            };

            prop_assert_eq!(&body.message, &message);
            prop_assert_eq!(errors.get(&field), Some(&message));
        }
    }
}
