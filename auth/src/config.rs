//! Authentication configuration.
//!
//! Configuration values are provided by the application, either through the
//! builder methods or from environment variables.

use crate::error::{AuthError, Result};

/// Environment variable names read by [`AuthConfig::from_env`].
pub mod env_vars {
    /// Error code namespace.
    pub const ERROR_NAMESPACE: &str = "AUTH_ERROR_NAMESPACE";
    /// Identifier field name.
    pub const IDENTIFIER_FIELD: &str = "AUTH_IDENTIFIER_FIELD";
    /// Secret field name.
    pub const SECRET_FIELD: &str = "AUTH_SECRET_FIELD";
    /// Refresh token field name.
    pub const REFRESH_TOKEN_FIELD: &str = "AUTH_REFRESH_TOKEN_FIELD";
    /// Default guard name.
    pub const DEFAULT_GUARD: &str = "AUTH_DEFAULT_GUARD";
    /// Create missing local users after remote login (`true`/`false`).
    pub const PROVISION_MISSING_USERS: &str = "AUTH_PROVISION_MISSING_USERS";
    /// Attach provider groups to claims (`true`/`false`).
    pub const ATTACH_GROUPS: &str = "AUTH_ATTACH_GROUPS";
    /// Auxiliary failure policy (`log` or `propagate`).
    pub const AUXILIARY_FAILURES: &str = "AUTH_AUXILIARY_FAILURES";
}

/// What to do when auxiliary claim data (group listing) cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuxiliaryFailurePolicy {
    /// Log the failure and issue the claim without the data.
    #[default]
    LogAndContinue,

    /// Fail the flow with the provider error.
    Propagate,
}

impl AuxiliaryFailurePolicy {
    /// Parse a policy name (`log` or `propagate`).
    ///
    /// # Errors
    ///
    /// Returns error if the name is not recognized.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "log" | "log_and_continue" => Ok(Self::LogAndContinue),
            "propagate" => Ok(Self::Propagate),
            other => Err(AuthError::Unexpected(format!(
                "unknown auxiliary failure policy: {other}"
            ))),
        }
    }
}

/// Orchestration configuration shared by all coordinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Prefix of every machine-readable error code.
    ///
    /// Default: `cognito`
    pub error_namespace: String,

    /// Credential identifier field; also the local-user lookup field.
    ///
    /// Default: `email`
    pub identifier_field: String,

    /// Credential secret field.
    ///
    /// Default: `password`
    pub secret_field: String,

    /// Refresh token request field.
    ///
    /// Default: `refresh_token`
    pub refresh_token_field: String,

    /// Guard used when a flow does not name one.
    ///
    /// Default: `web`
    pub default_guard: String,

    /// Create a local user when remote login succeeds for an unknown one.
    ///
    /// Default: false
    pub provision_missing_users: bool,

    /// Fetch provider groups into the claim's auxiliary data.
    ///
    /// Default: true
    pub attach_groups: bool,

    /// Handling of auxiliary data failures.
    ///
    /// Default: `LogAndContinue`
    pub auxiliary_failures: AuxiliaryFailurePolicy,
}

impl AuthConfig {
    /// Create configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            error_namespace: "cognito".to_string(),
            identifier_field: "email".to_string(),
            secret_field: "password".to_string(),
            refresh_token_field: "refresh_token".to_string(),
            default_guard: "web".to_string(),
            provision_missing_users: false,
            attach_groups: true,
            auxiliary_failures: AuxiliaryFailurePolicy::LogAndContinue,
        }
    }

    /// Load configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a boolean or policy variable has an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a boolean or policy variable has an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(value) = lookup(env_vars::ERROR_NAMESPACE) {
            config.error_namespace = value;
        }
        if let Some(value) = lookup(env_vars::IDENTIFIER_FIELD) {
            config.identifier_field = value;
        }
        if let Some(value) = lookup(env_vars::SECRET_FIELD) {
            config.secret_field = value;
        }
        if let Some(value) = lookup(env_vars::REFRESH_TOKEN_FIELD) {
            config.refresh_token_field = value;
        }
        if let Some(value) = lookup(env_vars::DEFAULT_GUARD) {
            config.default_guard = value;
        }
        if let Some(value) = lookup(env_vars::PROVISION_MISSING_USERS) {
            config.provision_missing_users = parse_bool(env_vars::PROVISION_MISSING_USERS, &value)?;
        }
        if let Some(value) = lookup(env_vars::ATTACH_GROUPS) {
            config.attach_groups = parse_bool(env_vars::ATTACH_GROUPS, &value)?;
        }
        if let Some(value) = lookup(env_vars::AUXILIARY_FAILURES) {
            config.auxiliary_failures = AuxiliaryFailurePolicy::parse(&value)?;
        }

        Ok(config)
    }

    /// Set the error code namespace.
    #[must_use]
    pub fn with_error_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.error_namespace = namespace.into();
        self
    }

    /// Set the identifier field name.
    #[must_use]
    pub fn with_identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = field.into();
        self
    }

    /// Set the default guard.
    #[must_use]
    pub fn with_default_guard(mut self, guard: impl Into<String>) -> Self {
        self.default_guard = guard.into();
        self
    }

    /// Enable or disable local-user provisioning.
    #[must_use]
    pub const fn with_provisioning(mut self, enabled: bool) -> Self {
        self.provision_missing_users = enabled;
        self
    }

    /// Enable or disable group attachment.
    #[must_use]
    pub const fn with_groups(mut self, enabled: bool) -> Self {
        self.attach_groups = enabled;
        self
    }

    /// Set the auxiliary failure policy.
    #[must_use]
    pub const fn with_auxiliary_failures(mut self, policy: AuxiliaryFailurePolicy) -> Self {
        self.auxiliary_failures = policy;
        self
    }

    /// Build an error code under the configured namespace.
    #[must_use]
    pub fn code(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.error_namespace)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AuthError::Unexpected(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}
