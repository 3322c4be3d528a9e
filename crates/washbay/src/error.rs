//! CLI error types with miette diagnostics.
//!
//! Maps core, query and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use washbay_config::ConfigError;
use washbay_core::{CoreError, ErrorClass, FetchError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const UNAVAILABLE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(washbay::not_found),
        help("Run: washbay {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(
        code(washbay::conflict),
        help("Pick another time or location. Run: washbay appointments list --status scheduled")
    )]
    Conflict { message: String },

    // ── Backend ──────────────────────────────────────────────────────

    #[error("Backend unavailable: {message}")]
    #[diagnostic(
        code(washbay::unavailable),
        help(
            "The request was retried with backoff before giving up.\n\
             Run with -vv to see each attempt, or raise query.retry_attempts."
        )
    )]
    Unavailable { message: String },

    #[error("Query failed: {message}")]
    #[diagnostic(code(washbay::query))]
    Query {
        message: String,
        status: Option<u16>,
        class: ErrorClass,
    },

    #[error("Backend error: {message}")]
    #[diagnostic(code(washbay::backend))]
    Backend { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(washbay::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(washbay::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Add one under [profiles.<name>] in the file shown by: washbay config path"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(washbay::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(washbay::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(washbay::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(washbay::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    #[diagnostic(code(washbay::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Unavailable { .. } => exit_code::UNAVAILABLE,
            Self::Query { status, class, .. } => match (status, class) {
                (Some(404), _) => exit_code::NOT_FOUND,
                (Some(409), _) => exit_code::CONFLICT,
                (_, ErrorClass::Client | ErrorClass::Validation) => exit_code::USAGE,
                (_, ErrorClass::Transient) => exit_code::UNAVAILABLE,
            },
            Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: format!("{entity_type}s list"),
                resource_type: entity_type,
                identifier,
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Conflict { message } => CliError::Conflict { message },

            CoreError::Unavailable { message } => CliError::Unavailable { message },

            CoreError::Timeout { timeout_ms } => CliError::Unavailable {
                message: format!("request timed out after {timeout_ms}ms"),
            },

            CoreError::Internal(message) => CliError::Backend { message },
        }
    }
}

// ── FetchError → CliError mapping ────────────────────────────────────

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        let class = err.class();
        if class == ErrorClass::Transient {
            return CliError::Unavailable {
                message: err.message().to_owned(),
            };
        }
        CliError::Query {
            message: err.message().to_owned(),
            status: err.status(),
            class,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            other => CliError::Config(other),
        }
    }
}
