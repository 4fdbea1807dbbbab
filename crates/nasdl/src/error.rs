//! CLI error types with miette diagnostics.
//!
//! Maps `RpcOutcome` failures and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use nasdl_api::messages::describe_failure;
use nasdl_api::{ConnectionFailure, MissingField, RpcOutcome};
use nasdl_config::ConfigError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file not found")]
    #[diagnostic(
        code(nasdl::no_config),
        help(
            "Create a profile in {path}, for example:\n\n\
             [profiles.default]\n\
             hostname = \"nas.local\"\n\
             username = \"admin\""
        )
    )]
    NoConfig { path: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(code(nasdl::profile_not_found), help("Available profiles: {available}"))]
    ProfileNotFound { name: String, available: String },

    #[error("Profile '{profile}' is missing its hostname or username")]
    #[diagnostic(
        code(nasdl::incomplete_profile),
        help("Set `hostname` and `username` under [profiles.{profile}].")
    )]
    IncompleteProfile { profile: String },

    #[error(transparent)]
    #[diagnostic(code(nasdl::config))]
    Config(ConfigError),

    // ── Authentication ───────────────────────────────────────────────

    #[error("No password available for profile '{profile}'")]
    #[diagnostic(
        code(nasdl::login_required),
        help(
            "Pass --ask-password, set NASDL_PASSWORD, or set\n\
             remember_password = true and store the password in the keyring."
        )
    )]
    LoginRequired { profile: String },

    // ── Connection ───────────────────────────────────────────────────

    #[error("{url} did not answer like an OpenMediaVault RPC endpoint")]
    #[diagnostic(
        code(nasdl::wrong_protocol),
        help("Check whether the NAS expects http or https on this port.")
    )]
    WrongProtocol { url: String },

    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(nasdl::connection_failed),
        help(
            "Likely causes: wrong hostname or port, no network connection,\n\
             or an untrusted certificate (set insecure = true or ca_cert)."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(nasdl::timeout),
        help("Check the hostname/port settings, or raise `timeout` in the profile.")
    )]
    Timeout { url: String },

    #[error("Unexpected response from {url}: {reason}")]
    #[diagnostic(code(nasdl::unknown))]
    Unknown { url: String, reason: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("{method} failed ({code}): {message}")]
    #[diagnostic(code(nasdl::rpc))]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    // ── IO ────────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name, available } => Self::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            other => Self::Config(other),
        }
    }
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::WrongProtocol { .. } | Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::LoginRequired { .. } => exit_code::AUTH,
            Self::Rpc { method, code, .. }
                if method.starts_with("session.") || *code == SESSION_NOT_AUTHENTICATED =>
            {
                exit_code::AUTH
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NoConfig { .. } | Self::ProfileNotFound { .. } | Self::IncompleteProfile { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Map a connection failure against the NAS at `url`.
    pub fn from_connection_failure(failure: ConnectionFailure, url: &str, profile: &str) -> Self {
        let url = url.to_owned();
        match failure {
            ConnectionFailure::MissingConfig {
                which: MissingField::Password,
            } => Self::LoginRequired {
                profile: profile.into(),
            },
            ConnectionFailure::MissingConfig {
                which: MissingField::Other,
            } => Self::IncompleteProfile {
                profile: profile.into(),
            },
            ConnectionFailure::ProbableWrongProtocol { .. } => Self::WrongProtocol { url },
            ConnectionFailure::ProbableWrongHostOrNoConnectionOrCert { cause } => {
                Self::ConnectionFailed {
                    url,
                    reason: cause.to_string(),
                }
            }
            ConnectionFailure::Timeout { .. } => Self::Timeout { url },
            ConnectionFailure::Unknown { cause } => Self::Unknown {
                url,
                reason: cause.to_string(),
            },
        }
    }
}

const SESSION_NOT_AUTHENTICATED: i64 = 5001;

/// Where a command's RPC calls went, for error messages.
#[derive(Debug, Clone)]
pub struct Target {
    pub url: String,
    pub profile: String,
}

impl Target {
    /// Unwrap an outcome, turning failures into [`CliError`]s.
    pub fn check<T>(&self, outcome: RpcOutcome<T>) -> Result<T, CliError> {
        match outcome {
            RpcOutcome::Success { data, .. } => Ok(data),
            RpcOutcome::Failure {
                code,
                message,
                meta,
            } => Err(CliError::Rpc {
                method: format!("{}.{}", meta.service, meta.method),
                code,
                message: message.unwrap_or_else(|| describe_failure(&meta, code).to_owned()),
            }),
            RpcOutcome::ConnectionFailure(failure) => Err(CliError::from_connection_failure(
                failure,
                &self.url,
                &self.profile,
            )),
        }
    }
}
