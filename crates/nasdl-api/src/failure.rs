// Connection failure taxonomy and the transport error classifier.
//
// The classification is a heuristic: the transport only sees what went wrong
// on the wire, never why. A 400 from a TLS-terminating proxy usually means
// plain HTTP was sent to an HTTPS port, a refused connection usually means a
// wrong hostname or port, and so on.

use std::sync::Arc;

use strum::{Display, EnumString};
use thiserror::Error;

use crate::error::Error;

/// Which part of the connection settings is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum MissingField {
    /// Only the password is missing (e.g. "remember password" disabled).
    Password,
    /// Anything else: unconfigured host, username, or several fields.
    Other,
}

/// Why a call never produced an RPC answer.
///
/// Closed set -- consumers match exhaustively. Everything except
/// [`MissingConfig`](Self::MissingConfig) carries the transport error that
/// caused it.
#[derive(Debug, Clone, Error)]
pub enum ConnectionFailure {
    #[error("Connection settings are not configured ({which} missing)")]
    MissingConfig { which: MissingField },

    #[error("Connection failed. Likely cause: wrong protocol")]
    ProbableWrongProtocol { cause: Arc<Error> },

    #[error(
        "Connection failed. Likely cause: wrong hostname/port, no internet connection, or invalid certificate"
    )]
    ProbableWrongHostOrNoConnectionOrCert { cause: Arc<Error> },

    #[error("Connection timed out. Check your hostname/port settings and internet connection")]
    Timeout { cause: Arc<Error> },

    #[error("Connection failed for an unknown reason")]
    Unknown { cause: Arc<Error> },
}

impl ConnectionFailure {
    /// Classify a transport error into exactly one failure category.
    ///
    /// - HTTP 400 without an RPC envelope → [`ProbableWrongProtocol`](Self::ProbableWrongProtocol)
    /// - unreachable host / refused / DNS / TLS / bad URL →
    ///   [`ProbableWrongHostOrNoConnectionOrCert`](Self::ProbableWrongHostOrNoConnectionOrCert)
    /// - elapsed deadline → [`Timeout`](Self::Timeout)
    /// - anything else → [`Unknown`](Self::Unknown)
    pub fn from_error(error: Error) -> Self {
        let cause = Arc::new(error);
        if cause.status() == Some(400) {
            Self::ProbableWrongProtocol { cause }
        } else if cause.is_timeout() {
            Self::Timeout { cause }
        } else if cause.is_unreachable() {
            Self::ProbableWrongHostOrNoConnectionOrCert { cause }
        } else {
            Self::Unknown { cause }
        }
    }

    /// The underlying transport error, if any.
    pub fn cause(&self) -> Option<&Error> {
        match self {
            Self::MissingConfig { .. } => None,
            Self::ProbableWrongProtocol { cause }
            | Self::ProbableWrongHostOrNoConnectionOrCert { cause }
            | Self::Timeout { cause }
            | Self::Unknown { cause } => Some(cause),
        }
    }

    /// Short machine-readable tag, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingConfig { .. } => "missing-config",
            Self::ProbableWrongProtocol { .. } => "probable-wrong-protocol",
            Self::ProbableWrongHostOrNoConnectionOrCert { .. } => {
                "probable-wrong-url-or-no-connection-or-cert-error"
            }
            Self::Timeout { .. } => "timeout",
            Self::Unknown { .. } => "unknown",
        }
    }

    pub fn is_missing_config(&self) -> bool {
        matches!(self, Self::MissingConfig { .. })
    }
}

impl From<Error> for ConnectionFailure {
    fn from(error: Error) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn http_400_is_wrong_protocol() {
        let failure = ConnectionFailure::from_error(Error::BadResponse {
            status: 400,
            body: "The plain HTTP request was sent to HTTPS port".into(),
        });
        assert!(matches!(failure, ConnectionFailure::ProbableWrongProtocol { .. }));
    }

    #[test]
    fn other_bad_status_is_unknown() {
        let failure = ConnectionFailure::from_error(Error::BadResponse {
            status: 502,
            body: String::new(),
        });
        assert!(matches!(failure, ConnectionFailure::Unknown { .. }));
    }

    #[test]
    fn deadline_is_timeout() {
        let failure = ConnectionFailure::from_error(Error::Timeout { timeout_ms: 20_000 });
        assert!(matches!(failure, ConnectionFailure::Timeout { .. }));
        assert_eq!(failure.kind(), "timeout");
    }

    #[test]
    fn dns_failure_is_wrong_host() {
        let failure = ConnectionFailure::from_error(Error::Network {
            message: "dns error: failed to lookup address information".into(),
        });
        assert!(matches!(
            failure,
            ConnectionFailure::ProbableWrongHostOrNoConnectionOrCert { .. }
        ));
    }

    #[test]
    fn bad_url_is_wrong_host() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let failure = ConnectionFailure::from_error(Error::InvalidUrl(parse_err));
        assert!(matches!(
            failure,
            ConnectionFailure::ProbableWrongHostOrNoConnectionOrCert { .. }
        ));
    }

    #[test]
    fn garbage_body_is_unknown() {
        let failure = ConnectionFailure::from_error(Error::Deserialization {
            message: "expected value at line 1 column 1".into(),
            body: "<html>".into(),
        });
        assert!(matches!(failure, ConnectionFailure::Unknown { .. }));
        assert!(failure.cause().is_some());
    }

    #[test]
    fn encode_error_is_unknown_and_named_as_such() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let failure = ConnectionFailure::from_error(Error::Encode {
            what: "download task",
            source,
        });
        assert!(matches!(failure, ConnectionFailure::Unknown { .. }));
        assert!(
            failure
                .cause()
                .unwrap()
                .to_string()
                .starts_with("Failed to encode download task:")
        );
    }

    #[test]
    fn missing_field_renders_kebab_case() {
        assert_eq!(MissingField::Password.to_string(), "password");
        assert_eq!(MissingField::Other.to_string(), "other");
    }
}
