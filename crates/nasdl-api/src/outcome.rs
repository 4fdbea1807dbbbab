// Three-way result of a remote call.

use serde::{Deserialize, Serialize};

use crate::failure::ConnectionFailure;

/// Identifies the RPC that produced a response, for error-message lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub service: String,
    pub method: String,
}

impl ResponseMeta {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
        }
    }
}

/// Result of an RPC call: success, structured application failure, or a
/// connection-level failure. The variants are mutually exclusive; there is no
/// ambiguous fourth state.
#[derive(Debug, Clone)]
pub enum RpcOutcome<T> {
    Success {
        data: T,
        meta: ResponseMeta,
    },
    Failure {
        code: i64,
        message: Option<String>,
        meta: ResponseMeta,
    },
    ConnectionFailure(ConnectionFailure),
}

impl<T> RpcOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionFailure(_))
    }

    /// Whether a proxied call may discard its session and try again.
    ///
    /// Deliberately broad: any application failure and any connection
    /// failure qualifies, except missing configuration, which no amount of
    /// re-authentication can fix.
    pub fn is_retry_eligible(&self) -> bool {
        match self {
            Self::Success { .. } => false,
            Self::Failure { .. } => true,
            Self::ConnectionFailure(failure) => !failure.is_missing_config(),
        }
    }

    /// Transform the success payload, leaving failures untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RpcOutcome<U> {
        match self {
            Self::Success { data, meta } => RpcOutcome::Success {
                data: f(data),
                meta,
            },
            Self::Failure {
                code,
                message,
                meta,
            } => RpcOutcome::Failure {
                code,
                message,
                meta,
            },
            Self::ConnectionFailure(failure) => RpcOutcome::ConnectionFailure(failure),
        }
    }

    /// Borrow the success payload.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success { data, .. } => Some(data),
            _ => None,
        }
    }
}

impl<T> From<ConnectionFailure> for RpcOutcome<T> {
    fn from(failure: ConnectionFailure) -> Self {
        Self::ConnectionFailure(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::MissingField;

    fn meta() -> ResponseMeta {
        ResponseMeta::new("Downloader", "getDownloadList")
    }

    #[test]
    fn missing_config_is_never_retried() {
        let outcome: RpcOutcome<()> = ConnectionFailure::MissingConfig {
            which: MissingField::Other,
        }
        .into();
        assert!(!outcome.is_retry_eligible());
    }

    #[test]
    fn application_failures_are_retry_eligible() {
        let outcome: RpcOutcome<()> = RpcOutcome::Failure {
            code: 5001,
            message: Some("Session not authenticated.".into()),
            meta: meta(),
        };
        assert!(outcome.is_retry_eligible());
    }

    #[test]
    fn map_keeps_meta() {
        let outcome = RpcOutcome::Success {
            data: 2,
            meta: meta(),
        }
        .map(|n| n * 10);
        match outcome {
            RpcOutcome::Success { data, meta: m } => {
                assert_eq!(data, 20);
                assert_eq!(m, meta());
            }
            other => panic!("expected success, got {other:?}"),
        }
    }
}
