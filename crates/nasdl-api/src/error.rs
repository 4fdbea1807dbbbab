use thiserror::Error;

/// Transport-level faults raised by the RPC client.
///
/// Ordinary RPC failures (an `error` envelope, a non-2xx status carrying a
/// message) are NOT errors -- they come back as
/// [`RpcOutcome::Failure`](crate::RpcOutcome::Failure). This type only covers
/// the cases where no usable RPC answer exists at all. `nasdl-core` turns
/// these into [`ConnectionFailure`](crate::ConnectionFailure) values via
/// [`ConnectionFailure::from_error`](crate::ConnectionFailure::from_error).
#[derive(Debug, Error)]
pub enum Error {
    // ── HTTP ────────────────────────────────────────────────────────
    /// Non-2xx response that did not carry an RPC error envelope.
    #[error("Bad HTTP response (HTTP {status}): {body}")]
    BadResponse { status: u16, body: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Host unreachable: DNS failure, connection refused, TLS handshake failure.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Request deadline elapsed before the server answered.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Any other HTTP transport error.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration error (bad CA file, client builder failure).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Request parameters could not be encoded as JSON. Nothing was sent.
    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        source: serde_json::Error,
    },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Translate a `reqwest` error into the most specific variant.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else if err.is_connect() {
            Self::Network {
                message: err.to_string(),
            }
        } else {
            Self::Transport(err)
        }
    }

    /// Returns `true` if the request never reached a server.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::InvalidUrl(_) | Self::Tls(_) => true,
            Self::Transport(e) => e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if the request deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadResponse { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
