// JSON-RPC HTTP client
//
// Wraps `reqwest::Client` with the NAS RPC envelope: every call is a POST of
// `{service, method, params}` to `{base}/rpc.php`, answered with
// `{response, error}`. Endpoint modules (auth, downloader, share) are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::outcome::{ResponseMeta, RpcOutcome};
use crate::transport::{SessionCookies, TransportConfig};

const RPC_PATH: &str = "rpc.php";

/// A single RPC invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub service: String,
    pub method: String,
    pub params: Value,
    /// Per-call deadline; falls back to the transport default.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl RpcRequest {
    pub fn new(service: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            params,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn meta(&self) -> ResponseMeta {
        ResponseMeta::new(&self.service, &self.method)
    }
}

/// The `{response, error}` envelope wrapped around every answer.
#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    response: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: Option<String>,
}

/// Raw HTTP client for the NAS JSON-RPC endpoint.
///
/// Cheap to clone: the underlying `reqwest::Client` and cookie store are
/// reference-counted. The base URL is passed per call because it belongs to
/// the connection settings, which may change between calls.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    cookies: Arc<SessionCookies>,
    default_timeout: Duration,
}

impl RpcClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            cookies: Arc::clone(&transport.cookies),
            default_timeout: transport.timeout,
        })
    }

    /// The session cookie store shared with the HTTP client.
    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Build the RPC endpoint URL under `base_url`.
    pub fn endpoint(base_url: &str) -> Result<Url, Error> {
        let base = base_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{RPC_PATH}"))?)
    }

    /// POST one RPC request and decode the envelope.
    ///
    /// Returns `Ok(Failure)` for anything the server answered with an RPC
    /// error, and `Err` only when there is no usable answer: deadline,
    /// unreachable host, a bare HTTP 400, or a body that isn't JSON.
    pub async fn call<T: DeserializeOwned>(
        &self,
        base_url: &str,
        request: &RpcRequest,
    ) -> Result<RpcOutcome<T>, Error> {
        let url = Self::endpoint(base_url)?;
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        debug!(service = %request.service, method = %request.method, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, timeout_ms))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, timeout_ms))?;

        trace!(%status, len = body.len(), "RPC response received");

        Self::parse_envelope(request.meta(), status, body)
    }

    fn parse_envelope<T: DeserializeOwned>(
        meta: ResponseMeta,
        status: reqwest::StatusCode,
        body: String,
    ) -> Result<RpcOutcome<T>, Error> {
        let envelope = serde_json::from_str::<RpcEnvelope>(&body);

        if let Ok(RpcEnvelope {
            error: Some(err), ..
        }) = &envelope
        {
            debug!(code = err.code, %status, "RPC error response");
            return Ok(RpcOutcome::Failure {
                code: err.code,
                message: err.message.clone(),
                meta,
            });
        }

        if !status.is_success() {
            if status == reqwest::StatusCode::BAD_REQUEST {
                return Err(Error::BadResponse {
                    status: status.as_u16(),
                    body: preview(&body).to_owned(),
                });
            }
            return Ok(RpcOutcome::Failure {
                code: i64::from(status.as_u16()),
                message: status.canonical_reason().map(String::from),
                meta,
            });
        }

        let envelope = envelope.map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })?;

        let data = serde_json::from_value(envelope.response).map_err(|e| Error::Deserialization {
            message: format!("unexpected response shape: {e}"),
            body: body.clone(),
        })?;

        Ok(RpcOutcome::Success { data, meta })
    }
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
