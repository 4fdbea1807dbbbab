// Shared transport configuration for building reqwest::Client instances.
//
// TLS, default deadline, and the session cookie store are configured here
// once; the RPC client only ever sees the finished `reqwest::Client`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use tracing::debug;
use url::Url;

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed NAS web UIs).
    DangerAcceptInvalid,
}

/// Clearable cookie store holding the NAS session cookie.
///
/// `reqwest`'s [`Jar`] can only grow, but logout must drop the session
/// cookie, so the jar is swapped for an empty one on [`clear`](Self::clear).
///
/// Logins are numbered with [`begin_login`](Self::begin_login). A logout of
/// an older login clears through
/// [`clear_unless_superseded`](Self::clear_unless_superseded), so it cannot
/// wipe the cookie of a login that started after it.
#[derive(Debug, Default)]
pub struct SessionCookies {
    jar: RwLock<Jar>,
    generation: AtomicU64,
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every cookie.
    pub fn clear(&self) {
        debug!("clearing session cookies");
        *self.jar.write().unwrap_or_else(PoisonError::into_inner) = Jar::default();
    }

    /// Record that a login is starting. Returns the new generation.
    pub fn begin_login(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Generation of the most recently started login.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Forget every cookie if no login started after `generation`.
    ///
    /// Returns whether the jar was cleared.
    pub fn clear_unless_superseded(&self, generation: u64) -> bool {
        let mut jar = self.jar.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "newer login in place; keeping session cookies");
            return false;
        }
        debug!("clearing session cookies");
        *jar = Jar::default();
        true
    }

    /// The `Cookie` header value that would be sent to `url`, if any.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        self.cookies(url)
            .and_then(|v| v.to_str().ok().map(String::from))
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cookies(url)
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Deadline applied to requests that don't specify their own.
    pub timeout: Duration,
    pub cookies: Arc<SessionCookies>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: DEFAULT_TIMEOUT,
            cookies: Arc::new(SessionCookies::new()),
        }
    }
}

impl TransportConfig {
    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// No client-level timeout is set: every request carries its own
    /// deadline so callers can shorten it per call.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("nasdl/", env!("CARGO_PKG_VERSION")))
            .cookie_provider(Arc::clone(&self.cookies));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path).map_err(|e| {
                    crate::error::Error::Tls(format!("failed to read CA cert: {e}"))
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| crate::error::Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clear_drops_stored_cookies() {
        let cookies = SessionCookies::new();
        let url: Url = "http://nas.local/rpc.php".parse().unwrap();
        let header = HeaderValue::from_static("X-OPENMEDIAVAULT-SESSIONID=abc123; Path=/");
        cookies.set_cookies(&mut std::iter::once(&header), &url);

        assert_eq!(
            cookies.header_for(&url).as_deref(),
            Some("X-OPENMEDIAVAULT-SESSIONID=abc123")
        );

        cookies.clear();
        assert_eq!(cookies.header_for(&url), None);
    }

    #[test]
    fn newer_login_keeps_cookies_from_older_logout() {
        let cookies = SessionCookies::new();
        let url: Url = "http://nas.local/rpc.php".parse().unwrap();
        let header = HeaderValue::from_static("X-OPENMEDIAVAULT-SESSIONID=abc123; Path=/");

        let first = cookies.begin_login();
        cookies.set_cookies(&mut std::iter::once(&header), &url);
        let second = cookies.begin_login();

        assert!(!cookies.clear_unless_superseded(first));
        assert!(cookies.header_for(&url).is_some());

        assert!(cookies.clear_unless_superseded(second));
        assert_eq!(cookies.header_for(&url), None);
    }
}
