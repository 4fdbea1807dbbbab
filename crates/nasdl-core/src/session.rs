// ── Session manager ──
//
// Owns the connection settings, their change counter, and the one cached
// login attempt tagged with its cookie generation. All of it sits behind a
// plain mutex that is never held across an await point; callers re-check the
// settings version after every suspension instead of holding a lock through
// it. A logout only clears the cookie store if no newer login has started.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::{debug, trace, warn};

use nasdl_api::messages::describe_outcome;
use nasdl_api::{ConnectionFailure, LoginResponse, RpcClient, RpcOutcome};

use crate::settings::{ConnectionSettings, Settings, SettingsUpdate};

/// Per-call tuning passed through to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Overrides the transport's default deadline.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Result of [`SessionManager::logout`].
#[derive(Debug, Clone)]
pub enum LogoutOutcome {
    /// No session was cached; nothing was sent.
    NotLoggedIn,
    Completed(RpcOutcome<()>),
}

pub(crate) type LoginFuture = Shared<BoxFuture<'static, RpcOutcome<LoginResponse>>>;

struct SessionState {
    settings: ConnectionSettings,
    /// Bumped on every settings change. Never decreases.
    version: u64,
    /// At most one login attempt, shared by every caller that needs it.
    login: Option<CachedLogin>,
}

/// A login attempt and the cookie generation it was started under.
#[derive(Clone)]
struct CachedLogin {
    attempt: LoginFuture,
    generation: u64,
}

struct SessionInner {
    rpc: RpcClient,
    state: Mutex<SessionState>,
}

/// Login/logout and settings owner for one NAS connection.
///
/// Cheaply cloneable via `Arc<SessionInner>`; clones share the same session.
/// Every operation resolves to a typed outcome -- nothing here returns `Err`.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    pub fn new(rpc: RpcClient, settings: ConnectionSettings) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                rpc,
                state: Mutex::new(SessionState {
                    settings,
                    version: 0,
                    login: None,
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The RPC client used for every call made under this session.
    pub fn rpc(&self) -> &RpcClient {
        &self.inner.rpc
    }

    /// Current settings version.
    pub fn settings_version(&self) -> u64 {
        self.lock().version
    }

    /// Snapshot of the current (possibly incomplete) settings.
    pub fn settings(&self) -> ConnectionSettings {
        self.lock().settings.clone()
    }

    /// Whether a login attempt is cached (pending or resolved).
    pub fn has_session(&self) -> bool {
        self.lock().login.is_some()
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Merge a partial update into the settings.
    ///
    /// Returns `false` without side effects if nothing changed. Otherwise the
    /// version is bumped and the previous session is logged out by a detached
    /// task; that logout never influences later calls.
    pub fn update_settings(&self, update: SettingsUpdate) -> bool {
        let (stashed, previous) = {
            let mut state = self.lock();
            let merged = state.settings.merged(update);
            if merged.same_as(&state.settings) {
                return false;
            }
            let previous = std::mem::replace(&mut state.settings, merged);
            state.version += 1;
            debug!(version = state.version, "connection settings changed");
            (state.login.take(), previous.validate())
        };

        if let Some(stashed) = stashed {
            self.spawn_logout(stashed, previous);
        }
        true
    }

    /// Check that every setting is present.
    pub fn validate(&self) -> Result<Settings, ConnectionFailure> {
        self.lock().settings.validate()
    }

    // ── Login / logout ───────────────────────────────────────────────

    /// Log in, or join the login already in flight.
    ///
    /// Missing settings short-circuit without touching the network. Only the
    /// caller that finds no cached attempt starts one; `options` are ignored
    /// when joining an existing attempt.
    pub async fn login(&self, options: RequestOptions) -> RpcOutcome<LoginResponse> {
        match self.current_login(options) {
            Ok(login) => login.await,
            Err(failure) => failure.into(),
        }
    }

    /// The cached login attempt, started first if there is none.
    pub(crate) fn current_login(
        &self,
        options: RequestOptions,
    ) -> Result<LoginFuture, ConnectionFailure> {
        let mut state = self.lock();
        let settings = state.settings.validate()?;
        if let Some(existing) = &state.login {
            trace!("joining in-flight login");
            return Ok(existing.attempt.clone());
        }
        let fresh = CachedLogin {
            generation: self.inner.rpc.cookies().begin_login(),
            attempt: Self::start_login(self.inner.rpc.clone(), settings, options),
        };
        state.login = Some(fresh.clone());
        Ok(fresh.attempt)
    }

    fn start_login(rpc: RpcClient, settings: Settings, options: RequestOptions) -> LoginFuture {
        debug!(username = %settings.username, session = %settings.session, "starting login");
        async move {
            match rpc
                .login(
                    &settings.base_url,
                    &settings.username,
                    &settings.password,
                    options.timeout,
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(error = %err, "login request failed");
                    ConnectionFailure::from_error(err).into()
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Best-effort logout of the current session.
    ///
    /// The cached login is dropped before anything is awaited, so the next
    /// call always logs in afresh no matter how this resolves. The returned
    /// outcome is informational only.
    pub async fn logout(&self, options: RequestOptions) -> LogoutOutcome {
        let (stashed, settings) = {
            let mut state = self.lock();
            (state.login.take(), state.settings.validate())
        };
        match stashed {
            Some(stashed) => Self::finish_logout(&self.inner.rpc, stashed, settings, options).await,
            None => LogoutOutcome::NotLoggedIn,
        }
    }

    async fn finish_logout(
        rpc: &RpcClient,
        stashed: CachedLogin,
        settings: Result<Settings, ConnectionFailure>,
        options: RequestOptions,
    ) -> LogoutOutcome {
        let settings = match settings {
            Ok(settings) => settings,
            Err(failure) => return LogoutOutcome::Completed(failure.into()),
        };

        let outcome: RpcOutcome<()> = match stashed.attempt.await {
            RpcOutcome::ConnectionFailure(failure) => failure.into(),
            RpcOutcome::Success { data, .. } if data.authenticated => {
                match rpc
                    .logout_generation(&settings.base_url, stashed.generation, options.timeout)
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(err) => ConnectionFailure::from_error(err).into(),
                }
            }
            // Never actually logged in: surface the login outcome itself.
            never_authenticated => never_authenticated.map(|_| ()),
        };
        LogoutOutcome::Completed(outcome)
    }

    fn spawn_logout(&self, stashed: CachedLogin, settings: Result<Settings, ConnectionFailure>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime; skipping logout of previous session");
            return;
        };
        let rpc = self.inner.rpc.clone();
        runtime.spawn(async move {
            match Self::finish_logout(&rpc, stashed, settings, RequestOptions::default()).await {
                LogoutOutcome::NotLoggedIn => {}
                LogoutOutcome::Completed(outcome) => match describe_outcome(&outcome) {
                    Some(reason) => debug!(%reason, "ignoring failed logout of previous session"),
                    None => debug!("previous session logged out"),
                },
            }
        });
    }

    /// Forget `failed` so the next call logs in again.
    ///
    /// No-op if the cache already holds a different attempt: another caller
    /// has replaced the session, and that replacement is joined instead.
    pub(crate) fn invalidate_session(&self, failed: &LoginFuture) {
        let mut state = self.lock();
        if state
            .login
            .as_ref()
            .is_some_and(|current| current.attempt.ptr_eq(failed))
        {
            trace!("discarding cached session");
            state.login = None;
        } else {
            trace!("session already replaced; keeping it");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SessionManager")
            .field("settings", &state.settings)
            .field("version", &state.version)
            .field("has_session", &state.login.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nasdl_api::{MissingField, TransportConfig};
    use tokio_test::block_on;

    use super::*;

    fn manager(settings: ConnectionSettings) -> SessionManager {
        let rpc = RpcClient::new(&TransportConfig::default()).unwrap();
        SessionManager::new(rpc, settings)
    }

    #[test]
    fn login_with_empty_settings_never_caches_an_attempt() {
        let session = manager(ConnectionSettings::default());

        let outcome = block_on(session.login(RequestOptions::default()));

        assert!(matches!(
            outcome,
            RpcOutcome::ConnectionFailure(ConnectionFailure::MissingConfig {
                which: MissingField::Other
            })
        ));
        assert!(!session.has_session());
    }

    #[test]
    fn logout_without_session_sends_nothing() {
        let session = manager(ConnectionSettings::default());
        let outcome = block_on(session.logout(RequestOptions::default()));
        assert!(matches!(outcome, LogoutOutcome::NotLoggedIn));
    }

    #[test]
    fn settings_change_outside_a_runtime_still_bumps_version() {
        let session = manager(ConnectionSettings::default());

        assert!(session.update_settings(SettingsUpdate::new().username("admin")));
        assert!(!session.update_settings(SettingsUpdate::new().username("admin")));
        assert_eq!(session.settings_version(), 1);
        assert_eq!(session.settings().username.as_deref(), Some("admin"));
    }
}
