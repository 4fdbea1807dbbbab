// ── Call proxy ──
//
// Runs one RPC operation under the shared session: log in (or join the
// login in flight), perform the call with the current settings, and on a
// retry-eligible failure drop the session and go around exactly once more.
// If the settings change while a step is suspended, whatever that step
// produced is thrown away and the sequence starts over.

use std::future::Future;

use tracing::debug;

use nasdl_api::{ConnectionFailure, Error, RpcClient, RpcOutcome};

use crate::session::{RequestOptions, SessionManager};
use crate::settings::Settings;

/// Extra attempts allowed after the first failure.
const MAX_RETRIES: u32 = 1;

/// Wraps RPC operations with session handling and a single retry.
#[derive(Debug, Clone)]
pub struct CallProxy {
    session: SessionManager,
}

impl CallProxy {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Run `op` with a valid session.
    ///
    /// `op` gets a handle to the RPC client and the settings current at the
    /// time of the call; it may be invoked more than once. Transport errors
    /// it returns are classified into [`ConnectionFailure`]s. This never
    /// returns `Err`: every path ends in an [`RpcOutcome`].
    ///
    /// Any failure other than missing configuration counts as retry-eligible,
    /// including plain application failures. That is broader than strictly
    /// auth-related errors, but the NAS reports expired sessions under a
    /// variety of codes and one extra round trip is cheap.
    pub async fn call<T, F, Fut>(&self, op: F) -> RpcOutcome<T>
    where
        F: Fn(RpcClient, Settings) -> Fut,
        Fut: Future<Output = Result<RpcOutcome<T>, Error>>,
    {
        let mut retries_left = MAX_RETRIES;

        loop {
            let version_at_init = self.session.settings_version();

            let attempt = match self.session.current_login(RequestOptions::default()) {
                Ok(attempt) => attempt,
                Err(failure) => return failure.into(),
            };
            let login = attempt.clone().await;
            if self.settings_changed_since(version_at_init) {
                retries_left = MAX_RETRIES;
                continue;
            }

            let failed: RpcOutcome<T> = match login {
                RpcOutcome::Success { .. } => {
                    let settings = match self.session.validate() {
                        Ok(settings) => settings,
                        Err(failure) => return failure.into(),
                    };

                    let result = op(self.session.rpc().clone(), settings).await;
                    if self.settings_changed_since(version_at_init) {
                        retries_left = MAX_RETRIES;
                        continue;
                    }

                    match result {
                        Ok(success @ RpcOutcome::Success { .. }) => return success,
                        Ok(failed) => failed,
                        Err(err) => {
                            debug!(error = %err, "call failed in transport");
                            ConnectionFailure::from_error(err).into()
                        }
                    }
                }
                RpcOutcome::Failure {
                    code,
                    message,
                    meta,
                } => RpcOutcome::Failure {
                    code,
                    message,
                    meta,
                },
                RpcOutcome::ConnectionFailure(failure) => failure.into(),
            };

            if retries_left > 0 && failed.is_retry_eligible() {
                retries_left -= 1;
                debug!(retries_left, "call failed; discarding session and retrying");
                self.session.invalidate_session(&attempt);
                continue;
            }

            return failed;
        }
    }

    fn settings_changed_since(&self, version: u64) -> bool {
        let changed = self.session.settings_version() != version;
        if changed {
            debug!(
                from = version,
                "settings changed while call was in flight; restarting"
            );
        }
        changed
    }
}
