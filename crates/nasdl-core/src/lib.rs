//! Session-managing client layer between `nasdl-api` and its consumers.
//!
//! - **[`SessionManager`]**: Owns the connection settings, a settings version
//!   counter, and one shared login attempt. Concurrent callers join the same
//!   login; a settings change bumps the version and logs the old session out
//!   in the background.
//!
//! - **[`CallProxy`]**: Runs any RPC operation under the session: logs in,
//!   performs the call, restarts if the settings changed mid-flight, and on
//!   failure discards the session and retries exactly once.
//!
//! - **[`RequestTracker`]**: Staleness tokens for streams of superseding
//!   requests. The newest request wins regardless of completion order.
//!
//! - **[`NasClient`]**: Facade exposing the Downloader and ShareMgmt RPC
//!   methods through the proxy, plus a side-effect-free connection test.
//!
//! - **[`TaskPoller`]**: Polls the task list and publishes results on a
//!   `watch` channel, dropping outdated results.
//!
//! Apart from construction, nothing here returns `Err`; every operation resolves to an
//! [`RpcOutcome`](nasdl_api::RpcOutcome) that callers match exhaustively.

pub mod client;
pub mod poll;
pub mod proxy;
pub mod session;
pub mod settings;
pub mod tracker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{NasClient, file_name_from_url};
pub use poll::{CachedTasks, MIN_POLL_INTERVAL, PollResult, TaskFetchFailure, TaskPoller};
pub use proxy::CallProxy;
pub use session::{LogoutOutcome, RequestOptions, SessionManager};
pub use settings::{ConnectionSettings, Settings, SettingsUpdate};
pub use tracker::{RequestToken, RequestTracker};
