// ── Task polling ──
//
// Fetches the task list through the call proxy and publishes it on a watch
// channel. Each poll takes a staleness token first; a poll that finishes
// after a newer one has started drops its result without touching the
// published snapshot.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use nasdl_api::messages::describe_failure;
use nasdl_api::{ConnectionFailure, DownloadTask, MissingField, RpcOutcome, TaskListResponse};

use crate::client::NasClient;
use crate::session::RequestOptions;
use crate::settings::SettingsUpdate;
use crate::tracker::RequestTracker;

const POLL_TIMEOUT: Duration = Duration::from_secs(20);

/// Shortest interval [`TaskPoller::run`] accepts; shorter ones are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Why the last task fetch produced no task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFetchFailure {
    /// Connection settings are incomplete.
    MissingConfig,
    /// Only the password is missing; the user has to log in.
    LoginRequired,
    /// Anything else, already rendered for display.
    Message(String),
}

/// Most recent task list and fetch bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedTasks {
    pub tasks: Vec<DownloadTask>,
    pub failure: Option<TaskFetchFailure>,
    pub last_initiated: Option<DateTime<Utc>>,
    pub last_completed: Option<DateTime<Utc>>,
}

/// What happened to a poll's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// The result was published.
    Applied,
    /// A newer poll started meanwhile; the result was dropped.
    Stale,
}

/// Polls the task list and publishes it.
pub struct TaskPoller {
    client: NasClient,
    tracker: RequestTracker,
    cache: watch::Sender<CachedTasks>,
    timeout: Duration,
}

impl TaskPoller {
    pub fn new(client: NasClient) -> Self {
        let (cache, _) = watch::channel(CachedTasks::default());
        Self {
            client,
            tracker: RequestTracker::new(),
            cache,
            timeout: POLL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client(&self) -> &NasClient {
        &self.client
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<CachedTasks> {
        self.cache.subscribe()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> CachedTasks {
        self.cache.borrow().clone()
    }

    /// Drop cached tasks, e.g. after the connection settings changed.
    pub fn clear(&self) {
        self.cache.send_replace(CachedTasks::default());
    }

    /// Apply a settings update; cached tasks belong to the old settings and
    /// are dropped if anything changed.
    pub fn update_settings(&self, update: SettingsUpdate) -> bool {
        let changed = self.client.update_settings(update);
        if changed {
            self.clear();
        }
        changed
    }

    /// Fetch the task list once.
    pub async fn poll_once(&self) -> PollResult {
        let token = self.tracker.start_new_request();
        self.cache
            .send_modify(|cache| cache.last_initiated = Some(Utc::now()));

        debug!(%token, "polling for tasks");

        let outcome = self
            .client
            .list_tasks(RequestOptions::with_timeout(self.timeout))
            .await;

        if !self.tracker.is_latest(token) {
            debug!(%token, "poll result outdated; ignoring");
            return PollResult::Stale;
        }

        debug!(%token, "poll result still relevant; applying");
        self.apply(outcome);
        PollResult::Applied
    }

    fn apply(&self, outcome: RpcOutcome<TaskListResponse>) {
        self.cache.send_modify(|cache| {
            cache.last_completed = Some(Utc::now());
            match outcome {
                RpcOutcome::Success { data, .. } => {
                    cache.tasks = data.data;
                    cache.failure = None;
                }
                RpcOutcome::Failure { code, meta, .. } => {
                    cache.failure = Some(TaskFetchFailure::Message(
                        describe_failure(&meta, code).to_owned(),
                    ));
                }
                RpcOutcome::ConnectionFailure(ConnectionFailure::MissingConfig {
                    which: MissingField::Other,
                }) => cache.failure = Some(TaskFetchFailure::MissingConfig),
                RpcOutcome::ConnectionFailure(ConnectionFailure::MissingConfig {
                    which: MissingField::Password,
                }) => cache.failure = Some(TaskFetchFailure::LoginRequired),
                RpcOutcome::ConnectionFailure(failure) => {
                    cache.failure = Some(TaskFetchFailure::Message(failure.to_string()));
                }
            }
        });
    }

    /// Queue a download, then refresh the task list.
    pub async fn add_download(
        &self,
        url: &str,
        shared_folder_ref: &str,
    ) -> RpcOutcome<DownloadTask> {
        let outcome = self
            .client
            .add_download(url, shared_folder_ref, RequestOptions::default())
            .await;
        self.poll_once().await;
        outcome
    }

    /// Poll every `interval` until `cancel` fires.
    ///
    /// Polls run back to back on the calling task; a slow poll delays the
    /// next tick instead of overlapping it. Intervals below
    /// [`MIN_POLL_INTERVAL`] (including zero) are raised to it.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let interval = interval.max(MIN_POLL_INTERVAL);
        info!(?interval, "task poller started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("task poller stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }
}
