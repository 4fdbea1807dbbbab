// ── NAS client facade ──
//
// The entry point for consumers: owns the session manager and exposes every
// RPC method through the call proxy. Constructed explicitly and injected
// wherever it's needed -- there is no process-wide instance.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use nasdl_api::messages::describe_outcome;
use nasdl_api::{
    CreateTaskRequest, DownloadTask, DownloadType, LoginResponse, PluginListResponse, RpcClient,
    RpcOutcome, SessionCookies, SharedFolder, TaskListResponse, TransportConfig,
};

use crate::proxy::CallProxy;
use crate::session::{LogoutOutcome, RequestOptions, SessionManager};
use crate::settings::{ConnectionSettings, SettingsUpdate};

const TEST_LOGIN_TIMEOUT: Duration = Duration::from_secs(30);
const TEST_LOGOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Segments aria2 splits a new download into.
const DEFAULT_PARTS: u32 = 20;

/// Cheaply cloneable handle to one NAS connection.
#[derive(Debug, Clone)]
pub struct NasClient {
    proxy: CallProxy,
}

impl NasClient {
    /// Build a client. Does NOT connect -- the first call logs in lazily.
    pub fn new(
        transport: &TransportConfig,
        settings: ConnectionSettings,
    ) -> Result<Self, nasdl_api::Error> {
        let rpc = RpcClient::new(transport)?;
        Ok(Self::with_rpc(rpc, settings))
    }

    /// Build a client around an existing RPC client.
    pub fn with_rpc(rpc: RpcClient, settings: ConnectionSettings) -> Self {
        Self {
            proxy: CallProxy::new(SessionManager::new(rpc, settings)),
        }
    }

    pub fn session(&self) -> &SessionManager {
        self.proxy.session()
    }

    pub fn proxy(&self) -> &CallProxy {
        &self.proxy
    }

    // ── Session ──────────────────────────────────────────────────────

    pub fn update_settings(&self, update: SettingsUpdate) -> bool {
        self.session().update_settings(update)
    }

    pub async fn login(&self, options: RequestOptions) -> RpcOutcome<LoginResponse> {
        self.session().login(options).await
    }

    pub async fn logout(&self, options: RequestOptions) -> LogoutOutcome {
        self.session().logout(options).await
    }

    /// Check that `settings` can log in, without disturbing any session.
    ///
    /// Uses a throwaway session with its own cookie store. On success the
    /// test session is logged out in the background; failures of that logout
    /// are only logged.
    pub async fn test_connection(
        transport: &TransportConfig,
        settings: ConnectionSettings,
    ) -> RpcOutcome<LoginResponse> {
        let transport = TransportConfig {
            cookies: Arc::new(SessionCookies::new()),
            ..transport.clone()
        };
        let client = match Self::new(&transport, settings) {
            Ok(client) => client,
            Err(err) => return nasdl_api::ConnectionFailure::from_error(err).into(),
        };

        let outcome = client
            .login(RequestOptions::with_timeout(TEST_LOGIN_TIMEOUT))
            .await;

        if outcome.data().is_some_and(|login| login.authenticated) {
            tokio::spawn(async move {
                match client
                    .logout(RequestOptions::with_timeout(TEST_LOGOUT_TIMEOUT))
                    .await
                {
                    LogoutOutcome::NotLoggedIn => {
                        warn!("not logged in immediately after a successful connection test");
                    }
                    LogoutOutcome::Completed(logout) => {
                        if let Some(reason) = describe_outcome(&logout) {
                            warn!(%reason, "ignoring failed logout after connection test");
                        }
                    }
                }
            });
        }

        outcome
    }

    // ── Downloader ───────────────────────────────────────────────────

    pub async fn list_tasks(&self, options: RequestOptions) -> RpcOutcome<TaskListResponse> {
        self.proxy
            .call(|rpc, s| async move { rpc.list_tasks(&s.base_url, options.timeout).await })
            .await
    }

    pub async fn create_task(
        &self,
        task: &CreateTaskRequest,
        options: RequestOptions,
    ) -> RpcOutcome<DownloadTask> {
        self.proxy
            .call(|rpc, s| async move { rpc.create_task(&s.base_url, task, options.timeout).await })
            .await
    }

    pub async fn start_task(
        &self,
        uuid: &str,
        options: RequestOptions,
    ) -> RpcOutcome<serde_json::Value> {
        self.proxy
            .call(|rpc, s| async move { rpc.start_task(&s.base_url, uuid, options.timeout).await })
            .await
    }

    pub async fn delete_task(
        &self,
        uuid: &str,
        options: RequestOptions,
    ) -> RpcOutcome<serde_json::Value> {
        self.proxy
            .call(|rpc, s| async move { rpc.delete_task(&s.base_url, uuid, options.timeout).await })
            .await
    }

    /// Queue `url` for download into the shared folder `shared_folder_ref`
    /// with the default aria2 settings.
    pub async fn add_download(
        &self,
        url: &str,
        shared_folder_ref: &str,
        options: RequestOptions,
    ) -> RpcOutcome<DownloadTask> {
        let task = CreateTaskRequest {
            filename: file_name_from_url(url).to_owned(),
            url: url.to_owned(),
            dltype: DownloadType::Aria2,
            sharedfolderref: shared_folder_ref.to_owned(),
            subtitles: false,
            delete: false,
            parts: Some(DEFAULT_PARTS),
            format: Some(String::new()),
        };
        debug!(url, filename = %task.filename, "adding download");
        self.create_task(&task, options).await
    }

    pub async fn downloader_info(&self, options: RequestOptions) -> RpcOutcome<PluginListResponse> {
        self.proxy
            .call(|rpc, s| async move { rpc.downloader_info(&s.base_url, options.timeout).await })
            .await
    }

    // ── Shared folders ───────────────────────────────────────────────

    pub async fn list_shared_folders(
        &self,
        options: RequestOptions,
    ) -> RpcOutcome<Vec<SharedFolder>> {
        self.proxy
            .call(|rpc, s| async move {
                rpc.list_shared_folders(&s.base_url, options.timeout).await
            })
            .await
    }
}

/// Last path segment of `url`, without query string or fragment.
///
/// Returns an empty string when the URL ends in `/`.
pub fn file_name_from_url(url: &str) -> &str {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    without_query.rsplit('/').next().unwrap_or_default()
}
