// Downloader plugin endpoints
//
// Task list/create/start/delete on the `Downloader` service, plus plugin
// discovery through the `Plugin` service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::Display;

use crate::client::{RpcClient, RpcRequest};
use crate::error::Error;
use crate::outcome::RpcOutcome;

pub const DOWNLOADER_SERVICE: &str = "Downloader";
pub const PLUGIN_SERVICE: &str = "Plugin";

/// Fixed UUID the plugin expects for newly created downloads.
const NEW_OBJECT_UUID: &str = "fa4b1c66-ef79-11e5-87a0-0002b3a176b4";

/// Which downloader backend handles a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DownloadType {
    Aria2,
    Curl,
    YoutubeDl,
}

/// One download as reported by `getDownloadList`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadTask {
    pub uuid: String,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub dltype: Option<DownloadType>,
    #[serde(default)]
    pub downloading: bool,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default)]
    pub parts: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub subtitles: Option<bool>,
    #[serde(default)]
    pub sharedfoldername: Option<String>,
    pub sharedfolderref: String,
    #[serde(default)]
    pub delete: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub total: u64,
    pub data: Vec<DownloadTask>,
}

/// Parameters for `setDownload`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTaskRequest {
    pub filename: String,
    pub url: String,
    pub dltype: DownloadType,
    pub sharedfolderref: String,
    pub subtitles: bool,
    pub delete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub installed: bool,
    #[serde(default, rename = "abstract")]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginListResponse {
    pub total: u64,
    pub data: Vec<Plugin>,
}

impl RpcClient {
    /// List every download task.
    pub async fn list_tasks(
        &self,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<TaskListResponse>, Error> {
        let request = RpcRequest::new(
            DOWNLOADER_SERVICE,
            "getDownloadList",
            json!({ "start": 0, "limit": -1 }),
        )
        .with_timeout(timeout);
        self.call(base_url, &request).await
    }

    /// Create a download task. The plugin stores it without starting it.
    pub async fn create_task(
        &self,
        base_url: &str,
        task: &CreateTaskRequest,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<DownloadTask>, Error> {
        let mut params = serde_json::to_value(task).map_err(|source| Error::Encode {
            what: "download task",
            source,
        })?;
        if let Some(obj) = params.as_object_mut() {
            obj.insert("uuid".into(), json!(NEW_OBJECT_UUID));
        }

        let request =
            RpcRequest::new(DOWNLOADER_SERVICE, "setDownload", params).with_timeout(timeout);
        self.call(base_url, &request).await
    }

    /// Start downloading an existing task in the background.
    pub async fn start_task(
        &self,
        base_url: &str,
        uuid: &str,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<serde_json::Value>, Error> {
        let request = RpcRequest::new(DOWNLOADER_SERVICE, "doDownloadBg", json!({ "uuid": uuid }))
            .with_timeout(timeout);
        self.call(base_url, &request).await
    }

    /// Delete a task.
    pub async fn delete_task(
        &self,
        base_url: &str,
        uuid: &str,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<serde_json::Value>, Error> {
        let request =
            RpcRequest::new(DOWNLOADER_SERVICE, "deleteDownload", json!({ "uuid": uuid }))
                .with_timeout(timeout);
        self.call(base_url, &request).await
    }

    /// Look up the Downloader plugin in the plugin catalogue.
    pub async fn downloader_info(
        &self,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<PluginListResponse>, Error> {
        let request = RpcRequest::new(
            PLUGIN_SERVICE,
            "getList",
            json!({ "search": "Downloader", "start": 0, "limit": -1 }),
        )
        .with_timeout(timeout);
        self.call(base_url, &request).await
    }
}
