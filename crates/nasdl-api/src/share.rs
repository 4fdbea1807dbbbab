// Shared folder endpoints (`ShareMgmt` service).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::{RpcClient, RpcRequest};
use crate::error::Error;
use crate::outcome::RpcOutcome;

pub const SHARE_SERVICE: &str = "ShareMgmt";

/// A shared folder downloads can be saved into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFolder {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub mntentref: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reldirpath: String,
}

impl RpcClient {
    /// Enumerate shared folders.
    pub async fn list_shared_folders(
        &self,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<Vec<SharedFolder>>, Error> {
        let request =
            RpcRequest::new(SHARE_SERVICE, "enumerateSharedFolders", json!({})).with_timeout(timeout);
        self.call(base_url, &request).await
    }
}
