// nasdl-api: Async Rust client for the OpenMediaVault JSON-RPC endpoint

pub mod auth;
pub mod client;
pub mod downloader;
pub mod error;
pub mod failure;
pub mod messages;
pub mod outcome;
pub mod share;
pub mod transport;

pub use auth::{LoginResponse, Permissions, Role, SessionName};
pub use client::{RpcClient, RpcRequest};
pub use downloader::{
    CreateTaskRequest, DownloadTask, DownloadType, Plugin, PluginListResponse, TaskListResponse,
};
pub use error::Error;
pub use failure::{ConnectionFailure, MissingField};
pub use outcome::{ResponseMeta, RpcOutcome};
pub use share::SharedFolder;
pub use transport::{SessionCookies, TlsMode, TransportConfig};
