// Session authentication
//
// Login/logout against the `session` RPC service. A successful login sets
// the session cookie in the client's store; every later RPC carries it
// automatically. Logout empties the store whatever the server says.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{Display, EnumString};
use tracing::debug;

use crate::client::{RpcClient, RpcRequest};
use crate::error::Error;
use crate::outcome::RpcOutcome;

/// RPC service handling authentication.
pub const SESSION_SERVICE: &str = "session";

/// Which NAS subsystem a session is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SessionName {
    DownloaderPlugin,
    ShareMgmt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub role: Role,
}

/// Payload of a successful `session.login` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub authenticated: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub permissions: Option<Permissions>,
}

impl RpcClient {
    /// Open a session with username/password.
    ///
    /// A rejected login comes back as `Ok(RpcOutcome::Failure)`; `Err` only
    /// means the NAS could not be reached or answered garbage.
    pub async fn login(
        &self,
        base_url: &str,
        username: &str,
        password: &SecretString,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<LoginResponse>, Error> {
        debug!(username, "logging in");

        let request = RpcRequest::new(
            SESSION_SERVICE,
            "login",
            json!({
                "username": username,
                "password": password.expose_secret(),
            }),
        )
        .with_timeout(timeout);

        let outcome = self.call::<LoginResponse>(base_url, &request).await?;
        if let RpcOutcome::Success { data, .. } = &outcome {
            debug!(authenticated = data.authenticated, "login answered");
        }
        Ok(outcome)
    }

    /// End the current session.
    ///
    /// The cookie store is cleared before returning on every path, including
    /// transport errors, so no stale session cookie survives a logout.
    pub async fn logout(
        &self,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<()>, Error> {
        let result = self.send_logout(base_url, timeout).await;
        self.cookies().clear();
        result
    }

    /// End the session opened under login `generation`.
    ///
    /// Like [`logout`](Self::logout), except the cookie store is left alone
    /// when a newer login has begun in the meantime (see
    /// [`SessionCookies::begin_login`](crate::SessionCookies::begin_login)).
    pub async fn logout_generation(
        &self,
        base_url: &str,
        generation: u64,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<()>, Error> {
        let result = self.send_logout(base_url, timeout).await;
        self.cookies().clear_unless_superseded(generation);
        result
    }

    async fn send_logout(
        &self,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<RpcOutcome<()>, Error> {
        debug!("logging out");

        let request = RpcRequest::new(SESSION_SERVICE, "logout", json!({})).with_timeout(timeout);
        let result = self
            .call::<serde_json::Value>(base_url, &request)
            .await
            .map(|outcome| outcome.map(|_| ()));

        debug!(ok = result.is_ok(), "logout complete");
        result
    }
}
