//! Configuration for the `nasdl` binary.
//!
//! TOML profiles layered with `NASDL_` environment variables, password
//! resolution (env + keyring + plaintext), and translation into the
//! connection settings and transport config that `nasdl-core` consumes.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nasdl_api::{SessionName, TlsMode, TransportConfig};
use nasdl_core::ConnectionSettings;

const KEYRING_SERVICE: &str = "nasdl";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named NAS profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Request deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between task list polls in `nasdl poll`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}
fn default_poll_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Https => "https",
        })
    }
}

/// A named NAS profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub protocol: Protocol,

    /// NAS hostname or IP address.
    #[serde(default)]
    pub hostname: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: Option<String>,

    /// Plaintext password (prefer the keyring). Only read when
    /// `remember_password` is set.
    pub password: Option<String>,

    /// Whether a stored password may be used. When false, the password has
    /// to come from the environment or a prompt.
    #[serde(default)]
    pub remember_password: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Override the default timeout, in seconds.
    pub timeout: Option<u64>,
}

fn default_port() -> u16 {
    443
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            hostname: String::new(),
            port: default_port(),
            username: None,
            password: None,
            remember_password: false,
            ca_cert: None,
            insecure: false,
            timeout: None,
        }
    }
}

impl Profile {
    /// `{protocol}://{hostname}:{port}`, or `None` while no hostname is set.
    pub fn host_url(&self) -> Option<String> {
        let hostname = self.hostname.trim();
        if hostname.is_empty() {
            return None;
        }
        Some(format!("{}://{hostname}:{}", self.protocol, self.port))
    }

    fn username(&self) -> Option<String> {
        self.username
            .clone()
            .or_else(|| std::env::var("NASDL_USERNAME").ok())
    }

    /// Connection settings for this profile, with the password resolved
    /// through [`resolve_password`].
    pub fn connection_settings(&self, profile_name: &str) -> ConnectionSettings {
        ConnectionSettings {
            base_url: self.host_url(),
            username: self.username(),
            password: resolve_password(self, profile_name),
            session: Some(SessionName::DownloaderPlugin),
        }
    }

    pub fn transport_config(&self, defaults: &Defaults) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        TransportConfig::default()
            .with_tls(tls)
            .with_timeout(Duration::from_secs(
                self.timeout.unwrap_or(defaults.timeout),
            ))
    }
}

impl Config {
    /// Look up `name`, falling back to the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned();

        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => {
                let mut available: Vec<_> = self.profiles.keys().cloned().collect();
                available.sort();
                Err(ConfigError::ProfileNotFound { name, available })
            }
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "nasdl", "nasdl").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("nasdl");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading and saving ──────────────────────────────────────────────

/// Load the full config from the canonical path and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` layered under `NASDL_*` environment variables.
///
/// A missing file is not an error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NASDL_").split("_"));

    Ok(figment.extract()?)
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Password resolution ─────────────────────────────────────────────

/// Resolve a profile's password.
///
/// 1. `NASDL_PASSWORD`
/// 2. System keyring (`nasdl` / `{profile}/password`), if remembered
/// 3. Plaintext `password` in the profile, if remembered
///
/// `None` means the caller has to ask the user.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Ok(pw) = std::env::var("NASDL_PASSWORD") {
        return Some(SecretString::from(pw));
    }

    if !profile.remember_password {
        return None;
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(pw) = entry.get_password() {
            return Some(SecretString::from(pw));
        }
    }

    profile.password.clone().map(SecretString::from)
}

/// Store a password in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))?;
    entry.set_password(password.expose_secret())?;
    Ok(())
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/password")
}
