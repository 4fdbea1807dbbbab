// ── Connection settings ──
//
// What the session manager needs to reach and authenticate with the NAS.
// Every field is optional until validated; the caller owns persistence and
// hands changes in as partial updates.

use secrecy::{ExposeSecret, SecretString};

use nasdl_api::{ConnectionFailure, MissingField, SessionName};

/// Possibly-incomplete connection settings.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    /// NAS web UI root, e.g. `https://nas.local:443`.
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub session: Option<SessionName>,
}

/// Fully populated settings, produced by [`ConnectionSettings::validate`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub username: String,
    pub password: SecretString,
    pub session: SessionName,
}

/// A partial settings change. Unset fields keep their current value; a field
/// can also be explicitly cleared.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    base_url: Option<Option<String>>,
    username: Option<Option<String>>,
    password: Option<Option<SecretString>>,
    session: Option<Option<SessionName>>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(Some(base_url.into()));
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(Some(username.into()));
        self
    }

    pub fn password(mut self, password: SecretString) -> Self {
        self.password = Some(Some(password));
        self
    }

    pub fn session(mut self, session: SessionName) -> Self {
        self.session = Some(Some(session));
        self
    }

    pub fn clear_base_url(mut self) -> Self {
        self.base_url = Some(None);
        self
    }

    pub fn clear_username(mut self) -> Self {
        self.username = Some(None);
        self
    }

    /// Forget the password (e.g. "remember password" was turned off).
    pub fn clear_password(mut self) -> Self {
        self.password = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.base_url.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.session.is_none()
    }
}

impl From<ConnectionSettings> for SettingsUpdate {
    /// Overwrite every field, clearing the ones that are `None`.
    fn from(settings: ConnectionSettings) -> Self {
        Self {
            base_url: Some(settings.base_url),
            username: Some(settings.username),
            password: Some(settings.password),
            session: Some(settings.session),
        }
    }
}

impl ConnectionSettings {
    /// Apply a partial update, returning the merged settings.
    pub fn merged(&self, update: SettingsUpdate) -> Self {
        Self {
            base_url: update.base_url.unwrap_or_else(|| self.base_url.clone()),
            username: update.username.unwrap_or_else(|| self.username.clone()),
            password: update.password.unwrap_or_else(|| self.password.clone()),
            session: update.session.unwrap_or(self.session),
        }
    }

    /// Field-by-field equality. Passwords are compared by value.
    pub fn same_as(&self, other: &Self) -> bool {
        let same_password = match (&self.password, &other.password) {
            (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
            (None, None) => true,
            _ => false,
        };
        self.base_url == other.base_url
            && self.username == other.username
            && self.session == other.session
            && same_password
    }

    /// Check every field is present.
    ///
    /// A lone missing password is reported as [`MissingField::Password`]
    /// since it usually just means the password isn't remembered; any other
    /// gap is [`MissingField::Other`].
    pub fn validate(&self) -> Result<Settings, ConnectionFailure> {
        match (
            &self.base_url,
            &self.username,
            &self.password,
            self.session,
        ) {
            (Some(base_url), Some(username), Some(password), Some(session)) => Ok(Settings {
                base_url: base_url.clone(),
                username: username.clone(),
                password: password.clone(),
                session,
            }),
            (Some(_), Some(_), None, Some(_)) => Err(ConnectionFailure::MissingConfig {
                which: MissingField::Password,
            }),
            _ => Err(ConnectionFailure::MissingConfig {
                which: MissingField::Other,
            }),
        }
    }
}
