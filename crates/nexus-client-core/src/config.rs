use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_META_URL: &str = "http://localhost:8080";
pub const DEFAULT_DATA_URL: &str = "http://localhost:3000";

/// Complete client configuration: the remote service endpoints and the
/// direct-connection tuple. Only one of the two is used by a given process,
/// depending on the transport mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub remote: RemoteConfig,
    pub direct: DirectConfig,
}

impl ClientConfig {
    /// Load a config previously written by [`ClientConfig::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        config.remote.meta_url = trim_base(&config.remote.meta_url);
        config.remote.data_url = trim_base(&config.remote.data_url);
        Ok(config)
    }

    /// Persist the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Defaults overridden by `NEXUS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (used by `from_env`).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup("NEXUS_META_URL") {
            self.remote = self.remote.meta_url(url);
        }
        if let Some(url) = lookup("NEXUS_DATA_URL") {
            self.remote = self.remote.data_url(url);
        }
        if let Some(token) = lookup("NEXUS_AUTH_TOKEN") {
            self.remote = self.remote.auth_token(token);
        }
        if let Some(host) = lookup("NEXUS_DB_HOST") {
            self.direct.host = host;
        }
        if let Some(port) = lookup("NEXUS_DB_PORT") {
            self.direct.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "NEXUS_DB_PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(database) = lookup("NEXUS_DB_NAME") {
            self.direct.database = database;
        }
        if let Some(user) = lookup("NEXUS_DB_USER") {
            self.direct.user = user;
        }
        if let Some(password) = lookup("NEXUS_DB_PASSWORD") {
            self.direct.password = password;
        }
        Ok(self)
    }
}

/// Endpoints for Remote mode: postgres-meta for metadata and raw queries,
/// PostgREST for table data.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub meta_url: String,
    pub data_url: String,
    pub auth_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            meta_url: DEFAULT_META_URL.to_string(),
            data_url: DEFAULT_DATA_URL.to_string(),
            auth_token: None,
        }
    }
}

impl RemoteConfig {
    pub fn new(meta_url: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            meta_url: trim_base(&meta_url.into()),
            data_url: trim_base(&data_url.into()),
            auth_token: None,
        }
    }

    /// Set the metadata service base URL.
    pub fn meta_url(mut self, url: impl Into<String>) -> Self {
        self.meta_url = trim_base(&url.into());
        self
    }

    /// Set the data service base URL.
    pub fn data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = trim_base(&url.into());
        self
    }

    /// Set the bearer token sent with every request.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = if token.is_empty() { None } else { Some(token) };
        self
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("meta_url", &self.meta_url)
            .field("data_url", &self.data_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Connection tuple for Direct mode.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    #[serde(skip)]
    pub pool: PoolConfig,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            pool: PoolConfig::default(),
        }
    }
}

impl DirectConfig {
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set maximum number of pool connections.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.pool.max_connections = n;
        self
    }

    /// Set pool acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.pool.acquire_timeout = timeout;
        self
    }
}

impl fmt::Debug for DirectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("pool", &self.pool)
            .finish()
    }
}

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
