use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use studentdesk_auth::AuthConfig;
use studentdesk_db_postgres::PostgresConfig;

/// Environment variable set by container images. When `true` the server
/// listens on `server.container_port` and never redirects to HTTPS.
pub const CONTAINER_ENV_VAR: &str = "STUDENTDESK_RUNNING_IN_CONTAINER";

/// Everything read from `studentdesk.toml` and `STUDENTDESK__*` variables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Student list cache.
    pub cache: CacheConfig,
    /// Session cookie and password policy.
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        let server = &self.server;
        for (name, port) in [
            ("port", server.port),
            ("container_port", server.container_port),
            ("https_port", server.https_port),
        ] {
            if port == 0 {
                return Err(format!("server.{name} must be > 0"));
            }
        }
        if server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        if self.cache.time_to_live.is_zero() || self.cache.time_to_idle.is_zero() {
            return Err("cache.time_to_live and cache.time_to_idle must be > 0".into());
        }
        const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(format!("logging.level must be one of {LEVELS:?}"));
        }
        if self.storage.backend == StorageBackend::Postgres {
            self.storage.postgres.validate()?;
        }
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        if let Some(admin) = &self.bootstrap.admin_user
            && (admin.email.trim().is_empty() || admin.password.is_empty())
        {
            return Err("bootstrap.admin_user requires both email and password".into());
        }
        Ok(())
    }

    /// Port the listener binds to.
    pub fn effective_port(&self) -> u16 {
        if self.server.in_container {
            self.server.container_port
        } else {
            self.server.port
        }
    }

    pub fn https_redirect_enabled(&self) -> bool {
        self.server.https_redirect && !self.server.in_container
    }

    pub fn addr(&self) -> SocketAddr {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.effective_port()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Replaces `port` when running inside a container.
    pub container_port: u16,
    /// Public HTTPS port used to build redirect locations.
    pub https_port: u16,
    /// Redirect requests that arrived over plain HTTP (per `X-Forwarded-Proto`).
    pub https_redirect: bool,
    pub body_limit_bytes: usize,
    /// Allowed CORS origins. Empty means permissive.
    pub cors_allow_origins: Vec<String>,
    /// Set from `STUDENTDESK_RUNNING_IN_CONTAINER` when the config is loaded.
    pub in_container: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            container_port: 8080,
            https_port: 443,
            https_redirect: true,
            body_limit_bytes: 1 << 20,
            cors_allow_origins: Vec::new(),
            in_container: false,
        }
    }
}

/// Which student/identity store to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps; data is lost on restart.
    Memory,
    #[default]
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub postgres: PostgresConfig,
}

/// Expiration of the cached student list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Absolute lifetime of a cached list.
    #[serde(with = "humantime_serde")]
    pub time_to_live: Duration,
    /// A cached list unused for this long is dropped.
    #[serde(with = "humantime_serde")]
    pub time_to_idle: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            time_to_live: Duration::from_secs(10 * 60),
            time_to_idle: Duration::from_secs(2 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset.
    pub level: String,
    /// JSON lines instead of human readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Created at startup unless a user with this email already exists.
    pub admin_user: Option<AdminUserConfig>,
}

/// Initial administrator. Prefer supplying the password through
/// `STUDENTDESK__BOOTSTRAP__ADMIN_USER__PASSWORD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserConfig {
    pub email: String,
    pub password: String,
}

/// Reads the container flag from the environment.
pub fn running_in_container() -> bool {
    std::env::var(CONTAINER_ENV_VAR)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub mod loader {
    use std::path::Path;

    use config::{Config, Environment, File};

    use super::{AppConfig, running_in_container};

    /// File values first, then `STUDENTDESK__SECTION__KEY` overrides. A
    /// missing file is not an error.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let path = Path::new(path.unwrap_or("studentdesk.toml"));
        let mut builder = Config::builder();
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("STUDENTDESK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let mut merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.server.in_container |= running_in_container();
        merged.validate()?;
        Ok(merged)
    }
}
