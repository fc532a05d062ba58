//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;

/// Deployment environment, as named by `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    /// Local development.
    Development,
    /// Automated tests.
    Test,
    /// Production.
    Production,
    /// Pre-production.
    Staging,
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            other => Err(ConfigError::Invalid {
                key: "APP_ENV",
                value: other.to_string(),
            }),
        }
    }
}

/// Storage backend selected by `STORAGE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL through `sqlx`.
    Postgres,
    /// Process-local in-memory tables.
    Memory,
}

impl StorageBackend {
    /// Name used in configuration and the health endpoint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                key: "STORAGE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("invalid value for {key}: {value}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// A required variable is missing.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Deployment environment.
    pub app_env: AppEnv,

    /// Which storage backend to wire.
    pub storage_backend: StorageBackend,

    /// PostgreSQL connection options. `None` only for the memory backend.
    pub database: Option<PgConnectOptions>,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Minimum idle connections in the pool.
    pub database_min_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Scheme used in pagination links when the request does not carry one.
    pub public_scheme: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("listen_addr", &self.listen_addr)
            .field("app_env", &self.app_env)
            .field("storage_backend", &self.storage_backend)
            .field("database", &self.database.as_ref().map(redacted))
            .field("database_max_connections", &self.database_max_connections)
            .field("database_min_connections", &self.database_min_connections)
            .field(
                "database_connect_timeout_secs",
                &self.database_connect_timeout_secs,
            )
            .field("public_scheme", &self.public_scheme)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` cannot be parsed, `APP_ENV` or
    /// `STORAGE_BACKEND` hold unknown values, `DATABASE_URL` is not a valid
    /// connection URL, or the postgres backend is selected without any
    /// database settings.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`GatewayConfig::from_env`].
    pub fn from_lookup<L>(lookup: L) -> Result<Self, Box<dyn std::error::Error>>
    where
        L: Fn(&str) -> Option<String>,
    {
        let listen_addr: SocketAddr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()?;

        let app_env = lookup("APP_ENV")
            .map_or(Ok(AppEnv::Development), |v| v.parse())?;
        let storage_backend = lookup("STORAGE_BACKEND")
            .map_or(Ok(StorageBackend::Postgres), |v| v.parse())?;

        let database = match lookup("DATABASE_URL") {
            Some(url) => Some(PgConnectOptions::from_str(&url).map_err(|_| ConfigError::Invalid {
                key: "DATABASE_URL",
                value: "<redacted>".to_string(),
            })?),
            None => database_from_parts(&lookup),
        };
        if storage_backend == StorageBackend::Postgres && database.is_none() {
            return Err(Box::new(ConfigError::Missing(
                "DATABASE_URL or DATABASE_HOST/DATABASE_USER/DATABASE_PASSWORD/DATABASE_NAME",
            )));
        }

        Ok(Self {
            listen_addr,
            app_env,
            storage_backend,
            database,
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", 10),
            database_min_connections: parse_var(&lookup, "DATABASE_MIN_CONNECTIONS", 2),
            database_connect_timeout_secs: parse_var(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS", 5),
            public_scheme: lookup("PUBLIC_SCHEME").unwrap_or_else(|| "http".to_string()),
            json_logs: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }
}

/// Connection target without credentials, for logs.
fn redacted(db: &PgConnectOptions) -> String {
    format!(
        "{}:{}/{}",
        db.get_host(),
        db.get_port(),
        db.get_database().unwrap_or_default()
    )
}

/// Builds connection options from the individual `DATABASE_*` parts.
/// Returns `None` unless host, user, password and name are all set.
fn database_from_parts<L>(lookup: &L) -> Option<PgConnectOptions>
where
    L: Fn(&str) -> Option<String>,
{
    let host = lookup("DATABASE_HOST")?;
    let user = lookup("DATABASE_USER")?;
    let password = lookup("DATABASE_PASSWORD")?;
    let name = lookup("DATABASE_NAME")?;
    let port: u16 = parse_var(lookup, "DATABASE_PORT", 5432);
    Some(
        PgConnectOptions::new_without_pgpass()
            .host(&host)
            .port(port)
            .username(&user)
            .password(&password)
            .database(&name),
    )
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_var<T, L>(lookup: &L, key: &str, default: T) -> T
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
