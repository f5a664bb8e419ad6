//! Configuration for kvlog
//!
//! Centralized configuration with sensible defaults. Values can be built in
//! code through [`ConfigBuilder`] or loaded from the process environment
//! (and an optional `.env` file) with [`Config::from_env`].

use std::path::PathBuf;

use crate::error::{KvError, Result};

/// Main configuration for a kvlog instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Transaction Log Configuration
    // -------------------------------------------------------------------------
    /// Which durable medium backs the transaction log
    pub backend: BackendConfig,

    /// Max events waiting in the persistence queue before writers suspend
    pub queue_capacity: usize,

    /// Max persistence errors buffered before the worker waits for a reader
    pub error_capacity: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// HTTP listen address
    pub listen_addr: String,
}

/// Durable medium selection
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Append-only text file, one event per line
    File { path: PathBuf },

    /// `transactions` table in a Postgres database
    Postgres(PostgresParams),
}

/// Connection parameters for the relational backend
#[derive(Clone)]
pub struct PostgresParams {
    pub host: String,
    pub port: u16,
    pub db_name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for PostgresParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_name", &self.db_name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl PostgresParams {
    /// Read `PG_HOST`, `PG_PORT`, `DB_NAME`, `PG_USER` and `PG_PASSWORD`
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: std::env::var("PG_HOST").unwrap_or(defaults.host),
            port: parse_var("PG_PORT")?.unwrap_or(defaults.port),
            db_name: std::env::var("DB_NAME").unwrap_or(defaults.db_name),
            user: std::env::var("PG_USER").unwrap_or(defaults.user),
            password: std::env::var("PG_PASSWORD").unwrap_or(defaults.password),
            max_connections: defaults.max_connections,
        })
    }
}

impl Default for PostgresParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            db_name: "kvlog".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_connections: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::File {
                path: PathBuf::from("./transaction.log"),
            },
            queue_capacity: 16,
            error_capacity: 1,
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// | Variable               | Meaning                          | Default             |
    /// |------------------------|----------------------------------|---------------------|
    /// | `KVLOG_BACKEND`        | `file` or `postgres`             | `file`              |
    /// | `KVLOG_LOG_FILE`       | path of the file log             | `./transaction.log` |
    /// | `KVLOG_LISTEN`         | HTTP listen address              | `127.0.0.1:8080`    |
    /// | `KVLOG_QUEUE_CAPACITY` | persistence queue capacity       | `16`                |
    /// | `PG_HOST`              | Postgres host                    | `localhost`         |
    /// | `PG_PORT`              | Postgres port                    | `5432`              |
    /// | `DB_NAME`              | Postgres database                | `kvlog`             |
    /// | `PG_USER`              | Postgres user                    | `postgres`          |
    /// | `PG_PASSWORD`          | Postgres password                | empty               |
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let mut builder = Config::builder();

        let backend = std::env::var("KVLOG_BACKEND").unwrap_or_else(|_| "file".to_string());
        match backend.to_ascii_lowercase().as_str() {
            "file" => {
                if let Ok(path) = std::env::var("KVLOG_LOG_FILE") {
                    builder = builder.file_backend(path);
                }
            }
            "postgres" | "postgresql" => {
                builder = builder.postgres_backend(PostgresParams::from_env()?);
            }
            other => {
                return Err(KvError::Config(format!(
                    "KVLOG_BACKEND must be 'file' or 'postgres', got '{}'",
                    other
                )));
            }
        }

        let config = builder
            .listen_addr(std::env::var("KVLOG_LISTEN").unwrap_or(defaults.listen_addr))
            .queue_capacity(parse_var("KVLOG_QUEUE_CAPACITY")?.unwrap_or(defaults.queue_capacity))
            .build();

        tracing::debug!(?config, "Config loaded from environment");
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| KvError::Config(format!("{} has an invalid value: '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Use an append-only file at `path` as the durable medium
    pub fn file_backend(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend = BackendConfig::File { path: path.into() };
        self
    }

    /// Use a Postgres table as the durable medium
    pub fn postgres_backend(mut self, params: PostgresParams) -> Self {
        self.config.backend = BackendConfig::Postgres(params);
        self
    }

    /// Set the persistence queue capacity (clamped to at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity.max(1);
        self
    }

    /// Set the persistence error buffer capacity (clamped to at least 1)
    pub fn error_capacity(mut self, capacity: usize) -> Self {
        self.config.error_capacity = capacity.max(1);
        self
    }

    /// Set the HTTP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
