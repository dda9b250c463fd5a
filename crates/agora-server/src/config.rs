//! Configuration for the server binary.
//!
//! All configuration is loaded from environment variables. The server
//! needs to know where to bind and which storage backend to run over.

use crate::error::ConfigError;

/// Which storage backend to run the server over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// `PostgreSQL` via `DATABASE_URL`. The default.
    Postgres,
    /// The in-memory store. State is lost on restart; useful for demos
    /// and local frontend development without a database.
    Memory,
}

/// Complete server configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct AgoraConfig {
    /// Host address to bind (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Storage backend selection.
    pub backend: StoreBackend,
    /// `PostgreSQL` connection URL; required for the postgres backend.
    pub database_url: Option<String>,
}

impl AgoraConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `AGORA_HOST` -- bind address (default `0.0.0.0`)
    /// - `AGORA_PORT` -- TCP port (default `8080`)
    /// - `AGORA_STORE` -- `postgres` (default) or `memory`
    /// - `DATABASE_URL` -- `PostgreSQL` URL, required when the backend is
    ///   `postgres`
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("AGORA_HOST").unwrap_or_else(|_| String::from("0.0.0.0"));

        let port: u16 = std::env::var("AGORA_PORT")
            .unwrap_or_else(|_| String::from("8080"))
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid AGORA_PORT: {e}")))?;

        let backend = match std::env::var("AGORA_STORE")
            .unwrap_or_else(|_| String::from("postgres"))
            .as_str()
        {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "invalid AGORA_STORE {other:?}: expected \"postgres\" or \"memory\""
                )));
            }
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            host,
            port,
            backend,
            database_url,
        })
    }
}
