//! Configuration types for the sqlite-rest service

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration for the REST service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listener configuration
    pub http: HttpConfig,
    /// Database connection configuration
    pub database: DatabaseConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Table access control configuration
    pub security: SecurityConfig,
    /// Logging configuration
    pub log: LogConfig,
}

impl ServerConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.database.dsn.is_empty() {
            return Err(Error::Config("database dsn is required".to_string()));
        }
        self.auth.validate()
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to (default: 8080)
    pub port: u16,
    /// Number of HTTP workers
    pub workers: usize,
    /// CORS allowed origins
    pub cors_origins: Vec<String>,
    /// Listen on this Unix domain socket instead of host/port
    pub socket_path: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: 4,
            cors_origins: vec!["*".to_string()],
            socket_path: None,
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite data source name, e.g. `sqlite://data.db` or `sqlite::memory:`
    pub dsn: String,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            max_connections: 5,
        }
    }
}

/// JWT authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Path to a PEM encoded RSA public key (RS256/RS384/RS512)
    pub rsa_public_key_file: Option<PathBuf>,
    /// Path to a shared secret file (HS256/HS384/HS512)
    pub token_file: Option<PathBuf>,
    /// Skip authentication entirely
    pub disabled: bool,
}

impl AuthConfig {
    /// Exactly one key source is required unless auth is disabled
    pub fn validate(&self) -> Result<()> {
        if self.disabled {
            return Ok(());
        }

        match (&self.rsa_public_key_file, &self.token_file) {
            (None, None) => Err(Error::Config(
                "specifies at least --auth-rsa-public-key or --auth-token-file".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::Config(
                "cannot specify --auth-rsa-public-key and --auth-token-file at the same time"
                    .to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Table access control configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Table or view names that are accessible (read & write)
    pub allowed_tables: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON formatted logs
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
