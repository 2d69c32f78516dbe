//! sqlite-rest
//!
//! Serves SQLite tables over a PostgREST-compatible HTTP API.
//!
//! # Features
//!
//! - **PostgREST request grammar** - filters, ordering, pagination and upserts
//! - **Parameterized SQL** - request values are always bound, never spliced
//! - **Table allow-list** - only configured tables and views are reachable
//! - **JWT authentication** - RSA public key or shared secret, reloaded on change

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub use sqlite_rest_common as common;
pub use sqlite_rest_query as query;
pub use sqlite_rest_server as server;

use std::sync::Arc;
use tracing::info;

use sqlite_rest_common::config::ServerConfig;
use sqlite_rest_common::error::Result;
use sqlite_rest_server::{RestServer, SqliteBackend};

/// Database connection plus the HTTP service in front of it
pub struct SqliteRestServer {
    config: ServerConfig,
    backend: Arc<SqliteBackend>,
    rest_server: RestServer,
}

impl SqliteRestServer {
    /// Connect to the configured database and prepare the HTTP service
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let backend = Arc::new(SqliteBackend::connect(&config.database).await?);
        let rest_server = RestServer::new(&config, backend.clone())?;

        Ok(Self {
            config,
            backend,
            rest_server,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn rest(&self) -> &RestServer {
        &self.rest_server
    }

    /// Serve requests until the HTTP server stops
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound.
    pub async fn run(&self) -> Result<()> {
        match &self.config.http.socket_path {
            Some(path) => info!("sqlite-rest listening on unix:{}", path.display()),
            None => info!(
                "sqlite-rest listening on http://{}:{}",
                self.config.http.host, self.config.http.port
            ),
        }
        self.rest_server.run().await
    }

    /// Close the database pool
    pub async fn shutdown(&self) {
        info!("shutting down sqlite-rest");
        self.backend.pool().close().await;
    }
}
