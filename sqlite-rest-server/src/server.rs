//! REST API server implementation

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tracing::{info, warn};

use sqlite_rest_common::config::ServerConfig;
use sqlite_rest_common::error::Result;

use crate::auth::Authenticator;
use crate::backend::QueryBackend;
use crate::handlers::{self, RestState};
use crate::security::TableAccess;

/// Register the health check and table routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_handler))
        .route("/{table}", web::get().to(handlers::select_handler))
        .route("/{table}", web::post().to(handlers::insert_handler))
        .route("/{table}", web::patch().to(handlers::update_handler))
        .route("/{table}", web::put().to(handlers::update_single_entry_handler))
        .route("/{table}", web::delete().to(handlers::delete_handler));
}

/// PostgREST-compatible REST API server over SQLite
pub struct RestServer {
    config: ServerConfig,
    state: Arc<RestState>,
}

impl RestServer {
    /// Create a new REST server
    pub fn new(config: &ServerConfig, backend: Arc<dyn QueryBackend>) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(RestState::new(
            backend,
            Authenticator::from_config(&config.auth)?,
            TableAccess::from_config(&config.security),
        ));

        if config.security.allowed_tables.is_empty() {
            warn!("no tables are allowed; every table request will be refused");
        }

        Ok(Self {
            config: config.clone(),
            state,
        })
    }

    #[must_use]
    pub fn state(&self) -> Arc<RestState> {
        self.state.clone()
    }

    fn build_cors(origins: &[String]) -> Cors {
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            return Cors::permissive();
        }

        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PATCH", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::RANGE,
                actix_web::http::header::HeaderName::from_static("prefer"),
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_RANGE,
                actix_web::http::header::HeaderName::from_static("range-unit"),
            ])
            .max_age(3600);

        for origin in origins {
            cors = cors.allowed_origin(origin);
        }

        cors
    }

    /// Run the REST server until it is stopped
    pub async fn run(&self) -> Result<()> {
        let state = self.state.clone();
        let cors_origins = self.config.http.cors_origins.clone();
        let host = self.config.http.host.clone();
        let port = self.config.http.port;

        info!(
            host = %host,
            port,
            socket_path = ?self.config.http.socket_path,
            allowed_tables = ?self.config.security.allowed_tables,
            auth_disabled = self.state.authenticator.is_disabled(),
            "starting REST API server"
        );

        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(Self::build_cors(&cors_origins))
                .wrap(middleware::Compress::default())
                .wrap(middleware::Logger::default())
                .configure(configure_routes)
        })
        .workers(self.config.http.workers.max(1));

        let server = match &self.config.http.socket_path {
            #[cfg(unix)]
            Some(path) => server.bind_uds(path)?,
            #[cfg(not(unix))]
            Some(_) => {
                return Err(sqlite_rest_common::error::Error::Config(
                    "unix domain sockets are not supported on this platform".to_string(),
                ))
            }
            None => server.bind((host.as_str(), port))?,
        };

        server.run().await?;

        Ok(())
    }
}
