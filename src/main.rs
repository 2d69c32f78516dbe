//! sqlite-rest server binary

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sqlite_rest::SqliteRestServer;
use sqlite_rest_common::config::{LogConfig, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "sqlite-rest")]
#[command(about = "Serve a SQLite database over a PostgREST-compatible REST API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the REST server
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database data source name, e.g. sqlite://data.db
    #[arg(long, env = "SQLITEREST_DB_DSN")]
    db_dsn: Option<String>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Listen on a Unix domain socket instead of host/port
    #[arg(long)]
    socket_path: Option<PathBuf>,

    /// Table or view to expose; repeat for several
    #[arg(long = "security-allow-table")]
    allow_tables: Vec<String>,

    /// Path to the RSA public key file
    #[arg(long = "auth-rsa-public-key", conflicts_with = "auth_token_file")]
    auth_rsa_public_key: Option<PathBuf>,

    /// Path to the token file
    #[arg(long)]
    auth_token_file: Option<PathBuf>,

    /// Serve without authentication
    #[arg(long)]
    auth_disabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit JSON formatted logs
    #[arg(long)]
    log_json: bool,
}

impl ServeArgs {
    /// Command line flags take precedence over the configuration file
    fn apply(self, config: &mut ServerConfig) {
        if let Some(dsn) = self.db_dsn {
            config.database.dsn = dsn;
        }
        if let Some(host) = self.host {
            config.http.host = host;
        }
        if let Some(port) = self.port {
            config.http.port = port;
        }
        if self.socket_path.is_some() {
            config.http.socket_path = self.socket_path;
        }
        if !self.allow_tables.is_empty() {
            config.security.allowed_tables = self.allow_tables;
        }
        if self.auth_rsa_public_key.is_some() || self.auth_token_file.is_some() {
            config.auth.rsa_public_key_file = self.auth_rsa_public_key;
            config.auth.token_file = self.auth_token_file;
        }
        if self.auth_disabled {
            config.auth.disabled = true;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if self.log_json {
            config.log.json = true;
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        }
        None => Ok(ServerConfig::default()),
    }
}

fn init_logging(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Command::Serve(args) = Cli::parse().command;

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    init_logging(&config.log);

    info!("sqlite-rest v{}", env!("CARGO_PKG_VERSION"));

    let server = SqliteRestServer::new(config).await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("received shutdown signal");
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                tracing::error!("server error: {}", e);
            }
        }
        () = shutdown => {}
    }

    server.shutdown().await;
    Ok(())
}
