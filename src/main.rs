use std::env;
use std::sync::Arc;

use clap::Parser;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::sync::broadcast;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fleetdeck_server::ansible::{AnsibleCli, ExecutionRunner};
use fleetdeck_server::db;
use fleetdeck_server::playbooks::PlaybookStore;
use fleetdeck_server::server::config::ServerConfig;
use fleetdeck_server::server::event_broadcaster::EventBroadcaster;
use fleetdeck_server::web::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` with noisy query logging damped if RUST_LOG is unset.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&server_config.log_dir);
    info!("Starting FleetDeck server");

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env file");
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(10);
    let db_pool: DatabaseConnection = Database::connect(opt)
        .await
        .expect("Failed to create database connection.");
    db::init_schema(&db_pool).await?;

    let (events_tx, _) = broadcast::channel(100);
    let events = Arc::new(EventBroadcaster::new(events_tx));

    let playbooks = Arc::new(PlaybookStore::new(server_config.playbook_dir.clone()));
    playbooks.ensure_root().await?;

    let engine = Arc::new(AnsibleCli::new(
        server_config.ansible_playbook_bin.clone(),
        server_config.ansible_bin.clone(),
    ));
    let runner = ExecutionRunner::new(
        db_pool.clone(),
        engine,
        playbooks.clone(),
        events.clone(),
    );

    let state = Arc::new(AppState {
        db: db_pool,
        config: server_config.clone(),
        playbooks,
        runner,
        events,
    });
    let app = web::create_router(state);

    let listener = tokio::net::TcpListener::bind(&server_config.listen_addr).await?;
    info!("HTTP server listening on {}", server_config.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received, stopping server.");
}
