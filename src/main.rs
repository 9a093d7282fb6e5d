//! Postbox -- message CRUD API backed by DynamoDB and S3.
//!
//! Startup is idempotent: the table and bucket are provisioned with
//! create-if-absent semantics on every boot. Provisioning failure does not
//! abort the process; the instance reports not-ready at `/readyz` until
//! both containers exist.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

/// Command-line arguments for the Postbox server.
#[derive(Parser, Debug)]
#[command(
    name = "postbox",
    version,
    about = "Message CRUD API backed by DynamoDB and S3"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "postbox.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = postbox::config::load_config(&cli.config)?;

    // Initialize tracing / logging. RUST_LOG wins over the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Loaded configuration from {}", cli.config);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Initialize Prometheus metrics recorder and register metric descriptions.
    postbox::metrics::init_metrics();
    postbox::metrics::describe_metrics();
    info!("Prometheus metrics initialized");

    // Construct the two store clients once; handlers receive them through
    // AppState rather than process-wide globals.
    let kv_store =
        postbox::kv::dynamodb::DynamoDbMessageStore::new(&config.aws, &config.storage.table)
            .await?;
    let kv: Arc<dyn postbox::kv::store::KeyValueStore> = Arc::new(kv_store);

    let object_store =
        postbox::objects::s3::S3ObjectStore::new(&config.aws, &config.storage.bucket).await?;
    let objects: Arc<dyn postbox::objects::store::ObjectStore> = Arc::new(object_store);

    let state = Arc::new(postbox::AppState::new(config, kv, objects));

    // Provision both containers. Failure is logged, not fatal: the process
    // starts and /readyz reports 503 until a restart provisions cleanly.
    match provision(&state).await {
        Ok(()) => {
            state.set_ready(true);
            info!("Provisioning complete, instance ready");
        }
        Err(e) => {
            error!("Provisioning failed, instance will report not-ready: {e}");
        }
    }

    let app = postbox::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Postbox listening on {}", bind_addr);

    // Graceful shutdown: on SIGTERM/SIGINT, stop accepting new connections
    // and wait for in-flight requests to complete.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Postbox shut down");

    Ok(())
}

/// Ensure the table and bucket exist (create-if-absent on both stores).
async fn provision(state: &postbox::AppState) -> anyhow::Result<()> {
    state.kv.provision().await?;
    state.objects.provision().await?;
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
