use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boxdrop_core::database::PostgresDatabase;
use boxdrop_server::{
    AppState,
    infra::{app_state::Repositories, config::Config},
    routes::create_app,
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "boxdrop-server")]
#[command(about = "Records box deliveries and sends their receipts to stores")]
struct Cli {
    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Keep records in process memory instead of PostgreSQL
    #[arg(long, env = "BOXDROP_MEMORY", default_value_t = false)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.ensure_directories()?;
    config.normalize_paths()?;
    info!(artifacts = %config.artifact_dir.display(), "artifact directory ready");

    let repositories = if cli.memory {
        info!("using in-memory store; records are lost on exit");
        Repositories::in_memory()
    } else {
        let url = config.require_database_url()?;
        let db = PostgresDatabase::new(url)
            .await
            .context("failed to connect to PostgreSQL")?;
        db.initialize_schema()
            .await
            .context("failed to apply migrations")?;
        let stats = db.pool_stats();
        info!(
            size = stats.size,
            idle = stats.idle,
            max = stats.max_size,
            "database pool ready"
        );
        Repositories::postgres(&db)
    };

    let config = Arc::new(config);
    let state = AppState::from_config(Arc::clone(&config), repositories).await?;
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server_host, config.server_port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
