use anyhow::{Context, Result};
use ecal_server::args::Args;
use ecal_server::{router, AppState, LogBuffer, ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};

fn init_logging(level: u8, buffer: &LogBuffer) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = match level {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(buffer.layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServerConfig::from_args(&args).context("Invalid configuration")?;

    let logs = LogBuffer::new(config.logs.capacity);
    init_logging(args.verbose, &logs);

    let state =
        Arc::new(AppState::from_config(&config, logs).context("Failed to initialise state")?);
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "ecal-server {} listening on {} (events: {}, page: {})",
        env!("CARGO_PKG_VERSION"),
        addr,
        config.calendar.events_path.display(),
        config.render.page_url
    );

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.shutdown().await.context("Failed to stop sync service")?;
    Ok(())
}
