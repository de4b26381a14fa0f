use anyhow::{Context, Result};
use ecal_display::args::Args;
use ecal_display::{
    calendar_sync, router, DisplayConfig, DisplayController, ReceiverState, ServiceMode,
};
use ecal_image::{compensate, decode_with_orientation, ExifCompensation, FitOptions, FitPolicy};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

fn init_logging(level: u8) {
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
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Paint a local file, compensating EXIF orientation for the offset mount.
async fn show_file(controller: &DisplayController, path: &Path, options: FitOptions) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let image = tokio::task::spawn_blocking(move || {
        decode_with_orientation(&bytes).map(|o| compensate(o, ExifCompensation::MountOffset))
    })
    .await?
    .with_context(|| format!("Failed to decode {}", path.display()))?;

    let placement = controller.present(image, options).await?;
    info!(
        "Displayed {} (rotate {}, scale {:.4})",
        path.display(),
        placement.rotation,
        placement.scale
    );
    Ok(())
}

async fn run_receiver(config: &DisplayConfig, controller: DisplayController) -> Result<()> {
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Image receiver listening on {}", addr);

    let state = Arc::new(ReceiverState::new(controller, config.fit.clone()));
    axum::serve(listener, router(state, config.http.max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn run_calendar_sync(config: &DisplayConfig, controller: DisplayController) -> Result<()> {
    let stats = calendar_sync::run(
        &config.calendar_sync,
        controller,
        config.fit.options(),
        shutdown_signal(),
    )
    .await?;
    info!(
        "{} ticks, {} displayed, {} skipped, {} failed",
        stats.ticks,
        stats.published,
        stats.skipped,
        stats.fetch_failures + stats.publish_failures
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = DisplayConfig::from_args(&args).context("Invalid configuration")?;
    let controller = DisplayController::new(config.panel.build());

    if let Some(path) = &args.show {
        let options = FitOptions {
            policy: FitPolicy::from_zoom_to_fit(args.zoom_to_fit),
            ..config.fit.options()
        };
        return show_file(&controller, path, options).await;
    }

    info!(
        "Starting ecal-display {} in {} mode on a {} panel",
        env!("CARGO_PKG_VERSION"),
        config.mode,
        controller.size()
    );

    let result = match config.mode {
        ServiceMode::ImageReceiver => run_receiver(&config, controller).await,
        ServiceMode::CalendarSync => run_calendar_sync(&config, controller).await,
    };
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
