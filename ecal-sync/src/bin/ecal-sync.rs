use anyhow::{bail, Context, Result};
use ecal_sync::args::Args;
use ecal_sync::{
    CalendarClient, HttpHashSource, HttpStatusSink, ImageRelay, NullStatus, StatusSink,
    SyncConfig, SyncLoop, TickOutcome, Uploader,
};
use tracing::{error, info};

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

async fn run<S: StatusSink + 'static>(
    config: &SyncConfig,
    client: CalendarClient,
    relay: ImageRelay,
    status: S,
    once: bool,
) -> Result<()> {
    let builder = SyncLoop::builder(HttpHashSource::new(client), relay)
        .status(status)
        .interval(config.interval())
        .policy(config.schedule.mode.tick_policy());

    if once {
        let mut sync_loop = builder.build();
        return match sync_loop.tick().await {
            TickOutcome::Published { hash } => {
                info!("Published {}", hash);
                Ok(())
            }
            TickOutcome::Skipped => Ok(()),
            TickOutcome::FetchFailed { error } | TickOutcome::PublishFailed { error } => {
                bail!("Sync failed: {}", error)
            }
        };
    }

    let task = builder.spawn();
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");
    let stats = task.shutdown().await?;
    info!(
        "{} ticks, {} published, {} skipped, {} failed",
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

    let config = SyncConfig::from_args(&args).context("Invalid configuration")?;
    info!(
        "Starting ecal-sync {} in {} mode (every {:?}): {} -> {}",
        env!("CARGO_PKG_VERSION"),
        config.schedule.mode,
        config.interval(),
        config.server.url,
        config.upload.endpoint
    );

    let client = CalendarClient::from_config(&config).context("Failed to create HTTP client")?;
    let uploader = Uploader::new(config.upload.clone()).context("Failed to create uploader")?;
    let relay = ImageRelay::new(client.clone(), uploader);

    let result = if config.server.report_status {
        let status = HttpStatusSink::new(client.clone());
        run(&config, client, relay, status, args.once).await
    } else {
        run(&config, client, relay, NullStatus, args.once).await
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
