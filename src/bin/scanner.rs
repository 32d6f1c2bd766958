//! Bandscan Scanner
//!
//! Scans the venue on the configured cadence and trades every confirmed
//! band re-entry until Ctrl-C.

use bandscan::config::Config;
use bandscan::core::LiveScanner;
use bandscan::logging;
use bandscan::metrics::Metrics;
use bandscan::models::signal::LiveOutcome;
use bandscan::services::{FeedMode, PaperVenue, VenueClient};
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let env = bandscan::config::get_environment();
    info!("Starting Bandscan Scanner");
    info!(environment = %env, "Environment");

    let config = Config::from_env()?;
    info!(cadence = ?config.live.cadence, "Scan cadence: {:?}", config.live.cadence);
    if let Some(symbols) = &config.symbols {
        info!(symbols = ?symbols, "Symbols: {}", symbols.join(", "));
    }

    let data_dir = env::var("PAPER_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let warmup = config.strategy.window + config.strategy.lookback;
    let venue = PaperVenue::from_csv_dir(
        &data_dir,
        FeedMode::Replay { warmup },
        config.feed.interval_seconds,
    )
    .map_err(|e| format!("Failed to load {}: {}", data_dir, e))?;
    let venue: Arc<dyn VenueClient> = Arc::new(venue);

    let metrics = Arc::new(Metrics::new()?);
    let (stop_tx, stop_rx) = watch::channel(false);
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<LiveOutcome>();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutting down scanner...");
        }
        let _ = stop_tx.send(true);
    });

    let reporter = tokio::spawn(async move {
        let mut settled = 0u64;
        while let Some(outcome) = outcome_rx.recv().await {
            settled += 1;
            info!(
                instrument = %outcome.instrument,
                direction = %outcome.direction,
                result = %outcome.result,
                amount = outcome.amount,
                "Trade #{}: {} {} -> {}",
                settled,
                outcome.instrument,
                outcome.direction,
                outcome.result
            );
        }
    });

    let summary = LiveScanner::new(venue, config)
        .with_metrics(metrics.clone())
        .with_outcome_sink(outcome_tx)
        .run(stop_rx)
        .await?;

    if let Err(e) = reporter.await {
        warn!(error = %e, "Outcome reporter failed");
    }
    match metrics.export() {
        Ok(text) => debug!(metrics = %text, "Final metrics"),
        Err(e) => warn!(error = %e, "Failed to export metrics"),
    }
    info!(summary = %serde_json::to_string(&summary)?, "Scanner stopped");

    Ok(())
}
