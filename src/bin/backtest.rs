//! Bandscan Backtest
//!
//! Replays the entry rule over recorded candles and writes the labeled
//! signals to CSV.

use bandscan::backtest::run_backtest;
use bandscan::config::Config;
use bandscan::export::write_records_csv;
use bandscan::logging;
use bandscan::services::{FeedMode, PaperVenue};
use chrono::Utc;
use dotenvy::dotenv;
use std::env;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let env = bandscan::config::get_environment();
    info!("Starting Bandscan Backtest");
    info!(environment = %env, "Environment");

    let config = Config::from_env()?;
    let data_dir = env::var("PAPER_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let output = env::var("BACKTEST_OUTPUT")
        .unwrap_or_else(|_| "final_backtest_results.csv".to_string());

    info!(data_dir = %data_dir, "Loading recorded candles from {}", data_dir);
    let venue = PaperVenue::from_csv_dir(&data_dir, FeedMode::Snapshot, config.feed.interval_seconds)
        .map_err(|e| format!("Failed to load {}: {}", data_dir, e))?;

    let report = run_backtest(&venue, &config, Utc::now()).await?;

    for skipped in &report.skipped {
        warn!(instrument = %skipped.instrument, reason = %skipped.reason, "Skipped {}", skipped.instrument);
    }

    write_records_csv(&output, &report.records)?;

    match report.win_rate() {
        Some(rate) => info!(
            records = report.records.len(),
            wins = report.wins(),
            losses = report.losses(),
            win_rate = rate,
            "Wrote {} records to {} (win rate {:.1}%)",
            report.records.len(),
            output,
            rate * 100.0
        ),
        None => info!(output = %output, "No signals found, wrote empty {}", output),
    }

    Ok(())
}
