//! End-to-end backtests over recorded CSV series

use crate::common_series::{at, oscillating, series_with_buy};
use crate::test_utils::{MockInstrument, MockVenue};
use bandscan::backtest::run_backtest;
use bandscan::config::Config;
use bandscan::error::ScanError;
use bandscan::export::write_records_csv;
use bandscan::models::indicators::Candle;
use bandscan::models::signal::{Direction, TradeResult};
use bandscan::services::{FeedMode, PaperVenue, VenueError};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::Ordering;
use tokio_test::{assert_err, assert_ok};

fn write_series(dir: &Path, id: &str, candles: &[Candle]) {
    let mut file = std::fs::File::create(dir.join(format!("{id}.csv"))).unwrap();
    writeln!(file, "timestamp,open,high,low,close,ticks").unwrap();
    for c in candles {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            c.timestamp.timestamp(),
            c.open,
            c.high,
            c.low,
            c.close,
            c.tick_volume
        )
        .unwrap();
    }
}

fn recorded_venue() -> (tempfile::TempDir, PaperVenue) {
    let dir = tempfile::tempdir().unwrap();
    write_series(dir.path(), "EURUSD_otc", &series_with_buy(28, 23, 1.0005));
    write_series(dir.path(), "GBPUSD_otc", &oscillating(12));
    write_series(dir.path(), "USDBRL_otc", &series_with_buy(28, 23, 1.0005));
    write_series(dir.path(), "AUDCAD", &series_with_buy(28, 23, 1.0005));
    let venue = PaperVenue::from_csv_dir(dir.path(), FeedMode::Snapshot, 60).unwrap();
    (dir, venue)
}

#[tokio::test]
async fn backtest_labels_tradable_instruments_only() {
    let (_dir, venue) = recorded_venue();
    let report = assert_ok!(run_backtest(&venue, &Config::default(), at(100)).await);

    assert_eq!(report.instruments_run, 1);
    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.instrument, "EURUSD_otc");
    assert_eq!(record.direction, Direction::Buy);
    assert_eq!(record.result, TradeResult::Win);
    assert_eq!(report.win_rate(), Some(1.0));

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].instrument, "GBPUSD_otc");
    assert!(report.skipped[0].reason.contains("insufficient data"));
}

#[tokio::test]
async fn snapshot_hides_candles_after_as_of() {
    let (_dir, venue) = recorded_venue();
    let report = run_backtest(&venue, &Config::default(), at(26)).await.unwrap();
    assert!(report.records.is_empty());
    assert_eq!(report.instruments_run, 0);
    let eurusd = report.skipped.iter().find(|s| s.instrument == "EURUSD_otc").unwrap();
    assert!(eurusd.reason.contains("no evaluable positions: need 28 candles, got 27"));
}

#[tokio::test]
async fn closed_instrument_is_not_backtested() {
    let (_dir, venue) = recorded_venue();
    venue.set_open("EURUSD_otc", false).await;
    let report = run_backtest(&venue, &Config::default(), at(100)).await.unwrap();
    assert_eq!(report.instruments_run, 0);
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn report_round_trips_through_csv() {
    let (dir, venue) = recorded_venue();
    let report = run_backtest(&venue, &Config::default(), at(100)).await.unwrap();

    let path = dir.path().join("final_backtest_results.csv");
    write_records_csv(&path, &report.records).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("2024-01-01 00:23:00,EURUSD_otc,Buy,0.99495,150,"));
    assert!(lines[1].ends_with(",win"));
}

#[tokio::test]
async fn explicit_symbols_restrict_the_universe() {
    let (_dir, venue) = recorded_venue();
    let config = Config {
        symbols: Some(vec!["GBPUSD_otc".to_string(), "NZDUSD_otc".to_string()]),
        ..Config::default()
    };
    let report = run_backtest(&venue, &config, at(100)).await.unwrap();
    assert!(report.records.is_empty());
    assert_eq!(report.instruments_run, 0);
    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.instrument.as_str()).collect();
    assert_eq!(skipped, vec!["NZDUSD_otc", "GBPUSD_otc"]);
}

#[tokio::test]
async fn failed_status_lookup_is_reported_as_skipped() {
    let venue = MockVenue::new(vec![
        MockInstrument::new("EURUSD_otc", series_with_buy(28, 23, 1.0005)),
        MockInstrument::new("GBPUSD_otc", series_with_buy(28, 23, 1.0005)).status_failing(),
    ]);

    let report = assert_ok!(run_backtest(&venue, &Config::default(), at(100)).await);
    assert_eq!(report.instruments_run, 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].instrument, "GBPUSD_otc");
    assert!(report.skipped[0].reason.starts_with("venue error:"));
    assert_eq!(venue.fetch_count("GBPUSD_otc"), 0);
}

#[tokio::test]
async fn series_without_evaluable_positions_is_skipped() {
    let venue = MockVenue::new(vec![
        MockInstrument::new("EURUSD_otc", series_with_buy(28, 23, 1.0005)),
        MockInstrument::new("AUDCAD_otc", oscillating(24)),
    ]);

    let report = run_backtest(&venue, &Config::default(), at(100)).await.unwrap();
    assert_eq!(report.instruments_run, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].instrument, "AUDCAD_otc");
    assert_eq!(
        report.skipped[0].reason,
        "no evaluable positions: need 28 candles, got 24"
    );
}

#[tokio::test]
async fn refused_connection_aborts_backtest() {
    let venue = MockVenue::new(vec![MockInstrument::new(
        "EURUSD_otc",
        series_with_buy(28, 23, 1.0005),
    )])
    .with_connect_error(VenueError::Connection("refused".to_string()));

    let err = assert_err!(run_backtest(&venue, &Config::default(), at(100)).await);
    assert!(matches!(err, ScanError::Collaborator(VenueError::Connection(_))));
    assert_eq!(venue.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unavailable_venue_is_retried() {
    let venue = MockVenue::new(vec![MockInstrument::new(
        "EURUSD_otc",
        series_with_buy(28, 23, 1.0005),
    )])
    .unavailable_for(2);

    let report = run_backtest(&venue, &Config::default(), at(100)).await.unwrap();
    assert_eq!(venue.connects.load(Ordering::SeqCst), 3);
    assert_eq!(report.records.len(), 1);
    assert_eq!(venue.disconnects.load(Ordering::SeqCst), 1);
}
