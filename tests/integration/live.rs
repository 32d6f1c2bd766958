//! Live scanner behaviour against a scripted venue

use crate::common_series::{buy_trigger, flat, oscillating};
use crate::test_utils::{MockInstrument, MockVenue};
use bandscan::config::Config;
use bandscan::core::scheduler::ScanCadence;
use bandscan::core::{run_live, LiveScanner};
use bandscan::error::ScanError;
use bandscan::indicators::volatility::BandTracker;
use bandscan::metrics::Metrics;
use bandscan::models::indicators::Candle;
use bandscan::models::signal::{Direction, TradeResult};
use bandscan::services::{FeedMode, PaperVenue, VenueClient, VenueError};
use bandscan::signals::{OutcomeEvaluator, SignalDetector};
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

fn live_config() -> Config {
    let mut config = Config::default();
    config.live.cadence = ScanCadence::Continuous {
        min_delay: Duration::from_secs(5),
    };
    config.live.failure_backoff = Duration::from_secs(5);
    config
}

/// Window whose newest candle re-enters through the lower band.
fn live_series() -> Vec<Candle> {
    let mut candles = oscillating(23);
    candles.push(buy_trigger(23));
    candles
}

#[tokio::test(start_paused = true)]
async fn failing_instrument_does_not_block_others() {
    let venue = Arc::new(
        MockVenue::new(vec![
            MockInstrument::new("GBPUSD_otc", live_series()).failing(),
            MockInstrument::new("EURUSD_otc", live_series()),
        ])
        .settling_after(Duration::from_secs(30), true),
    );
    let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
    let (stop_tx, stop_rx) = watch::channel(false);
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

    let scanner = LiveScanner::new(venue.clone(), live_config())
        .with_metrics(metrics.clone())
        .with_outcome_sink(outcome_tx);
    let handle = tokio::spawn(scanner.run(stop_rx));

    for _ in 0..2 {
        let outcome = outcome_rx.recv().await.unwrap();
        assert_eq!(outcome.instrument, "EURUSD_otc");
        assert_eq!(outcome.direction, Direction::Buy);
        assert_eq!(outcome.result, TradeResult::Win);
        assert_eq!(outcome.amount, 55.0);
    }
    stop_tx.send(true).unwrap();
    let summary = handle.await.unwrap().unwrap();

    assert!(summary.trades >= 2);
    assert_eq!(summary.trades, summary.wins);
    assert!(summary.failures >= 1);
    assert!(venue.fetch_count("GBPUSD_otc") >= 2);
    assert!(venue.trades().iter().all(|t| t.instrument == "EURUSD_otc"));
    assert_eq!(venue.disconnects.load(Ordering::SeqCst), 1);

    assert!(metrics.trades_total.with_label_values(&["win"]).get() >= 2);
    assert!(metrics.scan_failures_total.with_label_values(&["collaborator"]).get() >= 1);
    assert_eq!(metrics.venue_connected.get(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_pending_settlement() {
    let venue = Arc::new(
        MockVenue::new(vec![MockInstrument::new("EURUSD_otc", live_series())])
            .settling_after(Duration::from_secs(60), false),
    );
    let (stop_tx, stop_rx) = watch::channel(false);
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

    let scanner = LiveScanner::new(venue.clone(), live_config()).with_outcome_sink(outcome_tx);
    let handle = tokio::spawn(scanner.run(stop_rx));

    venue.placed.notified().await;
    stop_tx.send(true).unwrap();
    let summary = handle.await.unwrap().unwrap();

    assert_eq!(summary.trades, 1);
    assert_eq!(summary.losses, 1);
    let outcome = outcome_rx.recv().await.unwrap();
    assert_eq!(outcome.result, TradeResult::Loss);
    assert!(outcome_rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn scans_of_one_instrument_never_overlap() {
    let venue = Arc::new(
        MockVenue::new(vec![
            MockInstrument::new("EURUSD_otc", oscillating(30)),
            MockInstrument::new("GBPUSD_otc", oscillating(30)),
        ])
        .fetching_for(Duration::from_secs(12)),
    );
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(LiveScanner::new(venue.clone(), live_config()).run(stop_rx));

    tokio::time::sleep(Duration::from_secs(120)).await;
    stop_tx.send(true).unwrap();
    let summary = handle.await.unwrap().unwrap();

    assert!(summary.cycles > 10);
    assert!(venue.fetch_count("EURUSD_otc") >= 4);
    assert_eq!(venue.max_overlap("EURUSD_otc"), 1);
    assert_eq!(venue.max_overlap("GBPUSD_otc"), 1);
    assert_eq!(summary.trades, 0);
}

#[tokio::test(start_paused = true)]
async fn untradable_instruments_are_never_traded() {
    let venue = Arc::new(MockVenue::new(vec![
        MockInstrument::new("EURUSD_otc", live_series()).closed(),
        MockInstrument::new("USDBRL_otc", live_series()),
        MockInstrument::new("AUDCAD_otc", live_series()),
    ]));
    let config = Config {
        symbols: Some(vec!["EURUSD_otc".to_string(), "USDBRL_otc".to_string()]),
        ..live_config()
    };
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(LiveScanner::new(venue.clone(), config).run(stop_rx));

    tokio::time::sleep(Duration::from_secs(30)).await;
    stop_tx.send(true).unwrap();
    let summary = handle.await.unwrap().unwrap();

    assert!(summary.cycles >= 3);
    assert_eq!(summary.trades, 0);
    assert!(venue.trades().is_empty());
    assert_eq!(venue.fetch_count("EURUSD_otc"), 0);
    assert_eq!(venue.fetch_count("USDBRL_otc"), 0);
    assert_eq!(venue.fetch_count("AUDCAD_otc"), 0);
}

#[tokio::test]
async fn refused_connection_is_fatal() {
    let venue = Arc::new(
        MockVenue::new(vec![MockInstrument::new("EURUSD_otc", live_series())])
            .with_connect_error(VenueError::Connection("refused".to_string())),
    );
    let (_stop_tx, stop_rx) = watch::channel(false);

    let err = run_live(venue.clone(), live_config(), stop_rx).await.unwrap_err();
    assert!(matches!(err, ScanError::Collaborator(VenueError::Connection(_))));
    assert!(venue.trades().is_empty());
}

#[tokio::test]
async fn paper_trade_settles_against_recorded_future() {
    let mut candles = live_series();
    candles.extend(
        [1.0005, 1.0010, 1.0015, 1.0020]
            .iter()
            .enumerate()
            .map(|(i, close)| flat(24 + i, *close)),
    );
    let venue = PaperVenue::new(FeedMode::Replay { warmup: 24 }, 60)
        .with_instrument("EURUSD_otc", candles);
    venue.connect().await.unwrap();

    let fetched = venue
        .fetch_candles("EURUSD_otc", Utc::now(), 3600, 60)
        .await
        .unwrap();
    assert_eq!(fetched.len(), 24);

    let mut tracker = BandTracker::new(20, 2.0, 4);
    let view = tracker.update(&fetched).unwrap();
    let signal = SignalDetector::default()
        .detect(&view, view.len() - 1, "EURUSD_otc")
        .expect("buy signal on the newest candle");

    let outcome = OutcomeEvaluator::default()
        .evaluate_live(&venue, &signal, 55.0, 120)
        .await
        .unwrap();
    assert_eq!(outcome.result, TradeResult::Win);
    assert_eq!(outcome.duration_seconds, 120);
    let balance = venue.account_balance().await.unwrap();
    assert!((balance - (10_000.0 - 55.0 + 55.0 * 1.85)).abs() < 1e-9);

    venue.set_open("EURUSD_otc", false).await;
    let err = OutcomeEvaluator::default()
        .place(&venue, &signal, 55.0, 60)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Collaborator(VenueError::InstrumentClosed(_))));
}
