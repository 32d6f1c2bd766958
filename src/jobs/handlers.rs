//! Handler for one instrument scan
//!
//! Scanning -> (Signaled -> AwaitingSettlement) -> Idle. The scanning
//! phase is abandoned on a stop request; once a signal fires, placement and
//! settlement always run to completion.

use crate::core::state::InstrumentState;
use crate::error::ScanError;
use crate::indicators::volatility::BandTracker;
use crate::jobs::context::JobContext;
use crate::jobs::types::{ScanEvent, ScanJob, ScanOutcome};
use crate::models::indicators::validate_series;
use crate::models::signal::Signal;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

enum ScanStep {
    NotTradable,
    Detected(Option<Signal>),
}

/// Resolve once a stop has been requested (or the stop handle is gone).
pub async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

pub async fn handle_scan(
    job: ScanJob,
    ctx: &JobContext,
    events: &mpsc::UnboundedSender<ScanEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> ScanEvent {
    let ScanJob {
        instrument,
        mut tracker,
    } = job;

    let outcome = if *shutdown.borrow() {
        Ok(ScanOutcome::Cancelled)
    } else {
        transition(events, &instrument, InstrumentState::Scanning);
        run_scan(ctx, &instrument, &mut tracker, events, shutdown).await
    };

    if let (Some(metrics), Err(e)) = (&ctx.metrics, &outcome) {
        metrics.scan_failures_total.with_label_values(&[e.kind()]).inc();
    }

    ScanEvent::Finished {
        instrument,
        tracker,
        outcome,
    }
}

async fn run_scan(
    ctx: &JobContext,
    instrument: &str,
    tracker: &mut BandTracker,
    events: &mpsc::UnboundedSender<ScanEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<ScanOutcome, ScanError> {
    let started = Instant::now();

    let step = tokio::select! {
        biased;
        _ = stop_requested(shutdown) => {
            debug!(instrument = %instrument, "ScanJob: stop requested, abandoning scan of {}", instrument);
            return Ok(ScanOutcome::Cancelled);
        }
        step = detect(ctx, instrument, tracker) => step?,
    };

    if let Some(metrics) = &ctx.metrics {
        metrics.scans_total.inc();
        metrics
            .scan_duration_seconds
            .observe(started.elapsed().as_secs_f64());
    }

    let signal = match step {
        ScanStep::NotTradable => return Ok(ScanOutcome::NotTradable),
        ScanStep::Detected(None) => return Ok(ScanOutcome::NoSignal),
        ScanStep::Detected(Some(signal)) => signal,
    };

    info!(
        instrument = %instrument,
        direction = %signal.direction,
        trigger_price = signal.trigger_price,
        tick_volume = signal.tick_volume,
        reference_tick_volume = signal.reference_tick_volume,
        "ScanJob: {} signal on {} at {:.5}",
        signal.direction,
        instrument,
        signal.trigger_price
    );
    if let Some(metrics) = &ctx.metrics {
        metrics
            .signals_total
            .with_label_values(&[signal.direction.as_str()])
            .inc();
    }
    transition(events, instrument, InstrumentState::Signaled);

    let duration = ctx.trade_duration_seconds();
    let trade = ctx
        .evaluator
        .place(ctx.venue.as_ref(), &signal, ctx.config.live.trade_amount, duration)
        .await?;

    transition(events, instrument, InstrumentState::AwaitingSettlement);
    let outcome = ctx.evaluator.settle(ctx.venue.as_ref(), trade).await?;

    if let Some(metrics) = &ctx.metrics {
        metrics
            .trades_total
            .with_label_values(&[outcome.result.as_str()])
            .inc();
    }
    Ok(ScanOutcome::Traded(outcome))
}

/// Availability check, fetch, band update and rule evaluation on the most
/// recent candle.
async fn detect(
    ctx: &JobContext,
    instrument: &str,
    tracker: &mut BandTracker,
) -> Result<ScanStep, ScanError> {
    let status = ctx.venue.instrument_status(instrument).await?;
    if !ctx.config.universe.is_tradable(&status) {
        return Ok(ScanStep::NotTradable);
    }

    debug!(instrument = %instrument, name = %status.display_name, "ScanJob: scanning {}", status.display_name);

    let candles = ctx
        .venue
        .fetch_candles(
            instrument,
            ctx.clock.wall_time(),
            ctx.config.feed.history_seconds,
            ctx.config.feed.interval_seconds,
        )
        .await?;
    validate_series(&candles).map_err(ScanError::DataIntegrity)?;

    let view = tracker.update(&candles)?;
    let latest = view.len() - 1;
    Ok(ScanStep::Detected(ctx.detector.detect(&view, latest, instrument)))
}

fn transition(events: &mpsc::UnboundedSender<ScanEvent>, instrument: &str, state: InstrumentState) {
    let _ = events.send(ScanEvent::Transition {
        instrument: instrument.to_string(),
        state,
    });
}
