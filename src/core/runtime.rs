//! Live scanner: a fixed pool of scan workers fed by the tick scheduler

use crate::config::Config;
use crate::core::clock::{Clock, TokioClock};
use crate::core::scheduler::ScanScheduler;
use crate::core::state::InstrumentState;
use crate::error::ScanError;
use crate::indicators::volatility::BandTracker;
use crate::jobs::context::JobContext;
use crate::jobs::handlers::{handle_scan, stop_requested};
use crate::jobs::types::{ScanEvent, ScanJob, ScanOutcome};
use crate::metrics::Metrics;
use crate::models::signal::LiveOutcome;
use crate::services::universe::candidate_instruments;
use crate::services::venue::{connect_with_retry, VenueClient};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Counters accumulated over one `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveSummary {
    pub cycles: u64,
    pub scans: u64,
    pub trades: u64,
    pub wins: u64,
    pub losses: u64,
    pub failures: u64,
    pub cancelled: u64,
}

pub struct LiveScanner {
    venue: Arc<dyn VenueClient>,
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<Metrics>>,
    outcomes: Option<mpsc::UnboundedSender<LiveOutcome>>,
    concurrency: Option<usize>,
}

impl LiveScanner {
    pub fn new(venue: Arc<dyn VenueClient>, config: Config) -> Self {
        Self {
            venue,
            concurrency: config.live.worker_concurrency,
            config: Arc::new(config),
            clock: Arc::new(TokioClock::new()),
            metrics: None,
            outcomes: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Receive every settled trade as it completes.
    pub fn with_outcome_sink(mut self, sink: mpsc::UnboundedSender<LiveOutcome>) -> Self {
        self.outcomes = Some(sink);
        self
    }

    /// Set the worker pool size (default sizes it from the universe)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency.max(1));
        self
    }

    /// Scan until `shutdown` flips to `true`.
    ///
    /// Only a failed connection or initial listing is returned as an error;
    /// per-instrument failures are logged and retried after the backoff.
    /// Trades already placed when the stop arrives are settled and reported
    /// before this returns.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<LiveSummary, ScanError> {
        let message = connect_with_retry(self.venue.as_ref()).await?;
        info!(message = %message, "LiveScanner: connected");
        if let Some(metrics) = &self.metrics {
            metrics.venue_connected.set(1.0);
        }

        let mut universe =
            candidate_instruments(self.venue.as_ref(), self.config.symbols.as_deref()).await?;
        let workers = self
            .concurrency
            .unwrap_or_else(|| self.config.live.workers_for(universe.len()));

        let ctx = Arc::new(JobContext::new(
            self.venue.clone(),
            self.config.clone(),
            self.clock.clone(),
            self.metrics.clone(),
        ));
        let (job_tx, job_rx) = mpsc::unbounded_channel::<ScanJob>();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ScanEvent>();
        let handles = start_workers(workers, ctx, job_rx, event_tx, shutdown.clone());

        info!(
            workers = workers,
            instruments = universe.len(),
            "LiveScanner: started {} workers over {} instruments",
            workers,
            universe.len()
        );

        let mut dispatcher = Dispatcher::new(self.config.clone(), self.outcomes.clone());
        let mut scheduler = ScanScheduler::new(self.config.live.cadence, self.clock.clone());

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => {
                    info!("LiveScanner: stop requested, draining in-flight scans");
                    break;
                }
                Some(event) = event_rx.recv() => {
                    dispatcher.on_event(event, self.clock.elapsed());
                }
                tick = scheduler.wait_for_tick() => {
                    self.refresh_universe(&mut universe).await;
                    dispatcher.dispatch(tick, &universe, &job_tx);
                }
            }
        }

        // Queued jobs still reach a worker and resolve as cancelled; the
        // event channel closes once every worker has exited.
        drop(job_tx);
        while let Some(event) = event_rx.recv().await {
            dispatcher.on_event(event, self.clock.elapsed());
        }
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "LiveScanner: worker panicked");
            }
        }

        if let Err(e) = self.venue.disconnect().await {
            warn!(error = %e, "LiveScanner: disconnect failed");
        }
        if let Some(metrics) = &self.metrics {
            metrics.venue_connected.set(0.0);
        }

        let summary = dispatcher.summary;
        info!(
            cycles = summary.cycles,
            trades = summary.trades,
            wins = summary.wins,
            losses = summary.losses,
            failures = summary.failures,
            "LiveScanner: stopped after {} cycles, {} trades ({} won)",
            summary.cycles,
            summary.trades,
            summary.wins
        );
        Ok(summary)
    }

    /// Re-read the venue listing when no explicit symbols are configured.
    async fn refresh_universe(&self, universe: &mut Vec<String>) {
        if self.config.symbols.is_none() {
            match candidate_instruments(self.venue.as_ref(), None).await {
                Ok(listed) => *universe = listed,
                Err(e) => {
                    warn!(error = %e, "LiveScanner: listing failed, keeping previous universe");
                }
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.instruments_listed.set(universe.len() as i64);
        }
    }
}

/// Run the live scanner with the default clock until `shutdown` fires.
pub async fn run_live(
    venue: Arc<dyn VenueClient>,
    config: Config,
    shutdown: watch::Receiver<bool>,
) -> Result<LiveSummary, ScanError> {
    LiveScanner::new(venue, config).run(shutdown).await
}

fn start_workers(
    workers: usize,
    ctx: Arc<JobContext>,
    jobs: mpsc::UnboundedReceiver<ScanJob>,
    events: mpsc::UnboundedSender<ScanEvent>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let jobs = Arc::new(Mutex::new(jobs));
    (0..workers)
        .map(|worker_id| {
            let ctx = ctx.clone();
            let jobs = jobs.clone();
            let events = events.clone();
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let job = { jobs.lock().await.recv().await };
                    let Some(job) = job else { break };
                    let event = handle_scan(job, &ctx, &events, &mut shutdown).await;
                    let _ = events.send(event);
                }
                debug!(worker_id = worker_id, "LiveScanner: worker {} exited", worker_id);
            })
        })
        .collect()
}

struct Slot {
    state: InstrumentState,
    in_flight: bool,
    tracker: Option<BandTracker>,
    next_eligible: Duration,
}

/// Owns all per-instrument state; workers only see it through jobs and
/// events, so scans of one instrument never overlap.
struct Dispatcher {
    config: Arc<Config>,
    outcomes: Option<mpsc::UnboundedSender<LiveOutcome>>,
    slots: HashMap<String, Slot>,
    summary: LiveSummary,
}

impl Dispatcher {
    fn new(config: Arc<Config>, outcomes: Option<mpsc::UnboundedSender<LiveOutcome>>) -> Self {
        Self {
            config,
            outcomes,
            slots: HashMap::new(),
            summary: LiveSummary::default(),
        }
    }

    fn dispatch(&mut self, now: Duration, universe: &[String], jobs: &mpsc::UnboundedSender<ScanJob>) {
        self.summary.cycles += 1;
        let mut dispatched = 0;

        let listed: HashSet<&str> = universe.iter().map(String::as_str).collect();
        self.slots.retain(|instrument, slot| {
            let keep = slot.in_flight || !slot.state.is_idle() || listed.contains(instrument.as_str());
            if !keep {
                debug!(instrument = %instrument, "LiveScanner: {} left the universe", instrument);
            }
            keep
        });

        for instrument in universe {
            let slot = self.slots.entry(instrument.clone()).or_insert_with(|| Slot {
                state: InstrumentState::Idle,
                in_flight: false,
                tracker: None,
                next_eligible: Duration::ZERO,
            });
            if slot.in_flight || !slot.state.is_idle() || now < slot.next_eligible {
                continue;
            }

            let strategy = &self.config.strategy;
            let tracker = slot.tracker.take().unwrap_or_else(|| {
                BandTracker::new(strategy.window, strategy.num_std, strategy.lookback)
            });
            let job = ScanJob {
                instrument: instrument.clone(),
                tracker,
            };
            if let Err(mpsc::error::SendError(job)) = jobs.send(job) {
                slot.tracker = Some(job.tracker);
                warn!("LiveScanner: worker pool closed, dispatch skipped");
                return;
            }
            slot.in_flight = true;
            dispatched += 1;
        }

        debug!(
            cycle = self.summary.cycles,
            dispatched = dispatched,
            "LiveScanner: cycle {} dispatched {} scans",
            self.summary.cycles,
            dispatched
        );
    }

    fn on_event(&mut self, event: ScanEvent, now: Duration) {
        match event {
            ScanEvent::Transition { instrument, state } => {
                let Some(slot) = self.slots.get_mut(&instrument) else {
                    return;
                };
                match slot.state.transition(state) {
                    Ok(next) => slot.state = next,
                    Err(e) => warn!(instrument = %instrument, error = %e, "LiveScanner: {}", e),
                }
            }
            ScanEvent::Finished {
                instrument,
                tracker,
                outcome,
            } => {
                let backoff = self.config.live.failure_backoff;
                let rest = self.config.live.cadence.rest_after_scan();
                let Some(slot) = self.slots.get_mut(&instrument) else {
                    return;
                };
                slot.in_flight = false;
                slot.tracker = Some(tracker);

                match outcome {
                    Ok(outcome) => {
                        slot.state = slot
                            .state
                            .transition(InstrumentState::Idle)
                            .unwrap_or_else(|_| slot.state.reset());
                        slot.next_eligible = now + rest;
                        self.record(&instrument, outcome);
                    }
                    Err(e) => {
                        slot.state = slot.state.reset();
                        slot.next_eligible = now + backoff;
                        self.summary.failures += 1;
                        warn!(
                            instrument = %instrument,
                            kind = e.kind(),
                            error = %e,
                            retry_in = ?backoff,
                            "LiveScanner: scan of {} failed, retrying in {:?}: {}",
                            instrument,
                            backoff,
                            e
                        );
                    }
                }
            }
        }
    }

    fn record(&mut self, instrument: &str, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::NoSignal => {
                self.summary.scans += 1;
                debug!(instrument = %instrument, "LiveScanner: no signal on {}", instrument);
            }
            ScanOutcome::NotTradable => {
                debug!(instrument = %instrument, "LiveScanner: {} skipped, not tradable", instrument);
            }
            ScanOutcome::Cancelled => {
                self.summary.cancelled += 1;
                debug!(instrument = %instrument, "LiveScanner: scan of {} cancelled", instrument);
            }
            ScanOutcome::Traded(trade) => {
                self.summary.scans += 1;
                self.summary.trades += 1;
                if trade.result.is_win() {
                    self.summary.wins += 1;
                } else {
                    self.summary.losses += 1;
                }
                info!(
                    instrument = %trade.instrument,
                    direction = %trade.direction,
                    result = %trade.result,
                    trade_id = %trade.trade_id,
                    "LiveScanner: {} {} -> {}",
                    trade.instrument,
                    trade.direction,
                    trade.result
                );
                if let Some(sink) = &self.outcomes {
                    let _ = sink.send(trade);
                }
            }
        }
    }
}
