//! Messages exchanged between the scan dispatcher and its workers

use crate::core::state::InstrumentState;
use crate::error::ScanError;
use crate::indicators::volatility::BandTracker;
use crate::models::signal::LiveOutcome;

/// Scan one instrument. The tracker travels with the job so band state is
/// owned by exactly one scan at a time.
#[derive(Debug)]
pub struct ScanJob {
    pub instrument: String,
    pub tracker: BandTracker,
}

#[derive(Debug)]
pub enum ScanOutcome {
    NoSignal,
    /// Filtered out of the tradable universe this cycle.
    NotTradable,
    Traded(LiveOutcome),
    /// Abandoned by a stop request before any trade was placed.
    Cancelled,
}

#[derive(Debug)]
pub enum ScanEvent {
    Transition {
        instrument: String,
        state: InstrumentState,
    },
    Finished {
        instrument: String,
        tracker: BandTracker,
        outcome: Result<ScanOutcome, ScanError>,
    },
}
