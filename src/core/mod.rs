//! Live scanning primitives (clock, scheduler, state machine, worker pool)

pub mod clock;
pub mod runtime;
pub mod scheduler;
pub mod state;

pub use clock::{Clock, IntervalPhase, ManualClock, TokioClock};
pub use runtime::{run_live, LiveScanner, LiveSummary};
pub use scheduler::{ScanCadence, ScanScheduler};
pub use state::{InstrumentState, InvalidTransition};
