//! Instrument scan jobs executed by the live scanner's worker pool

pub mod context;
pub mod handlers;
pub mod types;

pub use context::JobContext;
pub use handlers::{handle_scan, stop_requested};
pub use types::{ScanEvent, ScanJob, ScanOutcome};
