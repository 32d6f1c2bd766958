//! External collaborators: the venue interface and its offline implementation.

pub mod paper;
pub mod universe;
pub mod venue;

pub use paper::{load_candles_csv, FeedMode, PaperVenue};
pub use universe::{candidate_instruments, tradable_instruments, TradableSet, UniverseFilter};
pub use venue::{TradeHandle, VenueClient, VenueError};
