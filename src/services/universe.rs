//! Tradable-subset filter applied to the venue's instrument listing.

use crate::models::instrument::InstrumentStatus;
use crate::services::venue::{VenueClient, VenueError};
use tracing::{debug, warn};

/// Instruments are tradable when open, quoted as a currency pair, listed on
/// the extended-hours market and not denominated in the excluded currency.
#[derive(Debug, Clone, PartialEq)]
pub struct UniverseFilter {
    pub pair_separator: char,
    pub market_tag: String,
    pub excluded_currency: String,
}

impl Default for UniverseFilter {
    fn default() -> Self {
        Self {
            pair_separator: '/',
            market_tag: "OTC".to_string(),
            excluded_currency: "BRL".to_string(),
        }
    }
}

impl UniverseFilter {
    pub fn is_tradable(&self, status: &InstrumentStatus) -> bool {
        status.is_open
            && status.symbol.contains(self.pair_separator)
            && (self.market_tag.is_empty() || status.symbol.contains(&self.market_tag))
            && (self.excluded_currency.is_empty()
                || !status.symbol.contains(&self.excluded_currency))
    }
}

/// Candidate instrument ids: the explicit list when given, otherwise the
/// venue listing in its own order.
pub async fn candidate_instruments(
    venue: &dyn VenueClient,
    symbols: Option<&[String]>,
) -> Result<Vec<String>, VenueError> {
    match symbols {
        Some(symbols) => Ok(symbols.to_vec()),
        None => Ok(venue
            .list_instruments()
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect()),
    }
}

/// Result of filtering a candidate list against the venue.
#[derive(Debug, Default)]
pub struct TradableSet {
    pub tradable: Vec<(String, InstrumentStatus)>,
    /// Candidates whose status lookup failed, with the error.
    pub failed: Vec<(String, VenueError)>,
}

/// Keep the candidates that currently pass `filter`. A failed status lookup
/// only moves the affected instrument to [`TradableSet::failed`].
pub async fn tradable_instruments(
    venue: &dyn VenueClient,
    candidates: &[String],
    filter: &UniverseFilter,
) -> TradableSet {
    let mut set = TradableSet::default();
    for id in candidates {
        match venue.instrument_status(id).await {
            Ok(status) if filter.is_tradable(&status) => set.tradable.push((id.clone(), status)),
            Ok(status) => {
                debug!(instrument = %id, symbol = %status.symbol, open = status.is_open, "UniverseFilter: {} not tradable", id);
            }
            Err(e) => {
                warn!(instrument = %id, error = %e, "UniverseFilter: status lookup failed for {}", id);
                set.failed.push((id.clone(), e));
            }
        }
    }
    set
}
