//! Scripted venue shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bandscan::models::indicators::Candle;
use bandscan::models::instrument::{display_name_for, InstrumentDescriptor, InstrumentStatus};
use bandscan::models::signal::Direction;
use bandscan::services::{TradeHandle, VenueClient, VenueError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct MockInstrument {
    pub id: String,
    pub candles: Vec<Candle>,
    pub is_open: bool,
    pub fail_fetch: bool,
    pub fail_status: bool,
}

impl MockInstrument {
    pub fn new(id: &str, candles: Vec<Candle>) -> Self {
        Self {
            id: id.to_string(),
            candles,
            is_open: true,
            fail_fetch: false,
            fail_status: false,
        }
    }

    pub fn closed(mut self) -> Self {
        self.is_open = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Status lookups answer `Unavailable`.
    pub fn status_failing(mut self) -> Self {
        self.fail_status = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PlacedTrade {
    pub instrument: String,
    pub direction: Direction,
    pub amount: f64,
    pub duration_seconds: u64,
}

/// Venue whose every answer is scripted up front.
pub struct MockVenue {
    instruments: Vec<MockInstrument>,
    connect_error: Option<VenueError>,
    unavailable_connects: AtomicUsize,
    settle_delay: Duration,
    settle_win: bool,
    fetch_delay: Duration,
    /// Per instrument: fetches in progress and the most seen at once.
    overlap: Mutex<HashMap<String, (usize, usize)>>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub fetches: Mutex<HashMap<String, usize>>,
    pub trades: Mutex<Vec<PlacedTrade>>,
    /// Signalled once per accepted trade.
    pub placed: Notify,
}

impl MockVenue {
    pub fn new(instruments: Vec<MockInstrument>) -> Self {
        Self {
            instruments,
            connect_error: None,
            unavailable_connects: AtomicUsize::new(0),
            settle_delay: Duration::ZERO,
            settle_win: true,
            fetch_delay: Duration::ZERO,
            overlap: Mutex::new(HashMap::new()),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            fetches: Mutex::new(HashMap::new()),
            trades: Mutex::new(Vec::new()),
            placed: Notify::new(),
        }
    }

    pub fn with_connect_error(mut self, error: VenueError) -> Self {
        self.connect_error = Some(error);
        self
    }

    /// Report `Unavailable` for the first `attempts` connects.
    pub fn unavailable_for(self, attempts: usize) -> Self {
        self.unavailable_connects.store(attempts, Ordering::SeqCst);
        self
    }

    pub fn settling_after(mut self, delay: Duration, win: bool) -> Self {
        self.settle_delay = delay;
        self.settle_win = win;
        self
    }

    pub fn fetching_for(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Most fetches of `id` ever in progress at the same time.
    pub fn max_overlap(&self, id: &str) -> usize {
        self.overlap.lock().unwrap().get(id).map(|(_, max)| *max).unwrap_or(0)
    }

    pub fn trades(&self) -> Vec<PlacedTrade> {
        self.trades.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, id: &str) -> usize {
        self.fetches.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    fn find(&self, id: &str) -> Result<&MockInstrument, VenueError> {
        self.instruments
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| VenueError::UnknownInstrument(id.to_string()))
    }
}

#[async_trait]
impl VenueClient for MockVenue {
    async fn connect(&self) -> Result<String, VenueError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.connect_error {
            return Err(err.clone());
        }
        let pending = self.unavailable_connects.load(Ordering::SeqCst);
        if pending > 0 {
            self.unavailable_connects.store(pending - 1, Ordering::SeqCst);
            return Err(VenueError::Unavailable("warming up".to_string()));
        }
        Ok("mock venue".to_string())
    }

    async fn list_instruments(&self) -> Result<Vec<InstrumentDescriptor>, VenueError> {
        Ok(self
            .instruments
            .iter()
            .map(|i| InstrumentDescriptor {
                id: i.id.clone(),
                display_name: display_name_for(&i.id),
            })
            .collect())
    }

    async fn instrument_status(&self, instrument_id: &str) -> Result<InstrumentStatus, VenueError> {
        let instrument = self.find(instrument_id)?;
        if instrument.fail_status {
            return Err(VenueError::Unavailable(format!("status of {instrument_id}")));
        }
        let name = display_name_for(instrument_id);
        Ok(InstrumentStatus {
            display_name: name.clone(),
            symbol: name,
            is_open: instrument.is_open,
        })
    }

    async fn fetch_candles(
        &self,
        instrument_id: &str,
        _as_of: DateTime<Utc>,
        _lookback_seconds: u64,
        _interval_seconds: u64,
    ) -> Result<Vec<Candle>, VenueError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(instrument_id.to_string())
            .or_default() += 1;
        {
            let mut overlap = self.overlap.lock().unwrap();
            let entry = overlap.entry(instrument_id.to_string()).or_default();
            entry.0 += 1;
            entry.1 = entry.1.max(entry.0);
        }
        tokio::time::sleep(self.fetch_delay).await;
        if let Some(entry) = self.overlap.lock().unwrap().get_mut(instrument_id) {
            entry.0 -= 1;
        }

        let instrument = self.find(instrument_id)?;
        if instrument.fail_fetch {
            return Err(VenueError::Fetch(format!("{} feed down", instrument_id)));
        }
        Ok(instrument.candles.clone())
    }

    async fn place_trade(
        &self,
        amount: f64,
        instrument_id: &str,
        direction: Direction,
        duration_seconds: u64,
    ) -> Result<TradeHandle, VenueError> {
        let trade_id = {
            let mut trades = self.trades.lock().unwrap();
            trades.push(PlacedTrade {
                instrument: instrument_id.to_string(),
                direction,
                amount,
                duration_seconds,
            });
            format!("mock-{}", trades.len())
        };
        self.placed.notify_one();
        Ok(TradeHandle { trade_id })
    }

    async fn await_settlement(&self, _trade_id: &str) -> Result<bool, VenueError> {
        tokio::time::sleep(self.settle_delay).await;
        Ok(self.settle_win)
    }

    async fn account_balance(&self) -> Result<f64, VenueError> {
        Ok(1_000.0)
    }

    async fn disconnect(&self) -> Result<(), VenueError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
