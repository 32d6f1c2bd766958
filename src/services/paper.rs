//! Offline venue backed by recorded candle series.
//!
//! Serves historical data for backtests (`Snapshot`) or replays it one
//! candle per fetch for the live scanner (`Replay`), settling paper trades
//! against the recorded future.

use crate::models::indicators::{validate_series, Candle};
use crate::models::instrument::{display_name_for, InstrumentDescriptor, InstrumentStatus};
use crate::models::signal::Direction;
use crate::services::venue::{TradeHandle, VenueClient, VenueError};
use crate::signals::outcome::classify;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Every fetch sees all candles up to `as_of`.
    Snapshot,
    /// The first fetch sees `warmup` candles; each fetch reveals one more.
    Replay { warmup: usize },
}

#[derive(Debug)]
struct PaperSeries {
    descriptor: InstrumentDescriptor,
    candles: Vec<Candle>,
    open: bool,
    cursor: usize,
}

impl PaperSeries {
    fn visible(&self, mode: FeedMode, as_of: DateTime<Utc>) -> &[Candle] {
        match mode {
            FeedMode::Snapshot => {
                let end = self.candles.partition_point(|c| c.timestamp <= as_of);
                &self.candles[..end]
            }
            FeedMode::Replay { .. } => &self.candles[..self.cursor],
        }
    }
}

#[derive(Debug, Clone)]
struct PaperTrade {
    instrument: String,
    direction: Direction,
    amount: f64,
    entry: f64,
    expiry_index: usize,
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    ticks: u64,
}

pub struct PaperVenue {
    mode: FeedMode,
    interval_seconds: u64,
    payout: f64,
    series: RwLock<Vec<PaperSeries>>,
    trades: RwLock<HashMap<String, PaperTrade>>,
    balance: RwLock<f64>,
    next_trade_id: AtomicU64,
    connected: AtomicBool,
}

impl PaperVenue {
    pub fn new(mode: FeedMode, interval_seconds: u64) -> Self {
        Self {
            mode,
            interval_seconds,
            payout: 0.85,
            series: RwLock::new(Vec::new()),
            trades: RwLock::new(HashMap::new()),
            balance: RwLock::new(10_000.0),
            next_trade_id: AtomicU64::new(1),
            connected: AtomicBool::new(false),
        }
    }

    /// Fraction of the stake paid on a winning trade.
    pub fn with_payout(mut self, payout: f64) -> Self {
        self.payout = payout;
        self
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        *self.balance.get_mut() = balance;
        self
    }

    /// Add an instrument; candles must be sorted oldest first.
    pub fn with_instrument(mut self, id: &str, candles: Vec<Candle>) -> Self {
        let cursor = match self.mode {
            FeedMode::Snapshot => candles.len(),
            FeedMode::Replay { warmup } => warmup.min(candles.len()),
        };
        self.series.get_mut().push(PaperSeries {
            descriptor: InstrumentDescriptor {
                id: id.to_string(),
                display_name: display_name_for(id),
            },
            candles,
            open: true,
            cursor,
        });
        self
    }

    /// Load every `<instrument id>.csv` in `dir`, in file-name order.
    ///
    /// Expected columns: `timestamp,open,high,low,close,ticks` with unix
    /// seconds timestamps.
    pub fn from_csv_dir(
        dir: impl AsRef<Path>,
        mode: FeedMode,
        interval_seconds: u64,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut paths: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        paths.sort();

        let mut venue = Self::new(mode, interval_seconds);
        for path in paths {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let candles = load_candles_csv(&path)?;
            info!(instrument = %id, candles = candles.len(), "PaperVenue: loaded {} candles for {}", candles.len(), id);
            venue = venue.with_instrument(&id, candles);
        }
        Ok(venue)
    }

    pub async fn set_open(&self, instrument_id: &str, open: bool) {
        let mut series = self.series.write().await;
        if let Some(s) = series.iter_mut().find(|s| s.descriptor.id == instrument_id) {
            s.open = open;
        }
    }

    fn ensure_connected(&self) -> Result<(), VenueError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(VenueError::Connection("paper session not connected".to_string()))
        }
    }
}

/// Read one recorded series from a CSV file.
pub fn load_candles_csv(
    path: impl AsRef<Path>,
) -> Result<Vec<Candle>, Box<dyn std::error::Error + Send + Sync>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut candles = Vec::new();
    for row in reader.deserialize() {
        let row: CandleRow = row?;
        let timestamp = DateTime::from_timestamp(row.timestamp, 0)
            .ok_or_else(|| format!("timestamp {} out of range", row.timestamp))?;
        candles.push(Candle::new(row.open, row.high, row.low, row.close, row.ticks, timestamp));
    }
    validate_series(&candles).map_err(|e| format!("{}: {}", path.as_ref().display(), e))?;
    Ok(candles)
}

#[async_trait::async_trait]
impl VenueClient for PaperVenue {
    async fn connect(&self) -> Result<String, VenueError> {
        self.connected.store(true, Ordering::SeqCst);
        let count = self.series.read().await.len();
        Ok(format!("paper venue with {} instruments", count))
    }

    async fn list_instruments(&self) -> Result<Vec<InstrumentDescriptor>, VenueError> {
        self.ensure_connected()?;
        let series = self.series.read().await;
        Ok(series.iter().map(|s| s.descriptor.clone()).collect())
    }

    async fn instrument_status(&self, instrument_id: &str) -> Result<InstrumentStatus, VenueError> {
        self.ensure_connected()?;
        let series = self.series.read().await;
        let s = series
            .iter()
            .find(|s| s.descriptor.id == instrument_id)
            .ok_or_else(|| VenueError::UnknownInstrument(instrument_id.to_string()))?;
        Ok(InstrumentStatus {
            display_name: s.descriptor.display_name.clone(),
            symbol: s.descriptor.display_name.clone(),
            is_open: s.open,
        })
    }

    async fn fetch_candles(
        &self,
        instrument_id: &str,
        as_of: DateTime<Utc>,
        lookback_seconds: u64,
        interval_seconds: u64,
    ) -> Result<Vec<Candle>, VenueError> {
        self.ensure_connected()?;
        if interval_seconds != self.interval_seconds {
            return Err(VenueError::Fetch(format!(
                "only {}s candles are recorded, {}s requested",
                self.interval_seconds, interval_seconds
            )));
        }

        let mut series = self.series.write().await;
        let s = series
            .iter_mut()
            .find(|s| s.descriptor.id == instrument_id)
            .ok_or_else(|| VenueError::UnknownInstrument(instrument_id.to_string()))?;

        let count = (lookback_seconds / interval_seconds).max(1) as usize;
        let visible = s.visible(self.mode, as_of);
        let start = visible.len().saturating_sub(count);
        let candles = visible[start..].to_vec();

        if let FeedMode::Replay { .. } = self.mode {
            s.cursor = (s.cursor + 1).min(s.candles.len());
        }

        debug!(instrument = %instrument_id, count = candles.len(), "PaperVenue: served {} candles", candles.len());
        Ok(candles)
    }

    async fn place_trade(
        &self,
        amount: f64,
        instrument_id: &str,
        direction: Direction,
        duration_seconds: u64,
    ) -> Result<TradeHandle, VenueError> {
        self.ensure_connected()?;
        if !(amount > 0.0) {
            return Err(VenueError::TradeRejected(format!("invalid amount {}", amount)));
        }

        let (entry, expiry_index) = {
            let series = self.series.read().await;
            let s = series
                .iter()
                .find(|s| s.descriptor.id == instrument_id)
                .ok_or_else(|| VenueError::UnknownInstrument(instrument_id.to_string()))?;
            if !s.open {
                return Err(VenueError::InstrumentClosed(instrument_id.to_string()));
            }
            let placed_at = match self.mode {
                FeedMode::Snapshot => s.candles.len(),
                FeedMode::Replay { .. } => s.cursor,
            };
            let Some(last) = placed_at.checked_sub(1).and_then(|i| s.candles.get(i)) else {
                return Err(VenueError::TradeRejected(format!("no price for {}", instrument_id)));
            };
            let steps = duration_seconds.div_ceil(self.interval_seconds).max(1) as usize;
            (last.close, placed_at - 1 + steps)
        };

        {
            let mut balance = self.balance.write().await;
            if *balance < amount {
                return Err(VenueError::TradeRejected("insufficient balance".to_string()));
            }
            *balance -= amount;
        }

        let trade_id = format!("paper-{}", self.next_trade_id.fetch_add(1, Ordering::SeqCst));
        self.trades.write().await.insert(
            trade_id.clone(),
            PaperTrade {
                instrument: instrument_id.to_string(),
                direction,
                amount,
                entry,
                expiry_index,
            },
        );
        Ok(TradeHandle { trade_id })
    }

    async fn await_settlement(&self, trade_id: &str) -> Result<bool, VenueError> {
        self.ensure_connected()?;
        let trade = self
            .trades
            .write()
            .await
            .remove(trade_id)
            .ok_or_else(|| VenueError::Settlement(format!("unknown trade {}", trade_id)))?;

        let close = {
            let series = self.series.read().await;
            series
                .iter()
                .find(|s| s.descriptor.id == trade.instrument)
                .and_then(|s| s.candles.get(trade.expiry_index))
                .map(|c| c.close)
                .ok_or_else(|| {
                    VenueError::Settlement(format!("recorded data ends before expiry of {}", trade_id))
                })?
        };

        let win = classify(trade.direction, trade.entry, close).is_win();
        if win {
            *self.balance.write().await += trade.amount * (1.0 + self.payout);
        }
        Ok(win)
    }

    async fn account_balance(&self) -> Result<f64, VenueError> {
        self.ensure_connected()?;
        Ok(*self.balance.read().await)
    }

    async fn disconnect(&self) -> Result<(), VenueError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
