use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Venue wording for the binary option side.
    pub fn as_venue_side(&self) -> &'static str {
        match self {
            Direction::Buy => "call",
            Direction::Sell => "put",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "Buy",
            Direction::Sell => "Sell",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeResult {
    Win,
    Loss,
}

impl TradeResult {
    pub fn from_win(win: bool) -> Self {
        if win {
            TradeResult::Win
        } else {
            TradeResult::Loss
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, TradeResult::Win)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Win => "win",
            TradeResult::Loss => "loss",
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry opportunity detected at one candle of an annotated series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub index: usize,
    pub instrument: String,
    pub direction: Direction,
    pub trigger_price: f64,
    pub timestamp: DateTime<Utc>,
    pub tick_volume: u64,
    /// Mean tick volume of the three candles at `index-4..=index-2`.
    pub reference_tick_volume: f64,
}

/// Win/loss label of one signal against a known future candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub trigger_tick_volume: u64,
    pub reference_tick_volume: f64,
    pub result: TradeResult,
}

/// Settled live trade, emitted once per signal acted upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveOutcome {
    pub instrument: String,
    pub direction: Direction,
    pub trigger_price: f64,
    pub trade_id: String,
    pub amount: f64,
    pub duration_seconds: u64,
    pub result: TradeResult,
}
