//! Environment-driven configuration.
//!
//! Every knob has a default matching the strategy as it runs in production;
//! `.env` files are honoured by the binaries through `dotenvy`.

use crate::core::scheduler::ScanCadence;
use crate::error::ConfigError;
use crate::services::universe::UniverseFilter;
use crate::signals::outcome::TradeExpiry;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_NUM_STD: f64 = 2.0;
pub const DEFAULT_LOOKBACK: usize = 4;
pub const DEFAULT_LOOKAHEAD: usize = 4;
pub const DEFAULT_ENTRY_OFFSET: f64 = 0.00005;

/// Number of candles averaged for the reference tick volume.
pub const REFERENCE_VOLUME_CANDLES: usize = 3;

/// Upper bound for the default worker pool size.
const MAX_DEFAULT_WORKERS: usize = 16;

/// Get the current deployment environment (`sandbox` when unset).
pub fn get_environment() -> String {
    env::var("APP_ENV").unwrap_or_else(|_| "sandbox".to_string())
}

/// Band and entry-rule parameters shared by backtest and live mode.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub window: usize,
    pub num_std: f64,
    pub lookback: usize,
    pub lookahead: usize,
    /// Offset subtracted from the low (buy) or added to the high (sell).
    pub entry_offset: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            num_std: DEFAULT_NUM_STD,
            lookback: DEFAULT_LOOKBACK,
            lookahead: DEFAULT_LOOKAHEAD,
            entry_offset: DEFAULT_ENTRY_OFFSET,
        }
    }
}

impl StrategyConfig {
    /// Shortest series for which at least one position can be fully
    /// evaluated in a backtest.
    pub fn min_evaluable_len(&self) -> usize {
        self.window + self.lookback + self.lookahead
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::Invalid(format!(
                "window must be at least 2, got {}",
                self.window
            )));
        }
        if self.lookback < REFERENCE_VOLUME_CANDLES {
            return Err(ConfigError::Invalid(format!(
                "lookback must be at least {}, got {}",
                REFERENCE_VOLUME_CANDLES, self.lookback
            )));
        }
        if self.lookahead == 0 {
            return Err(ConfigError::Invalid("lookahead must be at least 1".to_string()));
        }
        if !self.num_std.is_finite() || self.num_std < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "num_std must be finite and non-negative, got {}",
                self.num_std
            )));
        }
        if !self.entry_offset.is_finite() {
            return Err(ConfigError::Invalid("entry_offset must be finite".to_string()));
        }
        Ok(())
    }
}

/// Candle window requested from the venue on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub interval_seconds: u64,
    pub history_seconds: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            history_seconds: 3600,
        }
    }
}

/// Live trading parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    pub trade_amount: f64,
    pub expiry: TradeExpiry,
    pub cadence: ScanCadence,
    pub failure_backoff: Duration,
    /// `None` sizes the pool from the universe.
    pub worker_concurrency: Option<usize>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            trade_amount: 55.0,
            expiry: TradeExpiry::AlignToInterval,
            cadence: ScanCadence::default(),
            failure_backoff: Duration::from_secs(5),
            worker_concurrency: None,
        }
    }
}

impl LiveConfig {
    pub fn workers_for(&self, universe_len: usize) -> usize {
        self.worker_concurrency
            .unwrap_or_else(|| universe_len.clamp(1, MAX_DEFAULT_WORKERS))
            .max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub strategy: StrategyConfig,
    pub feed: FeedConfig,
    pub universe: UniverseFilter,
    /// Explicit instrument ids; `None` scans the whole venue listing.
    pub symbols: Option<Vec<String>>,
    pub live: LiveConfig,
}

impl Config {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let strategy = StrategyConfig {
            window: env_or("BAND_WINDOW", DEFAULT_WINDOW)?,
            num_std: env_or("BAND_NUM_STD", DEFAULT_NUM_STD)?,
            lookback: env_or("SIGNAL_LOOKBACK", DEFAULT_LOOKBACK)?,
            lookahead: env_or("OUTCOME_LOOKAHEAD", DEFAULT_LOOKAHEAD)?,
            entry_offset: env_or("ENTRY_OFFSET", DEFAULT_ENTRY_OFFSET)?,
        };

        let feed = FeedConfig {
            interval_seconds: env_or("CANDLE_INTERVAL_SECONDS", 60)?,
            history_seconds: env_or("HISTORY_SECONDS", 3600)?,
        };

        let defaults = UniverseFilter::default();
        let universe = UniverseFilter {
            market_tag: env::var("MARKET_TAG").unwrap_or(defaults.market_tag),
            excluded_currency: env::var("EXCLUDED_CURRENCY").unwrap_or(defaults.excluded_currency),
            ..defaults
        };

        let symbols = env::var("SYMBOLS").ok().and_then(|s| parse_symbols(&s));

        let expiry = match env::var("TRADE_DURATION_SECONDS") {
            Ok(v) => TradeExpiry::Fixed(parse_value("TRADE_DURATION_SECONDS", &v)?),
            Err(_) => TradeExpiry::AlignToInterval,
        };

        let interval = Duration::from_secs(feed.interval_seconds);
        let cadence = match env::var("SCAN_MODE")
            .unwrap_or_else(|_| "window".to_string())
            .as_str()
        {
            "window" => ScanCadence::IntervalWindow {
                interval,
                lead: Duration::from_secs(env_or("SCAN_LEAD_SECONDS", 10)?),
            },
            "continuous" => ScanCadence::Continuous {
                min_delay: Duration::from_secs(env_or("SCAN_MIN_DELAY_SECONDS", 5)?),
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "SCAN_MODE".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let worker_concurrency = match env::var("WORKER_CONCURRENCY") {
            Ok(v) => Some(parse_value("WORKER_CONCURRENCY", &v)?),
            Err(_) => None,
        };

        let live = LiveConfig {
            trade_amount: env_or("TRADE_AMOUNT", 55.0)?,
            expiry,
            cadence,
            failure_backoff: Duration::from_secs(env_or("FAILURE_BACKOFF_SECONDS", 5)?),
            worker_concurrency,
        };

        let config = Self {
            strategy,
            feed,
            universe,
            symbols,
            live,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        if self.feed.interval_seconds == 0 {
            return Err(ConfigError::Invalid("candle interval must be > 0".to_string()));
        }
        if self.feed.history_seconds < self.feed.interval_seconds * self.strategy.window as u64 {
            return Err(ConfigError::Invalid(format!(
                "history of {}s cannot hold a {}-candle window at {}s",
                self.feed.history_seconds, self.strategy.window, self.feed.interval_seconds
            )));
        }
        if let ScanCadence::IntervalWindow { interval, lead } = self.live.cadence {
            if interval.is_zero() || lead >= interval {
                return Err(ConfigError::Invalid(format!(
                    "scan lead {:?} must be shorter than the interval {:?}",
                    lead, interval
                )));
            }
        }
        if let ScanCadence::Continuous { min_delay } = self.live.cadence {
            if min_delay.is_zero() {
                return Err(ConfigError::Invalid("scan delay must be > 0".to_string()));
            }
        }
        if !(self.live.trade_amount > 0.0) {
            return Err(ConfigError::Invalid("trade amount must be > 0".to_string()));
        }
        if self.live.worker_concurrency == Some(0) {
            return Err(ConfigError::Invalid("worker concurrency must be > 0".to_string()));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(v) => parse_value(key, &v),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Split a comma separated symbol list, dropping blanks.
pub fn parse_symbols(raw: &str) -> Option<Vec<String>> {
    let symbols: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        None
    } else {
        Some(symbols)
    }
}
