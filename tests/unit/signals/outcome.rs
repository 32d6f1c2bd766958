//! Tests for outcome labeling and trade expiry

use bandscan::models::signal::{Direction, TradeResult};
use bandscan::signals::{classify, TradeExpiry};

#[test]
fn buy_wins_strictly_above_entry() {
    assert_eq!(classify(Direction::Buy, 1.0, 1.0001), TradeResult::Win);
    assert_eq!(classify(Direction::Buy, 1.0, 1.0), TradeResult::Loss);
    assert_eq!(classify(Direction::Buy, 1.0, 0.9999), TradeResult::Loss);
}

#[test]
fn sell_wins_strictly_below_entry() {
    assert_eq!(classify(Direction::Sell, 1.0, 0.9999), TradeResult::Win);
    assert_eq!(classify(Direction::Sell, 1.0, 1.0), TradeResult::Loss);
}

#[test]
fn aligned_expiry_runs_to_interval_end() {
    let expiry = TradeExpiry::AlignToInterval;
    assert_eq!(expiry.duration_seconds(0.0, 60), 60);
    assert_eq!(expiry.duration_seconds(50.0, 60), 10);
    assert_eq!(expiry.duration_seconds(47.0, 60), 15);
    assert_eq!(expiry.duration_seconds(59.5, 60), 5);
}

#[test]
fn fixed_expiry_ignores_phase() {
    assert_eq!(TradeExpiry::Fixed(120).duration_seconds(50.0, 60), 120);
}
