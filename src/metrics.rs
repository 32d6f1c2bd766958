//! Prometheus metrics for the live scanner

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub scans_total: IntCounter,
    pub signals_total: IntCounterVec,
    pub trades_total: IntCounterVec,
    pub scan_failures_total: IntCounterVec,
    pub scan_duration_seconds: Histogram,
    pub instruments_listed: IntGauge,
    pub venue_connected: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let scans_total = IntCounter::new("bandscan_scans_total", "Completed instrument scans")?;
        let signals_total = IntCounterVec::new(
            Opts::new("bandscan_signals_total", "Entry signals detected"),
            &["direction"],
        )?;
        let trades_total = IntCounterVec::new(
            Opts::new("bandscan_trades_total", "Settled live trades"),
            &["result"],
        )?;
        let scan_failures_total = IntCounterVec::new(
            Opts::new("bandscan_scan_failures_total", "Scans aborted by an error"),
            &["kind"],
        )?;
        let scan_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "bandscan_scan_duration_seconds",
                "Time from fetch to detection for one instrument",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;
        let instruments_listed =
            IntGauge::new("bandscan_instruments_listed", "Instruments in the scan universe")?;
        let venue_connected = Gauge::new("bandscan_venue_connected", "1 while a venue session is open")?;

        registry.register(Box::new(scans_total.clone()))?;
        registry.register(Box::new(signals_total.clone()))?;
        registry.register(Box::new(trades_total.clone()))?;
        registry.register(Box::new(scan_failures_total.clone()))?;
        registry.register(Box::new(scan_duration_seconds.clone()))?;
        registry.register(Box::new(instruments_listed.clone()))?;
        registry.register(Box::new(venue_connected.clone()))?;

        Ok(Self {
            registry,
            scans_total,
            signals_total,
            trades_total,
            scan_failures_total,
            scan_duration_seconds,
            instruments_listed,
            venue_connected,
        })
    }

    /// Render all metrics in the Prometheus text format.
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
