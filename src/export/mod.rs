//! CSV export of backtest outcome records

use crate::models::signal::OutcomeRecord;
use std::io::Write;
use std::path::Path;

pub const HEADER: [&str; 7] = [
    "time",
    "instrument",
    "operation",
    "entry",
    "tick",
    "tick mean",
    "result",
];

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write one header row followed by one row per record.
pub fn records_to_csv<W: Write>(writer: W, records: &[OutcomeRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;

    for r in records {
        wtr.write_record([
            &r.timestamp.format(TIME_FORMAT).to_string(),
            &r.instrument,
            r.direction.as_str(),
            &format!("{:.5}", r.entry_price),
            &r.trigger_tick_volume.to_string(),
            &format!("{:.2}", r.reference_tick_volume),
            r.result.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_records_csv<P: AsRef<Path>>(path: P, records: &[OutcomeRecord]) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    records_to_csv(file, records)
}
