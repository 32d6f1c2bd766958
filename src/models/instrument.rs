use serde::{Deserialize, Serialize};

/// Venue listing entry for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentDescriptor {
    /// Venue code, e.g. `EURUSD_otc`.
    pub id: String,
    /// Human name, e.g. `EUR/USD (OTC)`.
    pub display_name: String,
}

/// Point-in-time availability of an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentStatus {
    pub display_name: String,
    pub symbol: String,
    pub is_open: bool,
}

/// Derive the venue display name from a code such as `EURUSD_otc`.
///
/// Six-letter pair codes get a slash between base and quote; an `_otc`
/// suffix becomes ` (OTC)`. Anything else is returned unchanged.
pub fn display_name_for(id: &str) -> String {
    let (code, otc) = match id.strip_suffix("_otc") {
        Some(code) => (code, true),
        None => (id, false),
    };

    let base = if code.len() == 6 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        format!("{}/{}", &code[..3], &code[3..])
    } else {
        code.to_string()
    };

    if otc {
        format!("{} (OTC)", base)
    } else {
        base
    }
}
