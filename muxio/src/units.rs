//! Human-readable byte sizes.
//!
//! The download layer persists sizes as display strings (`"12.50 GiB"`);
//! this module renders byte counts into that format and parses them back.
//! Round-trips are lossy above whole-unit granularity: this is a display
//! format, not an exact serialization.

use crate::{Error, Result};

const ONE_KIBIBYTE: u64 = 1024;

/// Unit ladder above plain bytes, one label per division by 1024.
const LABELS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

/// What a size string describes. File sizes and transfer speeds share the
/// unit ladder but differ in where sub-unit precision starts: speeds are
/// commonly reported with decimals one tier earlier than sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeContext {
    Size,
    Speed,
}

impl SizeContext {
    /// Highest ladder tier still rounded to a whole number.
    fn whole_number_ceiling(self) -> usize {
        match self {
            SizeContext::Size => 1,  // KiB and MiB
            SizeContext::Speed => 0, // KiB only
        }
    }
}

/// Render a byte count as a display string.
///
/// Values below 1 KiB print as an integer with a `B` suffix. Above that the
/// value is divided by 1024 until it fits its unit (clamped at TiB), then
/// rounded to a whole number up to the context's ceiling tier and printed
/// with two decimal digits beyond it.
pub fn format_size(bytes: u64, context: SizeContext) -> String {
    if bytes < ONE_KIBIBYTE {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / ONE_KIBIBYTE as f64;
    let mut tier = 0usize;
    while value >= ONE_KIBIBYTE as f64 && tier < LABELS.len() - 1 {
        value /= ONE_KIBIBYTE as f64;
        tier += 1;
    }

    if tier > context.whole_number_ceiling() {
        format!("{value:.2} {}", LABELS[tier])
    } else {
        format!("{} {}", value.round() as u64, LABELS[tier])
    }
}

/// Parse a display string back into bytes.
///
/// The trailing unit decides the multiplier (1024 per ladder position).
/// `GiB`/`TiB` prefixes are read as fractional values and the final result
/// truncated; `B`/`KiB`/`MiB` prefixes are truncated to an integer before
/// scaling. Unknown suffixes and non-numeric prefixes are a
/// [`Error::SizeFormat`].
pub fn parse_size(display: &str) -> Result<u64> {
    let (prefix, ladder) = if let Some(p) = display.strip_suffix(" B") {
        (p, 0u32)
    } else if let Some(p) = display.strip_suffix("KiB") {
        (p, 1)
    } else if let Some(p) = display.strip_suffix("MiB") {
        (p, 2)
    } else if let Some(p) = display.strip_suffix("GiB") {
        (p, 3)
    } else if let Some(p) = display.strip_suffix("TiB") {
        (p, 4)
    } else {
        return Err(Error::SizeFormat(display.to_string()));
    };

    let value: f64 = prefix
        .trim_end()
        .parse()
        .map_err(|_| Error::SizeFormat(display.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(Error::SizeFormat(display.to_string()));
    }

    let scale = ONE_KIBIBYTE.pow(ladder);
    let bytes = match ladder {
        // Fractional tiers: scale first, truncate last.
        3 | 4 => (value * scale as f64) as u64,
        _ => (value as u64).saturating_mul(scale),
    };
    Ok(bytes)
}
