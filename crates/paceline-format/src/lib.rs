//! Human-readable formatting for transfer telemetry.
//!
//! Every function here is pure: numbers in, display strings out. Sizes use a
//! 1024 base and stop scaling at the gigabyte unit, so very large values read
//! as e.g. `5120.0GB` rather than switching to terabytes.

use std::time::Duration;

const BYTE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
const BIT_UNITS: [&str; 4] = ["Bits", "KBits", "MBits", "GBits"];

fn scaled(mut size: f64, units: &[&str; 4]) -> String {
    let mut unit = 0;
    while unit < units.len() - 1 && size >= 1024.0 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", size, units[unit])
}

/// Formats a byte count, e.g. `1.1MB`, `3.5GB`, `33.0KB`.
pub fn pretty_size(bytes: u64) -> String {
    scaled(bytes as f64, &BYTE_UNITS)
}

/// Formats a byte count as bits, e.g. `8.0KBits` for 1024 bytes.
pub fn pretty_bits(bytes: u64) -> String {
    scaled(bytes as f64 * 8.0, &BIT_UNITS)
}

/// Formats a throughput in bytes per second, e.g. `1.1MB/s`.
pub fn pretty_speed(bytes_per_second: u64) -> String {
    format!("{}/s", pretty_size(bytes_per_second))
}

/// Formats a completion fraction (`0.0..=1.0`) as a percentage, e.g. `3.9%`.
///
/// Values outside the range are rendered as-is.
pub fn pretty_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Formats a duration as `m:ss`, or `h:mm:ss` from one hour upwards.
pub fn pretty_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total < 3600 {
        format!("{}:{:02}", total / 60, total % 60)
    } else {
        format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
    }
}
