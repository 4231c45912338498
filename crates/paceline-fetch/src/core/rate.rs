use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Extrapolates the bytes moved during one reporting window to bytes per second.
///
/// The division is done in floating point, so windows longer than one second
/// still report a non-zero rate while bytes are flowing.
///
/// ```
/// use std::time::Duration;
/// use paceline_fetch::core::instant_rate;
///
/// assert_eq!(instant_rate(500, Duration::from_millis(500)), 1000);
/// assert_eq!(instant_rate(3000, Duration::from_secs(2)), 1500);
/// ```
pub fn instant_rate(window_bytes: u64, interval: Duration) -> u64 {
    if interval.is_zero() {
        return window_bytes;
    }
    (window_bytes as f64 / interval.as_secs_f64()) as u64
}

/// Average throughput over a whole transfer.
///
/// A transfer that took no measurable time reports its total as the rate.
pub fn average_rate(total_bytes: u64, elapsed: Duration) -> u64 {
    if elapsed.is_zero() {
        return total_bytes;
    }
    (total_bytes as f64 / elapsed.as_secs_f64()) as u64
}

/// Byte budget of one reporting window for a given speed cap:
/// `speed_cap * interval / 1s`. Zero means unthrottled.
pub fn window_cap(speed_cap: u64, interval: Duration) -> u64 {
    let cap = u128::from(speed_cap) * interval.as_nanos() / NANOS_PER_SEC;
    u64::try_from(cap).unwrap_or(u64::MAX)
}

/// Completed fraction, or `None` when the length is unknown or zero.
///
/// Values above `1.0` are passed through: they mean the body was longer than
/// the declared content length.
pub fn fraction(bytes: u64, content_length: Option<u64>) -> Option<f64> {
    match content_length {
        Some(length) if length > 0 => Some(bytes as f64 / length as f64),
        _ => None,
    }
}
