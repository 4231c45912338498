use std::time::Duration;

use tokio::time::Instant;

use crate::error::{FetchError, Result};

/// Offsets past this horizon are treated as "never". Report periods are
/// clamped to it, which keeps every `Instant` sum in range.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Splits the general timeout into `(dial, read)`; a specific timeout always
/// wins over the general one.
pub fn resolve_timeouts(
    general: Option<Duration>,
    dial: Option<Duration>,
    read: Option<Duration>,
) -> (Option<Duration>, Option<Duration>) {
    (dial.or(general), read.or(general))
}

/// Resolves the absolute deadline. An explicit instant wins over a duration,
/// which is anchored at `now`. A duration too large to represent means no
/// deadline at all.
pub fn resolve_deadline(
    at: Option<Instant>,
    within: Option<Duration>,
    now: Instant,
) -> Option<Instant> {
    at.or_else(|| within.and_then(|d| now.checked_add(d)))
}

/// Validates a reporting interval and clamps it to [`FAR_FUTURE`].
pub fn report_period(interval: Duration) -> Result<Duration> {
    if interval.is_zero() {
        return Err(FetchError::InvalidRequest("report interval must be non-zero".into()));
    }
    Ok(interval.min(FAR_FUTURE))
}

/// End of the window starting at `from`, saturating at [`FAR_FUTURE`].
pub fn window_end(from: Instant, period: Duration) -> Instant {
    from.checked_add(period.min(FAR_FUTURE))
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}

/// Idle time is counted in whole reporting windows, not wall clock: the
/// transfer is idle for `idle_ticks * interval`, and times out once that
/// strictly exceeds the read timeout.
pub fn idle_exceeded(idle_ticks: u32, interval: Duration, read_timeout: Option<Duration>) -> bool {
    match read_timeout {
        Some(limit) => interval.saturating_mul(idle_ticks) > limit,
        None => false,
    }
}

pub fn deadline_passed(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_some_and(|d| now >= d)
}
