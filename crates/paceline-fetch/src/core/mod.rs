//! Pure transformations behind the transfer engine.
//!
//! Nothing in here performs I/O or reads the clock: every function takes the
//! instant or counters it needs, which keeps the timing policies testable.

mod rate;
mod redirect;
mod timing;

pub use rate::{average_rate, fraction, instant_rate, window_cap};
pub use redirect::{MAX_REDIRECTS, redirect_verdict};
pub use timing::{
    FAR_FUTURE, deadline_passed, idle_exceeded, report_period, resolve_deadline, resolve_timeouts,
    window_end,
};
