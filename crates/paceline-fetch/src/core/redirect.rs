use crate::error::{FetchError, Result};

/// Requests allowed per dial, the first one included.
pub const MAX_REDIRECTS: usize = 10;

/// Decides whether a redirect may be followed before the caller is consulted.
///
/// `previous` is the number of requests already issued for this dial,
/// including the original one.
///
/// ```
/// use paceline_fetch::{FetchError, core::redirect_verdict};
///
/// assert!(redirect_verdict(true, 1).is_ok());
/// assert!(matches!(redirect_verdict(true, 10), Err(FetchError::TooManyRedirects)));
/// assert!(matches!(redirect_verdict(false, 1), Err(FetchError::RedirectsDisabled)));
/// ```
pub fn redirect_verdict(follow: bool, previous: usize) -> Result<()> {
    if !follow {
        return Err(FetchError::RedirectsDisabled);
    }
    if previous >= MAX_REDIRECTS {
        return Err(FetchError::TooManyRedirects);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follows_below_limit() {
        for previous in 0..MAX_REDIRECTS {
            assert!(redirect_verdict(true, previous).is_ok(), "hop {previous}");
        }
    }

    #[test]
    fn test_stops_at_limit() {
        assert!(matches!(redirect_verdict(true, MAX_REDIRECTS), Err(FetchError::TooManyRedirects)));
        assert!(matches!(redirect_verdict(true, 25), Err(FetchError::TooManyRedirects)));
    }

    #[test]
    fn test_disabled_wins_over_limit() {
        assert!(matches!(redirect_verdict(false, 0), Err(FetchError::RedirectsDisabled)));
        assert!(matches!(redirect_verdict(false, 50), Err(FetchError::RedirectsDisabled)));
    }
}
