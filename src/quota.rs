//! Daily API quota, as reported by the `x-exl-api-remaining` response header.
//!
//! Alma tells callers how many requests they have left for the day on every
//! response. The client only reads the value; it never throttles on it.

use http::HeaderMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Header carrying the number of API calls left today.
pub const REMAINING_HEADER: &str = "x-exl-api-remaining";

/// Value reported when the quota is unknown.
pub const UNKNOWN_REMAINING: i64 = -1;

/// Reads the remaining call count from response headers.
///
/// Returns `None` when the header is missing or not an integer.
///
/// # Examples
///
/// ```
/// use alma_api::quota::parse_remaining;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-exl-api-remaining", "99812".parse().unwrap());
///
/// assert_eq!(parse_remaining(&headers), Some(99812));
/// assert_eq!(parse_remaining(&HeaderMap::new()), None);
/// ```
pub fn parse_remaining(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(REMAINING_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// The last remaining-calls value seen by a client.
///
/// Concurrent requests may race to update it; the last writer wins.
#[derive(Debug)]
pub(crate) struct QuotaTracker {
    last_seen: AtomicI64,
}

impl QuotaTracker {
    pub(crate) fn new() -> Self {
        Self {
            last_seen: AtomicI64::new(UNKNOWN_REMAINING),
        }
    }

    /// Records the header value if the response carried one.
    pub(crate) fn observe(&self, headers: &HeaderMap) -> Option<i64> {
        let remaining = parse_remaining(headers)?;
        self.last_seen.store(remaining, Ordering::Relaxed);
        Some(remaining)
    }

    pub(crate) fn last_seen(&self) -> i64 {
        self.last_seen.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_parse_remaining_rejects_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(REMAINING_HEADER, HeaderValue::from_static("plenty"));
        assert_eq!(parse_remaining(&headers), None);

        headers.insert(REMAINING_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(parse_remaining(&headers), Some(42));
    }

    #[test]
    fn test_tracker_keeps_last_value() {
        let tracker = QuotaTracker::new();
        assert_eq!(tracker.last_seen(), UNKNOWN_REMAINING);

        let mut headers = HeaderMap::new();
        headers.insert(REMAINING_HEADER, HeaderValue::from_static("100"));
        assert_eq!(tracker.observe(&headers), Some(100));

        assert_eq!(tracker.observe(&HeaderMap::new()), None);
        assert_eq!(tracker.last_seen(), 100);

        headers.insert(REMAINING_HEADER, HeaderValue::from_static("99"));
        tracker.observe(&headers);
        assert_eq!(tracker.last_seen(), 99);
    }
}
