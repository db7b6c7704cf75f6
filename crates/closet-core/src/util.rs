//! Shared utility functions used across multiple modules.

use std::sync::atomic::{AtomicI64, Ordering};

use url::Url;

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Canonicalize a URL for analytics storage and comparison.
///
/// Query string and fragment are removed so tracking parameters and session
/// tokens never reach the store. Returns `None` for anything that is not an
/// absolute http(s) URL.
///
/// ```
/// use closet_core::util::canonicalize_url;
///
/// assert_eq!(
///     canonicalize_url("https://shop.example.com/item/42?utm_source=x#reviews").as_deref(),
///     Some("https://shop.example.com/item/42")
/// );
/// assert_eq!(canonicalize_url("not a url"), None);
/// ```
pub fn canonicalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// Source of wall-clock time for the store.
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in milliseconds.
    fn now_millis(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        unix_timestamp_millis()
    }
}

/// Clock that only moves when told to. Used by tests and replay tooling.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub const fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" https://example.com ".to_string())),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn canonicalize_url_strips_query_and_fragment() {
        assert_eq!(
            canonicalize_url("https://a.com/p?session=abc&ref=mail#top").as_deref(),
            Some("https://a.com/p")
        );
        assert_eq!(
            canonicalize_url("  http://a.com/cart  ").as_deref(),
            Some("http://a.com/cart")
        );
    }

    #[test]
    fn canonicalize_url_normalizes_bare_host() {
        assert_eq!(
            canonicalize_url("https://a.com").as_deref(),
            Some("https://a.com/")
        );
    }

    #[test]
    fn canonicalize_url_rejects_unparseable_and_foreign_schemes() {
        assert_eq!(canonicalize_url(""), None);
        assert_eq!(canonicalize_url("a.com/item"), None);
        assert_eq!(canonicalize_url("javascript:alert(1)"), None);
        assert_eq!(canonicalize_url("file:///etc/passwd"), None);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now_millis(), 1_500);
        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
    }
}
