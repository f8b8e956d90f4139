use std::time::Duration;

/// Backoff between attempts of the same item. The attempt budget itself comes from the
/// run's `SyncConfig::retry_attempts`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub base_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    pub headers: RetryHeadersConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            factor: 2.0,
            max_delay: Duration::from_secs(30),
            headers: RetryHeadersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryHeadersConfig {
    /// Platform-specific rate-limit headers consulted after `Retry-After`.
    pub vendor_headers: Vec<RetryVendorHeader>,
}

impl RetryHeadersConfig {
    /// Headers commonly sent by commerce platforms when throttling.
    pub fn commerce_platforms() -> Self {
        Self {
            vendor_headers: vec![
                RetryVendorHeader {
                    name: "X-Rate-Limit-Time-Reset-Ms".to_string(),
                    kind: VendorHeaderKind::DeltaMillis,
                },
                RetryVendorHeader {
                    name: "X-RateLimit-Reset".to_string(),
                    kind: VendorHeaderKind::UnixSeconds,
                },
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryVendorHeader {
    pub name: String,
    pub kind: VendorHeaderKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorHeaderKind {
    /// delta seconds
    DeltaSeconds,
    /// delta milliseconds
    DeltaMillis,
    /// unix epoch seconds
    UnixSeconds,
    /// HTTP-date
    HttpDate,
}
