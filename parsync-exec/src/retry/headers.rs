use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use httpdate::parse_http_date;

use crate::retry::config::{RetryHeadersConfig, VendorHeaderKind};

pub fn parse_retry_after(
    headers: &BTreeMap<String, String>,
    cfg: &RetryHeadersConfig,
    now: SystemTime,
) -> Option<Duration> {
    // Standard header wins.
    if let Some(v) = get_header_ci(headers, "retry-after") {
        if let Some(d) = parse_vendor_value(v, VendorHeaderKind::DeltaSeconds, now)
            .or_else(|| parse_vendor_value(v, VendorHeaderKind::HttpDate, now))
        {
            return Some(d);
        }
    }

    cfg.vendor_headers.iter().find_map(|vh| {
        get_header_ci(headers, &vh.name).and_then(|v| parse_vendor_value(v, vh.kind, now))
    })
}

fn parse_vendor_value(v: &str, kind: VendorHeaderKind, now: SystemTime) -> Option<Duration> {
    let v = v.trim();
    match kind {
        VendorHeaderKind::DeltaSeconds => v.parse::<u64>().ok().map(Duration::from_secs),
        VendorHeaderKind::DeltaMillis => v.parse::<u64>().ok().map(Duration::from_millis),
        VendorHeaderKind::UnixSeconds => {
            let ts = v.parse::<u64>().ok()?;
            let dt = SystemTime::UNIX_EPOCH + Duration::from_secs(ts);
            dt.duration_since(now).ok()
        }
        VendorHeaderKind::HttpDate => {
            let dt = parse_http_date(v).ok()?;
            dt.duration_since(now).ok()
        }
    }
}

fn get_header_ci<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
