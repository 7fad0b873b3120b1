//! Built-in string format predicates.
//!
//! These populate a fresh [`FormatRegistry`](crate::registry::FormatRegistry)
//! and are restored by its `reset()`.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Names of the built-in formats.
pub const BUILTIN_FORMATS: &[&str] = &[
    "date", "date-time", "email", "hostname", "ipv4", "ipv6", "regex", "time", "uri", "uuid",
];

static TIME: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{2}:\d{2}:\d{2})(\.\d+)?(z|[+-]\d{2}:\d{2})$").ok()
});

static EMAIL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
    )
    .ok()
});

static URI: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:[^\s]*$").ok());

fn matches(re: &Lazy<Option<Regex>>, s: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(s))
}

/// Look up a built-in predicate by name.
pub fn builtin(name: &str) -> Option<fn(&str) -> bool> {
    let f: fn(&str) -> bool = match name {
        "date-time" => is_date_time,
        "date" => is_date,
        "time" => is_time,
        "email" => is_email,
        "uuid" => is_uuid,
        "uri" => is_uri,
        "ipv4" => is_ipv4,
        "ipv6" => is_ipv6,
        "hostname" => is_hostname,
        "regex" => is_regex,
        _ => return None,
    };
    Some(f)
}

/// RFC 3339 date-time.
pub fn is_date_time(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
}

/// RFC 3339 full-date.
pub fn is_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// RFC 3339 full-time, offset required.
pub fn is_time(s: &str) -> bool {
    let Some(re) = TIME.as_ref() else {
        return false;
    };
    re.captures(s)
        .and_then(|c| c.get(1))
        .is_some_and(|hms| NaiveTime::parse_from_str(hms.as_str(), "%H:%M:%S").is_ok())
}

pub fn is_email(s: &str) -> bool {
    matches(&EMAIL, s)
}

/// Hyphenated UUID of any version.
pub fn is_uuid(s: &str) -> bool {
    s.len() == 36 && uuid::Uuid::parse_str(s).is_ok()
}

pub fn is_uri(s: &str) -> bool {
    matches(&URI, s)
}

pub fn is_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

pub fn is_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

/// RFC 1123 host name.
pub fn is_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

pub fn is_regex(s: &str) -> bool {
    Regex::new(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_is_resolvable() {
        for name in BUILTIN_FORMATS {
            assert!(builtin(name).is_some(), "missing {name}");
        }
        assert!(builtin("credit-card").is_none());
    }

    #[test]
    fn test_date_and_time_formats() {
        assert!(is_date_time("2024-02-29T12:30:00Z"));
        assert!(is_date_time("2024-02-29T12:30:00.5+05:30"));
        assert!(!is_date_time("2024-02-29 12:30:00"));
        assert!(is_date("2024-02-29"));
        assert!(!is_date("2023-02-29"));
        assert!(!is_date("2024-2-9"));
        assert!(is_time("23:59:59Z"));
        assert!(is_time("08:00:00.123-02:00"));
        assert!(!is_time("24:00:00Z"));
        assert!(!is_time("08:00:00"));
    }

    #[test]
    fn test_network_formats() {
        assert!(is_ipv4("192.168.0.1"));
        assert!(!is_ipv4("256.0.0.1"));
        assert!(is_ipv6("::1"));
        assert!(!is_ipv6("1::2::3"));
        assert!(is_hostname("api.example-host.com"));
        assert!(!is_hostname("-bad.example"));
        assert!(!is_hostname("a..b"));
        assert!(is_uri("https://example.com/path?q=1"));
        assert!(!is_uri("not a uri"));
    }

    #[test]
    fn test_identifier_formats() {
        assert!(is_uuid("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!is_uuid("67e5504410b1426f9247bb680e5fe0c8"));
        assert!(is_email("first.last@example.org"));
        assert!(!is_email("first.last@"));
        assert!(is_regex("^[a-z]+$"));
        assert!(!is_regex("(unclosed"));
    }
}
