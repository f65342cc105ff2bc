use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Replace the port of a `host:port` address
pub fn with_port(addr: &str, port: &str) -> String {
    match addr.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("{addr}:{port}"),
    }
}

/// Human readable age of an epoch-millis timestamp
pub fn age_since(timestamp: u64, now: u64) -> String {
    let age = Duration::from_millis(now.saturating_sub(timestamp));
    let secs = age.as_secs();
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_port() {
        assert_eq!(with_port("0.0.0.0:3000", "8080"), "0.0.0.0:8080");
        assert_eq!(with_port("localhost", "8080"), "localhost:8080");
    }

    #[test]
    fn formats_age() {
        assert_eq!(age_since(1_000, 31_000), "30s ago");
        assert_eq!(age_since(0, 7_200_000), "2h ago");
        assert_eq!(age_since(10, 0), "0s ago");
    }
}
