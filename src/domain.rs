use url::Url;

/// Derives the cache key for a URL: the last two labels of its hostname,
/// lowercased.
///
/// This is a naive two-label rule, not public-suffix aware, so
/// `www.example.co.uk` maps to `co.uk`. Every component keys the cache the
/// same way, so the rule is kept stable.
///
/// Returns an empty string for anything that does not parse as a URL with a
/// host. Callers must never use the empty string as a cache key.
pub fn domain_from_url(url: &str) -> String {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return String::new(),
    };

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
        _ => return String::new(),
    };

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 2 {
        parts[parts.len() - 2..].join(".")
    } else {
        host
    }
}

/// Two domains are related when both are non-empty and either contains the
/// other. Symmetric by construction.
pub fn is_related_domain(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(b) || b.contains(a)
}

/// The first label of a domain, capitalised (`example.com` -> `Example`).
pub fn display_name(domain: &str) -> String {
    let first = domain.split('.').next().unwrap_or_default();
    let mut chars = first.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
