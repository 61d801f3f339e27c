//! Registrable-domain extraction for rate limiting and image filtering.

/// Registrable domain of a URL string, lowercased.
///
/// Uses the public suffix list: `https://news.bbc.co.uk/x` yields
/// `bbc.co.uk`. Hosts without a registrable domain (IP addresses,
/// single-label hosts, bare public suffixes) fall back to the host itself.
/// Returns `None` when the input has no parseable host.
pub fn registrable_domain(input: &str) -> Option<String> {
    let parsed = url::Url::parse(input.trim()).ok()?;
    let host = parsed.host_str()?.trim_end_matches('.').to_lowercase();
    if host.is_empty() {
        return None;
    }

    let domain = match parsed.host() {
        Some(url::Host::Domain(_)) => psl::domain_str(&host).unwrap_or(host.as_str()).to_string(),
        _ => host,
    };
    Some(domain)
}

/// Bucket a URL is rate limited under. URLs without a host share the empty bucket.
pub fn rate_limit_domain(input: &str) -> String {
    registrable_domain(input).unwrap_or_default()
}
