use url::{Host, Url};

/// Reduces a feed URL to the tracker's root domain without its public suffix.
///
/// `https://rss.tracker.org/feed` → `tracker`,
/// `https://feeds.example.co.uk/rss` → `example`.
#[must_use]
pub fn root_domain(feed_url: &str) -> Option<String> {
    let url = Url::parse(feed_url).ok()?;
    match url.host()? {
        Host::Domain(host) => reduce_host(host),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

fn reduce_host(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    if let (Some(domain), Some(suffix)) = (psl::domain_str(&host), psl::suffix_str(&host))
        && let Some(label) = domain
            .strip_suffix(suffix)
            .and_then(|rest| rest.strip_suffix('.'))
        && !label.is_empty()
    {
        return Some(label.to_string());
    }

    // Bare suffixes and single labels such as `localhost`.
    host.split('.')
        .find(|label| !label.is_empty())
        .map(str::to_string)
}

/// Whether a show's tracker restriction admits the given feed domain.
#[must_use]
pub fn tracker_allows(restriction: &str, feed_domain: Option<&str>) -> bool {
    let restriction = restriction.trim();
    if restriction.is_empty() || restriction == crate::constants::ANY_TRACKER {
        return true;
    }

    feed_domain.is_some_and(|domain| restriction.eq_ignore_ascii_case(domain))
}
