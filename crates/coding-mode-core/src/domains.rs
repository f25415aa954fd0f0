//! Domain list normalization.
//!
//! User input arrives as anything from `LeetCode.com` to a pasted URL with a
//! path. Everything stored in the block list goes through [`sanitize`] first.

use url::Url;

/// Seed block list shipped with the binary, loaded on first run.
const BUNDLED_DEFAULT_DOMAINS: &str = include_str!("../assets/default_domains.json");

/// Sites whose top-frame visit auto-starts a session.
pub const PROGRAMMING_SITES: &[&str] = &[
    "leetcode.com",
    "www.leetcode.com",
    "codeforces.com",
    "www.codeforces.com",
    "codechef.com",
    "www.codechef.com",
    "hackerrank.com",
    "www.hackerrank.com",
    "atcoder.jp",
    "topcoder.com",
    "www.topcoder.com",
    "geeksforgeeks.org",
    "www.geeksforgeeks.org",
    "codingame.com",
    "www.codingame.com",
    "exercism.org",
    "www.exercism.org",
];

/// Normalize raw entries into hostnames, dropping blanks and duplicates.
///
/// Never fails: an entry that does not parse as a URL is kept verbatim
/// (trimmed) so bare hostnames the URL parser dislikes still make it in.
pub fn sanitize<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for entry in raw {
        let trimmed = entry.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        let host = hostname_of(trimmed).unwrap_or_else(|| trimmed.to_string());
        if !host.is_empty() && !out.contains(&host) {
            out.push(host);
        }
    }
    out
}

/// Hostname of `entry`, treating scheme-less input as `https://`.
///
/// `None` only when parsing fails; a parsed URL without a host yields `""`.
fn hostname_of(entry: &str) -> Option<String> {
    let parsed = if entry.contains("://") {
        Url::parse(entry)
    } else {
        Url::parse(&format!("https://{entry}"))
    };
    parsed
        .ok()
        .map(|url| url.host_str().unwrap_or_default().to_string())
}

/// Hostname of a full page URL, if it has one.
pub fn host_of_url(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Whether `url` belongs to `domain` or one of its subdomains.
///
/// Unparseable URLs fall back to a plain substring check.
pub fn url_matches_domain(url: &str, domain: &str) -> bool {
    match host_of_url(url) {
        Some(host) => host == domain || host.ends_with(&format!(".{domain}")),
        None => url.contains(domain),
    }
}

/// The bundled seed list, sanitized. An unreadable bundle yields an empty list.
pub fn bundled_defaults() -> Vec<String> {
    parse_domain_list(BUNDLED_DEFAULT_DOMAINS)
}

/// Parse a JSON array of domain strings, logging and returning an empty list
/// when the document is not an array of strings.
pub fn parse_domain_list(json: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(json) {
        Ok(domains) => sanitize(domains),
        Err(e) => {
            tracing::error!(error = %e, "unable to load default domains");
            Vec::new()
        }
    }
}
