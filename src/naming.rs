//! Application-name derivation for secret keys.
//!
//! Turns an application URL into the uppercase prefix used for every
//! secret in a deposit: `https://app.pipedrive.com` → `PIPEDRIVE`, so
//! keys come out as `PIPEDRIVE_URL`, `PIPEDRIVE_API_TOKEN`, ...

use url::Url;

use crate::errors::{Result, SecretZeroError};

/// Second-level labels that form a public suffix together with a
/// two-letter country TLD (`example.co.uk`, `school.ac.jp`, ...).
const SECOND_LEVEL_LABELS: &[&str] = &[
    "co", "com", "ac", "gov", "edu", "org", "net", "mil", "nom", "sch",
];

/// Subdomains that never name the application itself.
const COMMON_SUBDOMAINS: &[&str] = &["app", "www", "api", "web", "portal", "admin", "dashboard"];

/// Returned by `extract_domain` when the URL has no usable host.
pub const UNKNOWN_DOMAIN: &str = "unknown-domain";

/// Derive the uppercase application prefix from `url`.
///
/// Rules, in order:
/// 1. Drop the TLD (and a `co`-style second level under a 2-letter TLD).
/// 2. If exactly one label is left it is the name, even if it looks like
///    a common subdomain (`app.com` → `APP`).
/// 3. Otherwise drop common subdomains and take the last label left.
pub fn derive_app_prefix(url: &str) -> Result<String> {
    let host = hostname(url).ok_or_else(|| SecretZeroError::UrlParse(format!("'{url}' has no hostname")))?;

    let mut labels: Vec<&str> = host.split('.').collect();

    if labels.len() >= 2 {
        let tld = labels.pop().unwrap_or_default();

        if labels.len() >= 2
            && tld.len() == 2
            && labels
                .last()
                .is_some_and(|sld| SECOND_LEVEL_LABELS.contains(&sld.to_ascii_lowercase().as_str()))
        {
            labels.pop();
        }
    }

    let name = if labels.len() == 1 {
        labels[0]
    } else {
        labels
            .into_iter()
            .filter(|label| !COMMON_SUBDOMAINS.contains(&label.to_ascii_lowercase().as_str()))
            .last()
            .unwrap_or_default()
    };

    if name.is_empty() {
        return Err(SecretZeroError::UrlParse(format!(
            "could not extract application name from '{url}'"
        )));
    }

    Ok(name.to_uppercase())
}

/// Hostname of `url` for audit metadata, or `"unknown-domain"`.
pub fn extract_domain(url: &str) -> String {
    hostname(url).unwrap_or_else(|| UNKNOWN_DOMAIN.to_string())
}

fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
