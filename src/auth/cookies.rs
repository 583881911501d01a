use super::BrowserCookie;
use crate::model::{SameSite, SessionCookie};
use chrono::DateTime;

/// Site whose cookies carry the session.
pub const TARGET_DOMAIN: &str = "thameswater.co.uk";

/// The only cookies the AJAX endpoints need: session id, two tracking ids
/// and the two load balancer affinity cookies.
pub const ALLOWED_COOKIE_NAMES: [&str; 5] = [
    "JSESSIONID",
    "da_sid",
    "da_lid",
    "ARRAffinity",
    "ARRAffinitySameSite",
];

fn domain_matches(domain: &str, target: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    domain.eq_ignore_ascii_case(target)
        || domain
            .to_ascii_lowercase()
            .ends_with(&format!(".{}", target.to_ascii_lowercase()))
}

/// Keeps allow-listed cookies set for the target site or one of its
/// subdomains; everything else is dropped.
pub fn filter_session_cookies(cookies: Vec<BrowserCookie>) -> Vec<SessionCookie> {
    cookies
        .into_iter()
        .filter(|c| domain_matches(&c.domain, TARGET_DOMAIN))
        .filter(|c| ALLOWED_COOKIE_NAMES.contains(&c.name.as_str()))
        .map(|c| SessionCookie {
            expiry: c
                .expiry
                .filter(|secs| *secs >= 0)
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            same_site: SameSite::from_webdriver(c.same_site.as_deref()),
            name: c.name,
            value: c.value,
            domain: c.domain,
            path: c.path,
            secure: c.secure,
        })
        .collect()
}
