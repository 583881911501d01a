use crate::error::ReadingsError;
use crate::model::{SameSite, SessionCookie};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client as HttpClient, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Cookies the site sets in the browser after login; the AJAX endpoints
/// refuse requests without them.
const MARKER_COOKIES: [(&str, &str); 2] = [("LoggedIntoMyAccount", "1"), ("loginCount", "1")];

/// An HTTP client carrying the logged-in session.
pub struct CookieJarSession {
    http_client: HttpClient,
    base_url: Url,
}

fn cookie_string(name: &str, value: &str, path: &str, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path={}", name, value, path);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn session_cookie_string(cookie: &SessionCookie, https: bool) -> String {
    let mut rendered = cookie_string(&cookie.name, &cookie.value, &cookie.path, cookie.secure && https);
    if let Some(expiry) = cookie.expiry {
        rendered.push_str(&expiry.format("; Expires=%a, %d %b %Y %H:%M:%S GMT").to_string());
    }
    if cookie.same_site != SameSite::Default {
        rendered.push_str(&format!("; SameSite={}", cookie.same_site));
    }
    rendered
}

impl CookieJarSession {
    /// Builds a client whose jar holds `cookies` for `base_url`.
    ///
    /// Cookies are stored host-only for the base URL rather than under the
    /// domain the browser reported.
    pub fn new(base_url: &str, referer_path: &str, cookies: &[SessionCookie]) -> Result<Self, ReadingsError> {
        let base_url = Url::parse(base_url).map_err(|e| ReadingsError::invalid_url(base_url, e))?;
        let https = base_url.scheme() == "https";

        let jar = Jar::default();
        for cookie in cookies {
            jar.add_cookie_str(&session_cookie_string(cookie, https), &base_url);
        }
        for (name, value) in MARKER_COOKIES {
            jar.add_cookie_str(&cookie_string(name, value, "/", https), &base_url);
        }

        let referer = base_url
            .join(referer_path)
            .map_err(|e| ReadingsError::invalid_url(referer_path, e))?;
        let mut headers = HeaderMap::new();
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            REFERER,
            HeaderValue::from_str(referer.as_str()).map_err(|e| ReadingsError::invalid_url(referer.as_str(), e))?,
        );

        let http_client = HttpClient::builder()
            .cookie_provider(Arc::new(jar))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn url(&self, path: &str) -> Result<Url, ReadingsError> {
        self.base_url
            .join(path)
            .map_err(|e| ReadingsError::invalid_url(path, e))
    }

    /// GETs `url` and decodes the JSON body; any non-2xx status is an error.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ReadingsError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReadingsError::server_error(status, body));
        }
        Ok(response.json::<T>().await?)
    }
}
