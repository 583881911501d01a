//! Browser-driven login.
//!
//! The login flow is a fixed list of [`LoginStep`]s executed by the
//! [`AuthenticationAgent`] against an [`AutomationSurface`]. The only surface
//! shipped here talks W3C WebDriver; tests drive the agent with a scripted
//! mock instead.

mod agent;
mod bootstrap;
mod cookies;
mod steps;
mod webdriver;

pub use agent::AuthenticationAgent;
pub use bootstrap::{RetryPolicy, SessionBootstrap};
pub use cookies::{filter_session_cookies, ALLOWED_COOKIE_NAMES, TARGET_DOMAIN};
pub use steps::{login_steps, Detail, Input, LoginStep};
pub use webdriver::WebDriverLauncher;

use crate::error::AuthError;
use async_trait::async_trait;
use serde_derive::Deserialize;
use std::fmt;

/// How an element is located on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Css(&'static str),
    XPath(&'static str),
}

impl Locator {
    /// The WebDriver `using` strategy and selector value.
    pub fn strategy(&self) -> (&'static str, &'static str) {
        match self {
            Locator::Css(s) => ("css selector", *s),
            Locator::XPath(s) => ("xpath", *s),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Locator::Css(s) | Locator::XPath(s) => write!(f, "{}", s),
        }
    }
}

/// A cookie as the browser reports it, before filtering.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Seconds since the epoch; absent for session cookies
    #[serde(default)]
    pub expiry: Option<i64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: Option<String>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// The narrow set of browser capabilities the login flow needs.
///
/// Waits are bounded by the surface's own element timeout.
#[async_trait]
pub trait AutomationSurface: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), AuthError>;
    async fn emulate_viewport(&mut self, width: u32, height: u32) -> Result<(), AuthError>;
    async fn wait_visible(&mut self, locator: Locator) -> Result<(), AuthError>;
    async fn wait_not_visible(&mut self, locator: Locator) -> Result<(), AuthError>;
    /// Waits until the element is present in the DOM.
    async fn wait_ready(&mut self, locator: Locator) -> Result<(), AuthError>;
    /// Clicks the element once it is visible.
    async fn click(&mut self, locator: Locator) -> Result<(), AuthError>;
    async fn type_text(&mut self, locator: Locator, text: &str) -> Result<(), AuthError>;
    async fn text(&mut self, locator: Locator) -> Result<String, AuthError>;
    async fn cookies(&mut self) -> Result<Vec<BrowserCookie>, AuthError>;
    /// Releases the browser context. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), AuthError>;
}

/// Creates a fresh browser context per login attempt.
#[async_trait]
pub trait SurfaceLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn AutomationSurface>, AuthError>;
}
