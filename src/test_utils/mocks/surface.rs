//! Scripted browser surface for driving the login flow without a browser.

use crate::auth::{AutomationSurface, BrowserCookie, Locator, SurfaceLauncher};
use crate::error::AuthError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Describes how scripted surfaces behave.
///
/// Steps are named like [`crate::auth::LoginStep::name`], plus `launch` and
/// `read-cookies`.
#[derive(Debug, Clone)]
pub struct MockScript {
    fail_at: Option<&'static str>,
    hang_at: Option<&'static str>,
    failing_attempts: Option<u32>,
    cookies: Vec<BrowserCookie>,
}

/// Cookies a logged-in browser reports: two session cookies worth keeping,
/// an analytics cookie and one from a third-party domain.
pub fn browser_cookies() -> Vec<BrowserCookie> {
    let cookie = |name: &str, domain: &str| BrowserCookie {
        name: name.to_string(),
        value: format!("{}-value", name),
        domain: domain.to_string(),
        path: "/".to_string(),
        expiry: Some(1_900_000_000),
        secure: true,
        same_site: Some("Lax".to_string()),
    };
    vec![
        cookie("JSESSIONID", ".thameswater.co.uk"),
        cookie("_ga", ".thameswater.co.uk"),
        cookie("da_sid", "myaccount.thameswater.co.uk"),
        cookie("JSESSIONID", "tracker.example.com"),
    ]
}

impl MockScript {
    /// Every step succeeds and the default cookies are returned.
    pub fn succeeding() -> Self {
        Self {
            fail_at: None,
            hang_at: None,
            failing_attempts: None,
            cookies: browser_cookies(),
        }
    }

    pub fn failing_at(mut self, step: &'static str) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// The step never completes.
    pub fn hanging_at(mut self, step: &'static str) -> Self {
        self.hang_at = Some(step);
        self
    }

    /// Only the first `attempts` launches misbehave; later ones succeed.
    pub fn failing_attempts(mut self, attempts: u32) -> Self {
        self.failing_attempts = Some(attempts);
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<BrowserCookie>) -> Self {
        self.cookies = cookies;
        self
    }

    fn misbehaves_on(&self, attempt: u32) -> bool {
        self.failing_attempts.map_or(true, |n| attempt <= n)
    }
}

/// Hands out [`MockSurface`]s and counts how many were launched and released.
pub struct MockLauncher {
    script: MockScript,
    launched: AtomicU32,
    released: Arc<AtomicU32>,
    closed: Arc<AtomicU32>,
    typed: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockLauncher {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            launched: AtomicU32::new(0),
            released: Arc::new(AtomicU32::new(0)),
            closed: Arc::new(AtomicU32::new(0)),
            typed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn launched(&self) -> u32 {
        self.launched.load(Ordering::SeqCst)
    }

    /// Surfaces closed explicitly or dropped unclosed.
    pub fn released(&self) -> u32 {
        self.released.load(Ordering::SeqCst)
    }

    /// Surfaces released through an explicit `close` call.
    pub fn closed(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }

    /// `(selector, text)` for every `type_text` call, across all surfaces.
    pub fn typed(&self) -> Vec<(String, String)> {
        self.typed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SurfaceLauncher for MockLauncher {
    async fn launch(&self) -> Result<Box<dyn AutomationSurface>, AuthError> {
        let attempt = self.launched.fetch_add(1, Ordering::SeqCst) + 1;
        let active = self.script.misbehaves_on(attempt);
        if active && self.script.fail_at == Some("launch") {
            return Err(AuthError::step_failed("launch", "browser failed to start"));
        }
        Ok(Box::new(MockSurface {
            script: self.script.clone(),
            active,
            closed: false,
            released: self.released.clone(),
            closes: self.closed.clone(),
            typed: self.typed.clone(),
        }))
    }
}

pub struct MockSurface {
    script: MockScript,
    active: bool,
    closed: bool,
    released: Arc<AtomicU32>,
    closes: Arc<AtomicU32>,
    typed: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockSurface {
    async fn step(&self, name: &'static str, locator: Option<Locator>) -> Result<(), AuthError> {
        if !self.active {
            return Ok(());
        }
        if self.script.hang_at == Some(name) {
            std::future::pending::<()>().await;
        }
        if self.script.fail_at == Some(name) {
            return Err(match (name.starts_with("wait-"), locator) {
                (true, Some(locator)) => AuthError::selector_timeout(locator.to_string(), "ready", 0),
                _ => AuthError::step_failed(name, "scripted failure"),
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl AutomationSurface for MockSurface {
    async fn navigate(&mut self, _url: &str) -> Result<(), AuthError> {
        self.step("navigate", None).await
    }

    async fn emulate_viewport(&mut self, _width: u32, _height: u32) -> Result<(), AuthError> {
        self.step("emulate-viewport", None).await
    }

    async fn wait_visible(&mut self, locator: Locator) -> Result<(), AuthError> {
        self.step("wait-visible", Some(locator)).await
    }

    async fn wait_not_visible(&mut self, locator: Locator) -> Result<(), AuthError> {
        self.step("wait-not-visible", Some(locator)).await
    }

    async fn wait_ready(&mut self, locator: Locator) -> Result<(), AuthError> {
        self.step("wait-ready", Some(locator)).await
    }

    async fn click(&mut self, locator: Locator) -> Result<(), AuthError> {
        self.step("click", Some(locator)).await
    }

    async fn type_text(&mut self, locator: Locator, text: &str) -> Result<(), AuthError> {
        self.step("type-text", Some(locator)).await?;
        self.typed
            .lock()
            .unwrap()
            .push((locator.to_string(), text.to_string()));
        Ok(())
    }

    async fn text(&mut self, locator: Locator) -> Result<String, AuthError> {
        self.step("extract-text", Some(locator)).await?;
        Ok(format!(" text of {} ", locator))
    }

    async fn cookies(&mut self) -> Result<Vec<BrowserCookie>, AuthError> {
        self.step("read-cookies", None).await?;
        Ok(self.script.cookies.clone())
    }

    async fn close(&mut self) -> Result<(), AuthError> {
        if !self.closed {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        self.release();
        Ok(())
    }
}

impl Drop for MockSurface {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_attempts_only_affect_early_launches() {
        let launcher = MockLauncher::new(MockScript::succeeding().failing_at("navigate").failing_attempts(1));

        let mut first = launcher.launch().await.unwrap();
        assert!(first.navigate("https://example.test").await.is_err());
        let mut second = launcher.launch().await.unwrap();
        assert!(second.navigate("https://example.test").await.is_ok());
    }

    #[tokio::test]
    async fn test_release_counted_once() {
        let launcher = MockLauncher::new(MockScript::succeeding());
        let mut surface = launcher.launch().await.unwrap();
        surface.close().await.unwrap();
        surface.close().await.unwrap();
        drop(surface);
        assert_eq!(launcher.released(), 1);
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn test_drop_is_not_a_close() {
        let launcher = MockLauncher::new(MockScript::succeeding());
        drop(launcher.launch().await.unwrap());
        assert_eq!(launcher.released(), 1);
        assert_eq!(launcher.closed(), 0);
    }
}
