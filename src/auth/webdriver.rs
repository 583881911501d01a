//! [`AutomationSurface`] backed by a W3C WebDriver server such as chromedriver.

use super::{AutomationSurface, BrowserCookie, Locator, SurfaceLauncher};
use crate::config::ChromeConfig;
use crate::error::AuthError;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, Response};
use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const NO_SUCH_ELEMENT: &str = "no such element";
const STALE_ELEMENT: &str = "stale element reference";

#[derive(Debug, Clone, Copy)]
enum ElementState {
    Ready,
    Visible,
    NotVisible,
}

impl ElementState {
    fn as_str(&self) -> &'static str {
        match self {
            ElementState::Ready => "ready",
            ElementState::Visible => "visible",
            ElementState::NotVisible => "not visible",
        }
    }
}

/// Starts a new WebDriver session per login attempt.
pub struct WebDriverLauncher {
    http_client: HttpClient,
    endpoint: String,
    headless: bool,
    sandbox: bool,
    element_timeout: Duration,
    poll_interval: Duration,
}

impl WebDriverLauncher {
    pub fn new(config: &ChromeConfig) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint: config.webdriver_url.trim_end_matches('/').to_string(),
            headless: config.headless,
            sandbox: config.sandbox,
            element_timeout: Duration::from_secs(config.element_timeout_sec),
            poll_interval: Duration::from_millis(100),
        }
    }

    #[cfg(test)]
    fn with_timeouts(mut self, element_timeout: Duration, poll_interval: Duration) -> Self {
        self.element_timeout = element_timeout;
        self.poll_interval = poll_interval;
        self
    }

    fn capabilities(&self) -> Value {
        let mut args = vec!["--window-size=1280,1024".to_string()];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        if !self.sandbox {
            args.push("--no-sandbox".to_string());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args },
                }
            }
        })
    }
}

#[async_trait]
impl SurfaceLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn AutomationSurface>, AuthError> {
        let response = self
            .http_client
            .post(format!("{}/session", self.endpoint))
            .json(&self.capabilities())
            .send()
            .await?;
        let value = decode(response).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::step_failed("launch", "response carries no sessionId"))?;
        tracing::debug!(session_id, "started WebDriver session");

        Ok(Box::new(WebDriverSurface {
            http_client: self.http_client.clone(),
            session_url: format!("{}/session/{}", self.endpoint, session_id),
            element_timeout: self.element_timeout,
            poll_interval: self.poll_interval,
            closed: false,
        }))
    }
}

/// One browser context. Dropping it without [`AutomationSurface::close`]
/// schedules the session deletion on the current runtime.
pub struct WebDriverSurface {
    http_client: HttpClient,
    session_url: String,
    element_timeout: Duration,
    poll_interval: Duration,
    closed: bool,
}

async fn decode(response: Response) -> Result<Value, AuthError> {
    let status = response.status();
    let body: Value = response.json().await?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    Err(AuthError::WebDriver {
        error: value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
        message: value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn is_error(err: &AuthError, kind: &str) -> bool {
    matches!(err, AuthError::WebDriver { error, .. } if error == kind)
}

/// Text of the first element matching a CSS selector in a page source.
fn select_text(source: &str, selector: &str) -> Result<Option<String>, AuthError> {
    let parsed = Selector::parse(selector)
        .map_err(|e| AuthError::step_failed("extract-text", format!("invalid selector '{}': {}", selector, e)))?;
    let document = Html::parse_document(source);
    Ok(document
        .select(&parsed)
        .next()
        .map(|element| element.text().collect::<String>()))
}

impl WebDriverSurface {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, AuthError> {
        let mut request = self
            .http_client
            .request(method, format!("{}{}", self.session_url, path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        decode(request.send().await?).await
    }

    async fn find(&self, locator: Locator) -> Result<Option<String>, AuthError> {
        let (using, value) = locator.strategy();
        match self
            .command(Method::POST, "/element", Some(json!({ "using": using, "value": value })))
            .await
        {
            Ok(found) => Ok(found
                .get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(str::to_string)),
            Err(err) if is_error(&err, NO_SUCH_ELEMENT) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn is_displayed(&self, element: &str) -> Result<bool, AuthError> {
        match self
            .command(Method::GET, &format!("/element/{}/displayed", element), None)
            .await
        {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            Err(err) if is_error(&err, STALE_ELEMENT) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Polls until the element reaches `state`, returning its reference if present.
    async fn wait_for(&self, locator: Locator, state: ElementState) -> Result<Option<String>, AuthError> {
        let deadline = Instant::now() + self.element_timeout;
        loop {
            let element = self.find(locator).await?;
            let satisfied = match (&state, &element) {
                (ElementState::Ready, Some(_)) => true,
                (ElementState::Visible, Some(id)) => self.is_displayed(id).await?,
                (ElementState::NotVisible, Some(id)) => !self.is_displayed(id).await?,
                (ElementState::NotVisible, None) => true,
                (_, None) => false,
            };
            if satisfied {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(AuthError::selector_timeout(
                    locator.to_string(),
                    state.as_str(),
                    self.element_timeout.as_secs(),
                ));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn element(&self, locator: Locator, state: ElementState) -> Result<String, AuthError> {
        self.wait_for(locator, state)
            .await?
            .ok_or_else(|| AuthError::step_failed(state.as_str(), format!("'{}' disappeared", locator)))
    }
}

#[async_trait]
impl AutomationSurface for WebDriverSurface {
    async fn navigate(&mut self, url: &str) -> Result<(), AuthError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn emulate_viewport(&mut self, width: u32, height: u32) -> Result<(), AuthError> {
        self.command(
            Method::POST,
            "/window/rect",
            Some(json!({ "width": width, "height": height })),
        )
        .await
        .map(|_| ())
    }

    async fn wait_visible(&mut self, locator: Locator) -> Result<(), AuthError> {
        self.wait_for(locator, ElementState::Visible).await.map(|_| ())
    }

    async fn wait_not_visible(&mut self, locator: Locator) -> Result<(), AuthError> {
        self.wait_for(locator, ElementState::NotVisible).await.map(|_| ())
    }

    async fn wait_ready(&mut self, locator: Locator) -> Result<(), AuthError> {
        self.wait_for(locator, ElementState::Ready).await.map(|_| ())
    }

    async fn click(&mut self, locator: Locator) -> Result<(), AuthError> {
        let element = self.element(locator, ElementState::Visible).await?;
        self.command(Method::POST, &format!("/element/{}/click", element), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn type_text(&mut self, locator: Locator, text: &str) -> Result<(), AuthError> {
        let element = self.element(locator, ElementState::Ready).await?;
        self.command(
            Method::POST,
            &format!("/element/{}/value", element),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn text(&mut self, locator: Locator) -> Result<String, AuthError> {
        match locator {
            Locator::Css(selector) => {
                let source = self.command(Method::GET, "/source", None).await?;
                let source = source.as_str().unwrap_or_default();
                select_text(source, selector)?
                    .ok_or_else(|| AuthError::step_failed("extract-text", format!("'{}' not found", selector)))
            }
            Locator::XPath(_) => {
                let element = self.element(locator, ElementState::Ready).await?;
                let text = self
                    .command(Method::GET, &format!("/element/{}/text", element), None)
                    .await?;
                Ok(text.as_str().unwrap_or_default().to_string())
            }
        }
    }

    async fn cookies(&mut self) -> Result<Vec<BrowserCookie>, AuthError> {
        let value = self.command(Method::GET, "/cookie", None).await?;
        serde_json::from_value(value).map_err(|e| AuthError::step_failed("read-cookies", e))
    }

    async fn close(&mut self) -> Result<(), AuthError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let response = self.http_client.delete(&self.session_url).send().await?;
        decode(response).await.map(|_| ())
    }
}

impl Drop for WebDriverSurface {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(session = %self.session_url, "no runtime to release WebDriver session");
            return;
        };
        let http_client = self.http_client.clone();
        let session_url = self.session_url.clone();
        handle.spawn(async move {
            if let Err(e) = http_client.delete(&session_url).send().await {
                tracing::warn!(session = %session_url, error = %e, "failed to release WebDriver session");
            }
        });
    }
}
