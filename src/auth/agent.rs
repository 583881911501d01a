use super::cookies::filter_session_cookies;
use super::steps::{login_steps, Detail, Input, LoginStep, CONSENT_ANIMATION};
use super::{AutomationSurface, SurfaceLauncher};
use crate::error::AuthError;
use crate::model::{Credentials, SessionCookie};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Upper bound on releasing a browser context after an attempt.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Logs into the account through a browser and hands back the session cookies.
pub struct AuthenticationAgent {
    credentials: Credentials,
    launcher: Arc<dyn SurfaceLauncher>,
    steps: Vec<LoginStep>,
}

#[derive(Debug, Default)]
struct AccountDetails {
    number: String,
    address: String,
}

impl AuthenticationAgent {
    pub fn new(credentials: Credentials, launcher: Arc<dyn SurfaceLauncher>, login_url: &str) -> Self {
        Self {
            credentials,
            launcher,
            steps: login_steps(login_url, CONSENT_ANIMATION),
        }
    }

    /// Replaces the login flow, e.g. to drop the animation pause.
    pub fn with_steps(mut self, steps: Vec<LoginStep>) -> Self {
        self.steps = steps;
        self
    }

    /// Runs one login attempt in a fresh browser context.
    ///
    /// The attempt gives up once `cancel` fires or `timeout` elapses. Either
    /// way the context is closed before this returns.
    #[tracing::instrument(name = "auth", skip_all)]
    pub async fn login(
        &self,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<Vec<SessionCookie>, AuthError> {
        tracing::info!(
            email = %self.credentials.email,
            "attempting login to thames water account"
        );
        let deadline = Instant::now() + timeout;
        let mut surface = tokio::select! {
            _ = cancel.cancelled() => return Err(AuthError::Cancelled),
            _ = sleep_until(deadline) => return Err(AuthError::AttemptTimeout(timeout.as_secs())),
            surface = self.launcher.launch() => surface?,
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
            _ = sleep_until(deadline) => Err(AuthError::AttemptTimeout(timeout.as_secs())),
            result = self.run_steps(surface.as_mut()) => result,
        };
        match tokio::time::timeout(CLOSE_TIMEOUT, surface.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to close browser context"),
            Err(_) => tracing::warn!("timed out closing browser context"),
        }

        let (details, cookies) = result?;
        tracing::info!(
            account_number = %details.number,
            account_address = %details.address,
            cookies = cookies.len(),
            "successfully logged in"
        );
        Ok(cookies)
    }

    async fn run_steps(
        &self,
        surface: &mut dyn AutomationSurface,
    ) -> Result<(AccountDetails, Vec<SessionCookie>), AuthError> {
        let mut details = AccountDetails::default();
        for step in &self.steps {
            self.run_step(surface, step, &mut details).await?;
        }

        let cookies = surface.cookies().await?;
        let total = cookies.len();
        let kept = filter_session_cookies(cookies);
        tracing::debug!(total, kept = kept.len(), "filtered browser cookies");
        Ok((details, kept))
    }

    async fn run_step(
        &self,
        surface: &mut dyn AutomationSurface,
        step: &LoginStep,
        details: &mut AccountDetails,
    ) -> Result<(), AuthError> {
        match step {
            LoginStep::Navigate(url) => {
                tracing::debug!(%url, "navigate");
                surface.navigate(url).await
            }
            LoginStep::EmulateViewport { width, height } => {
                surface.emulate_viewport(*width, *height).await
            }
            LoginStep::WaitVisible(locator) => {
                tracing::debug!(selector = %locator, "waiting until visible");
                surface.wait_visible(*locator).await
            }
            LoginStep::Pause(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(())
            }
            LoginStep::Click(locator) => surface.click(*locator).await,
            LoginStep::WaitNotVisible(locator) => surface.wait_not_visible(*locator).await,
            LoginStep::TypeText { locator, input } => match input {
                Input::Email => {
                    tracing::debug!(email = %self.credentials.email, "enter email");
                    surface.type_text(*locator, &self.credentials.email).await
                }
                Input::Password => {
                    tracing::debug!(
                        password = %self.credentials.masked_password(),
                        "enter password"
                    );
                    surface.type_text(*locator, &self.credentials.password).await
                }
            },
            LoginStep::WaitReady(locator) => {
                tracing::debug!(selector = %locator, "wait for account details to be shown");
                surface.wait_ready(*locator).await
            }
            LoginStep::ExtractText { locator, detail } => {
                let text = surface.text(*locator).await?;
                match detail {
                    Detail::AccountNumber => details.number = text.trim().to_string(),
                    Detail::AccountAddress => details.address = text.trim().to_string(),
                }
                Ok(())
            }
        }
    }
}
