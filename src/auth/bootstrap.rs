use super::AuthenticationAgent;
use crate::error::{AuthError, SessionError};
use crate::model::SessionCookie;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// When and how often a failed login is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// `None` keeps retrying until the run is cancelled.
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub exponential_backoff: bool,
    pub max_delay: Duration,
    pub retry_if: fn(&AuthError) -> bool,
}

fn always_retry(_: &AuthError) -> bool {
    true
}

impl RetryPolicy {
    /// Retries every error until cancelled, backing off from 1s up to 60s.
    pub fn until_cancelled() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::from_secs(1),
            exponential_backoff: true,
            max_delay: Duration::from_secs(60),
            retry_if: always_retry,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    pub fn with_retry_if(mut self, predicate: fn(&AuthError) -> bool) -> Self {
        self.retry_if = predicate;
        self
    }

    /// Delay after the given (1-based) failed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.exponential_backoff {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        };
        delay.min(self.max_delay)
    }

    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }

    pub fn should_retry(&self, error: &AuthError) -> bool {
        (self.retry_if)(error)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::until_cancelled()
    }
}

type AttemptObserver = Box<dyn Fn(u32, &AuthError) + Send + Sync>;

fn log_failed_attempt(attempt: u32, err: &AuthError) {
    tracing::warn!(attempt, err = %err, "login failed");
}

/// Repeats login attempts until one yields cookies or the run is cancelled.
pub struct SessionBootstrap {
    agent: AuthenticationAgent,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    observer: AttemptObserver,
}

impl SessionBootstrap {
    pub fn new(agent: AuthenticationAgent, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            agent,
            policy,
            attempt_timeout,
            observer: Box::new(log_failed_attempt),
        }
    }

    /// Called with the attempt number and error after every failed attempt.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &AuthError) + Send + Sync + 'static,
    {
        self.observer = Box::new(observer);
        self
    }

    #[tracing::instrument(name = "bootstrap", skip_all)]
    pub async fn establish(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<SessionCookie>, SessionError> {
        let mut attempt = 0u32;
        let mut last_error: Option<AuthError> = None;

        while !cancel.is_cancelled() && self.policy.allows_attempt(attempt + 1) {
            attempt += 1;

            let err = match self.agent.login(cancel, self.attempt_timeout).await {
                Ok(cookies) => return Ok(cookies),
                Err(AuthError::Cancelled) => break,
                Err(err) => err,
            };

            (self.observer)(attempt, &err);
            let retry = self.policy.should_retry(&err);
            last_error = Some(err);
            if !retry {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.policy.delay_for_attempt(attempt)) => {}
            }
        }

        match last_error {
            Some(last) => Err(SessionError::Exhausted {
                attempts: attempt,
                last,
            }),
            None => Err(SessionError::Cancelled),
        }
    }
}
