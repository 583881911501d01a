use super::Locator;
use std::time::Duration;

pub(crate) const COOKIE_CONSENT: Locator = Locator::Css("button#onetrust-accept-btn-handler");
pub(crate) const EMAIL_INPUT: Locator = Locator::XPath(r#"//input[@type="email" and @id="email"]"#);
pub(crate) const PASSWORD_INPUT: Locator =
    Locator::XPath(r#"//input[@type="password" and @id="password"]"#);
pub(crate) const SUBMIT_BUTTON: Locator = Locator::Css("button#next");
pub(crate) const DETAILS_PANEL: Locator = Locator::Css("div.details-panel");
pub(crate) const ACCOUNT_NUMBER: Locator =
    Locator::Css("div.details-panel span.detail-value.txt-actnumber");
pub(crate) const ACCOUNT_ADDRESS: Locator = Locator::Css("div.details-panel span.detail-value.txt-adr");

pub(crate) const VIEWPORT_WIDTH: u32 = 1280;
pub(crate) const VIEWPORT_HEIGHT: u32 = 1024;

/// Time the cookie banner needs for its entrance animation.
pub const CONSENT_ANIMATION: Duration = Duration::from_secs(2);

/// Which credential a typing step enters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Email,
    Password,
}

/// Account details read off the dashboard for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    AccountNumber,
    AccountAddress,
}

/// One action of the login flow.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginStep {
    Navigate(String),
    EmulateViewport { width: u32, height: u32 },
    WaitVisible(Locator),
    Pause(Duration),
    Click(Locator),
    WaitNotVisible(Locator),
    TypeText { locator: Locator, input: Input },
    WaitReady(Locator),
    ExtractText { locator: Locator, detail: Detail },
}

impl LoginStep {
    pub fn name(&self) -> &'static str {
        match self {
            LoginStep::Navigate(_) => "navigate",
            LoginStep::EmulateViewport { .. } => "emulate-viewport",
            LoginStep::WaitVisible(_) => "wait-visible",
            LoginStep::Pause(_) => "pause",
            LoginStep::Click(_) => "click",
            LoginStep::WaitNotVisible(_) => "wait-not-visible",
            LoginStep::TypeText { .. } => "type-text",
            LoginStep::WaitReady(_) => "wait-ready",
            LoginStep::ExtractText { .. } => "extract-text",
        }
    }
}

/// The login flow for the account site.
///
/// Reaching the details panel is the only proof of a valid session: a
/// rejected login renders no error, just no panel.
pub fn login_steps(login_url: &str, consent_animation: Duration) -> Vec<LoginStep> {
    vec![
        LoginStep::Navigate(login_url.to_string()),
        LoginStep::EmulateViewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
        },
        LoginStep::WaitVisible(COOKIE_CONSENT),
        LoginStep::Pause(consent_animation),
        LoginStep::Click(COOKIE_CONSENT),
        LoginStep::WaitNotVisible(COOKIE_CONSENT),
        LoginStep::TypeText {
            locator: EMAIL_INPUT,
            input: Input::Email,
        },
        LoginStep::TypeText {
            locator: PASSWORD_INPUT,
            input: Input::Password,
        },
        LoginStep::Click(SUBMIT_BUTTON),
        LoginStep::WaitReady(DETAILS_PANEL),
        LoginStep::ExtractText {
            locator: ACCOUNT_NUMBER,
            detail: Detail::AccountNumber,
        },
        LoginStep::ExtractText {
            locator: ACCOUNT_ADDRESS,
            detail: Detail::AccountAddress,
        },
    ]
}
