//! Access to the account's AJAX endpoints once a session exists.

mod client;
mod session;
mod types;

pub use client::{ReadingsClient, DASHBOARD_PATH};
pub use session::CookieJarSession;
pub use types::{
    parse_day_marker, ConsumptionLine, ConsumptionRequest, ConsumptionResponse, MetersResponse,
    PeriodReading,
};
