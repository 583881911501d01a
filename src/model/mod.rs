//! Core data types shared by the login, download, storage and shipping stages.

pub mod labels;
pub mod types;

pub use labels::{LabelSet, JOB_NAME, METRIC_NAME, METRIC_NAME_LABEL};
pub use types::{Credentials, DayMarker, Sample, SameSite, SessionCookie};
