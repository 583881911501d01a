use crate::error::{ParseError, ReadingsError};
use crate::model::DayMarker;
use chrono::{Datelike, NaiveDate};
use serde::Deserializer;
use serde_derive::Deserialize;

/// Daily period values look like `31-01-2024`.
pub const DAY_VALUE_FORMAT: &str = "%d-%m-%Y";

/// The site sends `null` rather than `[]` for empty lists.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    let values: Option<Vec<T>> = serde::Deserialize::deserialize(deserializer)?;
    Ok(values.unwrap_or_default())
}

/// A selectable day on the usage dashboard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeriodReading {
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetersResponse {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub daily: Vec<PeriodReading>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub meters: Vec<String>,
}

impl MetersResponse {
    /// The meter every import uses.
    pub fn first_meter(&self) -> Result<&str, ReadingsError> {
        self.meters
            .first()
            .map(String::as_str)
            .ok_or(ReadingsError::NoMeters)
    }

    /// Parses every daily period, in the order the site lists them.
    pub fn day_markers(&self) -> Result<Vec<DayMarker>, ParseError> {
        self.daily
            .iter()
            .map(|reading| parse_day_marker(&reading.value))
            .collect()
    }
}

pub fn parse_day_marker(text: &str) -> Result<DayMarker, ParseError> {
    NaiveDate::parse_from_str(text.trim(), DAY_VALUE_FORMAT)
        .map(DayMarker)
        .map_err(|e| ParseError::date_parse(text, e))
}

/// One hourly line of a day's consumption.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConsumptionLine {
    /// Time of day as `HH:MM`
    pub label: String,
    /// Cumulative meter read in liters
    pub read: f64,
    #[serde(default)]
    pub is_estimated: bool,
    pub meter_serial_number_his: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConsumptionResponse {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub lines: Vec<ConsumptionLine>,
}

/// Consumption query for a meter over an inclusive date range.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionRequest {
    pub meter: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ConsumptionRequest {
    /// Hourly readings for a single day.
    pub fn for_day(meter: impl Into<String>, day: DayMarker) -> Self {
        Self {
            meter: meter.into(),
            start: day.date(),
            end: day.date(),
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("meter", self.meter.clone()),
            ("startDate", self.start.day().to_string()),
            ("startMonth", self.start.month().to_string()),
            ("startYear", self.start.year().to_string()),
            ("endDate", self.end.day().to_string()),
            ("endMonth", self.end.month().to_string()),
            ("endYear", self.end.year().to_string()),
            ("granularity", "H".to_string()),
            ("premiseId", String::new()),
        ]
    }
}
