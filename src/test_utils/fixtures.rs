//! Test fixtures and common test data.
//!
//! JSON bodies shaped like the account's AJAX responses, plus the dates the
//! import tests revolve around.

use crate::readings::ConsumptionLine;
use serde_json::json;

/// Common test data constants.
pub mod constants {
    /// Meter serial used unless a test picks another one.
    pub const TEST_METER: &str = "324A123456";

    /// External `cluster` label value.
    pub const TEST_CLUSTER: &str = "test-cluster";

    /// A plausible cumulative meter read in liters.
    pub const TEST_READ_LITERS: f64 = 1_234_567.0;
}

/// Daily period values as the dashboard formats them.
pub mod dates {
    use crate::model::DayMarker;
    use chrono::{DateTime, NaiveDate, Utc};

    pub const FEB_28: &str = "28-02-2024";
    pub const MAR_01: &str = "01-03-2024";
    pub const MAR_02: &str = "02-03-2024";

    pub fn day(year: i32, month: u32, day: u32) -> DayMarker {
        DayMarker(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }

    /// Midnight UTC of the given day.
    pub fn midnight(year: i32, month: u32, d: u32) -> DateTime<Utc> {
        day(year, month, d).start()
    }
}

/// A `getMeters` body listing `meters` and one daily entry per value.
pub fn meters_json(meters: &[&str], daily: &[&str]) -> String {
    let daily: Vec<_> = daily
        .iter()
        .map(|value| json!({ "Key": format!("Day {}", value), "Value": value }))
        .collect();
    json!({
        "Yearly": [],
        "HalfYearly": [],
        "Monthly": [],
        "Daily": daily,
        "Meters": meters,
        "IsRecentCustomer": false,
        "IsError": false,
        "IsDataAvailable": true,
        "Lines": null,
        "TargetUsage": 0.0,
    })
    .to_string()
}

/// A `getSmartWaterMeterConsumptions` body with `(label, read)` lines.
pub fn consumption_json(meter: &str, lines: &[(&str, f64)]) -> String {
    let lines: Vec<_> = lines
        .iter()
        .map(|(label, read)| {
            json!({
                "Label": label,
                "Usage": 1.5,
                "Read": read,
                "IsEstimated": false,
                "MeterSerialNumberHis": meter,
            })
        })
        .collect();
    json!({
        "IsError": false,
        "IsDataAvailable": true,
        "Lines": lines,
        "IsConsumptionAvailable": true,
        "AlertsValues": null,
        "MyUsage": "",
    })
    .to_string()
}

/// Same as [`consumption_json`], built from typed lines.
pub fn consumption_json_from_lines(lines: &[ConsumptionLine]) -> String {
    let lines: Vec<_> = lines
        .iter()
        .map(|line| {
            json!({
                "Label": line.label,
                "Usage": 0.0,
                "Read": line.read,
                "IsEstimated": line.is_estimated,
                "MeterSerialNumberHis": line.meter_serial_number_his,
            })
        })
        .collect();
    json!({ "IsError": false, "IsDataAvailable": true, "Lines": lines }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_json_shape() {
        let body: serde_json::Value = serde_json::from_str(&meters_json(&["m1"], &[dates::MAR_01])).unwrap();
        assert_eq!(body["Meters"][0], "m1");
        assert_eq!(body["Daily"][0]["Value"], "01-03-2024");
    }

    #[test]
    fn test_midnight() {
        assert_eq!(dates::midnight(2024, 3, 1).to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }
}
