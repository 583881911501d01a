//! Test data builders for labels, samples and consumption lines.

use crate::model::{LabelSet, Sample, JOB_NAME, METRIC_NAME, METRIC_NAME_LABEL};
use crate::readings::ConsumptionLine;
use crate::test_utils::fixtures::constants;
use chrono::{DateTime, Utc};

/// Builder for the label set every imported sample carries.
#[derive(Debug)]
pub struct TestLabelSetBuilder {
    labels: LabelSet,
}

impl TestLabelSetBuilder {
    /// Creates a builder with the test cluster label and the default meter.
    pub fn new() -> Self {
        let labels = LabelSet::new()
            .with("cluster", constants::TEST_CLUSTER)
            .with("job", JOB_NAME)
            .with(METRIC_NAME_LABEL, METRIC_NAME)
            .with("meter", constants::TEST_METER);
        Self { labels }
    }

    pub fn with_meter(mut self, meter: impl Into<String>) -> Self {
        self.labels.set("meter", meter);
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.set(name, value);
        self
    }

    pub fn build(self) -> LabelSet {
        self.labels
    }
}

/// Builder for a [`Sample`].
#[derive(Debug)]
pub struct TestSampleBuilder {
    labels: LabelSet,
    timestamp: DateTime<Utc>,
    value: f64,
}

impl TestSampleBuilder {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            labels: TestLabelSetBuilder::new().build(),
            timestamp,
            value: constants::TEST_READ_LITERS,
        }
    }

    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn build(self) -> Sample {
        Sample {
            labels: self.labels,
            timestamp: self.timestamp,
            value: self.value,
        }
    }
}

/// Builder for the hourly lines of one day.
#[derive(Debug)]
pub struct TestConsumptionLinesBuilder {
    meter: String,
    lines: Vec<ConsumptionLine>,
}

impl TestConsumptionLinesBuilder {
    pub fn new() -> Self {
        Self {
            meter: constants::TEST_METER.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn with_meter(mut self, meter: impl Into<String>) -> Self {
        self.meter = meter.into();
        self
    }

    /// Adds one line with the given label and cumulative read.
    pub fn add_line(mut self, label: impl Into<String>, read: f64) -> Self {
        self.lines.push(ConsumptionLine {
            label: label.into(),
            read,
            is_estimated: false,
            meter_serial_number_his: self.meter.clone(),
        });
        self
    }

    /// Adds a line for every hour of the day, reads climbing from `start`.
    pub fn full_day(mut self, start: f64) -> Self {
        for hour in 0..24 {
            self = self.add_line(format!("{:02}:00", hour), start + hour as f64);
        }
        self
    }

    pub fn build(self) -> Vec<ConsumptionLine> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_label_set_builder() {
        let labels = TestLabelSetBuilder::new().with_meter("other").build();
        assert_eq!(labels.get("meter"), Some("other"));
        assert_eq!(labels.get("__name__"), Some("water_consumption_liters"));
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn test_sample_builder() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap();
        let sample = TestSampleBuilder::new(ts).with_value(12.5).build();
        assert_eq!(sample.timestamp, ts);
        assert_eq!(sample.value, 12.5);
    }

    #[test]
    fn test_full_day_lines() {
        let lines = TestConsumptionLinesBuilder::new().full_day(100.0).build();
        assert_eq!(lines.len(), 24);
        assert_eq!(lines[23].label, "23:00");
        assert_eq!(lines[23].read, 123.0);
    }
}
