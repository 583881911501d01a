//! The incremental import: log in, find the meter, fetch every day the store
//! does not have yet and commit each day as one transaction.

use crate::auth::SessionBootstrap;
use crate::config::TsdbConfig;
use crate::error::{ConfigError, Error, ParseError, Result};
use crate::model::{DayMarker, LabelSet, Sample, JOB_NAME, METRIC_NAME, METRIC_NAME_LABEL};
use crate::readings::{
    ConsumptionLine, ConsumptionRequest, CookieJarSession, ReadingsClient, DASHBOARD_PATH,
};
use crate::tsdb::{LocalTimeSeriesStore, StoreOptions};
use chrono::{DateTime, NaiveTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// What one import run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub days_imported: usize,
    pub days_skipped: usize,
    pub samples_appended: usize,
    pub blocks_written: usize,
}

/// Days strictly after `floor`, ascending and without repeats.
///
/// A day whose midnight equals the floor is skipped: the store may already
/// hold part of it.
pub fn days_to_import(days: &[DayMarker], floor: Option<DateTime<Utc>>) -> Vec<DayMarker> {
    let mut days = days.to_vec();
    days.sort();
    days.dedup();
    days.into_iter()
        .filter(|day| floor.map_or(true, |floor| day.start() > floor))
        .collect()
}

/// Turns an `HH:MM` label into a UTC timestamp on `day`.
pub fn parse_label_time(day: DayMarker, label: &str) -> Result<DateTime<Utc>, ParseError> {
    let parts: Vec<&str> = label.split(':').collect();
    if parts.len() != 2 {
        return Err(ParseError::LabelSplit {
            label: label.to_string(),
            count: parts.len(),
        });
    }
    let hours: u32 = parts[0]
        .trim()
        .parse()
        .map_err(|e| ParseError::time_parse(label, e))?;
    let minutes: u32 = parts[1]
        .trim()
        .parse()
        .map_err(|e| ParseError::time_parse(label, e))?;
    let time = NaiveTime::from_hms_opt(hours, minutes, 0)
        .ok_or_else(|| ParseError::time_parse(label, "hour or minute out of range"))?;
    Ok(day.date().and_time(time).and_utc())
}

/// Builds the sample for one consumption line.
pub fn line_sample(day: DayMarker, line: &ConsumptionLine, base_labels: &LabelSet) -> Result<Sample, ParseError> {
    if !line.read.is_finite() || line.read < 0.0 {
        return Err(ParseError::InvalidValue {
            label: line.label.clone(),
            value: line.read,
        });
    }
    Ok(Sample {
        labels: base_labels
            .clone()
            .with("meter", line.meter_serial_number_his.clone()),
        timestamp: parse_label_time(day, &line.label)?,
        value: line.read,
    })
}

/// Labels shared by every sample: external labels, job and metric name.
pub fn base_labels(external_labels: &LabelSet) -> LabelSet {
    external_labels
        .clone()
        .with("job", JOB_NAME)
        .with(METRIC_NAME_LABEL, METRIC_NAME)
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

async fn cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}

pub struct ImportPipeline {
    bootstrap: SessionBootstrap,
    base_url: String,
    store_path: PathBuf,
    options: StoreOptions,
    external_labels: LabelSet,
}

impl ImportPipeline {
    pub fn new(
        bootstrap: SessionBootstrap,
        base_url: impl Into<String>,
        tsdb: &TsdbConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            bootstrap,
            base_url: base_url.into(),
            store_path: tsdb.path(),
            options: StoreOptions::from_config(tsdb),
            external_labels: tsdb.external_labels()?,
        })
    }

    #[tracing::instrument(name = "importer", skip_all)]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<ImportSummary> {
        let mut store = LocalTimeSeriesStore::open(&self.store_path, self.options.clone()).await?;
        let floor = store.appendable_min_time().and_then(from_millis);
        let max_time = store.max_time().and_then(from_millis);
        tracing::debug!(
            min_time = ?floor,
            max_time = ?max_time,
            "opened TSDB"
        );

        let cookies = self.bootstrap.establish(cancel).await?;
        let client = ReadingsClient::new(CookieJarSession::new(
            &self.base_url,
            DASHBOARD_PATH,
            &cookies,
        )?);

        let meters = cancellable(cancel, async { client.get_meters().await.map_err(Error::from) }).await?;
        let meter = meters.first_meter()?.to_string();
        tracing::info!(meters = %meters.meters.join(", "), "found meters");

        let days = meters.day_markers()?;
        let pending = days_to_import(&days, floor);
        let mut summary = ImportSummary {
            days_skipped: days.len() - pending.len(),
            ..ImportSummary::default()
        };
        for day in days.iter().filter(|d| !pending.contains(*d)) {
            tracing::debug!(%meter, date = %day, "skipped daily reading, as TSDB already contains data");
        }

        let base_labels = base_labels(&self.external_labels);
        for day in pending {
            tracing::debug!(%meter, date = %day, "daily reading");
            let request = ConsumptionRequest::for_day(meter.clone(), day);
            let response = cancellable(cancel, async {
                client.get_consumptions(&request).await.map_err(Error::from)
            })
            .await?;

            let mut appender = store.appender();
            for line in &response.lines {
                let sample = line_sample(day, line, &base_labels)?;
                appender.append(&sample.labels, sample.timestamp.timestamp_millis(), sample.value)?;
            }
            let appended = appender.commit().await?;

            let estimated = response.lines.iter().filter(|line| line.is_estimated).count();
            tracing::info!(%meter, date = %day, samples = appended, estimated, "imported daily reading");
            summary.days_imported += 1;
            summary.samples_appended += appended;
        }

        summary.blocks_written = store.compact().await?;
        tracing::debug!(blocks = summary.blocks_written, "ran TSDB compaction");
        store.close().await?;

        Ok(summary)
    }
}
