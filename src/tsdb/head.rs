use super::block::{SamplePoint, SeriesData};
use crate::error::StorageError;
use crate::model::LabelSet;
use crate::persistence;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const HEAD_LOG: &str = "head.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedSample {
    pub labels: LabelSet,
    pub t: i64,
    pub v: f64,
}

/// One committed transaction; one line of the head log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub samples: Vec<LoggedSample>,
}

/// Samples not yet cut into a block, ordered by time within each series.
#[derive(Debug, Default)]
pub struct Head {
    series: BTreeMap<LabelSet, Vec<SamplePoint>>,
    num_samples: usize,
}

impl Head {
    pub fn min_time(&self) -> Option<i64> {
        self.series.values().filter_map(|s| s.first()).map(|p| p.t).min()
    }

    pub fn max_time(&self) -> Option<i64> {
        self.series.values().filter_map(|s| s.last()).map(|p| p.t).max()
    }

    pub fn latest(&self, labels: &LabelSet) -> Option<SamplePoint> {
        self.series.get(labels).and_then(|s| s.last().copied())
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Adds a validated record; samples before `keep_from` are dropped.
    pub fn apply(&mut self, record: &LogRecord, keep_from: Option<i64>) {
        for sample in &record.samples {
            if keep_from.is_some_and(|floor| sample.t < floor) {
                continue;
            }
            self.series
                .entry(sample.labels.clone())
                .or_default()
                .push(SamplePoint {
                    t: sample.t,
                    v: sample.v,
                });
            self.num_samples += 1;
        }
    }

    /// Removes every sample older than `before`.
    pub fn cut_before(&mut self, before: i64) -> Vec<SeriesData> {
        let mut cut = Vec::new();
        for (labels, samples) in self.series.iter_mut() {
            let split = samples.partition_point(|p| p.t < before);
            if split == 0 {
                continue;
            }
            let remaining = samples.split_off(split);
            let taken = std::mem::replace(samples, remaining);
            self.num_samples -= taken.len();
            cut.push(SeriesData {
                labels: labels.clone(),
                samples: taken,
            });
        }
        self.series.retain(|_, samples| !samples.is_empty());
        cut
    }

    /// The whole head as a single log record.
    pub fn to_record(&self) -> LogRecord {
        let mut samples: Vec<LoggedSample> = self
            .series
            .iter()
            .flat_map(|(labels, points)| {
                points.iter().map(move |p| LoggedSample {
                    labels: labels.clone(),
                    t: p.t,
                    v: p.v,
                })
            })
            .collect();
        samples.sort_by_key(|s| s.t);
        LogRecord { samples }
    }
}

/// Newline-delimited JSON log of committed transactions.
#[derive(Debug)]
pub struct HeadLog {
    path: PathBuf,
}

impl HeadLog {
    /// Reads every complete record. A torn trailing record (a crash during
    /// commit) is discarded and the log rewritten without it.
    pub async fn replay(path: &Path) -> Result<(Self, Vec<LogRecord>), StorageError> {
        let log = Self {
            path: path.to_path_buf(),
        };
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((log, Vec::new())),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut records = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            match serde_json::from_str::<LogRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) if i + 1 == lines.len() => {
                    tracing::warn!(path = %path.display(), error = %e, "discarding torn head log record");
                    log.rewrite_records(&records).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok((log, records))
    }

    /// Appends one record and syncs it to disk.
    pub async fn append(&self, record: &LogRecord) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.sync_data().await?;
        Ok(())
    }

    /// Replaces the log with the given record.
    pub async fn rewrite(&self, record: &LogRecord) -> Result<(), StorageError> {
        if record.samples.is_empty() {
            self.rewrite_records(&[]).await
        } else {
            self.rewrite_records(std::slice::from_ref(record)).await
        }
    }

    async fn rewrite_records(&self, records: &[LogRecord]) -> Result<(), StorageError> {
        let mut content = Vec::new();
        for record in records {
            content.extend(serde_json::to_vec(record)?);
            content.push(b'\n');
        }
        persistence::write_atomic(&self.path, &content).await?;
        Ok(())
    }
}
