use super::block::SamplePoint;
use super::head::{LogRecord, LoggedSample};
use super::LocalTimeSeriesStore;
use crate::error::StorageError;
use crate::model::LabelSet;
use std::collections::HashMap;

/// Buffers samples until [`Appender::commit`]; dropping it discards them.
pub struct Appender<'a> {
    store: &'a mut LocalTimeSeriesStore,
    min_valid_time: Option<i64>,
    pending: Vec<LoggedSample>,
    latest: HashMap<LabelSet, SamplePoint>,
}

impl<'a> Appender<'a> {
    pub(super) fn new(store: &'a mut LocalTimeSeriesStore) -> Self {
        let min_valid_time = store.appendable_min_time();
        Self {
            store,
            min_valid_time,
            pending: Vec::new(),
            latest: HashMap::new(),
        }
    }

    /// Adds a sample at `timestamp` milliseconds.
    ///
    /// Re-appending an identical sample is accepted and ignored.
    pub fn append(&mut self, labels: &LabelSet, timestamp: i64, value: f64) -> Result<(), StorageError> {
        if let Some(min_valid_time) = self.min_valid_time {
            if timestamp < min_valid_time {
                return Err(StorageError::OutOfBounds {
                    timestamp,
                    min_valid_time,
                });
            }
        }

        let latest = self
            .latest
            .get(labels)
            .copied()
            .or_else(|| self.store.head.latest(labels));
        if let Some(latest) = latest {
            if timestamp < latest.t {
                return Err(StorageError::OutOfOrder {
                    series: labels.to_string(),
                    timestamp,
                    latest: latest.t,
                });
            }
            if timestamp == latest.t {
                if latest.v.to_bits() == value.to_bits() {
                    return Ok(());
                }
                return Err(StorageError::DuplicateSample {
                    series: labels.to_string(),
                    timestamp,
                });
            }
        }

        self.latest.insert(labels.clone(), SamplePoint { t: timestamp, v: value });
        self.pending.push(LoggedSample {
            labels: labels.clone(),
            t: timestamp,
            v: value,
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Durably writes all pending samples as one record, or none of them.
    pub async fn commit(self) -> Result<usize, StorageError> {
        if self.is_empty() {
            return Ok(0);
        }
        let record = LogRecord {
            samples: self.pending,
        };
        self.store.log.append(&record).await?;
        self.store.head.apply(&record, None);
        Ok(record.samples.len())
    }

    pub fn rollback(self) {
        tracing::debug!(discarded = self.pending.len(), "rolled back appender");
    }
}
