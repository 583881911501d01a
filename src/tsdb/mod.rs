//! Local block-structured time-series store.
//!
//! Committed samples land in the head, backed by an append-only log. Once
//! the head spans more than one and a half block durations, compaction cuts
//! its oldest aligned range into an immutable block directory holding
//! `meta.json` and `series.json`.

mod appender;
mod block;
mod head;

pub use appender::Appender;
pub use block::{
    load_blocks, Block, BlockMeta, BlockStats, SamplePoint, SeriesData, META_FILE, SERIES_FILE,
};

use crate::config::TsdbConfig;
use crate::error::StorageError;
use block::{write_block, TMP_SUFFIX};
use head::{Head, HeadLog, HEAD_LOG};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub min_block_duration: Duration,
    /// Blocks are never merged, so this must not be below the minimum.
    pub max_block_duration: Duration,
    pub retention: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            min_block_duration: Duration::from_secs(2 * 60 * 60),
            max_block_duration: Duration::from_secs(2 * 60 * 60),
            retention: Duration::from_secs(90 * 24 * 60 * 60),
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &TsdbConfig) -> Self {
        Self {
            min_block_duration: config.block_duration(),
            max_block_duration: config.block_duration(),
            retention: config.retention(),
        }
    }

    fn validate(&self) -> Result<(), StorageError> {
        if self.min_block_duration.as_millis() == 0 {
            return Err(StorageError::Compaction("block duration must be positive".to_string()));
        }
        if self.max_block_duration < self.min_block_duration {
            return Err(StorageError::Compaction(
                "max block duration is below min block duration".to_string(),
            ));
        }
        Ok(())
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

pub struct LocalTimeSeriesStore {
    dir: PathBuf,
    options: StoreOptions,
    blocks: Vec<Block>,
    head: Head,
    log: HeadLog,
}

impl LocalTimeSeriesStore {
    /// Opens or creates the store at `dir`, replaying the head log.
    pub async fn open(dir: impl AsRef<Path>, options: StoreOptions) -> Result<Self, StorageError> {
        options.validate()?;
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        remove_unfinished_blocks(&dir).await?;

        let blocks = load_blocks(&dir).await?;
        let (log, records) = HeadLog::replay(&dir.join(HEAD_LOG)).await?;

        // Samples already cut into a block may still be in the log if a
        // crash hit between writing the block and truncating the log.
        let keep_from = blocks.last().map(|b| b.meta.max_time);
        let mut head = Head::default();
        for record in &records {
            head.apply(record, keep_from);
        }

        tracing::debug!(
            path = %dir.display(),
            blocks = blocks.len(),
            head_samples = head.num_samples(),
            "opened store"
        );
        Ok(Self {
            dir,
            options,
            blocks,
            head,
            log,
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn block_duration_ms(&self) -> i64 {
        millis(self.options.min_block_duration)
    }

    /// Oldest timestamp a new sample may carry; `None` while the store is empty.
    pub fn appendable_min_time(&self) -> Option<i64> {
        let block_floor = self.blocks.last().map(|b| b.meta.max_time);
        let head_floor = self
            .head
            .max_time()
            .map(|t| t.saturating_sub(self.block_duration_ms() / 2));
        block_floor.max(head_floor)
    }

    /// Latest sample timestamp held anywhere in the store.
    pub fn max_time(&self) -> Option<i64> {
        let block_max = self.blocks.last().map(|b| b.meta.stats.max_sample_time);
        self.head.max_time().max(block_max)
    }

    pub fn num_samples(&self) -> u64 {
        let in_blocks: u64 = self.blocks.iter().map(|b| b.meta.stats.num_samples).sum();
        in_blocks + self.head.num_samples() as u64
    }

    pub fn appender(&mut self) -> Appender<'_> {
        Appender::new(self)
    }

    /// Cuts finished head ranges into blocks, then applies retention.
    ///
    /// Returns the number of blocks written.
    pub async fn compact(&mut self) -> Result<usize, StorageError> {
        let block_ms = self.block_duration_ms();
        let mut written = 0;

        while let (Some(min), Some(max)) = (self.head.min_time(), self.head.max_time()) {
            if 2 * (max - min) <= 3 * block_ms {
                break;
            }
            let start = min.div_euclid(block_ms) * block_ms;
            let end = start + block_ms;
            let series = self.head.cut_before(end);
            let block = write_block(&self.dir, start, end, series).await?;
            self.blocks.push(block);
            written += 1;
        }

        if written > 0 {
            self.log.rewrite(&self.head.to_record()).await?;
            tracing::debug!(blocks = written, "cut head into blocks");
        }
        self.apply_retention().await?;
        Ok(written)
    }

    async fn apply_retention(&mut self) -> Result<usize, StorageError> {
        let Some(newest) = self.blocks.last().map(|b| b.meta.max_time) else {
            return Ok(0);
        };
        let cutoff = newest.saturating_sub(millis(self.options.retention));

        let (expired, kept): (Vec<Block>, Vec<Block>) = std::mem::take(&mut self.blocks)
            .into_iter()
            .partition(|b| b.meta.max_time < cutoff);
        self.blocks = kept;

        for block in &expired {
            tokio::fs::remove_dir_all(&block.dir)
                .await
                .map_err(|e| StorageError::Compaction(format!("failed to delete block {}: {}", block.meta.id, e)))?;
            tracing::debug!(block = %block.meta.id, "deleted block past retention");
        }
        Ok(expired.len())
    }

    /// Commits are durable already; this only releases the handle.
    pub async fn close(self) -> Result<(), StorageError> {
        tracing::debug!(path = %self.dir.display(), "closed store");
        Ok(())
    }
}

async fn remove_unfinished_blocks(dir: &Path) -> Result<(), StorageError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().await?.is_dir() && name.ends_with(TMP_SUFFIX) {
            tracing::warn!(dir = %name, "removing unfinished block");
            tokio::fs::remove_dir_all(entry.path()).await?;
        }
    }
    Ok(())
}
