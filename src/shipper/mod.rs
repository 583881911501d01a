//! Ships finalized local blocks to a content-addressed bucket.
//!
//! Each block is keyed by the hash of its `series.json`. The series file is
//! uploaded first and `meta.json` last, so a block only becomes visible
//! remotely once all of it is there. Shipped hashes of the blocks still on
//! disk are remembered in `shipper.json` next to them.

mod bucket;

pub use bucket::{open_bucket, Bucket, FilesystemBucket, HttpBucket};

use crate::error::ShipmentError;
use crate::model::LabelSet;
use crate::persistence;
use crate::tsdb::{load_blocks, Block, BlockStats, META_FILE, SERIES_FILE};
use serde_derive::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const SHIPPER_FILE: &str = "shipper.json";
pub const SOURCE: &str = "importer";
const LEDGER_VERSION: u32 = 1;

pub type HashFn = fn(&[u8]) -> String;

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ShipLedger {
    version: u32,
    uploaded: BTreeSet<String>,
}

impl Default for ShipLedger {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            uploaded: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub rel_path: String,
    pub size_bytes: u64,
}

/// The `meta.json` stored next to a shipped block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMeta {
    pub hash: String,
    pub block_id: String,
    pub min_time: i64,
    pub max_time: i64,
    pub stats: BlockStats,
    pub external_labels: LabelSet,
    pub source: String,
    pub files: Vec<RemoteFile>,
}

pub struct RemoteShipper {
    dir: PathBuf,
    bucket: Arc<dyn Bucket>,
    labels: Box<dyn Fn() -> LabelSet + Send + Sync>,
    hash: HashFn,
}

impl RemoteShipper {
    pub fn new<F>(dir: impl AsRef<Path>, bucket: Arc<dyn Bucket>, labels: F) -> Self
    where
        F: Fn() -> LabelSet + Send + Sync + 'static,
    {
        Self {
            dir: dir.as_ref().to_path_buf(),
            bucket,
            labels: Box::new(labels),
            hash: sha256_hex,
        }
    }

    pub fn with_hash(mut self, hash: HashFn) -> Self {
        self.hash = hash;
        self
    }

    /// Uploads every block not yet in the bucket and returns how many were
    /// shipped. Cancelling `cancel` abandons any request in flight. The
    /// bucket is closed whether or not this succeeds.
    #[tracing::instrument(name = "shipper", skip_all, fields(bucket = %self.bucket.name()))]
    pub async fn sync(&self, cancel: &CancellationToken) -> Result<usize, ShipmentError> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ShipmentError::Cancelled),
            result = self.sync_blocks() => result,
        };
        match (self.bucket.close().await, result) {
            (Ok(()), result) => result,
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(err)) => {
                tracing::warn!(bucket = %self.bucket.name(), error = %e, "failed to close bucket");
                Err(err)
            }
        }
    }

    async fn sync_blocks(&self) -> Result<usize, ShipmentError> {
        let ledger_path = self.dir.join(SHIPPER_FILE);
        let previous: ShipLedger = persistence::load_json_or_default::<_, ShipmentError>(&ledger_path).await?;
        let blocks = load_blocks(&self.dir).await?;

        let mut hashed = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let series = tokio::fs::read(block.series_path()).await?;
            hashed.push((block, (self.hash)(&series)));
        }

        // Hashes of blocks deleted by retention drop out of the ledger.
        let mut ledger = ShipLedger {
            uploaded: hashed
                .iter()
                .map(|(_, hash)| hash)
                .filter(|hash| previous.uploaded.contains(*hash))
                .cloned()
                .collect(),
            ..ShipLedger::default()
        };
        if ledger != previous {
            tracing::debug!(
                pruned = previous.uploaded.len() - ledger.uploaded.len(),
                "pruned shipper ledger"
            );
            persistence::save_json::<_, ShipmentError>(&ledger_path, &ledger).await?;
        }

        let external_labels = (self.labels)();
        let mut shipped = 0;
        for (block, hash) in hashed {
            if ledger.uploaded.contains(&hash) {
                tracing::debug!(block = %block.meta.id, %hash, "block already shipped");
                continue;
            }

            let meta_key = format!("{}/{}", hash, META_FILE);
            if self.bucket.exists(&meta_key).await? {
                tracing::info!(block = %block.meta.id, %hash, "block already present in bucket");
            } else {
                let series = tokio::fs::read(block.series_path()).await?;
                self.upload(block, &hash, series, &external_labels).await?;
                shipped += 1;
            }

            ledger.uploaded.insert(hash);
            persistence::save_json::<_, ShipmentError>(&ledger_path, &ledger).await?;
        }

        Ok(shipped)
    }

    async fn upload(
        &self,
        block: &Block,
        hash: &str,
        series: Vec<u8>,
        external_labels: &LabelSet,
    ) -> Result<(), ShipmentError> {
        let meta = RemoteMeta {
            hash: hash.to_string(),
            block_id: block.meta.id.clone(),
            min_time: block.meta.min_time,
            max_time: block.meta.max_time,
            stats: block.meta.stats.clone(),
            external_labels: external_labels.clone(),
            source: SOURCE.to_string(),
            files: vec![RemoteFile {
                rel_path: SERIES_FILE.to_string(),
                size_bytes: series.len() as u64,
            }],
        };

        self.bucket
            .upload(&format!("{}/{}", hash, SERIES_FILE), series)
            .await?;
        self.bucket
            .upload(&format!("{}/{}", hash, META_FILE), serde_json::to_vec_pretty(&meta)?)
            .await?;

        tracing::info!(
            block = %block.meta.id,
            %hash,
            bucket = %self.bucket.name(),
            "shipped block"
        );
        Ok(())
    }
}
