use crate::error::StorageError;
use crate::model::LabelSet;
use crate::persistence;
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const META_FILE: &str = "meta.json";
pub const SERIES_FILE: &str = "series.json";
pub(crate) const TMP_SUFFIX: &str = ".tmp";
const META_VERSION: u32 = 1;

/// A timestamp in milliseconds since the epoch and its value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub t: i64,
    pub v: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData {
    pub labels: LabelSet,
    pub samples: Vec<SamplePoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStats {
    pub num_samples: u64,
    pub num_series: u64,
    /// Timestamp of the newest sample in the block
    pub max_sample_time: i64,
}

/// Contents of a block's `meta.json`. The range is half-open: `[min_time, max_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMeta {
    pub id: String,
    pub min_time: i64,
    pub max_time: i64,
    pub stats: BlockStats,
    pub version: u32,
}

/// A finalized block on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub dir: PathBuf,
    pub meta: BlockMeta,
}

/// Block ids sort by time, like the directory listing does.
pub fn block_id(min_time: i64, max_time: i64) -> String {
    format!("{:013}-{:013}", min_time, max_time)
}

impl Block {
    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE)
    }

    pub fn series_path(&self) -> PathBuf {
        self.dir.join(SERIES_FILE)
    }

    pub async fn read_series(&self) -> Result<Vec<SeriesData>, StorageError> {
        persistence::load_json(&self.series_path()).await
    }
}

/// Writes a block into a temp directory and renames it into place.
pub async fn write_block(
    root: &Path,
    min_time: i64,
    max_time: i64,
    series: Vec<SeriesData>,
) -> Result<Block, StorageError> {
    let id = block_id(min_time, max_time);
    let final_dir = root.join(&id);
    let tmp_dir = root.join(format!("{}{}", id, TMP_SUFFIX));

    if tokio::fs::try_exists(&tmp_dir).await? {
        tokio::fs::remove_dir_all(&tmp_dir).await?;
    }
    tokio::fs::create_dir_all(&tmp_dir).await?;

    let meta = BlockMeta {
        id,
        min_time,
        max_time,
        stats: BlockStats {
            num_samples: series.iter().map(|s| s.samples.len() as u64).sum(),
            num_series: series.len() as u64,
            max_sample_time: series
                .iter()
                .flat_map(|s| s.samples.iter().map(|p| p.t))
                .max()
                .unwrap_or(min_time),
        },
        version: META_VERSION,
    };
    persistence::write_atomic(&tmp_dir.join(SERIES_FILE), &serde_json::to_vec(&series)?).await?;
    persistence::save_json::<_, StorageError>(&tmp_dir.join(META_FILE), &meta).await?;

    if tokio::fs::try_exists(&final_dir).await? {
        tokio::fs::remove_dir_all(&final_dir).await?;
    }
    tokio::fs::rename(&tmp_dir, &final_dir).await?;

    tracing::debug!(
        block = %meta.id,
        samples = meta.stats.num_samples,
        series = meta.stats.num_series,
        "wrote block"
    );
    Ok(Block {
        dir: final_dir,
        meta,
    })
}

async fn load_block(dir: PathBuf) -> Result<Block, StorageError> {
    let meta: BlockMeta = persistence::load_json::<_, StorageError>(&dir.join(META_FILE)).await?;
    Ok(Block { dir, meta })
}

/// Lists finalized blocks under `root`, oldest first.
///
/// Directories still carrying the temp suffix or lacking `meta.json` are
/// not blocks and are skipped.
pub async fn load_blocks(root: &Path) -> Result<Vec<Block>, StorageError> {
    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(TMP_SUFFIX) {
            continue;
        }
        if tokio::fs::try_exists(entry.path().join(META_FILE)).await? {
            dirs.push(entry.path());
        }
    }

    let mut blocks = futures::future::try_join_all(dirs.into_iter().map(load_block)).await?;
    blocks.sort_by_key(|b| (b.meta.min_time, b.meta.max_time));
    Ok(blocks)
}
