//! One complete run: import new readings into the local store, then ship
//! finished blocks to the bucket.

use crate::auth::{AuthenticationAgent, RetryPolicy, SessionBootstrap, WebDriverLauncher};
use crate::config::{BucketConfig, ChromeConfig, ThamesWaterConfig, TsdbConfig};
use crate::error::Result;
use crate::importer::ImportPipeline;
use crate::shipper::{open_bucket, RemoteShipper};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct App {
    pipeline: ImportPipeline,
    shipper: RemoteShipper,
}

impl App {
    pub fn new(pipeline: ImportPipeline, shipper: RemoteShipper) -> Self {
        Self { pipeline, shipper }
    }

    /// Wires the WebDriver browser, the importer and the bucket from the
    /// loaded configuration.
    pub fn from_config(
        thames: &ThamesWaterConfig,
        chrome: &ChromeConfig,
        tsdb: &TsdbConfig,
        bucket: &BucketConfig,
    ) -> Result<Self> {
        let launcher = Arc::new(WebDriverLauncher::new(chrome));
        let login_url = format!("{}/login", thames.base_url.trim_end_matches('/'));
        let agent = AuthenticationAgent::new(thames.credentials(), launcher, &login_url);
        let bootstrap = SessionBootstrap::new(agent, RetryPolicy::default(), thames.login_timeout());
        let pipeline = ImportPipeline::new(bootstrap, thames.base_url.clone(), tsdb)?;

        let target = bucket.target()?;
        let labels = tsdb.external_labels()?;
        let bucket = open_bucket(&target)?;
        tracing::debug!(bucket = %bucket.name(), "opened bucket");
        let shipper = RemoteShipper::new(tsdb.path(), bucket, move || labels.clone());

        Ok(Self::new(pipeline, shipper))
    }

    /// Imports, compacts and ships. Nothing is shipped if the import fails.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        let summary = self.pipeline.run(cancel).await?;
        tracing::info!(
            days_imported = summary.days_imported,
            days_skipped = summary.days_skipped,
            samples = summary.samples_appended,
            "import finished"
        );

        let uploaded = self.shipper.sync(cancel).await?;
        tracing::info!("successfully uploaded {} blocks", uploaded);
        Ok(())
    }
}
