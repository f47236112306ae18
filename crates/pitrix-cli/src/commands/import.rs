use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use pitrix_blob::{S3Config, S3ContentStore};
use pitrix_chart::ChartLoader;
use pitrix_import::{ImportConfig, ImportRunner, ImportStores, ImportWorkflow};
use pitrix_import_types::{ApplicationRecord, CategoryRecord, VersionRecord};
use pitrix_store::{ApiClient, HttpResourceStore, StoreConfig};

#[derive(Args)]
pub struct ImportCommand {
    /// Directory holding the chart bundles (*.tgz)
    #[arg(long, env = "PITRIX_CHART_DIR", default_value = "/root/package")]
    chart_dir: PathBuf,

    /// Import configuration file
    #[arg(long, env = "PITRIX_IMPORT_CONFIG", default_value = "./import-config.yaml")]
    import_config: PathBuf,

    /// Base URL of the resource API server
    #[arg(long, env = "PITRIX_STORE_URL")]
    store_url: String,

    /// Bearer token for the resource API
    #[arg(long, env = "PITRIX_STORE_TOKEN")]
    store_token: Option<String>,

    /// Request timeout against the resource API, in seconds
    #[arg(long, env = "PITRIX_STORE_TIMEOUT_SECS", default_value = "30")]
    store_timeout_secs: u64,

    /// S3 endpoint URL (for MinIO/custom S3)
    #[arg(long, env = "S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// S3 region
    #[arg(long, env = "S3_REGION", default_value = "us-east-1")]
    s3_region: String,

    /// S3 bucket holding chart payloads
    #[arg(long, env = "S3_BUCKET")]
    s3_bucket: String,

    /// S3 access key ID
    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    s3_access_key_id: Option<String>,

    /// S3 secret access key
    #[arg(long, env = "S3_SECRET_ACCESS_KEY")]
    s3_secret_access_key: Option<String>,

    /// Force path style (needed for MinIO)
    #[arg(long, env = "S3_FORCE_PATH_STYLE", default_value = "true")]
    s3_force_path_style: bool,
}

impl ImportCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let config = ImportConfig::load(&self.import_config)
            .with_context(|| format!("Failed to load {}", self.import_config.display()))?;

        let stores = self.connect_stores().await?;
        let workflow = ImportWorkflow::new(stores, Arc::new(ChartLoader::new()), Arc::new(config));
        let runner = ImportRunner::new(workflow);

        let summary = runner
            .run(&self.chart_dir)
            .await
            .with_context(|| format!("Failed to read {}", self.chart_dir.display()))?;

        for failure in &summary.failures {
            error!(
                "{} failed at {}: {}",
                failure.file.display(),
                failure.stage,
                failure.error
            );
        }
        info!("Import summary: {}", summary);

        if !summary.is_success() {
            anyhow::bail!("{} of the bundles failed to import", summary.failures.len());
        }
        Ok(())
    }

    async fn connect_stores(&self) -> anyhow::Result<ImportStores> {
        let store_config = StoreConfig {
            base_url: self.store_url.clone(),
            token: self.store_token.clone(),
            timeout: Duration::from_secs(self.store_timeout_secs),
        };
        let api = Arc::new(
            ApiClient::new(store_config).context("Failed to create resource API client")?,
        );
        info!("Using resource API at {}", self.store_url);

        let s3_config = S3Config {
            endpoint: self.s3_endpoint.clone(),
            region: self.s3_region.clone(),
            bucket: self.s3_bucket.clone(),
            access_key_id: self.s3_access_key_id.clone(),
            secret_access_key: self.s3_secret_access_key.clone(),
            force_path_style: self.s3_force_path_style,
        };
        let content = S3ContentStore::connect(&s3_config)
            .await
            .context("Failed to create S3 client")?;
        info!("Using bucket {}", content.bucket());

        Ok(ImportStores {
            categories: Arc::new(HttpResourceStore::<CategoryRecord>::new(api.clone())),
            applications: Arc::new(HttpResourceStore::<ApplicationRecord>::new(api.clone())),
            versions: Arc::new(HttpResourceStore::<VersionRecord>::new(api)),
            content: Arc::new(content),
        })
    }
}
