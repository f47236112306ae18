//! Directory runner
//!
//! Processes every `*.tgz` bundle in a directory, one at a time. A failing
//! bundle is recorded in the [`ImportSummary`] and the run moves on.

use std::fmt;
use std::fs::FileType;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use pitrix_import_types::{ImportError, ImportResult, Resource};

use crate::workflow::ImportWorkflow;

const BUNDLE_EXTENSION: &str = ".tgz";

/// Step at which a bundle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    /// Listing the directory or inspecting an entry
    Read,
    Decode,
    Application,
    Version,
}

impl ImportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStage::Read => "read",
            ImportStage::Decode => "decode",
            ImportStage::Application => "application",
            ImportStage::Version => "version",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct BundleFailure {
    pub file: PathBuf,
    pub stage: ImportStage,
    pub error: ImportError,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failures: Vec<BundleFailure>,
}

impl ImportSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, file: PathBuf, stage: ImportStage, error: ImportError) {
        self.failures.push(BundleFailure { file, stage, error });
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} imported, {} skipped, {} failed",
            self.imported,
            self.skipped,
            self.failures.len()
        )
    }
}

pub struct ImportRunner {
    workflow: ImportWorkflow,
}

impl ImportRunner {
    pub fn new(workflow: ImportWorkflow) -> Self {
        Self { workflow }
    }

    pub fn workflow(&self) -> &ImportWorkflow {
        &self.workflow
    }

    /// Import every bundle in `dir`.
    ///
    /// Only a directory that cannot be opened fails the call. Unreadable
    /// entries and bundle failures end up in the returned summary.
    pub async fn run(&self, dir: &Path) -> ImportResult<ImportSummary> {
        info!("Importing bundles from {}", dir.display());
        let mut summary = ImportSummary::default();

        let mut entries = tokio::fs::read_dir(dir).await?;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to list {}: {}", dir.display(), e);
                    summary.record_failure(dir.to_path_buf(), ImportStage::Read, e.into());
                    break;
                }
            };
            let file_type = entry.file_type().await;
            self.visit(entry.path(), file_type, &mut summary).await;
        }

        if summary.is_success() {
            info!("Import finished: {}", summary);
        } else {
            warn!("Import finished with failures: {}", summary);
        }
        Ok(summary)
    }

    /// Handle one directory entry, recording its outcome in `summary`
    async fn visit(
        &self,
        path: PathBuf,
        file_type: io::Result<FileType>,
        summary: &mut ImportSummary,
    ) {
        match file_type {
            Ok(file_type) if file_type.is_dir() => {
                debug!("Skipping directory {}", path.display());
                summary.skipped += 1;
                return;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to inspect {}: {}", path.display(), e);
                summary.record_failure(path, ImportStage::Read, e.into());
                return;
            }
        }

        let is_bundle = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(BUNDLE_EXTENSION))
            .unwrap_or(false);
        if !is_bundle {
            info!("Skipping file {}", path.display());
            summary.skipped += 1;
            return;
        }

        match self.import_bundle(&path).await {
            Ok(()) => summary.imported += 1,
            Err((stage, error)) => {
                error!(
                    "Failed to import {} at {} stage: {}",
                    path.display(),
                    stage,
                    error
                );
                summary.record_failure(path, stage, error);
            }
        }
    }

    /// Decode, resolve the application, then resolve the version
    pub async fn import_bundle(&self, path: &Path) -> Result<(), (ImportStage, ImportError)> {
        let bundle = self
            .workflow
            .decode(path)
            .map_err(|e| (ImportStage::Decode, e))?;

        let application = self
            .workflow
            .create_app(&bundle)
            .await
            .map_err(|e| (ImportStage::Application, e))?;

        let version = self
            .workflow
            .create_app_ver(&application, path)
            .await
            .map_err(|e| (ImportStage::Version, e))?;

        info!(
            "Imported {} {} as {}/{}",
            bundle.name,
            bundle.version,
            application.name(),
            version.name()
        );
        Ok(())
    }
}
