//! One `/analyze` request end to end: stage uploads, extract, score.

use crate::config::Config;
use crate::engine::{EngineError, EngineHandle};
use crate::extractor::{ExtractError, FeatureExtractor};
use crate::normalize::{self, NormalizeError};
use crate::staging::JobDirs;
use persona_core::AnalysisReport;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no files uploaded")]
    NoUploads,
    #[error("unsupported upload: {0}")]
    Unsupported(#[from] NormalizeError),
    #[error("cannot stage uploads: {0}")]
    Staging(#[from] std::io::Error),
    #[error("feature extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("upload task failed")]
    Join,
}

/// An uploaded file as received from the client.
pub struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
}

pub struct Pipeline {
    extractor: FeatureExtractor,
    engine: EngineHandle,
    upload_root: PathBuf,
    results_root: PathBuf,
    keep_results: bool,
}

impl Pipeline {
    pub fn new(config: &Config, engine: EngineHandle) -> Self {
        Self {
            extractor: FeatureExtractor::new(
                config.extractor_bin.clone(),
                config.extractor_args.clone(),
                config.extract_timeout(),
            ),
            engine,
            upload_root: config.upload_dir.clone(),
            results_root: config.results_dir.clone(),
            keep_results: config.keep_results,
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Run extraction and scoring over a batch of uploaded frames.
    ///
    /// Any failure here is request-level: no partial sections are returned.
    pub async fn analyze(&self, uploads: Vec<Upload>) -> Result<AnalysisReport, PipelineError> {
        if uploads.is_empty() {
            return Err(PipelineError::NoUploads);
        }

        let job = JobDirs::create(&self.upload_root, &self.results_root, self.keep_results)?;
        tracing::info!(job = %job.id, files = uploads.len(), "analysis started");

        let upload_dir = job.upload().to_path_buf();
        tokio::task::spawn_blocking(move || {
            for upload in &uploads {
                normalize::stage_upload(&upload_dir, &upload.file_name, &upload.data)?;
            }
            Ok::<_, NormalizeError>(())
        })
        .await
        .map_err(|_| PipelineError::Join)??;

        let table_path = self.extractor.run(job.upload(), job.results()).await?;
        tracing::debug!(job = %job.id, table = %table_path.display(), "extraction finished");

        let report = self.engine.score(table_path).await?;
        tracing::info!(job = %job.id, "analysis finished");
        Ok(report)
    }
}
