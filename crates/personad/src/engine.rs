use persona_core::{AnalysisReport, Analyzer, MeasurementTable, TableError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("measurement table unreadable: {0}")]
    Table(#[from] TableError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from request handlers to the engine thread.
enum EngineRequest {
    Score {
        table_path: PathBuf,
        reply: oneshot::Sender<Result<AnalysisReport, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Request scoring: load the measurement table and run every section.
    pub async fn score(&self, table_path: PathBuf) -> Result<AnalysisReport, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Score {
                table_path,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Table loading and scoring are blocking work; keeping them off the
/// async runtime leaves the HTTP side responsive while a batch is scored.
pub fn spawn_engine(analyzer: Analyzer, queue_depth: usize) -> Result<EngineHandle, EngineError> {
    let config = analyzer.config();
    tracing::info!(
        seed = ?config.seed,
        relationship_smoothing = ?config.relationship_smoothing,
        work_dna_smoothing = ?config.work_dna_smoothing,
        "scoring configured"
    );

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(queue_depth.max(1));

    std::thread::Builder::new()
        .name("persona-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Score { table_path, reply } => {
                        let result = run_score(&analyzer, &table_path);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}

fn run_score(analyzer: &Analyzer, table_path: &Path) -> Result<AnalysisReport, EngineError> {
    let table = MeasurementTable::from_path(table_path)?;
    tracing::debug!(rows = table.len(), path = %table_path.display(), "score: table loaded");
    Ok(analyzer.analyze(&table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::ScoringConfig;

    #[tokio::test]
    async fn test_score_through_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.csv");
        std::fs::write(&path, "frame, AU06_r, AU12_r\n1, 2.5, 2.5\n").unwrap();

        let config = ScoringConfig {
            seed: Some(1),
            ..ScoringConfig::default()
        };
        let handle = spawn_engine(Analyzer::new(config), 2).unwrap();
        let report = handle.score(path).await.unwrap();
        assert_eq!(report.section1.get("trust").unwrap().balance, "70.0%");
    }

    #[tokio::test]
    async fn test_missing_table_is_error() {
        let handle = spawn_engine(Analyzer::default(), 1).unwrap();
        let err = handle
            .score(PathBuf::from("/nonexistent/persona.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Table(_)));
    }

    #[tokio::test]
    async fn test_handle_is_shared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.csv");
        std::fs::write(&path, "frame, AU04_r\n1, 1.0\n2, 3.0\n").unwrap();

        let handle = spawn_engine(Analyzer::default(), 4).unwrap();
        let (a, b) = tokio::join!(handle.score(path.clone()), handle.score(path));
        assert_eq!(
            a.unwrap().section3.get("attention").unwrap().top_image,
            b.unwrap().section3.get("attention").unwrap().top_image
        );
    }
}
