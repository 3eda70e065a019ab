//! External FeatureExtraction invocation.
//!
//! The extractor reads every image in an input directory and writes one
//! CSV row per image into an output directory. It is treated as a black
//! box: only its exit status and the CSV it leaves behind matter here.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Tail of stderr kept in error messages.
const STDERR_TAIL: usize = 2000;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to launch extractor {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("extractor exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("extractor timed out after {0:?}")]
    Timeout(Duration),
    #[error("extractor produced no measurement table in {0}")]
    NoOutput(String),
}

pub struct FeatureExtractor {
    bin: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl FeatureExtractor {
    pub fn new(bin: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            args,
            timeout,
        }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Run the extractor over `input_dir`, writing into `out_dir`, and
    /// return the path of the measurement table it produced.
    pub async fn run(&self, input_dir: &Path, out_dir: &Path) -> Result<PathBuf, ExtractError> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(&self.args)
            .arg("-fdir")
            .arg(input_dir)
            .arg("-out_dir")
            .arg(out_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            bin = %self.bin.display(),
            input = %input_dir.display(),
            output = %out_dir.display(),
            "running extractor"
        );

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ExtractError::Timeout(self.timeout))?
            .map_err(|source| ExtractError::Spawn {
                bin: self.bin.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let start = stderr.len().saturating_sub(STDERR_TAIL);
            let start = (start..stderr.len())
                .find(|&i| stderr.is_char_boundary(i))
                .unwrap_or(stderr.len());
            return Err(ExtractError::Failed {
                status: output.status,
                stderr: stderr[start..].trim().to_string(),
            });
        }

        locate_table(input_dir, out_dir)
    }
}

/// Find the extractor's CSV: `<out_dir>/<input dir name>.csv`, or else the
/// only CSV in `out_dir`.
pub fn locate_table(input_dir: &Path, out_dir: &Path) -> Result<PathBuf, ExtractError> {
    let no_output = || ExtractError::NoOutput(out_dir.display().to_string());

    if let Some(stem) = input_dir.file_name() {
        let expected = out_dir.join(format!("{}.csv", stem.to_string_lossy()));
        if expected.is_file() {
            return Ok(expected);
        }
    }

    let entries = std::fs::read_dir(out_dir).map_err(|_| no_output())?;
    let mut tables = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        });

    match (tables.next(), tables.next()) {
        (Some(only), None) => Ok(only),
        _ => Err(no_output()),
    }
}
