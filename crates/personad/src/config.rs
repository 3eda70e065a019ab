use persona_core::ScoringConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read scoring config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scoring config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (default: 0.0.0.0:5000).
    pub bind_addr: String,
    /// FeatureExtraction executable.
    pub extractor_bin: PathBuf,
    /// Arguments placed before `-fdir`/`-out_dir` (e.g. a wrapper script).
    pub extractor_args: Vec<String>,
    /// Timeout in seconds for one extractor run.
    pub extract_timeout_secs: u64,
    /// Root for per-request upload directories.
    pub upload_dir: PathBuf,
    /// Root for per-request extractor output.
    pub results_dir: PathBuf,
    /// Keep extractor output after the response is sent.
    pub keep_results: bool,
    /// Request body limit for `/analyze`.
    pub max_upload_bytes: usize,
    pub scoring: ScoringConfig,
}

impl Config {
    /// Load configuration from `PERSONA_*` environment variables with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut scoring = match lookup("PERSONA_SCORING_CONFIG") {
            Some(path) => load_scoring(&path)?,
            None => ScoringConfig::default(),
        };
        if let Some(seed) = lookup("PERSONA_SEED").and_then(|v| v.parse().ok()) {
            scoring.seed = Some(seed);
        }

        Ok(Self {
            bind_addr: lookup("PERSONA_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            extractor_bin: lookup("PERSONA_EXTRACTOR_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("openface/FeatureExtraction")),
            extractor_args: lookup("PERSONA_EXTRACTOR_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            extract_timeout_secs: parse_or(&lookup, "PERSONA_EXTRACT_TIMEOUT_SECS", 300),
            upload_dir: lookup("PERSONA_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            results_dir: lookup("PERSONA_RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("results")),
            keep_results: lookup("PERSONA_KEEP_RESULTS")
                .map(|v| v != "0")
                .unwrap_or(true),
            max_upload_bytes: parse_or(&lookup, "PERSONA_MAX_UPLOAD_BYTES", 256 * 1024 * 1024),
            scoring,
        })
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }
}

fn load_scoring(path: &str) -> Result<ScoringConfig, ConfigError> {
    let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    toml::from_str(&src).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
