//! Per-request working directories.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Upload and result directories for one request, named by a fresh id.
///
/// The upload directory is removed on drop. The result directory is
/// removed too unless `keep_results` was requested.
pub struct JobDirs {
    pub id: Uuid,
    upload: PathBuf,
    results: PathBuf,
    keep_results: bool,
}

impl JobDirs {
    pub fn create(
        upload_root: &Path,
        results_root: &Path,
        keep_results: bool,
    ) -> std::io::Result<Self> {
        let id = Uuid::new_v4();
        let upload = upload_root.join(id.to_string());
        let results = results_root.join(id.to_string());
        std::fs::create_dir_all(&upload)?;
        // Construct before the second mkdir so a failure still cleans up.
        let dirs = Self {
            id,
            upload,
            results,
            keep_results,
        };
        std::fs::create_dir_all(&dirs.results)?;
        Ok(dirs)
    }

    pub fn upload(&self) -> &Path {
        &self.upload
    }

    pub fn results(&self) -> &Path {
        &self.results
    }
}

impl Drop for JobDirs {
    fn drop(&mut self) {
        remove(&self.upload);
        if !self.keep_results {
            remove(&self.results);
        }
    }
}

fn remove(dir: &Path) {
    if let Err(err) = std::fs::remove_dir_all(dir) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(dir = %dir.display(), error = %err, "failed to remove job directory");
        }
    }
}
