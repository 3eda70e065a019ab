//! Upload normalization.
//!
//! The extractor only reads a handful of still-image encodings. Anything
//! else is decoded with the `image` crate and re-encoded as PNG before it
//! lands in the extractor's input directory.

use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Extensions the extractor reads without conversion.
pub const NATIVE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("cannot decode upload {name:?}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot encode upload {name:?} as PNG: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot write upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Lower-cased extension of an uploaded file name.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn is_native(extension: &str) -> bool {
    NATIVE_EXTENSIONS.contains(&extension)
}

/// Write one upload into `dir` under a fresh random name, converting it
/// to PNG when the extractor cannot read it as-is.
pub fn stage_upload(dir: &Path, file_name: &str, data: &[u8]) -> Result<PathBuf, NormalizeError> {
    let stem = Uuid::new_v4();

    if let Some(ext) = extension_of(file_name).filter(|e| is_native(e)) {
        let path = dir.join(format!("{stem}.{ext}"));
        std::fs::write(&path, data)?;
        return Ok(path);
    }

    let decoded = image::load_from_memory(data).map_err(|source| NormalizeError::Decode {
        name: file_name.to_string(),
        source,
    })?;
    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|source| NormalizeError::Encode {
            name: file_name.to_string(),
            source,
        })?;

    let path = dir.join(format!("{stem}.png"));
    std::fs::write(&path, png)?;
    tracing::debug!(upload = file_name, staged = %path.display(), "upload converted to PNG");
    Ok(path)
}
