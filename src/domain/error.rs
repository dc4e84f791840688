// ============================================================
// Layer 3 — Error Kinds
// ============================================================
// Every failure the pipeline can hit falls into one of these
// kinds. None of them is recovered from internally: they travel
// up to `main` and abort the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VmmrError {
    /// Missing or unreadable directory/file.
    #[error("filesystem error at '{path}': {message}")]
    FileSystem { path: PathBuf, message: String },

    /// The file exists but is not a decodable image.
    #[error("cannot decode image '{path}': {message}")]
    Decode { path: PathBuf, message: String },

    /// Manifest missing expected columns, or checkpoint missing fields.
    #[error("schema error in '{source_name}': {message}")]
    Schema { source_name: String, message: String },

    /// Dataset index outside `[0, len)`.
    #[error("index {index} out of range for dataset of length {len}")]
    Index { index: usize, len: usize },

    /// Accelerator unavailable or out of memory.
    #[error("device error: {0}")]
    Device(String),
}

impl VmmrError {
    pub fn fs(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::FileSystem { path: path.into(), message: err.to_string() }
    }

    pub fn decode(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Decode { path: path.into(), message: err.to_string() }
    }

    pub fn schema(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema { source_name: source_name.into(), message: message.into() }
    }
}

pub type VmmrResult<T> = std::result::Result<T, VmmrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let e = VmmrError::decode("cars/audi/a.jpg", "bad header");
        assert!(e.to_string().contains("cars/audi/a.jpg"));

        let e = VmmrError::Index { index: 7, len: 3 };
        assert_eq!(e.to_string(), "index 7 out of range for dataset of length 3");
    }
}
