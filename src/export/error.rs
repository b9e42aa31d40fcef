use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Write `contents` to `path`, attaching the path to any IO error
pub(crate) fn write_file(path: &std::path::Path, contents: &str) -> ExportResult<()> {
    std::fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
