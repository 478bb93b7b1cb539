use std::io;
use std::path::{Path, PathBuf};

/// Error that occurs when reading a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file `{path}`: {source}")]
pub struct FileReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Reads the entire contents of the file at the given path into a string.
///
/// # Errors
///
/// Returns a [`FileReadError`] if the file cannot be opened or is not valid UTF-8.
///
/// # Example
/// ```no_run
/// # use oci_lifecycle_sensor::fsutil;
/// # async fn doc() -> Result<(), fsutil::FileReadError> {
/// let content = fsutil::read_to_string("/some/file.txt").await?;
/// # Ok(())
/// # }
/// ```
pub async fn read_to_string(path: impl AsRef<Path>) -> Result<String, FileReadError> {
    let path = path.as_ref();
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FileReadError {
            path: path.to_path_buf(),
            source,
        })
}
