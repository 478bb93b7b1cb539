use std::path::PathBuf;

/// Errors raised by the notification facility or while registering watches.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to initialize inotify: {0}")]
    Init(#[source] std::io::Error),
    #[error("failed to watch `{path}`: {source}")]
    AddWatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory `{path}`: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read inotify event: {0}")]
    ReadEvent(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
