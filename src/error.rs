use std::{io, path::PathBuf};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid mod: {0}")]
    Validation(String),

    #[error("no mod with id {0}")]
    NotFound(i64),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }
}

/// Failures at the external process boundary (running scripts, opening paths).
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("no {label} set for this mod")]
    PathNotSet { label: &'static str },

    #[error("{label} not found: {}", path.display())]
    PathMissing { label: &'static str, path: PathBuf },

    #[error("failed to start {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
