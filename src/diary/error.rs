//! Failure taxonomy surfaced by [`super::store::DiaryStore`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiaryError {
    /// Caller input was rejected; retrying the same input will fail again.
    #[error("invalid diary entry: {0}")]
    Validation(String),

    #[error("index write failed: {0}")]
    IndexWrite(String),

    #[error("index query failed: {0}")]
    IndexQuery(String),

    /// The image could not be persisted; nothing was committed to the index.
    #[error("failed to write image artifact {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image exists but could not be removed; the owning entry was kept.
    #[error("failed to remove image artifact {}: {source}", path.display())]
    ArtifactRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DiaryError {
    pub(crate) fn index_write(err: anyhow::Error) -> Self {
        Self::IndexWrite(format!("{err:#}"))
    }

    pub(crate) fn index_query(err: anyhow::Error) -> Self {
        Self::IndexQuery(format!("{err:#}"))
    }
}

pub type DiaryResult<T> = std::result::Result<T, DiaryError>;
