use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Usage(String),

    #[error("could not find a .docs directory (looked in: {})", display_paths(.searched))]
    CorpusNotFound { searched: Vec<PathBuf> },

    #[error("embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("cache storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("cache transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("cache table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("cache commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("cache file is corrupt: {0}")]
    CacheCorrupt(String),

    #[error(
        "embedding for {id} has dimension {found}, expected {expected}"
    )]
    DimensionMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
}

impl Error {
    /// Suggested next step printed under the error message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::EmbeddingUnavailable(_) => {
                Some("semantic search is unusable until this is fixed; try --fast")
            }
            Error::CorpusNotFound { .. } => {
                Some("create a .docs directory or pass --docs-dir")
            }
            _ => None,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nowhere".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
