use thiserror::Error;

/// Failures surfaced by the recording store.
///
/// File-removal problems during delete are not part of this type: they are
/// logged and never fail the operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("Recording {0} not found")]
    NotFound(i64),
    /// The uploaded content could not be read from its source (client went away, body limit hit)
    #[error("Failed to read upload content: {0}")]
    ContentRead(#[source] std::io::Error),
    #[error("Failed to write recording content: {0}")]
    StorageWrite(#[source] std::io::Error),
    #[error("{0}")]
    Persistence(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
