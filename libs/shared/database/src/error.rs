use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    /// A conditional write matched no row because the record changed since it was read.
    #[error("Record was modified concurrently")]
    StaleState,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(format!("Malformed record: {}", err))
    }
}
