use thiserror::Error;

/// Failure reported by a storage backend.
///
/// Every backend problem (query failure, constraint violation, exhausted
/// pool) collapses into this one kind. Callers decide what to do with it;
/// nothing in this crate retries.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}
