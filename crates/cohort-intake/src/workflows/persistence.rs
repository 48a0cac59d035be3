/// Failures raised by the backing stores. Every mutating call is all-or-nothing: an error
/// means nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stale write: expected version {expected}, store holds {found}")]
    VersionConflict { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Compares the caller's token with the stored one before a write lands.
pub(crate) fn check_version(expected: u64, found: u64) -> Result<(), RepositoryError> {
    if expected == found {
        Ok(())
    } else {
        Err(RepositoryError::VersionConflict { expected, found })
    }
}
