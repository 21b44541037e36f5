use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage quota exceeded: {0}")]
    Quota(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify an I/O error, separating out-of-space conditions from the
    /// rest so callers can log them distinctly before degrading.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => {
                StoreError::Quota(err.to_string())
            }
            _ => StoreError::Io(err),
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, StoreError::Quota(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classifies_storage_full() {
        let err = StoreError::from_io(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        assert!(err.is_quota());

        let err = StoreError::from_io(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(!err.is_quota());
    }
}
