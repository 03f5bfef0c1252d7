use super::object::ObjectId;
use thiserror::Error;

/// Failures reported by an [`ObjectStore`](crate::store::ObjectStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object '{0}' not found")]
    NotFound(String),

    #[error("Deletion of '{id}' rejected: {reason}")]
    Rejected { id: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

/// A matched object whose deletion failed.
#[derive(Debug)]
pub struct DeletionFailure {
    pub id: ObjectId,
    pub error: StoreError,
}

/// Errors that stop a sweep.
///
/// `Enumeration` and `Deletion` carry the deletions and the deletion
/// failures that happened before the sweep stopped, including deletes that
/// were still in flight.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Enumeration failed after {deleted} deletion(s): {source}")]
    Enumeration {
        deleted: usize,
        failures: Vec<DeletionFailure>,
        #[source]
        source: StoreError,
    },

    #[error("Deletion of '{id}' failed after {deleted} deletion(s): {source}")]
    Deletion {
        id: String,
        deleted: usize,
        /// Other failed deletes, not including `id`
        failures: Vec<DeletionFailure>,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SweepError {
    /// Number of objects already deleted when the sweep stopped.
    pub fn deleted_so_far(&self) -> usize {
        match self {
            SweepError::Enumeration { deleted, .. } | SweepError::Deletion { deleted, .. } => {
                *deleted
            }
            _ => 0,
        }
    }

    /// Deletion failures recorded before the sweep stopped.
    pub fn failures(&self) -> &[DeletionFailure] {
        match self {
            SweepError::Enumeration { failures, .. } | SweepError::Deletion { failures, .. } => {
                failures
            }
            _ => &[],
        }
    }

    /// Prepends `earlier` to the failures carried by an abort error.
    pub(crate) fn with_failures(mut self, mut earlier: Vec<DeletionFailure>) -> Self {
        if let SweepError::Enumeration { failures, .. } | SweepError::Deletion { failures, .. } =
            &mut self
        {
            earlier.append(failures);
            *failures = earlier;
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
