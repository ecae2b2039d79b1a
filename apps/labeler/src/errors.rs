use thiserror::Error;

use crate::loaders::LoadError;
use crate::storage::StorageError;

/// Errors that abort a pipeline run.
///
/// Per-record problems (rejected rows, failed pair scoring) never surface here;
/// they are skipped, logged, and counted in `GenerationStats`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid generation options: {0}")]
    InvalidOptions(String),
}
