//! Worker-level error type (§4.E).

use thiserror::Error;
use vectorizer_common::Disposition;
use vectorizer_executor::ExecutorError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("executor failed fatally: {0}")]
    Executor(#[from] ExecutorError),
}

/// Classify an `ExecutorError` into the Worker's retryable/fatal split
/// (§4.E steps 4/5). Standalone function so the classification itself is
/// unit-testable without spinning up a `Worker`.
#[must_use]
pub fn classify(err: &ExecutorError) -> Disposition {
    err.disposition()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_row_is_not_fatal() {
        let err = ExecutorError::MalformedRow {
            pk: "[1]".to_string(),
            message: "bad row".to_string(),
        };
        assert_eq!(classify(&err), Disposition::ContainedPerChunk);
    }
}
