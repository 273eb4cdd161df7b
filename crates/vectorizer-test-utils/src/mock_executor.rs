//! A scriptable [`ExecutorLike`] double for Worker run-loop tests (§4.E),
//! so retry/backoff/shutdown behavior can be exercised without a live
//! Postgres connection (the real `Executor` always needs one).

use std::sync::Mutex;
use vectorizer_executor::{ExecutorLike, ExecutorResult};

/// Each call to `run_once` pops the next scripted outcome; once the script
/// is exhausted, repeats the last outcome (or returns `Ok(0)` if the
/// script was empty to begin with).
pub struct MockExecutor {
    script: Mutex<Vec<ExecutorResult<usize>>>,
    calls: Mutex<usize>,
}

impl MockExecutor {
    #[must_use]
    pub fn new(script: Vec<ExecutorResult<usize>>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ExecutorLike for MockExecutor {
    async fn run_once(&self) -> ExecutorResult<usize> {
        *self.calls.lock().unwrap() += 1;
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Ok(0);
        }
        if script.len() == 1 {
            // Keep repeating the final scripted outcome, since we can't
            // clone an `ExecutorResult` (the error side isn't `Clone`) -
            // callers that want exhaustion-then-repeat of an `Ok` can
            // still observe it; `Err` scripts should list every desired
            // call explicitly instead of relying on repeat.
            return match &script[0] {
                Ok(count) => Ok(*count),
                Err(_) => script.remove(0),
            };
        }
        script.remove(0)
    }
}
