//! An in-memory queue double: the same claim/requeue/succeed semantics
//! over a `Mutex<HashMap<...>>` instead of `FOR UPDATE SKIP LOCKED` SQL.
//!
//! This does not implement the real `QueueProtocol` trait - that trait's
//! methods take `&mut sqlx::PgConnection`, which only a live Postgres
//! connection can produce, so a trait-object-compatible mock isn't
//! possible. Instead this exposes the same operations with the `conn`
//! parameter dropped, for tests that want to exercise claim/backoff/succeed
//! bookkeeping without a database.

use std::collections::HashMap;
use std::sync::Mutex;
use vectorizer_catalog::{ClaimedItem, FailureStep, PkValues};
use vectorizer_config::RetryConfig;

fn pk_key(pk: &PkValues) -> String {
    serde_json::Value::Array(pk.clone()).to_string()
}

struct Entry {
    row: Option<serde_json::Value>,
    attempts: i32,
    claimed: bool,
}

/// A dead-lettered entry, recorded when `requeue_with_backoff` exhausts
/// `retry.max_attempts`.
#[derive(Debug, Clone)]
pub struct DeadLettered {
    pub pk: PkValues,
    pub attempts: i32,
    pub failure_step: FailureStep,
    pub error: String,
}

#[derive(Default)]
pub struct MockQueueProtocol {
    entries: Mutex<HashMap<String, Entry>>,
    dead_letters: Mutex<Vec<DeadLettered>>,
}

impl MockQueueProtocol {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one queued entry. `row = None` simulates a tombstone (source
    /// row already deleted).
    pub fn seed(&self, pk: PkValues, row: Option<serde_json::Value>) {
        self.entries.lock().unwrap().insert(
            pk_key(&pk),
            Entry {
                row,
                attempts: 0,
                claimed: false,
            },
        );
    }

    /// Claim up to `batch_size` unclaimed entries.
    pub fn claim(&self, batch_size: i64) -> Vec<ClaimedItem> {
        let mut entries = self.entries.lock().unwrap();
        let mut claimed = Vec::new();
        for (key, entry) in entries.iter_mut() {
            if claimed.len() as i64 >= batch_size {
                break;
            }
            if !entry.claimed {
                entry.claimed = true;
                let pk: PkValues = serde_json::from_str(key).unwrap_or_default();
                claimed.push(ClaimedItem {
                    pk,
                    attempts: entry.attempts,
                    row: entry.row.clone(),
                });
            }
        }
        claimed
    }

    /// Schedule a retry, or dead-letter once `retry.max_attempts` is hit.
    pub fn requeue_with_backoff(
        &self,
        retry: &RetryConfig,
        pk: &PkValues,
        failure_step: FailureStep,
        error: &str,
    ) {
        let key = pk_key(pk);
        let mut entries = self.entries.lock().unwrap();
        let Some(entry) = entries.get_mut(&key) else {
            return;
        };
        entry.attempts += 1;
        if entry.attempts as u32 >= retry.max_attempts {
            let attempts = entry.attempts;
            entries.remove(&key);
            self.dead_letters.lock().unwrap().push(DeadLettered {
                pk: pk.clone(),
                attempts,
                failure_step,
                error: error.to_string(),
            });
        } else {
            entry.claimed = false;
        }
    }

    /// Remove claimed, successfully-processed PKs from the queue.
    pub fn succeed(&self, pks: &[PkValues]) {
        let mut entries = self.entries.lock().unwrap();
        for pk in pks {
            entries.remove(&pk_key(pk));
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> i64 {
        self.entries.lock().unwrap().len() as i64
    }

    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLettered> {
        self.dead_letters.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_only_returns_unclaimed_entries() {
        let queue = MockQueueProtocol::new();
        queue.seed(vec![serde_json::json!(1)], Some(serde_json::json!({"id": 1})));
        queue.seed(vec![serde_json::json!(2)], Some(serde_json::json!({"id": 2})));

        let first = queue.claim(10);
        assert_eq!(first.len(), 2);
        assert!(queue.claim(10).is_empty());
    }

    #[test]
    fn requeue_dead_letters_after_max_attempts() {
        let queue = MockQueueProtocol::new();
        let pk = vec![serde_json::json!(1)];
        queue.seed(pk.clone(), Some(serde_json::json!({"id": 1})));
        let retry = RetryConfig {
            max_attempts: 2,
            backoff_base_seconds: 1,
            backoff_cap_seconds: 60,
        };

        queue.claim(10);
        queue.requeue_with_backoff(&retry, &pk, FailureStep::Embedding, "timeout");
        assert_eq!(queue.pending_count(), 1);

        queue.claim(10);
        queue.requeue_with_backoff(&retry, &pk, FailureStep::Embedding, "timeout again");
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(queue.dead_letters().len(), 1);
    }

    #[test]
    fn succeed_removes_entries() {
        let queue = MockQueueProtocol::new();
        let pk = vec![serde_json::json!(7)];
        queue.seed(pk.clone(), Some(serde_json::json!({"id": 7})));
        queue.claim(10);
        queue.succeed(&[pk]);
        assert_eq!(queue.pending_count(), 0);
    }
}
