//! Queue Protocol (§4.A): claim/requeue/succeed/pending_count against the
//! per-vectorizer work queue, plus the backoff schedule used by
//! `requeue_with_backoff`.

pub mod backoff;
pub mod ident;
pub mod postgres;
pub mod protocol;

pub use backoff::{backoff_duration, backoff_duration_default};
pub use postgres::PostgresQueue;
pub use protocol::QueueProtocol;
