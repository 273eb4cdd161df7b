//! The Worker run loop (§4.E): spawns `concurrency` Executors for one
//! vectorizer and drives them to completion or shutdown.

pub mod error;
pub mod worker;

pub use error::{WorkerError, WorkerResult, classify};
pub use worker::{MAX_CONCURRENCY, Worker, WorkerEvent};
