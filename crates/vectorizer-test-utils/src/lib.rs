//! Test doubles and fixtures shared across the workspace's unit test
//! suites: small, dependency-light helpers that keep individual crates'
//! test modules from re-deriving the same scaffolding.

pub mod fixtures;
pub mod mock_embedder;
pub mod mock_executor;
pub mod mock_queue;

pub use fixtures::{sample_config, sample_row, sample_vectorizer};
pub use mock_embedder::MockEmbedder;
pub use mock_executor::MockExecutor;
pub use mock_queue::MockQueueProtocol;
