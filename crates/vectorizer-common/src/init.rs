//! Global initialization utilities for the vectorizer process

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the process environment
///
/// Loads environment variables from a `.env` file (searching up the tree)
/// if one is present. Safe to call multiple times - will only run once.
pub fn initialize_environment() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
    });
}

/// Initialize environment for tests
///
/// Prefers `.env.test`, falling back to `.env`.
#[cfg(test)]
pub fn initialize_test_environment() {
    INIT.call_once(|| {
        dotenvy::from_filename(".env.test")
            .or_else(|_| dotenvy::dotenv())
            .ok();
    });
}
