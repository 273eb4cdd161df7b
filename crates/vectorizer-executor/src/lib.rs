//! The Executor (§4.D): claims one batch, chunks/formats/embeds it, and
//! writes the result, all inside a single transaction.

pub mod error;
pub mod executor;

pub use error::{ExecutorError, ExecutorResult, StepError};
pub use executor::{Executor, ExecutorLike};
