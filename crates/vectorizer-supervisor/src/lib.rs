//! The Supervisor (§4.F) and Worker Tracking (§4.G): the outermost loop
//! over vectorizer IDs, and the liveness/progress telemetry it feeds.

pub mod error;
pub mod supervisor;
pub mod tracking;

pub use error::{SupervisorError, SupervisorResult};
pub use supervisor::Supervisor;
pub use tracking::{NoopWorkerTracking, PostgresWorkerTracking, ProgressEvent, WorkerTracking};
