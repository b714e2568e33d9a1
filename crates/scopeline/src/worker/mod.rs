pub mod pool;

pub use pool::{JobAction, JobCommand, JobRunResult, WorkerPool};

// Re-export crossbeam_channel for use by embedders
pub use crossbeam_channel;
