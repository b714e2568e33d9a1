pub mod assemble;
pub mod broadcast;
pub mod cancel;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod job;
pub mod pipeline;
pub mod reference;
pub mod sanitize;
pub mod service;
pub mod store;
pub mod worker;

pub use broadcast::JobProgressBroadcaster;
pub use cancel::CancelFlag;
pub use config::{load_config, Config};
pub use error::{ConfigError, Result, ScopelineError, WorkerError};
pub use job::{
    AnalysisMode, AssessmentJob, ColumnEstimates, DraftSections, JobStatus, JobSummary,
    ProjectAssessment,
};
pub use pipeline::{Orchestrator, PipelineError};
pub use service::{JobService, StartJobRequest};
pub use store::{JobStore, StoreError};
pub use worker::{JobCommand, WorkerPool};
