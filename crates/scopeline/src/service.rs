//! Caller-facing facade over the store and orchestrator.
//!
//! This is what a thin API layer consumes: create-and-start in one call,
//! resume, lookups, deletion, and the read-only preview.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cancel::CancelFlag;
use crate::job::{AnalysisMode, AssessmentJob, JobSummary, NewJob, ProjectAssessment};
use crate::pipeline::{Orchestrator, PipelineError, ProgressReporter};
use crate::reference::ReferenceResolver;
use crate::store::StoreError;

/// Inputs for `start_job`.
#[derive(Debug, Clone)]
pub struct StartJobRequest {
    pub template_id: String,
    pub project_name: String,
    /// Path of the uploaded scope document.
    pub source_document: PathBuf,
    pub analysis_mode: AnalysisMode,
    /// Reference ids to resolve into few-shot context.
    pub reference_ids: Vec<String>,
}

pub struct JobService {
    orchestrator: Arc<Orchestrator>,
    resolver: Box<dyn ReferenceResolver>,
    max_references: usize,
}

impl JobService {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        resolver: Box<dyn ReferenceResolver>,
        max_references: usize,
    ) -> Self {
        Self {
            orchestrator,
            resolver,
            max_references,
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Creates a job and immediately runs it. References are resolved here,
    /// once, and captured on the job for any later resume.
    pub fn start_job(
        &self,
        request: StartJobRequest,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<AssessmentJob, PipelineError> {
        let reference_context = self
            .resolver
            .resolve(&request.reference_ids, self.max_references);

        let job = self.orchestrator.store().create(NewJob {
            template_id: request.template_id,
            project_name: request.project_name,
            analysis_mode: request.analysis_mode,
            source_document_ref: request.source_document.to_string_lossy().to_string(),
            reference_context,
        })?;

        self.orchestrator.start(&job.id, cancel, progress)
    }

    /// Re-enters a failed (or stale in-progress) job at the stage that
    /// stopped.
    pub fn resume_job(
        &self,
        job_id: &str,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<AssessmentJob, PipelineError> {
        self.orchestrator.resume(job_id, cancel, progress)
    }

    pub fn get_job(&self, job_id: &str) -> Result<AssessmentJob, StoreError> {
        self.orchestrator.store().get(job_id)
    }

    pub fn list_job_summaries(&self) -> Result<Vec<JobSummary>, StoreError> {
        self.orchestrator.store().list_summaries()
    }

    /// Removes a job. Returns false if it was already absent.
    pub fn delete_job(&self, job_id: &str) -> Result<bool, StoreError> {
        self.orchestrator.store().delete(job_id)
    }

    /// Read-only assessment preview from whatever artifacts exist; `None`
    /// until generation has checkpointed.
    pub fn preview_assessment(
        &self,
        job_id: &str,
    ) -> Result<Option<ProjectAssessment>, PipelineError> {
        self.orchestrator.try_build_assessment(job_id)
    }
}
