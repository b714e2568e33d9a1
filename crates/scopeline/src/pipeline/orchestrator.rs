//! Pipeline orchestrator: drives the job state machine through its two
//! stages, checkpointing after each one.
//!
//! Every stage runs as blocking calls to the extractor/gateway interleaved
//! with local assembly. Failures become job state; only caller-input errors
//! (`NotFound`, `ConcurrentModification`, illegal entry points) escape.

use std::path::Path;

use tracing::{debug, info_span, warn};

use crate::assemble::{self, DraftParse, EstimateParse};
use crate::cancel::CancelFlag;
use crate::db::assessment_repo::AssessmentStorage;
use crate::extract::TextExtractor;
use crate::gateway::{ChatMessage, LlmGateway};
use crate::job::{AssessmentJob, ColumnEstimates, DraftSections, JobStatus, ProjectAssessment};
use crate::sanitize;
use crate::store::{Artifact, JobStore};

use super::error::{PipelineError, StageAbort, StageError};
use super::progress::{ProgressEvent, ProgressReporter};
use super::prompt;

/// Builds an `Orchestrator` with production implementations: the extractor
/// registry, the Ollama gateway, and SQLite-backed assessment storage.
pub fn build_orchestrator(
    config: &crate::config::Config,
    db: crate::db::Database,
) -> Result<Orchestrator, crate::error::ScopelineError> {
    let gateway = crate::gateway::OllamaGateway::new(
        &config.gateway.base_url,
        &config.gateway.model,
        config.gateway.timeout_secs,
    )?;
    tracing::info!(model = %config.gateway.model, "Pipeline using gateway model");

    Ok(Orchestrator::new(
        JobStore::new(db.clone()),
        Box::new(crate::extract::ExtractorRegistry::new()),
        Box::new(gateway),
        Box::new(crate::db::assessment_repo::SqliteAssessmentStorage::new(db)),
        config.columns.clone(),
        config.generation.max_document_chars,
    ))
}

pub struct Orchestrator {
    store: JobStore,
    extractor: Box<dyn TextExtractor>,
    gateway: Box<dyn LlmGateway>,
    assessments: Box<dyn AssessmentStorage>,
    columns: Vec<String>,
    max_document_chars: usize,
}

impl Orchestrator {
    pub fn new(
        store: JobStore,
        extractor: Box<dyn TextExtractor>,
        gateway: Box<dyn LlmGateway>,
        assessments: Box<dyn AssessmentStorage>,
        columns: Vec<String>,
        max_document_chars: usize,
    ) -> Self {
        Self {
            store,
            extractor,
            gateway,
            assessments,
            columns,
            max_document_chars,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Runs a freshly created job. Only legal from `Pending`; the job is
    /// moved to `GenerationInProgress` before any external call so a crash
    /// mid-stage leaves it visibly in progress.
    pub fn start(
        &self,
        job_id: &str,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<AssessmentJob, PipelineError> {
        let job = self.store.get(job_id)?;
        if job.status != JobStatus::Pending {
            return Err(PipelineError::AlreadyStarted {
                id: job.id,
                status: job.status,
            });
        }

        let job = self
            .store
            .transition_to(&job, JobStatus::GenerationInProgress, None, None)?;
        self.generation_stage(job, cancel, progress)
    }

    /// Re-enters a failed job at the exact stage that failed, reusing every
    /// artifact produced before the failure. Also reclaims a stale
    /// in-progress job left behind by a cancelled invocation, continues a
    /// job parked at `GenerationComplete` by a crash between checkpoints,
    /// and retries finalize from `EstimationComplete`.
    pub fn resume(
        &self,
        job_id: &str,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<AssessmentJob, PipelineError> {
        let job = self.store.get(job_id)?;

        match job.status {
            JobStatus::FailedGeneration | JobStatus::GenerationInProgress => {
                let job = self
                    .store
                    .transition_to(&job, JobStatus::GenerationInProgress, None, None)?;
                self.generation_stage(job, cancel, progress)
            }
            JobStatus::FailedEstimation
            | JobStatus::EstimationInProgress
            | JobStatus::GenerationComplete => {
                let job = self
                    .store
                    .transition_to(&job, JobStatus::EstimationInProgress, None, None)?;
                self.estimation_stage(job, cancel, progress)
            }
            JobStatus::EstimationComplete => self.finalize(job, cancel, progress),
            JobStatus::Pending | JobStatus::Complete => Err(PipelineError::NotResumable {
                id: job.id,
                status: job.status,
            }),
        }
    }

    /// Read-only preview: assembles an assessment view from whatever
    /// artifacts exist right now. Missing estimates are zero-filled; no
    /// generation artifact yet means no preview. Never changes job status.
    pub fn try_build_assessment(
        &self,
        job_id: &str,
    ) -> Result<Option<ProjectAssessment>, PipelineError> {
        let job = self.store.get(job_id)?;

        let draft = match job.generation_artifact {
            Some(ref draft) => draft,
            None => return Ok(None),
        };
        let estimates = match job.estimation_artifact {
            Some(ref estimates) => estimates.clone(),
            None => ColumnEstimates::zero_filled(draft, &self.columns),
        };

        Ok(Some(ProjectAssessment::merge(
            &job.template_id,
            &job.project_name,
            draft,
            &estimates,
            &self.columns,
        )))
    }

    // ── Stage drivers ───────────────────────────────────────────────────

    /// Job must hold `GenerationInProgress`. Runs generation, checkpoints,
    /// and auto-chains into estimation.
    fn generation_stage(
        &self,
        job: AssessmentJob,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<AssessmentJob, PipelineError> {
        let _span = info_span!("generation_stage", job_id = %job.id).entered();

        match self.run_generation(&job, cancel, progress) {
            Ok(draft) => {
                let job = self.store.transition_to(
                    &job,
                    JobStatus::GenerationComplete,
                    Some(Artifact::Draft(draft)),
                    None,
                )?;
                progress.report(ProgressEvent::Stage {
                    status: JobStatus::GenerationComplete,
                    message: "Draft structure checkpointed".to_string(),
                });

                if cancel.is_cancelled() {
                    debug!(job_id = %job.id, "Cancelled after generation checkpoint");
                    return Ok(job);
                }
                let job = self
                    .store
                    .transition_to(&job, JobStatus::EstimationInProgress, None, None)?;
                self.estimation_stage(job, cancel, progress)
            }
            Err(StageAbort::Cancelled) => {
                debug!(job_id = %job.id, "Generation cancelled, job left in progress");
                Ok(job)
            }
            Err(StageAbort::Failed(e)) => {
                let message = e.to_string();
                warn!(job_id = %job.id, error = %message, "Generation stage failed");
                progress.report(ProgressEvent::Failed {
                    status: JobStatus::FailedGeneration,
                    error: message.clone(),
                });
                Ok(self.store.transition_to(
                    &job,
                    JobStatus::FailedGeneration,
                    None,
                    Some(message),
                )?)
            }
        }
    }

    /// Job must hold `EstimationInProgress` with a generation artifact.
    fn estimation_stage(
        &self,
        job: AssessmentJob,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<AssessmentJob, PipelineError> {
        let _span = info_span!("estimation_stage", job_id = %job.id).entered();

        let draft = match job.generation_artifact {
            Some(ref draft) => draft.clone(),
            None => {
                // Should be unreachable given the invariants, but a corrupt
                // row must park the job rather than panic.
                return Ok(self.store.transition_to(
                    &job,
                    JobStatus::FailedEstimation,
                    None,
                    Some("No generation artifact available for estimation".to_string()),
                )?);
            }
        };

        match self.run_estimation(&draft, cancel, progress) {
            Ok(estimates) => {
                let job = self.store.transition_to(
                    &job,
                    JobStatus::EstimationComplete,
                    Some(Artifact::Estimates(estimates)),
                    None,
                )?;
                progress.report(ProgressEvent::Stage {
                    status: JobStatus::EstimationComplete,
                    message: "Estimates checkpointed".to_string(),
                });
                self.finalize(job, cancel, progress)
            }
            Err(StageAbort::Cancelled) => {
                debug!(job_id = %job.id, "Estimation cancelled, job left in progress");
                Ok(job)
            }
            Err(StageAbort::Failed(e)) => {
                let message = e.to_string();
                warn!(job_id = %job.id, error = %message, "Estimation stage failed");
                progress.report(ProgressEvent::Failed {
                    status: JobStatus::FailedEstimation,
                    error: message.clone(),
                });
                Ok(self.store.transition_to(
                    &job,
                    JobStatus::FailedEstimation,
                    None,
                    Some(message),
                )?)
            }
        }
    }

    /// Job must hold `EstimationComplete`. A materialization failure is
    /// reported but never regresses the job's status.
    fn finalize(
        &self,
        job: AssessmentJob,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<AssessmentJob, PipelineError> {
        let _span = info_span!("finalize", job_id = %job.id).entered();

        if cancel.is_cancelled() {
            debug!(job_id = %job.id, "Cancelled before finalize");
            return Ok(job);
        }

        let (draft, estimates) = match (&job.generation_artifact, &job.estimation_artifact) {
            (Some(draft), Some(estimates)) => (draft, estimates),
            _ => {
                warn!(job_id = %job.id, "Finalize without both artifacts, leaving status as-is");
                return Ok(job);
            }
        };

        match self.assessments.materialize(
            &job.id,
            &job.template_id,
            &job.project_name,
            draft,
            estimates,
            &self.columns,
        ) {
            Ok(_assessment) => {
                let job = self
                    .store
                    .transition_to(&job, JobStatus::Complete, None, None)?;
                progress.report(ProgressEvent::Stage {
                    status: JobStatus::Complete,
                    message: "Assessment ready".to_string(),
                });
                Ok(job)
            }
            Err(e) => {
                warn!(
                    job_id = %job.id,
                    error = %e,
                    "Assessment materialization failed; job stays estimation-complete"
                );
                Ok(job)
            }
        }
    }

    // ── Stage bodies ────────────────────────────────────────────────────

    fn run_generation(
        &self,
        job: &AssessmentJob,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<DraftSections, StageAbort> {
        if cancel.is_cancelled() {
            return Err(StageAbort::Cancelled);
        }

        progress.report(ProgressEvent::Stage {
            status: JobStatus::GenerationInProgress,
            message: "Extracting document text...".to_string(),
        });
        let pages = {
            let source = Path::new(&job.source_document_ref);
            let _step = info_span!("extract", file = %sanitize::redact_path(source)).entered();
            self.extractor.extract(source)?
        };

        progress.report(ProgressEvent::Stage {
            status: JobStatus::GenerationInProgress,
            message: "Requesting draft structure from model...".to_string(),
        });
        let generation_prompt = prompt::build_generation_prompt(
            &job.project_name,
            job.analysis_mode,
            &pages,
            &job.reference_context,
            self.max_document_chars,
        );
        let raw = self.gateway.complete(&generation_prompt, &[], cancel)?;

        match assemble::assemble_sections(&raw) {
            DraftParse::Parsed(draft) => Ok(draft),
            DraftParse::Malformed { raw } => {
                debug!(job_id = %job.id, "Draft output malformed, attempting one repair");
                progress.report(ProgressEvent::Stage {
                    status: JobStatus::GenerationInProgress,
                    message: "Repairing malformed model output...".to_string(),
                });
                let history = [
                    ChatMessage::user(generation_prompt),
                    ChatMessage::assistant(raw),
                ];
                let repaired = self
                    .gateway
                    .complete(prompt::repair_prompt(), &history, cancel)?;
                match assemble::assemble_sections(&repaired) {
                    DraftParse::Parsed(draft) => Ok(draft),
                    DraftParse::Malformed { .. } => {
                        Err(StageAbort::Failed(StageError::UnrepairableOutput))
                    }
                }
            }
        }
    }

    fn run_estimation(
        &self,
        draft: &DraftSections,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<ColumnEstimates, StageAbort> {
        if cancel.is_cancelled() {
            return Err(StageAbort::Cancelled);
        }

        progress.report(ProgressEvent::Stage {
            status: JobStatus::EstimationInProgress,
            message: "Requesting estimates from model...".to_string(),
        });
        let estimation_prompt = prompt::build_estimation_prompt(draft, &self.columns);
        let raw = self.gateway.complete(&estimation_prompt, &[], cancel)?;

        match assemble::assemble_estimates(&raw, draft, &self.columns) {
            EstimateParse::Parsed(estimates) => Ok(estimates),
            EstimateParse::Malformed { raw } => {
                debug!("Estimate output malformed, attempting one repair");
                progress.report(ProgressEvent::Stage {
                    status: JobStatus::EstimationInProgress,
                    message: "Repairing malformed model output...".to_string(),
                });
                let history = [
                    ChatMessage::user(estimation_prompt),
                    ChatMessage::assistant(raw),
                ];
                let repaired = self
                    .gateway
                    .complete(prompt::repair_prompt(), &history, cancel)?;
                match assemble::assemble_estimates(&repaired, draft, &self.columns) {
                    EstimateParse::Parsed(estimates) => Ok(estimates),
                    EstimateParse::Malformed { .. } => {
                        Err(StageAbort::Failed(StageError::UnrepairableOutput))
                    }
                }
            }
        }
    }
}
