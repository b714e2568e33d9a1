//! Durable job store with compare-and-set state transitions.
//!
//! The store is the only writer of job rows. `transition_to` applies status,
//! artifact and error together in a single SQL statement guarded by the
//! caller's `(status, revision)` snapshot — the mechanism that enforces "at
//! most one active stage per job".

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::job_repo::{self, JobRow, TransitionUpdate};
use crate::db::{Database, DatabaseError};
use crate::job::{
    AnalysisMode, AssessmentJob, ColumnEstimates, DraftSections, JobStatus, JobSummary, NewJob,
};

/// Errors surfaced by the job store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No job with the given id.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job moved since the caller's snapshot — another operation is
    /// already acting on it. Never recorded on the job itself; the caller
    /// should re-fetch and decide based on the now-current status.
    #[error("Concurrent modification of job {id}: expected {expected}, found {actual}")]
    ConcurrentModification {
        id: String,
        expected: JobStatus,
        actual: JobStatus,
    },

    /// The requested edge does not exist in the state machine.
    #[error("Illegal transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// The artifact handed to a transition does not fit the target status,
    /// or violates the generation/estimation consistency invariant.
    #[error("Artifact rejected for job {id}: {reason}")]
    ArtifactMismatch { id: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Artifact serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The artifact written alongside a checkpoint transition.
#[derive(Debug, Clone)]
pub enum Artifact {
    Draft(DraftSections),
    Estimates(ColumnEstimates),
}

// ─── Row conversion helpers ─────────────────────────────────────────────────

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn decode_column<T: serde::de::DeserializeOwned>(
    id: &str,
    column: &'static str,
    json: &str,
) -> Result<T, DatabaseError> {
    serde_json::from_str(json).map_err(|e| DatabaseError::CorruptRow {
        id: id.to_string(),
        column,
        reason: e.to_string(),
    })
}

fn row_to_job(row: JobRow) -> Result<AssessmentJob, DatabaseError> {
    let status = JobStatus::parse(&row.status).ok_or_else(|| DatabaseError::CorruptRow {
        id: row.id.clone(),
        column: "status",
        reason: format!("unknown status '{}'", row.status),
    })?;

    let analysis_mode = AnalysisMode::parse(&row.analysis_mode).unwrap_or_else(|| {
        log::warn!(
            "Unknown analysis mode '{}' for job {}, defaulting to standard",
            row.analysis_mode,
            row.id
        );
        AnalysisMode::Standard
    });

    let reference_context = match row.reference_context.as_deref() {
        Some(json) => decode_column(&row.id, "reference_context", json)?,
        None => Vec::new(),
    };

    let generation_artifact = match row.generation_artifact.as_deref() {
        Some(json) => Some(decode_column(&row.id, "generation_artifact", json)?),
        None => None,
    };

    let estimation_artifact = match row.estimation_artifact.as_deref() {
        Some(json) => Some(decode_column(&row.id, "estimation_artifact", json)?),
        None => None,
    };

    Ok(AssessmentJob {
        id: row.id,
        template_id: row.template_id,
        project_name: row.project_name,
        analysis_mode,
        status,
        created_at: parse_timestamp(&row.created_at),
        last_modified_at: parse_timestamp(&row.last_modified_at),
        source_document_ref: row.source_document_ref,
        reference_context,
        generation_artifact,
        estimation_artifact,
        error_message: row.error_message,
        revision: row.revision,
    })
}

// ─── JobStore ───────────────────────────────────────────────────────────────

/// Persistent job store backed by the shared `Database` handle.
#[derive(Clone)]
pub struct JobStore {
    db: Database,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Allocates a new job in `Pending` with its immutable inputs.
    pub fn create(&self, input: NewJob) -> Result<AssessmentJob, StoreError> {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        let reference_context = if input.reference_context.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&input.reference_context)?)
        };

        let row = JobRow {
            id: id.clone(),
            template_id: input.template_id,
            project_name: input.project_name,
            analysis_mode: input.analysis_mode.as_str().to_string(),
            status: JobStatus::Pending.as_str().to_string(),
            source_document_ref: input.source_document_ref,
            reference_context,
            generation_artifact: None,
            estimation_artifact: None,
            error_message: None,
            revision: 0,
            created_at: format_timestamp(now),
            last_modified_at: format_timestamp(now),
        };
        job_repo::insert(&self.db, &row)?;

        log::info!("Created job {} in pending", id);
        self.get(&id)
    }

    /// Fetches a job by id.
    pub fn get(&self, id: &str) -> Result<AssessmentJob, StoreError> {
        let row = job_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(row_to_job(row)?)
    }

    /// Lists all jobs as summaries, newest first.
    pub fn list_summaries(&self) -> Result<Vec<JobSummary>, StoreError> {
        let rows = job_repo::list_summaries(&self.db)?;
        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let status = JobStatus::parse(&row.status).ok_or_else(|| {
                DatabaseError::CorruptRow {
                    id: row.id.clone(),
                    column: "status",
                    reason: format!("unknown status '{}'", row.status),
                }
            })?;
            summaries.push(JobSummary {
                id: row.id,
                template_id: row.template_id,
                project_name: row.project_name,
                status,
                created_at: parse_timestamp(&row.created_at),
                last_modified_at: parse_timestamp(&row.last_modified_at),
            });
        }
        Ok(summaries)
    }

    /// Removes a job. Returns false if it was already absent. No side
    /// effects on other jobs.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let affected = job_repo::delete(&self.db, id)?;
        Ok(affected > 0)
    }

    /// Atomic compare-and-set transition.
    ///
    /// Applies only if the row still holds the `(status, revision)` of the
    /// caller's `snapshot`; otherwise fails with `ConcurrentModification`.
    /// Status, artifact and error are written in one statement, so a reader
    /// can never observe a checkpoint status without its artifact.
    pub fn transition_to(
        &self,
        snapshot: &AssessmentJob,
        new_status: JobStatus,
        artifact: Option<Artifact>,
        error: Option<String>,
    ) -> Result<AssessmentJob, StoreError> {
        if !snapshot.status.may_transition_to(new_status) {
            return Err(StoreError::InvalidTransition {
                id: snapshot.id.clone(),
                from: snapshot.status,
                to: new_status,
            });
        }
        self.check_artifact(snapshot, new_status, artifact.as_ref())?;

        let mut update = TransitionUpdate {
            new_status: new_status.as_str().to_string(),
            generation_artifact: None,
            estimation_artifact: None,
            // Re-entering a stage always clears a stale error; failure
            // transitions carry the new one.
            error_message: if new_status.is_in_progress() { None } else { error },
            last_modified_at: format_timestamp(Utc::now()),
        };
        match artifact {
            Some(Artifact::Draft(ref draft)) => {
                update.generation_artifact = Some(serde_json::to_string(draft)?);
            }
            Some(Artifact::Estimates(ref estimates)) => {
                update.estimation_artifact = Some(serde_json::to_string(estimates)?);
            }
            None => {}
        }

        let affected = job_repo::transition(
            &self.db,
            &snapshot.id,
            snapshot.status.as_str(),
            snapshot.revision,
            &update,
        )?;

        if affected == 0 {
            // Lost the race, or the job vanished. Re-fetch to tell apart.
            let current = job_repo::find_by_id(&self.db, &snapshot.id)?
                .ok_or_else(|| StoreError::NotFound(snapshot.id.clone()))?;
            let current = row_to_job(current)?;
            return Err(StoreError::ConcurrentModification {
                id: snapshot.id.clone(),
                expected: snapshot.status,
                actual: current.status,
            });
        }

        log::info!(
            "Job {} transitioned {} -> {}",
            snapshot.id,
            snapshot.status.as_str(),
            new_status.as_str()
        );
        self.get(&snapshot.id)
    }

    /// Checkpoint statuses demand their artifact; everything else must not
    /// carry one. Estimates must cover exactly the checkpointed draft.
    fn check_artifact(
        &self,
        snapshot: &AssessmentJob,
        new_status: JobStatus,
        artifact: Option<&Artifact>,
    ) -> Result<(), StoreError> {
        let mismatch = |reason: String| StoreError::ArtifactMismatch {
            id: snapshot.id.clone(),
            reason,
        };

        match (new_status, artifact) {
            (JobStatus::GenerationComplete, Some(Artifact::Draft(draft))) => {
                if draft.is_empty() {
                    return Err(mismatch("draft has no items".to_string()));
                }
                Ok(())
            }
            (JobStatus::GenerationComplete, _) => {
                Err(mismatch("generation checkpoint requires a draft artifact".to_string()))
            }
            (JobStatus::EstimationComplete, Some(Artifact::Estimates(estimates))) => {
                let draft = snapshot.generation_artifact.as_ref().ok_or_else(|| {
                    mismatch("estimation checkpoint without a generation artifact".to_string())
                })?;
                if !estimates.covers_exactly(draft) {
                    return Err(mismatch(
                        "estimates do not cover exactly the draft's items".to_string(),
                    ));
                }
                Ok(())
            }
            (JobStatus::EstimationComplete, _) => Err(mismatch(
                "estimation checkpoint requires an estimates artifact".to_string(),
            )),
            (_, None) => Ok(()),
            (_, Some(_)) => Err(mismatch(format!(
                "no artifact expected on transition to {}",
                new_status.as_str()
            ))),
        }
    }
}
