//! Assessment job entity and projections.

pub mod artifact;
pub mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reference::ReferenceSummary;

pub use artifact::{
    item_key, AssessedItem, AssessedSection, ColumnEstimates, DraftItem, DraftSection,
    DraftSections, ProjectAssessment,
};
pub use status::JobStatus;

/// Granularity of the generation stage, captured at job creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// One item per distinct deliverable.
    Standard,
    /// Break deliverables down into implementation-level items.
    Detailed,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Standard => "standard",
            AnalysisMode::Detailed => "detailed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(AnalysisMode::Standard),
            "detailed" => Some(AnalysisMode::Detailed),
            _ => None,
        }
    }
}

/// Immutable inputs for creating a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub template_id: String,
    pub project_name: String,
    pub analysis_mode: AnalysisMode,
    /// Path of the uploaded scope document, captured so resume never needs
    /// a re-upload.
    pub source_document_ref: String,
    /// Reference material resolved at creation time, captured so resume
    /// never re-resolves.
    pub reference_context: Vec<ReferenceSummary>,
}

/// The central entity: one assessment job and its stage artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentJob {
    pub id: String,
    pub template_id: String,
    pub project_name: String,
    pub analysis_mode: AnalysisMode,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub source_document_ref: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_context: Vec<ReferenceSummary>,
    /// Present once status has reached `GenerationComplete`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_artifact: Option<DraftSections>,
    /// Present once status has reached `EstimationComplete`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimation_artifact: Option<ColumnEstimates>,
    /// Set only in failure states; cleared when a resume re-enters the
    /// failed stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Bumped on every transition; the compare-and-set token alongside
    /// `status`.
    pub revision: i64,
}

impl AssessmentJob {
    /// Lightweight projection for listing UIs.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            template_id: self.template_id.clone(),
            project_name: self.project_name.clone(),
            status: self.status,
            created_at: self.created_at,
            last_modified_at: self.last_modified_at,
        }
    }
}

/// Projection of a job without artifacts or inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub template_id: String,
    pub project_name: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}
