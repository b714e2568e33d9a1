//! Assessment repository — storage for finalized `ProjectAssessment`
//! payloads, one per job.

use rusqlite::params;

use crate::job::artifact::{ColumnEstimates, DraftSections, ProjectAssessment};

use super::{Database, DatabaseError};

/// Hands a finalized job's artifacts off to assessment storage.
///
/// The pipeline only depends on this trait; tests substitute a failing or
/// recording implementation.
pub trait AssessmentStorage: Send + Sync {
    fn materialize(
        &self,
        job_id: &str,
        template_id: &str,
        project_name: &str,
        draft: &DraftSections,
        estimates: &ColumnEstimates,
        columns: &[String],
    ) -> Result<ProjectAssessment, DatabaseError>;
}

/// Assessment storage backed by the `assessments` table.
pub struct SqliteAssessmentStorage {
    db: Database,
}

impl SqliteAssessmentStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl AssessmentStorage for SqliteAssessmentStorage {
    fn materialize(
        &self,
        job_id: &str,
        template_id: &str,
        project_name: &str,
        draft: &DraftSections,
        estimates: &ColumnEstimates,
        columns: &[String],
    ) -> Result<ProjectAssessment, DatabaseError> {
        let assessment =
            ProjectAssessment::merge(template_id, project_name, draft, estimates, columns);
        let payload = serde_json::to_string(&assessment).map_err(|e| {
            DatabaseError::CorruptRow {
                id: job_id.to_string(),
                column: "payload",
                reason: e.to_string(),
            }
        })?;

        upsert(
            &self.db,
            &AssessmentRow {
                id: uuid::Uuid::new_v4().to_string(),
                job_id: job_id.to_string(),
                template_id: template_id.to_string(),
                project_name: project_name.to_string(),
                payload,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        )?;

        log::info!("Materialized assessment for job {}", job_id);
        Ok(assessment)
    }
}

/// A stored assessment row. The payload is the serialized
/// `ProjectAssessment`.
#[derive(Debug, Clone)]
pub struct AssessmentRow {
    pub id: String,
    pub job_id: String,
    pub template_id: String,
    pub project_name: String,
    pub payload: String,
    pub created_at: String,
}

/// Inserts or replaces the assessment for a job. Finalize may be retried
/// after a reported failure, so the write is idempotent per job.
pub fn upsert(db: &Database, row: &AssessmentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO assessments (id, job_id, template_id, project_name, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(job_id) DO UPDATE SET
                 template_id = excluded.template_id,
                 project_name = excluded.project_name,
                 payload = excluded.payload",
            params![
                row.id,
                row.job_id,
                row.template_id,
                row.project_name,
                row.payload,
                row.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds the assessment materialized for a job, if any.
pub fn find_by_job_id(db: &Database, job_id: &str) -> Result<Option<AssessmentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, job_id, template_id, project_name, payload, created_at
             FROM assessments WHERE job_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![job_id], |row| {
            Ok(AssessmentRow {
                id: row.get(0)?,
                job_id: row.get(1)?,
                template_id: row.get(2)?,
                project_name: row.get(3)?,
                payload: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}
