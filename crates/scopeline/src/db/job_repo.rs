//! Job repository — CRUD and compare-and-set transitions for the `jobs`
//! table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub template_id: String,
    pub project_name: String,
    pub analysis_mode: String,
    pub status: String,
    pub source_document_ref: String,
    pub reference_context: Option<String>,
    pub generation_artifact: Option<String>,
    pub estimation_artifact: Option<String>,
    pub error_message: Option<String>,
    pub revision: i64,
    pub created_at: String,
    pub last_modified_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            template_id: row.get("template_id")?,
            project_name: row.get("project_name")?,
            analysis_mode: row.get("analysis_mode")?,
            status: row.get("status")?,
            source_document_ref: row.get("source_document_ref")?,
            reference_context: row.get("reference_context")?,
            generation_artifact: row.get("generation_artifact")?,
            estimation_artifact: row.get("estimation_artifact")?,
            error_message: row.get("error_message")?,
            revision: row.get("revision")?,
            created_at: row.get("created_at")?,
            last_modified_at: row.get("last_modified_at")?,
        })
    }
}

/// Summary projection of a job row (no artifacts, no inputs).
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub id: String,
    pub template_id: String,
    pub project_name: String,
    pub status: String,
    pub created_at: String,
    pub last_modified_at: String,
}

/// The mutable half of a compare-and-set transition. `None` artifact fields
/// preserve whatever the row currently holds — a failure transition must
/// never clobber the last good artifact.
#[derive(Debug, Clone, Default)]
pub struct TransitionUpdate {
    pub new_status: String,
    pub generation_artifact: Option<String>,
    pub estimation_artifact: Option<String>,
    /// Written verbatim; `None` clears the column.
    pub error_message: Option<String>,
    pub last_modified_at: String,
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, template_id, project_name, analysis_mode, status,
             source_document_ref, reference_context, generation_artifact,
             estimation_artifact, error_message, revision, created_at, last_modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                job.id,
                job.template_id,
                job.project_name,
                job.analysis_mode,
                job.status,
                job.source_document_ref,
                job.reference_context,
                job.generation_artifact,
                job.estimation_artifact,
                job.error_message,
                job.revision,
                job.created_at,
                job.last_modified_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all jobs as summaries, newest first.
pub fn list_summaries(db: &Database) -> Result<Vec<SummaryRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, template_id, project_name, status, created_at, last_modified_at
             FROM jobs ORDER BY created_at DESC",
        )?;
        let rows: Vec<SummaryRow> = stmt
            .query_map([], |row| {
                Ok(SummaryRow {
                    id: row.get(0)?,
                    template_id: row.get(1)?,
                    project_name: row.get(2)?,
                    status: row.get(3)?,
                    created_at: row.get(4)?,
                    last_modified_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a job row. Returns the number of rows removed (0 or 1).
pub fn delete(db: &Database, id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        Ok(affected)
    })
}

/// Compare-and-set transition: applies `update` only if the row still holds
/// `(expected_status, expected_revision)`, bumping the revision in the same
/// statement. Returns the number of rows affected (0 = lost the race or
/// no such job; the caller disambiguates by re-fetching).
pub fn transition(
    db: &Database,
    id: &str,
    expected_status: &str,
    expected_revision: i64,
    update: &TransitionUpdate,
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let mut sets = vec![
            "status = ?1".to_string(),
            "error_message = ?2".to_string(),
            "last_modified_at = ?3".to_string(),
            "revision = revision + 1".to_string(),
        ];
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
            Box::new(update.new_status.clone()),
            Box::new(update.error_message.clone()),
            Box::new(update.last_modified_at.clone()),
        ];

        if let Some(ref artifact) = update.generation_artifact {
            sets.push(format!("generation_artifact = ?{}", values.len() + 1));
            values.push(Box::new(artifact.clone()));
        }
        if let Some(ref artifact) = update.estimation_artifact {
            sets.push(format!("estimation_artifact = ?{}", values.len() + 1));
            values.push(Box::new(artifact.clone()));
        }

        let sql = format!(
            "UPDATE jobs SET {} WHERE id = ?{} AND status = ?{} AND revision = ?{}",
            sets.join(", "),
            values.len() + 1,
            values.len() + 2,
            values.len() + 3,
        );
        values.push(Box::new(id.to_string()));
        values.push(Box::new(expected_status.to_string()));
        values.push(Box::new(expected_revision));

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|p| p.as_ref()).collect();
        let affected = conn.execute(&sql, params_ref.as_slice())?;
        Ok(affected)
    })
}
