//! Test harness for isolated pipeline execution.
//!
//! Wires a real in-memory database, the real extractor registry, and a
//! scripted gateway into a `JobService`, inside a temp directory for scope
//! documents.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use scopeline::db::assessment_repo::SqliteAssessmentStorage;
use scopeline::db::Database;
use scopeline::extract::ExtractorRegistry;
use scopeline::gateway::GatewayError;
use scopeline::job::AnalysisMode;
use scopeline::pipeline::Orchestrator;
use scopeline::reference::{InMemoryResolver, ReferenceSummary};
use scopeline::store::JobStore;
use scopeline::{JobService, StartJobRequest};

use super::builders::{columns, ScriptedGateway, SharedGateway};

pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub store: JobStore,
    pub gateway: Arc<ScriptedGateway>,
    pub service: JobService,
}

impl TestHarness {
    /// Harness with a scripted gateway and no reference material.
    pub fn new(script: Vec<Result<String, GatewayError>>) -> Self {
        Self::with_references(script, vec![])
    }

    pub fn with_references(
        script: Vec<Result<String, GatewayError>>,
        references: Vec<ReferenceSummary>,
    ) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db = Database::open_in_memory().expect("open in-memory DB");
        let store = JobStore::new(db.clone());
        let gateway = Arc::new(ScriptedGateway::new(script));

        let orchestrator = Orchestrator::new(
            store.clone(),
            Box::new(ExtractorRegistry::new()),
            Box::new(SharedGateway(Arc::clone(&gateway))),
            Box::new(SqliteAssessmentStorage::new(db.clone())),
            columns(),
            12_000,
        );

        let service = JobService::new(
            Arc::new(orchestrator),
            Box::new(InMemoryResolver::new(references)),
            5,
        );

        Self {
            temp_dir,
            db,
            store,
            gateway,
            service,
        }
    }

    /// Writes a scope document into the harness temp dir.
    pub fn write_scope(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content).expect("write scope document");
        path
    }

    /// A plausible plain-text scope document.
    pub fn default_scope(&self) -> PathBuf {
        self.write_scope(
            "scope.txt",
            "The client needs user authentication: a login form, \
             session handling and a password reset flow.",
        )
    }

    pub fn request_for(&self, source: PathBuf) -> StartJobRequest {
        StartJobRequest {
            template_id: "tpl-1".to_string(),
            project_name: "Demo project".to_string(),
            source_document: source,
            analysis_mode: AnalysisMode::Standard,
            reference_ids: vec![],
        }
    }

    /// Raw generation_artifact column for byte-identity assertions.
    pub fn raw_generation_artifact(&self, job_id: &str) -> Option<String> {
        scopeline::db::job_repo::find_by_id(&self.db, job_id)
            .expect("query job row")
            .expect("job row present")
            .generation_artifact
    }
}
