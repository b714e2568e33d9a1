//! Reference material resolution — prior assessments and reference-document
//! summaries used as few-shot context for the generation prompt.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A resolved reference: a compact summary of a prior assessment or
/// reference document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSummary {
    pub id: String,
    pub title: String,
    pub summary: String,
}

/// Supplies reference summaries for a set of requested ids.
///
/// Resolution happens once, at job creation; the resolved summaries are
/// captured on the job so a resume never needs the resolver again.
pub trait ReferenceResolver: Send + Sync {
    /// Resolves the requested ids, in request order, up to `max_count`
    /// entries. Unknown ids are skipped silently.
    fn resolve(&self, reference_ids: &[String], max_count: usize) -> Vec<ReferenceSummary>;
}

/// Resolver over a fixed in-memory set of summaries.
#[derive(Debug, Default)]
pub struct InMemoryResolver {
    entries: HashMap<String, ReferenceSummary>,
}

impl InMemoryResolver {
    pub fn new(entries: Vec<ReferenceSummary>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }
}

impl ReferenceResolver for InMemoryResolver {
    fn resolve(&self, reference_ids: &[String], max_count: usize) -> Vec<ReferenceSummary> {
        reference_ids
            .iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .take(max_count)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> InMemoryResolver {
        InMemoryResolver::new(vec![
            ReferenceSummary {
                id: "r1".to_string(),
                title: "Webshop 2024".to_string(),
                summary: "12 sections, 340h total".to_string(),
            },
            ReferenceSummary {
                id: "r2".to_string(),
                title: "CRM migration".to_string(),
                summary: "8 sections, 120h total".to_string(),
            },
        ])
    }

    #[test]
    fn test_resolve_keeps_request_order() {
        let resolved = resolver().resolve(
            &["r2".to_string(), "r1".to_string()],
            10,
        );
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].id, "r2");
        assert_eq!(resolved[1].id, "r1");
    }

    #[test]
    fn test_resolve_skips_unknown_ids() {
        let resolved = resolver().resolve(&["nope".to_string(), "r1".to_string()], 10);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "r1");
    }

    #[test]
    fn test_resolve_caps_at_max_count() {
        let resolved = resolver().resolve(&["r1".to_string(), "r2".to_string()], 1);
        assert_eq!(resolved.len(), 1);
    }
}
