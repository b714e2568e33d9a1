//! Stage artifacts: draft structure, column estimates, and the merged
//! assessment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single work item inside a draft section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    /// Short item name (e.g., "Login form").
    pub item_name: String,
    /// Longer free-text description of the work.
    #[serde(default)]
    pub item_detail: String,
    /// Category label assigned by the model (e.g., "frontend").
    #[serde(default)]
    pub category: String,
}

/// An ordered group of items under one heading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftSection {
    pub title: String,
    pub items: Vec<DraftItem>,
}

/// Output of the generation stage: the full section/item structure.
/// Immutable once checkpointed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftSections {
    pub sections: Vec<DraftSection>,
}

/// Builds the stable identity key for an item. Item names repeat across
/// sections in real scope documents, so the section title qualifies the key.
pub fn item_key(section_title: &str, item_name: &str) -> String {
    format!("{}/{}", section_title.trim(), item_name.trim())
}

impl DraftSections {
    /// All item keys in document order.
    pub fn item_keys(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|s| s.items.iter().map(|i| item_key(&s.title, &i.item_name)))
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }
}

/// Output of the estimation stage: hours per estimation column, keyed by
/// item identity. Always defined over exactly the items of the draft it was
/// produced for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnEstimates {
    /// item key -> column name -> hours
    pub estimates: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ColumnEstimates {
    /// Zero-valued estimates for every item of the draft, over the given
    /// columns. This is both the "empty AI response" result and the base the
    /// assembler fills in.
    pub fn zero_filled(draft: &DraftSections, columns: &[String]) -> Self {
        let zero_row: BTreeMap<String, f64> =
            columns.iter().map(|c| (c.clone(), 0.0)).collect();
        let estimates = draft
            .item_keys()
            .into_iter()
            .map(|key| (key, zero_row.clone()))
            .collect();
        Self { estimates }
    }

    /// True when the estimate keys are exactly the draft's item keys.
    pub fn covers_exactly(&self, draft: &DraftSections) -> bool {
        let mut draft_keys: Vec<String> = draft.item_keys();
        draft_keys.sort();
        let mut own_keys: Vec<&String> = self.estimates.keys().collect();
        own_keys.sort();
        draft_keys.len() == own_keys.len()
            && draft_keys.iter().zip(own_keys).all(|(a, b)| *a == *b)
    }

    pub fn hours_for(&self, key: &str, column: &str) -> f64 {
        self.estimates
            .get(key)
            .and_then(|row| row.get(column))
            .copied()
            .unwrap_or(0.0)
    }
}

/// An item with its merged estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessedItem {
    pub item_name: String,
    pub item_detail: String,
    pub category: String,
    /// column name -> hours
    pub hours: BTreeMap<String, f64>,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessedSection {
    pub title: String,
    pub items: Vec<AssessedItem>,
}

/// The final materialized assessment, merged from `DraftSections` and
/// `ColumnEstimates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAssessment {
    pub template_id: String,
    pub project_name: String,
    pub sections: Vec<AssessedSection>,
    /// column name -> summed hours across all items
    pub column_totals: BTreeMap<String, f64>,
    pub grand_total: f64,
}

impl ProjectAssessment {
    /// Merges a draft with its estimates. Items without an estimate row get
    /// zero hours — the forgiving aggregation rule used everywhere
    /// downstream.
    pub fn merge(
        template_id: &str,
        project_name: &str,
        draft: &DraftSections,
        estimates: &ColumnEstimates,
        columns: &[String],
    ) -> Self {
        let mut column_totals: BTreeMap<String, f64> =
            columns.iter().map(|c| (c.clone(), 0.0)).collect();
        let mut grand_total = 0.0;

        let sections = draft
            .sections
            .iter()
            .map(|section| {
                let items = section
                    .items
                    .iter()
                    .map(|item| {
                        let key = item_key(&section.title, &item.item_name);
                        let mut hours = BTreeMap::new();
                        let mut total = 0.0;
                        for column in columns {
                            let value = estimates.hours_for(&key, column);
                            total += value;
                            if let Some(sum) = column_totals.get_mut(column) {
                                *sum += value;
                            }
                            hours.insert(column.clone(), value);
                        }
                        grand_total += total;
                        AssessedItem {
                            item_name: item.item_name.clone(),
                            item_detail: item.item_detail.clone(),
                            category: item.category.clone(),
                            hours,
                            total_hours: total,
                        }
                    })
                    .collect();
                AssessedSection {
                    title: section.title.clone(),
                    items,
                }
            })
            .collect();

        Self {
            template_id: template_id.to_string(),
            project_name: project_name.to_string(),
            sections,
            column_totals,
            grand_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_draft() -> DraftSections {
        DraftSections {
            sections: vec![DraftSection {
                title: "Authentication".to_string(),
                items: vec![
                    DraftItem {
                        item_name: "Login form".to_string(),
                        item_detail: "Email + password".to_string(),
                        category: "frontend".to_string(),
                    },
                    DraftItem {
                        item_name: "Session handling".to_string(),
                        item_detail: String::new(),
                        category: "backend".to_string(),
                    },
                ],
            }],
        }
    }

    fn columns() -> Vec<String> {
        vec!["development".to_string(), "testing".to_string()]
    }

    #[test]
    fn test_item_keys_are_section_qualified() {
        let draft = sample_draft();
        assert_eq!(
            draft.item_keys(),
            vec![
                "Authentication/Login form".to_string(),
                "Authentication/Session handling".to_string(),
            ]
        );
        assert_eq!(draft.item_count(), 2);
        assert!(!draft.is_empty());
    }

    #[test]
    fn test_zero_filled_covers_draft() {
        let draft = sample_draft();
        let estimates = ColumnEstimates::zero_filled(&draft, &columns());
        assert!(estimates.covers_exactly(&draft));
        assert_eq!(
            estimates.hours_for("Authentication/Login form", "development"),
            0.0
        );
    }

    #[test]
    fn test_covers_exactly_rejects_extra_and_missing() {
        let draft = sample_draft();
        let mut estimates = ColumnEstimates::zero_filled(&draft, &columns());
        estimates
            .estimates
            .insert("Phantom/Item".to_string(), BTreeMap::new());
        assert!(!estimates.covers_exactly(&draft));

        let mut estimates = ColumnEstimates::zero_filled(&draft, &columns());
        estimates.estimates.remove("Authentication/Login form");
        assert!(!estimates.covers_exactly(&draft));
    }

    #[test]
    fn test_merge_totals() {
        let draft = sample_draft();
        let mut estimates = ColumnEstimates::zero_filled(&draft, &columns());
        estimates
            .estimates
            .get_mut("Authentication/Login form")
            .unwrap()
            .insert("development".to_string(), 8.0);
        estimates
            .estimates
            .get_mut("Authentication/Session handling")
            .unwrap()
            .insert("testing".to_string(), 2.5);

        let assessment =
            ProjectAssessment::merge("tpl-1", "Demo", &draft, &estimates, &columns());
        assert_eq!(assessment.grand_total, 10.5);
        assert_eq!(assessment.column_totals["development"], 8.0);
        assert_eq!(assessment.column_totals["testing"], 2.5);
        assert_eq!(assessment.sections[0].items[0].total_hours, 8.0);
    }

    #[test]
    fn test_merge_missing_estimate_row_yields_zero() {
        let draft = sample_draft();
        let estimates = ColumnEstimates::default();
        let assessment =
            ProjectAssessment::merge("tpl-1", "Demo", &draft, &estimates, &columns());
        assert_eq!(assessment.grand_total, 0.0);
        assert_eq!(assessment.sections[0].items.len(), 2);
    }
}
