//! Result assembly: converts raw model output into typed stage artifacts.
//!
//! Model output is never trusted as pre-validated domain data. Parsing
//! returns a tagged outcome — `Parsed` or `Malformed` — and the orchestrator
//! routes `Malformed` through one bounded repair re-prompt before declaring
//! the stage failed.

use serde::Deserialize;

use crate::job::artifact::{item_key, ColumnEstimates, DraftItem, DraftSection, DraftSections};

/// Outcome of assembling the generation stage's output.
#[derive(Debug)]
pub enum DraftParse {
    Parsed(DraftSections),
    /// Raw text kept for the repair re-prompt.
    Malformed { raw: String },
}

/// Outcome of assembling the estimation stage's output.
#[derive(Debug)]
pub enum EstimateParse {
    Parsed(ColumnEstimates),
    Malformed { raw: String },
}

/// Extracts the first complete JSON value (object or array) from a model
/// response, tolerating prose around it. Uses a stateful scanner that tracks
/// string boundaries and escape sequences.
pub fn extract_json(response: &str) -> Option<String> {
    let start = response.find(['{', '['])?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' | '[' if !in_string => {
                depth += 1;
            }
            '}' | ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(response[start..start + i + c.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

// ─── Generation assembly ────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDraft {
    #[serde(default)]
    sections: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSection {
    title: String,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Assembles `DraftSections` from raw generation output.
///
/// Individual items that fail to deserialize are skipped; a response with no
/// usable section at all is `Malformed` (there is nothing to estimate over).
pub fn assemble_sections(raw: &str) -> DraftParse {
    let malformed = || DraftParse::Malformed {
        raw: raw.to_string(),
    };

    let json = match extract_json(raw) {
        Some(json) => json,
        None => return malformed(),
    };
    let parsed: RawDraft = match serde_json::from_str(&json) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Generation output did not parse as draft JSON: {}", e);
            return malformed();
        }
    };

    let mut sections = Vec::new();
    for value in parsed.sections {
        let section: RawSection = match serde_json::from_value(value) {
            Ok(section) => section,
            Err(e) => {
                log::warn!("Skipping malformed draft section: {}", e);
                continue;
            }
        };
        let items: Vec<DraftItem> = parse_array_lenient(&section.items);
        if items.is_empty() {
            continue;
        }
        sections.push(DraftSection {
            title: section.title,
            items,
        });
    }

    let draft = DraftSections { sections };
    if draft.is_empty() {
        return malformed();
    }
    DraftParse::Parsed(draft)
}

/// Parse an array leniently — skip items that fail to deserialize.
fn parse_array_lenient<T: for<'de> Deserialize<'de>>(items: &[serde_json::Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

// ─── Estimation assembly ────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEstimates {
    #[serde(default)]
    estimates: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEstimateEntry {
    section: String,
    item: String,
    #[serde(default)]
    hours: serde_json::Map<String, serde_json::Value>,
}

/// Assembles `ColumnEstimates` from raw estimation output, always defined
/// over exactly the draft's items:
///
/// - an empty response yields zero-valued estimates for every item;
/// - estimates for items absent from the draft are dropped, not fatal;
/// - missing or non-numeric hour fields default to zero;
/// - columns outside the configured set are ignored.
pub fn assemble_estimates(raw: &str, draft: &DraftSections, columns: &[String]) -> EstimateParse {
    let mut estimates = ColumnEstimates::zero_filled(draft, columns);

    if raw.trim().is_empty() {
        return EstimateParse::Parsed(estimates);
    }

    let malformed = || EstimateParse::Malformed {
        raw: raw.to_string(),
    };

    let json = match extract_json(raw) {
        Some(json) => json,
        None => return malformed(),
    };
    let parsed: RawEstimates = match serde_json::from_str(&json) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Estimation output did not parse as estimate JSON: {}", e);
            return malformed();
        }
    };

    for value in parsed.estimates {
        let entry: RawEstimateEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping malformed estimate entry: {}", e);
                continue;
            }
        };
        let key = item_key(&entry.section, &entry.item);
        let row = match estimates.estimates.get_mut(&key) {
            Some(row) => row,
            None => {
                // A hallucinated or renamed item must not invalidate the
                // rest of the pass.
                log::warn!("Dropping estimate for unknown item '{}'", key);
                continue;
            }
        };
        for (column, hours) in &entry.hours {
            if let Some(slot) = row.get_mut(column) {
                let value = hours.as_f64().unwrap_or(0.0);
                *slot = if value.is_finite() { value } else { 0.0 };
            }
        }
    }

    EstimateParse::Parsed(estimates)
}
