use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use factmail_core::{Fact, FactCategory, FACTS_PER_DIGEST};

use crate::error::GenerationError;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n").expect("valid regex"));
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n?```\s*$").expect("valid regex"));

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBatch {
    facts: Vec<RawFact>,
}

#[derive(Deserialize)]
struct RawFact {
    category: String,
    fact: String,
    #[serde(default)]
    source: Option<String>,
}

/// Trim and drop a surrounding markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let body = match OPENING_FENCE.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        // Opening fence with no line break after it.
        None => trimmed.trim_start_matches('`'),
    };
    let body = match CLOSING_FENCE.find(body) {
        Some(m) => &body[..m.start()],
        None => body,
    };
    body.trim()
}

/// Parse the model's text into facts. Strict about shape, lenient about
/// category labels.
pub fn parse_facts(text: &str) -> Result<Vec<Fact>, GenerationError> {
    let json = strip_code_fence(text);
    let batch: RawBatch = serde_json::from_str(json)
        .map_err(|e| GenerationError::MalformedResponse(format!("invalid JSON: {e}")))?;

    if batch.facts.is_empty() {
        return Err(GenerationError::MalformedResponse("no facts in response".into()));
    }

    batch
        .facts
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let text = raw.fact.trim();
            if text.is_empty() {
                return Err(GenerationError::MalformedResponse(format!(
                    "fact {} has empty text",
                    i + 1
                )));
            }
            Ok(Fact::new(
                FactCategory::from(raw.category),
                text,
                raw.source.map(|s| s.trim().to_string()),
            ))
        })
        .collect()
}

/// Soft checks on a parsed batch: total count, unknown labels, and missing
/// recognised categories. Each problem becomes one human-readable warning.
pub fn coverage_warnings(facts: &[Fact]) -> Vec<String> {
    let mut warnings = Vec::new();

    if facts.len() != FACTS_PER_DIGEST {
        warnings.push(format!(
            "expected {FACTS_PER_DIGEST} facts, model returned {}",
            facts.len()
        ));
    }

    let mut counts: HashMap<&FactCategory, usize> = HashMap::new();
    for fact in facts {
        *counts.entry(&fact.category).or_default() += 1;
    }

    let mut unknown: Vec<&str> = counts
        .keys()
        .filter(|c| !c.is_recognised())
        .map(|c| c.label())
        .collect();
    unknown.sort_unstable();
    for label in unknown {
        warnings.push(format!("unknown category \"{label}\""));
    }

    for category in FactCategory::ALL.iter() {
        if !counts.contains_key(category) {
            warnings.push(format!("no facts for category \"{category}\""));
        }
    }

    warnings
}
