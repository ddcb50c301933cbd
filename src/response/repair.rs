//! Best-effort JSON repair for extracted VLM response candidates.
//!
//! Two passes: strip fences and trailing commas, then parse; on failure drop
//! surrounding prose with a first-to-last-brace span and parse once more.
//! A candidate that survives neither pass becomes the safe fallback
//! directive, so a malformed response never halts the agent loop.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::response::directive::ActionDirective;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    /// Parsed after the first cleanup pass.
    Parsed,
    /// Parsed only after the second, more aggressive pass.
    Repaired,
    /// Both passes failed; the directive is the synthetic safe default.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub directive: ActionDirective,
    pub status: RepairStatus,
    pub diagnostics: Vec<String>,
}

// Applied once, not to a fixpoint: nested trailing commas at several depths
// can survive a single pass and fall through to the fallback.
static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma regex"));

static TRAILING_COMMA_BRACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*)\}").expect("trailing comma brace regex"));

// Greedy first-to-last-brace span. Misfires on responses holding several
// brace-delimited objects in prose; known limitation.
static BRACE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^[^{]*(\{.*\})[^}]*$").expect("brace span regex"));

/// Repair `candidate` and parse it into an [`ActionDirective`]. Never fails:
/// unrecoverable input yields the fallback directive plus diagnostics.
pub fn repair_and_parse(candidate: &str) -> RepairOutcome {
    let mut cleaned = candidate.trim();

    // Residual fence markers the extractor may have left behind.
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    let cleaned = TRAILING_COMMA_RE.replace_all(cleaned.trim(), "$1").into_owned();

    if cleaned.trim().is_empty() {
        // A guaranteed parse error carries no information; short-circuit.
        return RepairOutcome {
            directive: ActionDirective::fallback("Empty response received"),
            status: RepairStatus::Fallback,
            diagnostics: vec!["empty candidate after cleanup".to_string()],
        };
    }

    let first_err = match serde_json::from_str::<ActionDirective>(&cleaned) {
        Ok(directive) => {
            return RepairOutcome {
                directive,
                status: RepairStatus::Parsed,
                diagnostics: Vec::new(),
            }
        }
        Err(e) => e,
    };
    tracing::debug!(error = %first_err, "first parse pass failed, repairing");

    let repaired = TRAILING_COMMA_BRACE_RE.replace_all(&cleaned, "${1}}").into_owned();
    let repaired = BRACE_SPAN_RE.replace(&repaired, "$1").into_owned();

    let second_err = match serde_json::from_str::<ActionDirective>(&repaired) {
        Ok(directive) => {
            return RepairOutcome {
                directive,
                status: RepairStatus::Repaired,
                diagnostics: vec![format!("first pass: {first_err}")],
            }
        }
        Err(e) => e,
    };

    let reason = classify_failure(&cleaned);
    tracing::warn!(reason, error = %second_err, "JSON repair exhausted, using fallback directive");

    RepairOutcome {
        directive: ActionDirective::fallback(&format!("JSON parsing failed ({reason})")),
        status: RepairStatus::Fallback,
        diagnostics: vec![
            format!("first pass: {first_err}"),
            format!("second pass: {second_err}"),
        ],
    }
}

fn classify_failure(content: &str) -> &'static str {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        "Empty response"
    } else if !trimmed.starts_with('{') {
        "Response doesn't start with '{'"
    } else if !trimmed.ends_with('}') {
        "Response doesn't end with '}'"
    } else {
        "Invalid JSON syntax"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_json_parses_directly() {
        let outcome = repair_and_parse(r#"{"Reasoning": "x", "Next Action": "left_click", "Box ID": 5}"#);
        assert_eq!(outcome.status, RepairStatus::Parsed);
        assert_eq!(outcome.directive.next_action, "left_click");
        assert_eq!(outcome.directive.box_id, Some(5));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn single_trailing_comma_matches_comma_free_parse() {
        let with_comma = repair_and_parse("{\"Next Action\": \"wait\",\n}");
        let without = repair_and_parse("{\"Next Action\": \"wait\"\n}");
        assert_eq!(with_comma.status, RepairStatus::Parsed);
        assert_eq!(with_comma.directive, without.directive);
    }

    #[test]
    fn trailing_comma_in_nested_array() {
        let outcome =
            repair_and_parse(r#"{"Next Action": "wait", "steps": ["a", "b",]}"#);
        assert_eq!(outcome.status, RepairStatus::Parsed);
        assert_eq!(outcome.directive.next_action, "wait");
    }

    #[test]
    fn fence_markers_are_stripped() {
        let outcome = repair_and_parse("```json\n{\"Next Action\": \"scroll_down\"}\n```");
        assert_eq!(outcome.status, RepairStatus::Parsed);
        assert_eq!(outcome.directive.next_action, "scroll_down");
    }

    #[test]
    fn surrounding_prose_is_repaired_on_second_pass() {
        let outcome =
            repair_and_parse("Sure! {\"Next Action\": \"left_click\", \"Box ID\": 2} Let me know.");
        assert_eq!(outcome.status, RepairStatus::Repaired);
        assert_eq!(outcome.directive.box_id, Some(2));
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn empty_and_whitespace_short_circuit_to_fallback() {
        for input in ["", "   ", "```json\n```"] {
            let outcome = repair_and_parse(input);
            assert_eq!(outcome.status, RepairStatus::Fallback);
            assert_eq!(outcome.directive.next_action, "screenshot");
            assert_eq!(
                outcome.directive.reasoning,
                "Empty response received, taking screenshot to assess current state"
            );
        }
    }

    #[test]
    fn prose_without_json_becomes_fallback() {
        let outcome = repair_and_parse("I clicked the button");
        assert_eq!(outcome.status, RepairStatus::Fallback);
        assert_eq!(outcome.directive.next_action, "screenshot");
        assert!(outcome
            .directive
            .reasoning
            .contains("JSON parsing failed (Response doesn't start with '{')"));
        assert_eq!(outcome.diagnostics.len(), 2);
    }

    #[test]
    fn missing_comma_between_fields_is_unrecoverable() {
        let outcome = repair_and_parse(
            "{\n\"Reasoning\": \"t\"\n\"Next Action\": \"left_click\"\n}",
        );
        assert_eq!(outcome.status, RepairStatus::Fallback);
        assert!(outcome
            .directive
            .reasoning
            .contains("Invalid JSON syntax"));
    }

    #[test]
    fn missing_next_action_key_falls_back() {
        // Valid JSON, but the contract's one required key is absent.
        let outcome = repair_and_parse(r#"{"Reasoning": "thinking"}"#);
        assert_eq!(outcome.status, RepairStatus::Fallback);
        assert_eq!(outcome.directive.next_action, "screenshot");
    }
}
