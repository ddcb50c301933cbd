//! Locates the most likely JSON payload inside a free-text VLM response.
//!
//! Models wrap their action directive in markdown fences, prose, or nothing
//! at all; the strategies below are tried in fixed priority order and the
//! first match wins. The function always produces a candidate string — when
//! no structured region exists the trimmed input is returned verbatim so the
//! repair stage can classify it.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    FencedBlock,
    UnlabeledFence,
    FenceNoClose,
    BraceScan,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    /// Strategy labels in trial order, the successful one last.
    pub attempted: Vec<&'static str>,
}

static UNLABELED_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```\s*(\{.*?\})\s*```").expect("unlabeled fence regex")
});

// Tolerates one level of nested braces, same as the bare-object pattern the
// diagnostic tooling settled on.
static BARE_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("bare object regex")
});

/// Extract the best candidate for a `data_type` payload (normally "json").
pub fn extract(input: &str, data_type: &str) -> ExtractionResult {
    let mut attempted = Vec::new();
    let label = regex::escape(data_type);

    attempted.push("labeled_fence");
    let labeled = Regex::new(&format!(r"(?si)```{label}\s*(.*?)\s*```"))
        .expect("labeled fence regex");
    if let Some(caps) = labeled.captures(input) {
        return done(&caps[1], ExtractionMethod::FencedBlock, attempted);
    }

    attempted.push("unlabeled_fence");
    if let Some(caps) = UNLABELED_FENCE_RE.captures(input) {
        return done(&caps[1], ExtractionMethod::UnlabeledFence, attempted);
    }

    // Streamed or truncated output: opening marker, no closing fence.
    attempted.push("fence_no_close");
    let open_only = Regex::new(&format!(r"(?si)```{label}\s*(.*?)$"))
        .expect("open fence regex");
    if let Some(caps) = open_only.captures(input) {
        return done(&caps[1], ExtractionMethod::FenceNoClose, attempted);
    }

    attempted.push("bare_object");
    if let Some(m) = BARE_OBJECT_RE.find(input) {
        return done(m.as_str(), ExtractionMethod::BraceScan, attempted);
    }

    // Deeper nesting than the regex tolerates: balance braces by hand from
    // the first `{`.
    attempted.push("brace_scan");
    if let Some(span) = brace_depth_scan(input) {
        return done(span, ExtractionMethod::BraceScan, attempted);
    }

    attempted.push("verbatim");
    done(input, ExtractionMethod::Fallback, attempted)
}

fn done(text: &str, method: ExtractionMethod, attempted: Vec<&'static str>) -> ExtractionResult {
    ExtractionResult {
        text: text.trim().to_string(),
        method,
        attempted,
    }
}

/// Find the span from the first `{` to its matching `}` by depth counting.
/// Returns `None` when there is no `{` or the braces never balance.
fn brace_depth_scan(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let mut depth = 0usize;
    for (i, ch) in input[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_fence_wins() {
        let input = "Here is my analysis:\n```json\n{\"Next Action\": \"wait\"}\n```\nHope this helps!";
        let result = extract(input, "json");
        assert_eq!(result.method, ExtractionMethod::FencedBlock);
        assert_eq!(result.text, "{\"Next Action\": \"wait\"}");
        assert_eq!(result.attempted, vec!["labeled_fence"]);
    }

    #[test]
    fn labeled_fence_is_case_insensitive() {
        let input = "```JSON\n{\"Next Action\": \"wait\"}\n```";
        let result = extract(input, "json");
        assert_eq!(result.method, ExtractionMethod::FencedBlock);
        assert_eq!(result.text, "{\"Next Action\": \"wait\"}");
    }

    #[test]
    fn unlabeled_fence_with_object_body() {
        let input = "```\n{\"Next Action\": \"scroll_down\"}\n```";
        let result = extract(input, "json");
        assert_eq!(result.method, ExtractionMethod::UnlabeledFence);
        assert_eq!(result.text, "{\"Next Action\": \"scroll_down\"}");
    }

    #[test]
    fn open_fence_without_close_captures_to_end() {
        let input = "```json\n{\"Reasoning\": \"truncated";
        let result = extract(input, "json");
        assert_eq!(result.method, ExtractionMethod::FenceNoClose);
        assert_eq!(result.text, "{\"Reasoning\": \"truncated");
    }

    #[test]
    fn bare_object_in_prose() {
        let input = "The plan: {\"Next Action\": \"wait\", \"meta\": {\"n\": 1}} done.";
        let result = extract(input, "json");
        assert_eq!(result.method, ExtractionMethod::BraceScan);
        assert_eq!(
            result.text,
            "{\"Next Action\": \"wait\", \"meta\": {\"n\": 1}}"
        );
    }

    #[test]
    fn deep_nesting_matches_innermost_balanced_span() {
        // Two nesting levels defeat the one-level pattern, which then settles
        // on the innermost balanced pair. Known limitation, kept as-is.
        let input = "x {\"a\": {\"b\": {\"c\": 1}}} y";
        let result = extract(input, "json");
        assert_eq!(result.method, ExtractionMethod::BraceScan);
        assert_eq!(result.text, "{\"b\": {\"c\": 1}}");
    }

    #[test]
    fn depth_scan_balances_arbitrary_nesting() {
        let input = "x {\"a\": {\"b\": {\"c\": 1}}} y";
        assert_eq!(
            brace_depth_scan(input),
            Some("{\"a\": {\"b\": {\"c\": 1}}}")
        );
        assert_eq!(brace_depth_scan("no braces"), None);
        assert_eq!(brace_depth_scan("open { only"), None);
    }

    #[test]
    fn no_braces_returns_trimmed_input_verbatim() {
        let result = extract("  I clicked the button  ", "json");
        assert_eq!(result.method, ExtractionMethod::Fallback);
        assert_eq!(result.text, "I clicked the button");
        assert_eq!(*result.attempted.last().unwrap(), "verbatim");
    }

    #[test]
    fn unbalanced_braces_fall_back_verbatim() {
        let result = extract("oops {\"a\": 1", "json");
        // Bare-object regex needs a closing brace and the depth scan never
        // balances, so the raw input survives.
        assert_eq!(result.method, ExtractionMethod::Fallback);
        assert_eq!(result.text, "oops {\"a\": 1");
    }

    #[test]
    fn empty_input_is_fallback() {
        let result = extract("", "json");
        assert_eq!(result.method, ExtractionMethod::Fallback);
        assert_eq!(result.text, "");
    }
}
