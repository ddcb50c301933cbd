//! The parsed action directive the VLM is asked to produce.
//!
//! Field names mirror the JSON contract in the system prompt ("Reasoning",
//! "Next Action", "Box ID", "value"). Anything else the model emits lands in
//! `extra` and survives into the plan text.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionDirective {
    #[serde(rename = "Reasoning", default)]
    pub reasoning: String,

    /// One of the fixed action names, or the literal "None" to stop.
    /// A directive without this key is a parse failure, not a default.
    #[serde(rename = "Next Action")]
    pub next_action: String,

    /// Index into the current screen's detected-element list. Models emit
    /// this as an integer, an integral float, or a quoted number; any other
    /// shape coerces to `None` so element lookup is simply skipped.
    #[serde(
        rename = "Box ID",
        default,
        deserialize_with = "lenient_box_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub box_id: Option<i64>,

    /// Text payload, required iff `next_action == "type"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ActionDirective {
    /// The safe default substituted whenever parsing cannot recover: observe
    /// the screen instead of acting on garbage.
    pub fn fallback(reason: &str) -> Self {
        Self {
            reasoning: format!("{reason}, taking screenshot to assess current state"),
            next_action: "screenshot".to_string(),
            box_id: None,
            value: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Human-readable plan rendered into the assistant turn: reasoning first,
    /// then the remaining fields as `key: value` lines.
    pub fn plan_text(&self, coordinate: Option<(i32, i32)>) -> String {
        let mut plan = self.reasoning.clone();
        plan.push_str(&format!("\nNext Action: {}", self.next_action));
        if let Some(id) = self.box_id {
            plan.push_str(&format!("\nBox ID: {id}"));
        }
        if let Some(value) = &self.value {
            plan.push_str(&format!("\nvalue: {value}"));
        }
        if let Some((x, y)) = coordinate {
            plan.push_str(&format!("\nbox_centroid_coordinate: [{x}, {y}]"));
        }
        for (key, val) in &self.extra {
            plan.push_str(&format!("\n{key}: {val}"));
        }
        plan
    }
}

fn lenient_box_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(coerce_box_id))
}

fn coerce_box_id(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                // Integral floats like 5.0 slip through some models.
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            }
        }
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
