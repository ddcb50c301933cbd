//! Materializes a parsed directive into one executable UI action.
//!
//! Element lookup failures are recoverable (the action simply carries no
//! coordinate); an action name outside the known set, or a `type` without
//! its text, signals a prompt/model contract violation and is the only kind
//! of error that escapes a step.

use serde::{Deserialize, Serialize};

use crate::errors::{PilotError, PilotResult};
use crate::perception::types::{Point, ScreenElement};
use crate::response::directive::ActionDirective;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UiAction {
    LeftClick { coordinate: Option<Point> },
    RightClick { coordinate: Option<Point> },
    DoubleClick { coordinate: Option<Point> },
    Hover { coordinate: Option<Point> },
    ScrollUp,
    ScrollDown,
    Wait,
    Type { text: String },
    /// Observe-only action; also the safe default after a parse failure.
    Screenshot,
    /// Terminal: the model answered "None", the task loop should end.
    Stop,
}

impl UiAction {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UiAction::Stop)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAction {
    pub action: UiAction,
    pub coordinate: Option<Point>,
}

/// Resolve the directive's Box ID to a scaled centroid. Any miss — no box
/// id, a negative index, out of range — yields `None` and the step proceeds
/// without a coordinate.
pub fn resolve_centroid(
    directive: &ActionDirective,
    elements: &[ScreenElement],
    screen_width: u32,
    screen_height: u32,
) -> Option<Point> {
    let id = directive.box_id?;
    let idx = usize::try_from(id).ok();
    match idx.and_then(|i| elements.get(i)) {
        Some(elem) => Some(elem.centroid(screen_width, screen_height)),
        None => {
            tracing::debug!(box_id = id, elements = elements.len(), "Box ID out of range");
            None
        }
    }
}

/// Dispatch on the directive's "Next Action" string.
pub fn decode_action(
    directive: &ActionDirective,
    coordinate: Option<Point>,
) -> PilotResult<UiAction> {
    let name = directive.next_action.trim();
    // "None" always stops, whatever else the directive carries.
    if name == "None" {
        return Ok(UiAction::Stop);
    }
    match name {
        "type" => match &directive.value {
            Some(text) => Ok(UiAction::Type { text: text.clone() }),
            None => Err(PilotError::MissingActionValue("type".into())),
        },
        "left_click" => Ok(UiAction::LeftClick { coordinate }),
        "right_click" => Ok(UiAction::RightClick { coordinate }),
        "double_click" => Ok(UiAction::DoubleClick { coordinate }),
        "hover" => Ok(UiAction::Hover { coordinate }),
        "scroll_up" => Ok(UiAction::ScrollUp),
        "scroll_down" => Ok(UiAction::ScrollDown),
        "wait" => Ok(UiAction::Wait),
        "screenshot" => Ok(UiAction::Screenshot),
        other => Err(PilotError::UnrecognizedAction(other.into())),
    }
}

/// Full decode: centroid resolution plus action dispatch.
pub fn decode(
    directive: &ActionDirective,
    elements: &[ScreenElement],
    screen_width: u32,
    screen_height: u32,
) -> PilotResult<DecodedAction> {
    let coordinate = resolve_centroid(directive, elements, screen_width, screen_height);
    let action = decode_action(directive, coordinate)?;
    Ok(DecodedAction { action, coordinate })
}
