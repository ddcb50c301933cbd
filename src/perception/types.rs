use serde::{Deserialize, Serialize};

/// A detected interactive region on screen. The element's position in
/// `ParsedScreen::parsed_content_list` is the Box ID the model refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenElement {
    /// Normalized bounding box [xmin, ymin, xmax, ymax] in range 0.0–1.0.
    pub bbox: [f32; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ScreenElement {
    /// Centre of the bounding box scaled to pixel coordinates.
    pub fn centroid(&self, screen_width: u32, screen_height: u32) -> Point {
        let x = ((self.bbox[0] + self.bbox[2]) / 2.0 * screen_width as f32).round() as i32;
        let y = ((self.bbox[1] + self.bbox[3]) / 2.0 * screen_height as f32).round() as i32;
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Record produced by the screen-analysis collaborator for one capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedScreen {
    pub original_screenshot_base64: String,
    /// Annotated (set-of-marks) variant, display only.
    pub som_image_base64: String,
    /// Human-readable element listing fed into the system prompt.
    pub screen_info: String,
    pub screenshot_uuid: String,
    pub width: u32,
    pub height: u32,
    pub parsed_content_list: Vec<ScreenElement>,
    /// Seconds the screen parser spent on this capture.
    pub latency: f64,
}
