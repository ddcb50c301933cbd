//! Draws the click marker onto the annotated screenshot: a filled red disc
//! at the resolved coordinate with a concentric ring outline around it.

use base64::Engine as _;

use crate::errors::{PilotError, PilotResult};
use crate::perception::types::Point;

const MARKER_RADIUS: i32 = 10;
const RING_RADIUS: i32 = 30;
const RING_WIDTH: i32 = 2;
const MARKER_COLOUR: [u8; 4] = [255, 0, 0, 255];

/// Decode `image_base64` (PNG/JPEG), draw the marker at `point`, return the
/// result as base64-encoded PNG. Off-image coordinates clip silently.
pub fn draw_click_marker(image_base64: &str, point: Point) -> PilotResult<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image_base64)
        .map_err(|e| PilotError::Annotation(format!("base64 decode: {e}")))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| PilotError::Annotation(format!("marker load: {e}")))?;
    let mut canvas = img.to_rgba8();

    fill_disc(&mut canvas, point, MARKER_RADIUS);
    draw_ring(&mut canvas, point, RING_RADIUS, RING_WIDTH);

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| PilotError::Annotation(format!("PNG encode: {e}")))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(&out))
}

fn fill_disc(canvas: &mut image::RgbaImage, centre: Point, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                set_pixel(canvas, centre.x + dx, centre.y + dy);
            }
        }
    }
}

fn draw_ring(canvas: &mut image::RgbaImage, centre: Point, radius: i32, width: i32) {
    let outer = radius * radius;
    let inner = (radius - width) * (radius - width);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d2 = dx * dx + dy * dy;
            if d2 <= outer && d2 >= inner {
                set_pixel(canvas, centre.x + dx, centre.y + dy);
            }
        }
    }
}

fn set_pixel(canvas: &mut image::RgbaImage, x: i32, y: i32) {
    let (w, h) = canvas.dimensions();
    if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
        canvas.put_pixel(x as u32, y as u32, image::Rgba(MARKER_COLOUR));
    }
}
