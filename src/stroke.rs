use macroquad::{
    color::{Color, BLACK},
    math::{vec2, Vec2},
};

use crate::surface::DrawingSurface;
use crate::utility::{color_u8, point_segment_distance, segment_bounds};

/// Surface-local pixel coordinates, origin top-left, y down.
pub type Point = Vec2;

/// Radius of the reinforcement dot painted at the start of every segment.
pub const DOT_RADIUS: f32 = 2.0;

pub const DEFAULT_STROKE_WIDTH: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: BLACK,
            width: DEFAULT_STROKE_WIDTH,
        }
    }
}

/// Paints one segment of a stroke.
///
/// With no `from` this is the start of a stroke and a single dot is painted
/// at `to`, so a tap still leaves a mark. Otherwise a round-capped line is
/// painted from `from` to `to`, followed by a small filled dot at `from`
/// which covers the gaps slow pointer movement leaves between segments.
pub fn paint_segment(
    surface: &mut DrawingSurface,
    from: Option<Point>,
    to: Point,
    style: &StrokeStyle,
) {
    let rgba = color_u8(style.color);
    let radius = style.width / 2.0;

    match from {
        None => {
            tracing::trace!(x = to.x, y = to.y, "stroke start dot");
            fill_capsule(surface, to, to, radius.max(DOT_RADIUS), rgba);
        }
        Some(from) => {
            tracing::trace!(
                from_x = from.x,
                from_y = from.y,
                to_x = to.x,
                to_y = to.y,
                "stroke segment"
            );
            fill_capsule(surface, from, to, radius, rgba);
            fill_capsule(surface, from, from, DOT_RADIUS, rgba);
        }
    }
}

// Every pixel whose center lies within `radius` of the segment. A zero-length
// segment gives a disc; otherwise the ends come out round.
fn fill_capsule(surface: &mut DrawingSurface, a: Vec2, b: Vec2, radius: f32, rgba: [u8; 4]) {
    let (min_x, max_x, min_y, max_y) = segment_bounds(a, b, radius + 1.0);

    let x0 = min_x.floor().max(0.0) as i32;
    let y0 = min_y.floor().max(0.0) as i32;
    let x1 = max_x.ceil().min(surface.width() as f32 - 1.0) as i32;
    let y1 = max_y.ceil().min(surface.height() as f32 - 1.0) as i32;
    if x1 < x0 || y1 < y0 {
        return;
    }

    for y in y0..=y1 {
        for x in x0..=x1 {
            let center = vec2(x as f32 + 0.5, y as f32 + 0.5);
            if point_segment_distance(center, a, b) <= radius {
                surface.blend_pixel(x, y, rgba);
            }
        }
    }
}
