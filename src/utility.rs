use macroquad::{color::Color, math::Vec2};

/// Color picker swatches, in display order.
pub const PALETTE: [&str; 12] = [
    "#000000", "#808080", "#964B00", "#FF0000", "#FF7F00", "#FFFF00", "#00FF00", "#00FFFF",
    "#0000FF", "#FF00FF", "#8B00FF", "#FFFFFF",
];

/// Distance from `p` to the closed segment `a..b`.
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ap = p - a;
    let ab = b - a;
    let ab_length_sq = ab.length_squared();
    if ab_length_sq <= f32::EPSILON {
        return ap.length();
    }
    let t = (ap.dot(ab) / ab_length_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

/// Padded bounding box of a segment as (min_x, max_x, min_y, max_y).
pub fn segment_bounds(a: Vec2, b: Vec2, pad: f32) -> (f32, f32, f32, f32) {
    (
        a.x.min(b.x) - pad,
        a.x.max(b.x) + pad,
        a.y.min(b.y) - pad,
        a.y.max(b.y) + pad,
    )
}

pub fn color_u8(color: Color) -> [u8; 4] {
    [
        channel_u8(color.r),
        channel_u8(color.g),
        channel_u8(color.b),
        channel_u8(color.a),
    ]
}

fn channel_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Parse "#RGB", "#RRGGBB" or "#RRGGBBAA" (the '#' is optional).
pub fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return None,
    };

    let byte = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    let r = byte(0)?;
    let g = byte(2)?;
    let b = byte(4)?;
    let a = if expanded.len() == 8 { byte(6)? } else { 255 };

    Some(Color::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        a as f32 / 255.0,
    ))
}
