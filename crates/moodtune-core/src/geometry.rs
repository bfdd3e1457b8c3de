//! 2-D geometry shared by detection results and overlay drawing.

use serde::{Deserialize, Serialize};

/// A point in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Pixel dimensions of a frame or surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Per-axis scale ratios for mapping `from` coordinates into `to` coordinates.
///
/// Returns `None` when either `from` axis is zero; callers leave geometry
/// unchanged in that case.
fn ratios(from: Dimensions, to: Dimensions) -> Option<(f32, f32)> {
    if from.width == 0 || from.height == 0 {
        return None;
    }
    Some((
        to.width as f32 / from.width as f32,
        to.height as f32 / from.height as f32,
    ))
}

/// Linearly rescale a point from one resolution into another.
pub fn scale_point(p: Point, from: Dimensions, to: Dimensions) -> Point {
    match ratios(from, to) {
        Some((sx, sy)) => Point {
            x: p.x * sx,
            y: p.y * sy,
        },
        None => p,
    }
}

/// Linearly rescale a rect from one resolution into another.
pub fn scale_rect(r: Rect, from: Dimensions, to: Dimensions) -> Rect {
    match ratios(from, to) {
        Some((sx, sy)) => Rect {
            x: r.x * sx,
            y: r.y * sy,
            width: r.width * sx,
            height: r.height * sy,
        },
        None => r,
    }
}
