//! Per-frame annotation overlay.
//!
//! An RGBA surface composited over the live video, sized to the frame's
//! natural dimensions. Exclusively owned and redrawn by the detection
//! poller: cleared in full every tick before drawing, cleared once more
//! when the poller halts.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as PixelRect;
use moodtune_core::{Dimensions, FaceDetection, Rect};

use crate::glyphs;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const BOX_COLOR: Rgba<u8> = Rgba([66, 133, 244, 255]);
const LANDMARK_COLOR: Rgba<u8> = Rgba([234, 67, 53, 255]);
const BAR_COLOR: Rgba<u8> = Rgba([52, 168, 83, 255]);
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LANDMARK_RADIUS: i32 = 1;
const BAR_MAX_WIDTH: f32 = 100.0;
const BAR_HEIGHT: u32 = 4;
const LINE_SPACING: i32 = glyphs::GLYPH_HEIGHT as i32 + 2;

pub struct Overlay {
    surface: RgbaImage,
}

impl Overlay {
    /// Create a transparent surface sized to the video frame.
    pub fn new(dims: Dimensions) -> Self {
        Self {
            surface: RgbaImage::new(dims.width, dims.height),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.surface.width(), self.surface.height())
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for px in self.surface.pixels_mut() {
            *px = TRANSPARENT;
        }
    }

    /// Whether the surface is fully transparent.
    #[allow(dead_code)]
    pub fn is_clear(&self) -> bool {
        self.surface.pixels().all(|p| p.0[3] == 0)
    }

    /// Read-only view of the surface for compositing.
    #[allow(dead_code)]
    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Draw one face: bounding box, landmark dots, expression bars and the
    /// age/gender label. Geometry must already be in surface coordinates;
    /// everything is clipped to the surface.
    pub fn draw_face(&mut self, face: &FaceDetection) {
        if let Some(px_rect) = pixel_rect(face.rect) {
            draw_hollow_rect_mut(&mut self.surface, px_rect, BOX_COLOR);
        }

        for point in &face.landmarks {
            draw_filled_circle_mut(
                &mut self.surface,
                (point.x.round() as i32, point.y.round() as i32),
                LANDMARK_RADIUS,
                LANDMARK_COLOR,
            );
        }

        let base_x = face.rect.x.round() as i32;

        // Age/gender label above the box, kept inside the right edge.
        let label = face.age_gender_label();
        let max_x = self.surface.width() as i32 - glyphs::text_width(&label) as i32;
        glyphs::draw_text(
            &mut self.surface,
            base_x.min(max_x).max(0),
            face.rect.y.round() as i32 - LINE_SPACING,
            &label,
            TEXT_COLOR,
        );

        // Expression bars below the box, one line per label, bar length
        // proportional to the score.
        let mut line_y = (face.rect.y + face.rect.height).round() as i32 + 2;
        for (expression, score) in face.expressions.iter() {
            let bar_width = (score.clamp(0.0, 1.0) * BAR_MAX_WIDTH).round() as u32;
            if bar_width > 0 {
                let bar_y = line_y + (glyphs::GLYPH_HEIGHT as i32 - BAR_HEIGHT as i32) / 2;
                draw_filled_rect_mut(
                    &mut self.surface,
                    PixelRect::at(base_x, bar_y).of_size(bar_width, BAR_HEIGHT),
                    BAR_COLOR,
                );
            }
            glyphs::draw_text(
                &mut self.surface,
                base_x + BAR_MAX_WIDTH as i32 + 4,
                line_y,
                expression.as_str(),
                TEXT_COLOR,
            );
            line_y += LINE_SPACING;
        }
    }
}

/// Round an f32 rect to a drawable pixel rect; degenerate boxes are skipped.
fn pixel_rect(rect: Rect) -> Option<PixelRect> {
    let width = rect.width.round() as i64;
    let height = rect.height.round() as i64;
    if width < 1 || height < 1 {
        return None;
    }
    Some(PixelRect::at(rect.x.round() as i32, rect.y.round() as i32).of_size(width as u32, height as u32))
}
