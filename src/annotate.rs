//! In-place frame annotation.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

use crate::detect::BoundingBox;

/// DejaVu Sans, see `assets/fonts/DejaVuSans-LICENSE`.
const DEFAULT_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 22.0;
/// Gap between the label baseline and the top edge of the box.
const LABEL_OFFSET: i64 = 10;
/// Labels never extend further than this, so farther origins draw the same.
const LABEL_REACH: i64 = 1 << 20;

/// Draws detection boxes and labels onto frames.
///
/// Labels use the bundled DejaVu Sans unless another font is supplied.
pub struct Annotator {
    font: Option<FontArc>,
    color: Rgb<u8>,
    thickness: i32,
    scale: PxScale,
}

impl Annotator {
    pub fn new() -> Self {
        let font = match FontArc::try_from_slice(DEFAULT_FONT) {
            Ok(font) => Some(font),
            Err(err) => {
                log::warn!("Annotator: bundled font unusable, labels disabled: {}", err);
                None
            }
        };
        Self {
            font,
            color: BOX_COLOR,
            thickness: BOX_THICKNESS,
            scale: PxScale::from(LABEL_SCALE),
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Replace the bundled font with a TrueType/OpenType file.
    pub fn with_font_file(self, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|_| anyhow!("{} is not a usable font", path.display()))?;
        Ok(self.with_font(font))
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = Rgb(color);
        self
    }

    /// Draw `bbox` and `label` in place. Boxes with no area are skipped.
    pub fn draw(&self, image: &mut RgbImage, bbox: &BoundingBox, label: &str) {
        if bbox.width() <= 0 || bbox.height() <= 0 {
            log::debug!("Annotator: skipping empty box {:?}", bbox);
            return;
        }

        // edges pulled in to just outside the image stay invisible
        let margin = i64::from(self.thickness);
        let clip = |value: i32, limit: u32| i64::from(value).clamp(-margin, i64::from(limit) + margin);
        let x_min = clip(bbox.x_min, image.width());
        let y_min = clip(bbox.y_min, image.height());
        let x_max = clip(bbox.x_max, image.width());
        let y_max = clip(bbox.y_max, image.height());

        // corners are inclusive; stroke grows inward so the outer edge stays on the box
        for inset in 0..i64::from(self.thickness) {
            let width = x_max - x_min + 1 - 2 * inset;
            let height = y_max - y_min + 1 - 2 * inset;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at((x_min + inset) as i32, (y_min + inset) as i32)
                .of_size(width as u32, height as u32);
            draw_hollow_rect_mut(image, rect, self.color);
        }

        if let Some(font) = &self.font {
            // text origin is the top of the ascent; put the baseline above the box
            let ascent = font.as_scaled(self.scale).ascent().round() as i64;
            let top = (i64::from(bbox.y_min) - LABEL_OFFSET - ascent)
                .clamp(-LABEL_REACH, i64::from(image.height()));
            let left = i64::from(bbox.x_min).clamp(-LABEL_REACH, i64::from(image.width()));
            draw_text_mut(
                image,
                self.color,
                left as i32,
                top as i32,
                self.scale,
                font,
                label,
            );
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}
