//! Text measurement and drawing.
//!
//! The builtin face is a 5x7 bitmap (classic LCD font, ASCII 32..=126)
//! drawn at an integer scale. Characters outside that range draw as `?`.
//! A TrueType face can replace it through [`Font::from_file`].

use std::path::Path;

use image::{Rgba, RgbaImage};
use rusttype::{Scale, point};

use synthdoc_core::BBox;

use crate::errors::GenerationError;

/// Colour of every rendered field value.
pub const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

const GLYPH_COLUMNS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_COLUMNS + 1;
const FIRST_GLYPH: u8 = b' ';
const FALLBACK_GLYPH: u8 = b'?';

/// Column-major glyph bitmaps, bit 0 is the top row.
#[rustfmt::skip]
const GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], [0x00, 0x00, 0x5F, 0x00, 0x00], [0x00, 0x07, 0x00, 0x07, 0x00],
    [0x14, 0x7F, 0x14, 0x7F, 0x14], [0x24, 0x2A, 0x7F, 0x2A, 0x12], [0x23, 0x13, 0x08, 0x64, 0x62],
    [0x36, 0x49, 0x55, 0x22, 0x50], [0x00, 0x05, 0x03, 0x00, 0x00], [0x00, 0x1C, 0x22, 0x41, 0x00],
    [0x00, 0x41, 0x22, 0x1C, 0x00], [0x08, 0x2A, 0x1C, 0x2A, 0x08], [0x08, 0x08, 0x3E, 0x08, 0x08],
    [0x00, 0x50, 0x30, 0x00, 0x00], [0x08, 0x08, 0x08, 0x08, 0x08], [0x00, 0x60, 0x60, 0x00, 0x00],
    [0x20, 0x10, 0x08, 0x04, 0x02], [0x3E, 0x51, 0x49, 0x45, 0x3E], [0x00, 0x42, 0x7F, 0x40, 0x00],
    [0x42, 0x61, 0x51, 0x49, 0x46], [0x21, 0x41, 0x45, 0x4B, 0x31], [0x18, 0x14, 0x12, 0x7F, 0x10],
    [0x27, 0x45, 0x45, 0x45, 0x39], [0x3C, 0x4A, 0x49, 0x49, 0x30], [0x01, 0x71, 0x09, 0x05, 0x03],
    [0x36, 0x49, 0x49, 0x49, 0x36], [0x06, 0x49, 0x49, 0x29, 0x1E], [0x00, 0x36, 0x36, 0x00, 0x00],
    [0x00, 0x56, 0x36, 0x00, 0x00], [0x08, 0x14, 0x22, 0x41, 0x00], [0x14, 0x14, 0x14, 0x14, 0x14],
    [0x00, 0x41, 0x22, 0x14, 0x08], [0x02, 0x01, 0x51, 0x09, 0x06], [0x32, 0x49, 0x79, 0x41, 0x3E],
    [0x7E, 0x11, 0x11, 0x11, 0x7E], [0x7F, 0x49, 0x49, 0x49, 0x36], [0x3E, 0x41, 0x41, 0x41, 0x22],
    [0x7F, 0x41, 0x41, 0x22, 0x1C], [0x7F, 0x49, 0x49, 0x49, 0x41], [0x7F, 0x09, 0x09, 0x01, 0x01],
    [0x3E, 0x41, 0x41, 0x51, 0x32], [0x7F, 0x08, 0x08, 0x08, 0x7F], [0x00, 0x41, 0x7F, 0x41, 0x00],
    [0x20, 0x40, 0x41, 0x3F, 0x01], [0x7F, 0x08, 0x14, 0x22, 0x41], [0x7F, 0x40, 0x40, 0x40, 0x40],
    [0x7F, 0x02, 0x04, 0x02, 0x7F], [0x7F, 0x04, 0x08, 0x10, 0x7F], [0x3E, 0x41, 0x41, 0x41, 0x3E],
    [0x7F, 0x09, 0x09, 0x09, 0x06], [0x3E, 0x41, 0x51, 0x21, 0x5E], [0x7F, 0x09, 0x19, 0x29, 0x46],
    [0x46, 0x49, 0x49, 0x49, 0x31], [0x01, 0x01, 0x7F, 0x01, 0x01], [0x3F, 0x40, 0x40, 0x40, 0x3F],
    [0x1F, 0x20, 0x40, 0x20, 0x1F], [0x7F, 0x20, 0x18, 0x20, 0x7F], [0x63, 0x14, 0x08, 0x14, 0x63],
    [0x03, 0x04, 0x78, 0x04, 0x03], [0x61, 0x51, 0x49, 0x45, 0x43], [0x00, 0x00, 0x7F, 0x41, 0x41],
    [0x02, 0x04, 0x08, 0x10, 0x20], [0x41, 0x41, 0x7F, 0x00, 0x00], [0x04, 0x02, 0x01, 0x02, 0x04],
    [0x40, 0x40, 0x40, 0x40, 0x40], [0x00, 0x01, 0x02, 0x04, 0x00], [0x20, 0x54, 0x54, 0x54, 0x78],
    [0x7F, 0x48, 0x44, 0x44, 0x38], [0x38, 0x44, 0x44, 0x44, 0x20], [0x38, 0x44, 0x44, 0x48, 0x7F],
    [0x38, 0x54, 0x54, 0x54, 0x18], [0x08, 0x7E, 0x09, 0x01, 0x02], [0x08, 0x14, 0x54, 0x54, 0x3C],
    [0x7F, 0x08, 0x04, 0x04, 0x78], [0x00, 0x44, 0x7D, 0x40, 0x00], [0x20, 0x40, 0x44, 0x3D, 0x00],
    [0x00, 0x7F, 0x10, 0x28, 0x44], [0x00, 0x41, 0x7F, 0x40, 0x00], [0x7C, 0x04, 0x18, 0x04, 0x78],
    [0x7C, 0x08, 0x04, 0x04, 0x78], [0x38, 0x44, 0x44, 0x44, 0x38], [0x7C, 0x14, 0x14, 0x14, 0x08],
    [0x08, 0x14, 0x14, 0x18, 0x7C], [0x7C, 0x08, 0x04, 0x04, 0x08], [0x48, 0x54, 0x54, 0x54, 0x20],
    [0x04, 0x3F, 0x44, 0x40, 0x20], [0x3C, 0x40, 0x40, 0x20, 0x7C], [0x1C, 0x20, 0x40, 0x20, 0x1C],
    [0x3C, 0x40, 0x30, 0x40, 0x3C], [0x44, 0x28, 0x10, 0x28, 0x44], [0x0C, 0x50, 0x50, 0x50, 0x3C],
    [0x44, 0x64, 0x54, 0x4C, 0x44], [0x00, 0x08, 0x36, 0x41, 0x00], [0x00, 0x00, 0x7F, 0x00, 0x00],
    [0x00, 0x41, 0x36, 0x08, 0x00], [0x10, 0x08, 0x08, 0x10, 0x08],
];

fn glyph(ch: char) -> &'static [u8; 5] {
    let code = u8::try_from(ch)
        .ok()
        .filter(|code| (FIRST_GLYPH..=b'~').contains(code))
        .unwrap_or(FALLBACK_GLYPH);
    &GLYPHS[usize::from(code - FIRST_GLYPH)]
}

/// Face used to draw field values.
#[derive(Debug, Clone)]
pub enum Font {
    Bitmap { scale: u32 },
    TrueType { font: rusttype::Font<'static>, px: f32 },
}

/// Pixel rectangle covered by a drawn text run, clipped to its bbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextExtent {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for Font {
    fn default() -> Self {
        Font::builtin(2)
    }
}

impl Font {
    pub fn builtin(scale: u32) -> Self {
        Font::Bitmap {
            scale: scale.max(1),
        }
    }

    pub fn from_file(path: &Path, px: f32) -> Result<Self, GenerationError> {
        let bytes = std::fs::read(path)
            .map_err(|err| GenerationError::Font(format!("{}: {err}", path.display())))?;
        let font = rusttype::Font::try_from_vec(bytes).ok_or_else(|| {
            GenerationError::Font(format!("{}: not a TrueType font", path.display()))
        })?;
        Ok(Font::TrueType { font, px })
    }

    /// Width and height of `text` when drawn into a box `max_height` tall.
    pub fn measure(&self, text: &str, max_height: u32) -> (u32, u32) {
        match self {
            Font::Bitmap { scale } => {
                let scale = bitmap_scale(*scale, max_height);
                let count = text.chars().count() as u32;
                let width = (count * GLYPH_ADVANCE).saturating_sub(1) * scale;
                (width, GLYPH_ROWS * scale)
            }
            Font::TrueType { font, px } => {
                let scale = truetype_scale(*px, max_height);
                let metrics = font.v_metrics(scale);
                let width = font
                    .layout(text, scale, point(0.0, metrics.ascent))
                    .filter_map(|glyph| glyph.pixel_bounding_box())
                    .map(|bb| bb.max.x.max(0) as u32)
                    .max()
                    .unwrap_or(0);
                (width, line_height(&metrics))
            }
        }
    }

    /// Draw `text` left aligned and vertically centred in `bbox`.
    ///
    /// Ink never leaves `bbox`; glyphs past its right edge are clipped.
    pub fn draw(&self, image: &mut RgbaImage, text: &str, bbox: &BBox) -> TextExtent {
        let (text_width, text_height) = self.measure(text, bbox.height);
        let top = bbox.y + bbox.height.saturating_sub(text_height) / 2;
        let clip = Clip::new(image, bbox);

        match self {
            Font::Bitmap { scale } => {
                let scale = bitmap_scale(*scale, bbox.height);
                for (index, ch) in text.chars().enumerate() {
                    let origin_x = u64::from(bbox.x) + index as u64 * u64::from(GLYPH_ADVANCE * scale);
                    if origin_x >= clip.right {
                        break;
                    }
                    for (column, &bits) in glyph(ch).iter().enumerate() {
                        for row in 0..GLYPH_ROWS {
                            if bits & (1u8 << row) == 0 {
                                continue;
                            }
                            let x = origin_x + column as u64 * u64::from(scale);
                            let y = u64::from(top) + u64::from(row * scale);
                            fill_block(image, &clip, x, y, scale);
                        }
                    }
                }
            }
            Font::TrueType { font, px } => {
                let scale = truetype_scale(*px, bbox.height);
                let metrics = font.v_metrics(scale);
                let origin = point(bbox.x as f32, top as f32 + metrics.ascent);
                for positioned in font.layout(text, scale, origin) {
                    let Some(bb) = positioned.pixel_bounding_box() else {
                        continue;
                    };
                    positioned.draw(|gx, gy, coverage| {
                        let x = i64::from(bb.min.x) + i64::from(gx);
                        let y = i64::from(bb.min.y) + i64::from(gy);
                        if x < 0 || y < 0 {
                            return;
                        }
                        let (x, y) = (x as u64, y as u64);
                        if clip.contains(x, y) {
                            blend_ink(image.get_pixel_mut(x as u32, y as u32), coverage);
                        }
                    });
                }
            }
        }

        let right = (u64::from(bbox.x) + u64::from(text_width)).min(clip.right);
        let bottom = (u64::from(top) + u64::from(text_height)).min(clip.bottom);
        TextExtent {
            x: bbox.x,
            y: top,
            width: right.saturating_sub(u64::from(bbox.x)) as u32,
            height: bottom.saturating_sub(u64::from(top)) as u32,
        }
    }
}

/// Shrink the bitmap scale until the glyph height fits the box.
fn bitmap_scale(scale: u32, max_height: u32) -> u32 {
    scale.min(max_height / GLYPH_ROWS).max(1)
}

fn truetype_scale(px: f32, max_height: u32) -> Scale {
    Scale::uniform(px.min(max_height as f32).max(1.0))
}

fn line_height(metrics: &rusttype::VMetrics) -> u32 {
    (metrics.ascent - metrics.descent).ceil().max(0.0) as u32
}

/// Drawable region: the bbox intersected with the image.
struct Clip {
    left: u64,
    top: u64,
    right: u64,
    bottom: u64,
}

impl Clip {
    fn new(image: &RgbaImage, bbox: &BBox) -> Self {
        Self {
            left: u64::from(bbox.x),
            top: u64::from(bbox.y),
            right: bbox.right().min(u64::from(image.width())),
            bottom: bbox.bottom().min(u64::from(image.height())),
        }
    }

    fn contains(&self, x: u64, y: u64) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

fn fill_block(image: &mut RgbaImage, clip: &Clip, x: u64, y: u64, size: u32) {
    for dy in 0..u64::from(size) {
        for dx in 0..u64::from(size) {
            if clip.contains(x + dx, y + dy) {
                image.put_pixel((x + dx) as u32, (y + dy) as u32, INK);
            }
        }
    }
}

fn blend_ink(pixel: &mut Rgba<u8>, coverage: f32) {
    let coverage = coverage.clamp(0.0, 1.0);
    for channel in 0..3 {
        let base = f32::from(pixel.0[channel]);
        let ink = f32::from(INK.0[channel]);
        pixel.0[channel] = (base + (ink - base) * coverage).round() as u8;
    }
    let alpha = f32::from(pixel.0[3]);
    pixel.0[3] = (alpha + (255.0 - alpha) * coverage).round() as u8;
}
