//! Placing a composed document onto a background.

use image::imageops;
use image::{Rgba, RgbaImage};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::GenerationError;
use crate::model::BackgroundOptions;

pub mod corpus;
pub mod geometry;

pub use corpus::{BackgroundCorpus, DirectoryCorpus, EmptyCorpus, IMAGE_EXTENSIONS, MemoryCorpus};
pub use geometry::{fit_centered, resize_exact, rotate_expanded, rotated_extent};

/// Where the foreground landed on the background.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub kind: BackgroundKind,
    pub angle_degrees: f32,
    /// Size of the foreground after resizing, before rotation.
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Top-left corner and size of the rotated foreground.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub background_width: u32,
    pub background_height: u32,
}

impl Placement {
    pub fn right(&self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    pub fn bottom(&self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    pub fn is_contained(&self) -> bool {
        self.right() <= u64::from(self.background_width)
            && self.bottom() <= u64::from(self.background_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundKind {
    Flat { grey: u8 },
    Photo { index: usize },
}

/// The flattened output and, when a background was used, its geometry.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub image: RgbaImage,
    pub placement: Option<Placement>,
}

/// Place `foreground` on a random background.
///
/// Every draw comes from `rng` in a fixed order, so the result is a pure
/// function of the stream state.
pub fn place_on_background(
    foreground: RgbaImage,
    corpus: &dyn BackgroundCorpus,
    options: &BackgroundOptions,
    rng: &mut dyn RngCore,
) -> Result<PlacedImage, GenerationError> {
    if !rng.random_bool(options.probability) {
        return Ok(PlacedImage {
            image: foreground,
            placement: None,
        });
    }

    let (background, kind) = choose_background(corpus, options, rng)?;
    let (bg_w, bg_h) = background.dimensions();
    let (fg_w, fg_h) = foreground.dimensions();
    if fg_w == 0 || fg_h == 0 || bg_w == 0 || bg_h == 0 {
        return Err(GenerationError::BackgroundFit(format!(
            "empty image: foreground {fg_w}x{fg_h}, background {bg_w}x{bg_h}"
        )));
    }

    let min_w = f64::from(bg_w) / 3.0;
    let max_w = f64::from(bg_w) * 0.75;
    let scaled_w = (rng.random_range(min_w..=max_w) as u32).max(1);
    let aspect = f64::from(fg_w) / f64::from(fg_h);
    let scaled_h = ((f64::from(scaled_w) / aspect) as u32).clamp(1, bg_h);
    let scaled = resize_exact(&foreground, scaled_w, scaled_h);

    let max_angle = options.max_rotation_degrees;
    let angle = rng.random_range(-max_angle..=max_angle);
    let rotated = rotate_expanded(&scaled, angle);
    let (rot_w, rot_h) = rotated.dimensions();

    let x = rng.random_range(0..=bg_w.saturating_sub(rot_w));
    let y = rng.random_range(0..=bg_h.saturating_sub(rot_h));
    let target_w = bg_w.max(rot_w + x);
    let target_h = bg_h.max(rot_h + y);
    let mut canvas = fit_centered(&background, target_w, target_h);

    let placement = Placement {
        kind,
        angle_degrees: angle,
        scaled_width: scaled_w,
        scaled_height: scaled_h,
        x,
        y,
        width: rot_w,
        height: rot_h,
        background_width: canvas.width(),
        background_height: canvas.height(),
    };
    place_within(&placement)?;
    imageops::overlay(&mut canvas, &rotated, i64::from(x), i64::from(y));
    debug!(
        angle = angle,
        x = x,
        y = y,
        width = rot_w,
        height = rot_h,
        background_width = placement.background_width,
        background_height = placement.background_height,
        "foreground placed"
    );

    Ok(PlacedImage {
        image: canvas,
        placement: Some(placement),
    })
}

/// Containment check for a computed placement.
///
/// The sizing rules make this hold by construction; a failure is a bug.
pub fn place_within(placement: &Placement) -> Result<(), GenerationError> {
    if placement.is_contained() {
        return Ok(());
    }
    Err(GenerationError::BackgroundFit(format!(
        "foreground {}x{} at ({}, {}) exceeds background {}x{}",
        placement.width,
        placement.height,
        placement.x,
        placement.y,
        placement.background_width,
        placement.background_height
    )))
}

fn choose_background(
    corpus: &dyn BackgroundCorpus,
    options: &BackgroundOptions,
    rng: &mut dyn RngCore,
) -> Result<(RgbaImage, BackgroundKind), GenerationError> {
    let flat = corpus.is_empty() || rng.random_bool(options.flat_ratio);
    if flat {
        let width = rng.random_range(options.min_canvas..=options.max_canvas);
        let height = rng.random_range(options.min_canvas..=options.max_canvas);
        let grey = rng.random_range(0..=255u8);
        let canvas = RgbaImage::from_pixel(width, height, Rgba([grey, grey, grey, 255]));
        return Ok((canvas, BackgroundKind::Flat { grey }));
    }
    let index = rng.random_range(0..corpus.len());
    Ok((corpus.load(index)?, BackgroundKind::Photo { index }))
}
