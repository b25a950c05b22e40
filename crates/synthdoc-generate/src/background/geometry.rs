use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const EXTENT_EPSILON: f32 = 1e-3;

/// Canvas size that holds a `width` x `height` rectangle rotated by `degrees`.
pub fn rotated_extent(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let (w, h) = (width as f32, height as f32);
    let out_w = (w * cos + h * sin - EXTENT_EPSILON).ceil().max(1.0);
    let out_h = (w * sin + h * cos - EXTENT_EPSILON).ceil().max(1.0);
    (out_w as u32, out_h as u32)
}

/// Rotate counter-clockwise by `degrees` onto an expanded transparent canvas.
///
/// No corner of the input is clipped.
pub fn rotate_expanded(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if degrees == 0.0 {
        return image.clone();
    }
    let (out_w, out_h) = rotated_extent(width, height, degrees);
    let projection = Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0)
        * Projection::rotate(-degrees.to_radians())
        * Projection::translate(-(width as f32) / 2.0, -(height as f32) / 2.0);
    let mut out = RgbaImage::from_pixel(out_w, out_h, TRANSPARENT);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        TRANSPARENT,
        &mut out,
    );
    out
}

/// Scale to cover `width` x `height` keeping the aspect ratio, then crop the centre.
///
/// Returns the input unchanged when it already has the requested size.
pub fn fit_centered(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (src_w, src_h) = image.dimensions();
    if (src_w, src_h) == (width, height) {
        return image.clone();
    }
    let scale = (width as f64 / src_w.max(1) as f64).max(height as f64 / src_h.max(1) as f64);
    let scaled_w = ((src_w as f64 * scale).ceil() as u32).max(width);
    let scaled_h = ((src_h as f64 * scale).ceil() as u32).max(height);
    let scaled = imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle);
    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;
    imageops::crop_imm(&scaled, x, y, width, height).to_image()
}

/// Resize to exactly `width` x `height`.
pub fn resize_exact(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}
