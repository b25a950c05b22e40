//! Scan and print artifacts applied after generation.

use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use imageproc::noise::{gaussian_noise, salt_and_pepper_noise};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::errors::GenerationError;
use crate::output::write_image_atomic;

/// Image to image degradation.
///
/// Implementations keep no state between calls; the output depends only on
/// the input image and `seed`.
pub trait Degrader: Send + Sync {
    fn name(&self) -> &'static str;

    fn degrade(&self, image: RgbImage, seed: u64) -> Result<RgbImage, GenerationError>;
}

/// Blur, sensor noise, uneven lighting and speckle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanDegrader {
    pub blur_sigma: (f32, f32),
    pub noise_stddev: (f64, f64),
    pub shading_strength: (f32, f32),
    pub speckle_rate: (f64, f64),
}

impl Default for ScanDegrader {
    fn default() -> Self {
        Self {
            blur_sigma: (0.3, 1.2),
            noise_stddev: (2.0, 12.0),
            shading_strength: (0.0, 0.35),
            speckle_rate: (0.0, 0.004),
        }
    }
}

impl Degrader for ScanDegrader {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn degrade(&self, image: RgbImage, seed: u64) -> Result<RgbImage, GenerationError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(GenerationError::Augment("cannot degrade an empty image".to_string()));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let sigma = sample(&mut rng, self.blur_sigma);
        let mut out = if sigma > 0.0 {
            gaussian_blur_f32(&image, sigma)
        } else {
            image
        };

        let stddev = sample(&mut rng, self.noise_stddev);
        if stddev > 0.0 {
            out = gaussian_noise(&out, 0.0, stddev, rng.random());
        }

        let strength = sample(&mut rng, self.shading_strength);
        let from_left = rng.random_bool(0.5);
        apply_shading(&mut out, strength, from_left);

        let rate = sample(&mut rng, self.speckle_rate);
        if rate > 0.0 {
            out = salt_and_pepper_noise(&out, rate, rng.random());
        }
        Ok(out)
    }
}

fn sample<T>(rng: &mut ChaCha8Rng, (low, high): (T, T)) -> T
where
    T: PartialOrd + Copy + rand::distr::uniform::SampleUniform,
{
    if low < high {
        rng.random_range(low..=high)
    } else {
        low
    }
}

/// Darken linearly towards one vertical edge.
fn apply_shading(image: &mut RgbImage, strength: f32, from_left: bool) {
    if strength <= 0.0 {
        return;
    }
    let span = image.width().saturating_sub(1).max(1) as f32;
    for (x, _, pixel) in image.enumerate_pixels_mut() {
        let distance = if from_left { x as f32 } else { span - x as f32 };
        let factor = 1.0 - strength * (1.0 - distance / span);
        let Rgb(channels) = *pixel;
        *pixel = Rgb(channels.map(|value| (f32::from(value) * factor).round().clamp(0.0, 255.0) as u8));
    }
}

/// Degrade the image at `source` and write the result to `dest`.
pub fn augment_file(
    degrader: &dyn Degrader,
    source: &Path,
    dest: &Path,
    seed: u64,
) -> Result<(), GenerationError> {
    let image = image::open(source)?.to_rgb8();
    let degraded = degrader.degrade(image, seed)?;
    write_image_atomic(dest, degraded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> RgbImage {
        let mut image = RgbImage::from_pixel(64, 48, Rgb([240, 240, 240]));
        for x in 10..50 {
            image.put_pixel(x, 20, Rgb([0, 0, 0]));
        }
        image
    }

    #[test]
    fn same_seed_same_output() {
        let degrader = ScanDegrader::default();
        let a = degrader.degrade(page(), 42).expect("degrade");
        let b = degrader.degrade(page(), 42).expect("degrade");
        assert_eq!(a, b);
        assert_eq!(a.dimensions(), (64, 48));
    }

    #[test]
    fn output_differs_from_input() {
        let degraded = ScanDegrader::default().degrade(page(), 7).expect("degrade");
        assert_ne!(degraded, page());
    }

    #[test]
    fn shading_darkens_one_edge() {
        let mut image = RgbImage::from_pixel(11, 1, Rgb([200, 200, 200]));
        apply_shading(&mut image, 0.5, true);
        assert_eq!(image.get_pixel(0, 0).0[0], 100);
        assert_eq!(image.get_pixel(10, 0).0[0], 200);
    }

    #[test]
    fn empty_image_is_rejected() {
        let result = ScanDegrader::default().degrade(RgbImage::new(0, 0), 1);
        assert!(matches!(result, Err(GenerationError::Augment(_))));
    }
}
