//! Equirectangular source image and seam-aware sampling.

use image::{DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;
use crate::sphere::PanoramaPoint;

/// Resampling kernel used when rendering faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

/// Read-only equirectangular panorama.
///
/// Pixel `(c, r)` covers `[c, c + 1) × [r, r + 1)` in continuous panorama
/// coordinates, so its center sits at `(c + 0.5, r + 0.5)`.
#[derive(Debug, Clone)]
pub struct Panorama {
    image: RgbImage,
}

impl Panorama {
    /// Wrap a decoded RGB buffer. Zero-sized images are rejected.
    pub fn new(image: RgbImage) -> Result<Self, ProjectionError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ProjectionError::InvalidPanorama { width, height });
        }
        if width != 2 * height {
            tracing::debug!(
                "panorama {}x{} is not 2:1; angles are normalized per axis",
                width,
                height
            );
        }
        Ok(Self { image })
    }

    /// Convert any decoded image to RGB8 and wrap it.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, ProjectionError> {
        Self::new(image.to_rgb8())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Underlying pixel buffer.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Sample with the requested kernel.
    #[inline]
    pub fn sample(&self, p: PanoramaPoint, interpolation: Interpolation) -> Rgb<u8> {
        match interpolation {
            Interpolation::Nearest => self.sample_nearest(p),
            Interpolation::Bilinear => self.sample_bilinear(p),
        }
    }

    /// Pixel containing `p`; columns wrap, rows clamp.
    #[inline]
    pub fn sample_nearest(&self, p: PanoramaPoint) -> Rgb<u8> {
        let [c, r] = p.pixel(self.width(), self.height());
        *self.image.get_pixel(c, r)
    }

    /// Bilinear interpolation between the four nearest pixel centers.
    ///
    /// Neighbours wrap horizontally across the seam and clamp vertically at
    /// the poles, so sampling near `x = 0` blends with column `W - 1`.
    #[inline]
    pub fn sample_bilinear(&self, p: PanoramaPoint) -> Rgb<u8> {
        let (w, h) = self.dimensions();
        let sx = p.x - 0.5;
        let sy = p.y - 0.5;
        let x0f = sx.floor();
        let y0f = sy.floor();
        let fx = (sx - x0f) as f32;
        let fy = (sy - y0f) as f32;

        let x0 = (x0f as i64).rem_euclid(w as i64) as usize;
        let x1 = (x0 + 1) % w as usize;
        let y0 = (y0f as i64).clamp(0, h as i64 - 1) as usize;
        let y1 = (y0f as i64 + 1).clamp(0, h as i64 - 1) as usize;

        let stride = w as usize * 3;
        let raw = self.image.as_raw();
        let i00 = y0 * stride + x0 * 3;
        let i10 = y0 * stride + x1 * 3;
        let i01 = y1 * stride + x0 * 3;
        let i11 = y1 * stride + x1 * 3;

        let mut out = [0u8; 3];
        for (ch, o) in out.iter_mut().enumerate() {
            let v = (1.0 - fx) * (1.0 - fy) * raw[i00 + ch] as f32
                + fx * (1.0 - fy) * raw[i10 + ch] as f32
                + (1.0 - fx) * fy * raw[i01 + ch] as f32
                + fx * fy * raw[i11 + ch] as f32;
            *o = v.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone(w: u32, h: u32) -> Panorama {
        let mut img = RgbImage::new(w, h);
        for y in 0..h {
            img.put_pixel(0, y, Rgb([200, 0, 0]));
            img.put_pixel(w - 1, y, Rgb([0, 0, 100]));
        }
        Panorama::new(img).unwrap()
    }

    #[test]
    fn rejects_empty_image() {
        assert!(matches!(
            Panorama::new(RgbImage::new(0, 4)),
            Err(ProjectionError::InvalidPanorama { .. })
        ));
    }

    #[test]
    fn bilinear_at_pixel_center_is_exact() {
        let pano = two_tone(8, 4);
        let v = pano.sample_bilinear(PanoramaPoint::new(0.5, 1.5));
        assert_eq!(v, Rgb([200, 0, 0]));
    }

    #[test]
    fn bilinear_blends_across_seam() {
        let pano = two_tone(8, 4);
        // x = 0 lies halfway between the centers of column 7 and column 0
        let v = pano.sample_bilinear(PanoramaPoint::new(0.0, 2.5));
        assert_eq!(v, Rgb([100, 0, 50]));
    }

    #[test]
    fn bilinear_clamps_at_poles() {
        let pano = two_tone(8, 4);
        let top = pano.sample_bilinear(PanoramaPoint::new(0.5, 0.0));
        let bottom = pano.sample_bilinear(PanoramaPoint::new(0.5, 3.999));
        assert_eq!(top, Rgb([200, 0, 0]));
        assert_eq!(bottom, Rgb([200, 0, 0]));
    }

    #[test]
    fn nearest_wraps_columns() {
        let pano = two_tone(8, 4);
        assert_eq!(
            pano.sample(PanoramaPoint::new(7.9, 1.0), Interpolation::Nearest),
            Rgb([0, 0, 100])
        );
        assert_eq!(
            pano.sample(PanoramaPoint::new(-0.2, 1.0), Interpolation::Nearest),
            Rgb([0, 0, 100])
        );
    }
}
