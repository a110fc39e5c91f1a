//! Shared fixtures for unit tests: synthetic panoramas and deterministic
//! collaborator stand-ins.

use image::{Rgb, RgbImage};

use crate::backproject::BoundingBox;
use crate::collaborator::{ObjectDetector, RawDetection, VisionAnalyzer};
use crate::error::CollaboratorError;
use crate::face::FaceImage;
use crate::panorama::Panorama;
use crate::sphere::{self, SphericalAngles};

/// Panorama whose pixels encode their own position:
/// `R = col & 0xff`, `G = col >> 8`, `B = row`. Requires `h <= 256`.
pub(crate) fn gradient_panorama(w: u32, h: u32) -> Panorama {
    assert!(h <= 256, "row must fit in one channel");
    let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x & 0xff) as u8, (x >> 8) as u8, y as u8]));
    Panorama::new(img).unwrap()
}

/// Inverse of [`gradient_panorama`]: `(column, row)` of a sampled pixel.
pub(crate) fn decode_gradient(p: &Rgb<u8>, w: u32, h: u32) -> (u32, u32) {
    let col = p[0] as u32 | ((p[1] as u32) << 8);
    let row = p[2] as u32;
    assert!(col < w && row < h, "pixel {p:?} does not decode inside {w}x{h}");
    (col, row)
}

pub(crate) const TARGET: Rgb<u8> = Rgb([250, 20, 20]);
const GROUND: Rgb<u8> = Rgb([90, 110, 90]);

/// Uniform panorama with one saturated red patch centered at `center`,
/// spanning `half_deg` degrees each way.
pub(crate) fn target_panorama(w: u32, h: u32, center: SphericalAngles, half_deg: f64) -> Panorama {
    let half = half_deg.to_radians();
    let img = RgbImage::from_fn(w, h, |x, y| {
        let a = sphere::pixel_to_angles(x as f64 + 0.5, y as f64 + 0.5, w, h).unwrap();
        let dyaw = sphere::yaw_delta(center.yaw, a.yaw).abs();
        let dpitch = (a.pitch - center.pitch).abs();
        if dyaw <= half && dpitch <= half {
            TARGET
        } else {
            GROUND
        }
    });
    Panorama::new(img).unwrap()
}

/// Detector that boxes all [`TARGET`]-coloured pixels of a face.
pub(crate) struct ColorBlobDetector {
    pub class_id: u32,
    /// Face names that fail instead of detecting.
    pub failing: Vec<String>,
}

impl ColorBlobDetector {
    pub(crate) fn new(class_id: u32) -> Self {
        Self {
            class_id,
            failing: Vec::new(),
        }
    }
}

impl ObjectDetector for ColorBlobDetector {
    fn detect(&self, face: &FaceImage) -> Result<Vec<RawDetection>, CollaboratorError> {
        if self.failing.contains(&face.name) {
            return Err(format!("detector unavailable for {}", face.name).into());
        }
        let mut bounds: Option<[u32; 4]> = None;
        for (x, y, p) in face.image.enumerate_pixels() {
            if *p != TARGET {
                continue;
            }
            let b = bounds.get_or_insert([x, y, x, y]);
            b[0] = b[0].min(x);
            b[1] = b[1].min(y);
            b[2] = b[2].max(x);
            b[3] = b[3].max(y);
        }
        Ok(bounds
            .map(|[x0, y0, x1, y1]| RawDetection {
                bbox: BoundingBox::new(x0 as f64, y0 as f64, x1 as f64 + 1.0, y1 as f64 + 1.0),
                class_id: self.class_id,
                confidence: 0.9,
            })
            .into_iter()
            .collect())
    }
}

/// Analyzer that answers every prompt with the crop size and the prompt.
pub(crate) struct EchoAnalyzer;

impl VisionAnalyzer for EchoAnalyzer {
    fn analyze(&self, image: &RgbImage, prompts: &[String]) -> Result<Vec<String>, CollaboratorError> {
        Ok(prompts
            .iter()
            .map(|p| format!("{}x{}: {}", image.width(), image.height(), p))
            .collect())
    }
}

/// Analyzer that always fails.
pub(crate) struct FailingAnalyzer;

impl VisionAnalyzer for FailingAnalyzer {
    fn analyze(&self, _image: &RgbImage, _prompts: &[String]) -> Result<Vec<String>, CollaboratorError> {
        Err("analysis service unreachable".into())
    }
}
