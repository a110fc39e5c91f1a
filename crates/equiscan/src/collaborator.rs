//! Pluggable external services: the planar object detector and the
//! vision-analysis service.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::backproject::BoundingBox;
use crate::error::CollaboratorError;
use crate::face::FaceImage;

/// One box reported by an [`ObjectDetector`], in face pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub confidence: f32,
}

/// Planar object detection backend, run once per rendered face.
pub trait ObjectDetector: Send + Sync {
    /// Detect objects on one face.
    fn detect(&self, face: &FaceImage) -> Result<Vec<RawDetection>, CollaboratorError>;
}

/// Vision-analysis backend, run once per extracted crop.
pub trait VisionAnalyzer: Send + Sync {
    /// Answer each prompt about `image`. The returned list matches `prompts`
    /// in length and order.
    fn analyze(&self, image: &RgbImage, prompts: &[String]) -> Result<Vec<String>, CollaboratorError>;
}
