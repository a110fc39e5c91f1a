use serde::Serialize;

use crate::backproject::BoundingBox;
use crate::region::CropRegion;
use crate::sphere::PanoramaPoint;

/// One detection located in the panorama.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedObject {
    pub face_id: usize,
    pub face_name: String,
    pub class_id: u32,
    pub label: String,
    pub confidence: f32,
    /// Box on the source face.
    pub bbox: BoundingBox,
    /// `[yaw, pitch]` of the box center, degrees.
    pub center_deg: [f64; 2],
    /// Box center in panorama pixels.
    pub center: PanoramaPoint,
    /// Measured `[half_yaw, half_pitch]`, degrees.
    pub extent_deg: [f64; 2],
    pub region: CropRegion,
    /// `[width, height]` of the extracted crop.
    pub crop_size: [u32; 2],
    /// Back-projected bbox perimeter; empty when outlines are off.
    #[serde(skip)]
    pub outline: Vec<PanoramaPoint>,
}

/// A detection that was dropped before locating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDetection {
    pub face_id: usize,
    pub class_id: u32,
    pub reason: String,
}

/// A face the detector failed on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceFailure {
    pub face_name: String,
    pub error: String,
}

/// Result of locating detections in one panorama.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocateReport {
    /// `[width, height]`.
    pub panorama_size: [u32; 2],
    pub num_faces: usize,
    pub objects: Vec<LocatedObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedDetection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_faces: Vec<FaceFailure>,
}

/// Analyzer answers for one crop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropAnalysis {
    /// Index into [`LocateReport::objects`].
    pub object_index: usize,
    pub answers: Vec<String>,
}
