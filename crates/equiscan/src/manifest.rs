//! Detections manifest: the on-disk hand-off between the detector stage and
//! back-projection.
//!
//! JSON shape, keyed by face name:
//!
//! ```json
//! {
//!   "front": {
//!     "image_path": "faces/front.png",
//!     "boxes": [{"coordinates": [x1, y1, x2, y2], "score": 0.91, "class": 3}],
//!     "num_detections": 1
//!   },
//!   "up": {"image_path": "faces/up.png", "boxes": [], "num_detections": 0, "error": "..."}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backproject::{BoundingBox, Detection};
use crate::collaborator::RawDetection;
use crate::face::FaceLayout;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read or write manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("manifest face '{name}' is not part of the layout")]
    UnknownFace { name: String },
}

/// One box as stored in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManifestBox {
    /// `[x1, y1, x2, y2]` in face pixels.
    pub coordinates: [f64; 4],
    pub score: f32,
    pub class: u32,
}

/// Detector output for one face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceEntry {
    pub image_path: String,
    #[serde(default)]
    pub boxes: Vec<ManifestBox>,
    #[serde(default)]
    pub num_detections: usize,
    /// Detector failure message; such faces carry no boxes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Which detections survive resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionFilter {
    pub min_confidence: f32,
    /// Keep only these classes; `None` keeps all.
    pub target_classes: Option<Vec<u32>>,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            min_confidence: 0.25,
            target_classes: None,
        }
    }
}

impl DetectionFilter {
    pub fn accepts(&self, class_id: u32, confidence: f32) -> bool {
        confidence >= self.min_confidence
            && self
                .target_classes
                .as_ref()
                .map_or(true, |c| c.contains(&class_id))
    }
}

/// Class id → label table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNames(pub BTreeMap<u32, String>);

impl Default for ClassNames {
    fn default() -> Self {
        Self(
            [(0, "arbusto"), (2, "roca"), (3, "arbol")]
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
        )
    }
}

impl ClassNames {
    /// Label for a class; unnamed classes get `class<N>`.
    pub fn label(&self, class_id: u32) -> String {
        self.0
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("class{class_id}"))
    }
}

/// All faces of one panorama, keyed by face name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionManifest {
    pub faces: BTreeMap<String, FaceEntry>,
}

impl DetectionManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ManifestError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn write_json_file(&self, path: &Path) -> Result<(), ManifestError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Record detector results for one face.
    pub fn record(&mut self, face_name: &str, image_path: String, detections: &[RawDetection]) {
        let boxes: Vec<ManifestBox> = detections
            .iter()
            .map(|d| ManifestBox {
                coordinates: d.bbox.to_array(),
                score: d.confidence,
                class: d.class_id,
            })
            .collect();
        self.faces.insert(
            face_name.to_string(),
            FaceEntry {
                image_path,
                num_detections: boxes.len(),
                boxes,
                error: None,
            },
        );
    }

    /// Record a detector failure for one face.
    pub fn record_error(&mut self, face_name: &str, image_path: String, error: String) {
        self.faces.insert(
            face_name.to_string(),
            FaceEntry {
                image_path,
                boxes: Vec::new(),
                num_detections: 0,
                error: Some(error),
            },
        );
    }

    /// Total number of stored boxes.
    pub fn total_boxes(&self) -> usize {
        self.faces.values().map(|f| f.boxes.len()).sum()
    }

    /// Turn manifest boxes into detections keyed by layout face id.
    ///
    /// Output is ordered by face id, then by box order within the face.
    /// Faces with no boxes are skipped, failed faces are logged and skipped.
    pub fn resolve(
        &self,
        layout: &FaceLayout,
        filter: &DetectionFilter,
        names: &ClassNames,
    ) -> Result<Vec<Detection>, ManifestError> {
        let mut out = Vec::new();
        for (name, entry) in &self.faces {
            if let Some(err) = &entry.error {
                tracing::warn!("face '{}' has no detections: {}", name, err);
                continue;
            }
            if entry.boxes.is_empty() {
                continue;
            }
            let face_id = layout.find(name).ok_or_else(|| ManifestError::UnknownFace {
                name: name.clone(),
            })?;
            if entry.num_detections != entry.boxes.len() {
                tracing::debug!(
                    "face '{}': num_detections {} != {} boxes",
                    name,
                    entry.num_detections,
                    entry.boxes.len()
                );
            }
            out.extend(
                entry
                    .boxes
                    .iter()
                    .filter(|b| filter.accepts(b.class, b.score))
                    .map(|b| Detection {
                        face_id,
                        bbox: BoundingBox::from_array(b.coordinates),
                        class_id: b.class,
                        label: names.label(b.class),
                        confidence: b.score,
                    }),
            );
        }
        out.sort_by_key(|d| d.face_id);
        tracing::info!(
            "manifest resolved to {} detections ({} boxes total)",
            out.len(),
            self.total_boxes()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "front": {
            "image_path": "faces/front.png",
            "boxes": [
                {"coordinates": [10.0, 20.0, 30.0, 60.0], "score": 0.9, "class": 3},
                {"coordinates": [40.0, 40.0, 50.0, 50.0], "score": 0.1, "class": 3}
            ],
            "num_detections": 2
        },
        "back": {
            "image_path": "faces/back.png",
            "boxes": [{"coordinates": [1.0, 2.0, 3.0, 4.0], "score": 0.8, "class": 0}],
            "num_detections": 1
        },
        "up": {"image_path": "faces/up.png", "boxes": [], "num_detections": 0, "error": "timeout"},
        "down": {"image_path": "faces/down.png", "boxes": [], "num_detections": 0}
    }"#;

    #[test]
    fn resolves_against_layout_in_face_order() {
        let layout = FaceLayout::cube(64).unwrap();
        let manifest = DetectionManifest::from_json_str(SAMPLE).unwrap();
        let dets = manifest
            .resolve(&layout, &DetectionFilter::default(), &ClassNames::default())
            .unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].face_id, 0);
        assert_eq!(dets[0].label, "arbol");
        assert_eq!(dets[0].bbox, BoundingBox::new(10.0, 20.0, 30.0, 60.0));
        assert_eq!(dets[1].face_id, 2);
        assert_eq!(dets[1].label, "arbusto");
    }

    #[test]
    fn class_filter_drops_other_classes() {
        let layout = FaceLayout::cube(64).unwrap();
        let manifest = DetectionManifest::from_json_str(SAMPLE).unwrap();
        let filter = DetectionFilter {
            min_confidence: 0.05,
            target_classes: Some(vec![3]),
        };
        let dets = manifest.resolve(&layout, &filter, &ClassNames::default()).unwrap();
        assert_eq!(dets.len(), 2);
        assert!(dets.iter().all(|d| d.class_id == 3 && d.face_id == 0));
    }

    #[test]
    fn unknown_face_name_is_an_error() {
        let layout = FaceLayout::ring(4, 0.0, 90.0, 64).unwrap();
        let manifest = DetectionManifest::from_json_str(SAMPLE).unwrap();
        let err = manifest
            .resolve(&layout, &DetectionFilter::default(), &ClassNames::default())
            .unwrap_err();
        assert!(matches!(err, ManifestError::UnknownFace { .. }));
    }

    #[test]
    fn record_roundtrips_through_json() {
        let mut m = DetectionManifest::new();
        m.record(
            "front",
            "front.png".into(),
            &[RawDetection {
                bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
                class_id: 3,
                confidence: 0.5,
            }],
        );
        m.record_error("up", "up.png".into(), "model crashed".into());
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"coordinates\":[1.0,2.0,3.0,4.0]"));
        let back = DetectionManifest::from_json_str(&json).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.faces["front"].num_detections, 1);
        assert_eq!(back.faces["up"].error.as_deref(), Some("model crashed"));
        assert!(!serde_json::to_string(&back.faces["front"]).unwrap().contains("error"));
    }

    #[test]
    fn unnamed_class_gets_generic_label() {
        assert_eq!(ClassNames::default().label(5), "class5");
    }
}
