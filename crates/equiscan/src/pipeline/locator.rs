use std::path::Path;

use image::RgbImage;
use rayon::prelude::*;

use super::config::LocatorConfig;
use super::report::{CropAnalysis, FaceFailure, LocateReport, LocatedObject, SkippedDetection};
use crate::annotate::{self, Mark};
use crate::backproject::{self, Detection};
use crate::collaborator::{ObjectDetector, VisionAnalyzer};
use crate::error::{LocateError, ProjectionError};
use crate::face::{self, FaceImage, FaceLayout, LayoutError};
use crate::manifest::DetectionManifest;
use crate::panorama::Panorama;
use crate::region;

/// Everything produced by [`Locator::locate`].
#[derive(Debug, Clone)]
pub struct LocateRun {
    pub layout: FaceLayout,
    pub faces: Vec<FaceImage>,
    pub manifest: DetectionManifest,
    pub report: LocateReport,
}

/// Primary entry point: splits a panorama into faces, runs a detector on
/// them and maps the detections back into the panorama.
///
/// Create once, run on many panoramas.
#[derive(Debug, Clone, Default)]
pub struct Locator {
    config: LocatorConfig,
}

impl Locator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Load a JSON config and create a locator in one step.
    pub fn from_config_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(LocatorConfig::from_json_file(path)?))
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Mutable access for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut LocatorConfig {
        &mut self.config
    }

    /// Face layout for this panorama.
    pub fn layout_for(&self, panorama: &Panorama) -> Result<FaceLayout, LayoutError> {
        self.config.layout.build(panorama.width())
    }

    pub fn render_faces(&self, panorama: &Panorama, layout: &FaceLayout) -> Vec<FaceImage> {
        face::render_faces(panorama, layout, self.config.interpolation)
    }

    /// Run the detector once per face. Failures are logged and recorded in
    /// the manifest; the remaining faces still run. Each entry's
    /// `image_path` is `<face name>.png`.
    pub fn run_detector(&self, faces: &[FaceImage], detector: &dyn ObjectDetector) -> DetectionManifest {
        let mut manifest = DetectionManifest::new();
        for f in faces {
            let image_path = format!("{}.png", f.name);
            match detector.detect(f) {
                Ok(dets) => {
                    tracing::debug!("face '{}': {} detections", f.name, dets.len());
                    manifest.record(&f.name, image_path, &dets);
                }
                Err(err) => {
                    tracing::warn!("detector failed on face '{}': {}", f.name, err);
                    manifest.record_error(&f.name, image_path, err.to_string());
                }
            }
        }
        tracing::info!(
            "detector found {} boxes on {} faces",
            manifest.total_boxes(),
            faces.len()
        );
        manifest
    }

    /// Back-project detections and derive their crop regions.
    ///
    /// Malformed boxes and boxes behind their face are skipped and listed in
    /// the report. Any other projection failure aborts the run.
    pub fn locate_detections(
        &self,
        panorama: &Panorama,
        layout: &FaceLayout,
        detections: &[Detection],
    ) -> Result<LocateReport, LocateError> {
        let (w, h) = panorama.dimensions();
        let projected = backproject::back_project_all(detections, layout, w, h);

        let mut report = LocateReport {
            panorama_size: [w, h],
            num_faces: layout.len(),
            ..LocateReport::default()
        };
        for (det, result) in detections.iter().zip(projected) {
            let bp = match result {
                Ok(bp) => bp,
                Err(
                    err @ (ProjectionError::InvalidBoundingBox { .. }
                    | ProjectionError::NotVisible { .. }),
                ) => {
                    tracing::warn!(
                        "skipping detection on face {} (class {}): {}",
                        det.face_id,
                        det.class_id,
                        err
                    );
                    report.skipped.push(SkippedDetection {
                        face_id: det.face_id,
                        class_id: det.class_id,
                        reason: err.to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let region =
                self.config
                    .region
                    .region_for(bp.center, bp.center_angles.pitch, bp.extent, w, h)?;
            let outline = if self.config.draw_outlines {
                backproject::back_project_outline(
                    det,
                    layout,
                    w,
                    h,
                    self.config.outline_points_per_side,
                )?
            } else {
                Vec::new()
            };
            let face_name = layout
                .get(det.face_id)
                .map(|f| f.name.clone())
                .unwrap_or_default();
            report.objects.push(LocatedObject {
                face_id: det.face_id,
                face_name,
                class_id: det.class_id,
                label: det.label.clone(),
                confidence: det.confidence,
                bbox: det.bbox,
                center_deg: bp.center_angles.to_degrees(),
                center: bp.center,
                extent_deg: [bp.extent.half_yaw.to_degrees(), bp.extent.half_pitch.to_degrees()],
                region,
                crop_size: [region.width(), region.height()],
                outline,
            });
        }
        tracing::info!(
            "located {} objects ({} skipped)",
            report.objects.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Resolve a manifest against the layout and locate its detections.
    pub fn locate_manifest(
        &self,
        panorama: &Panorama,
        layout: &FaceLayout,
        manifest: &DetectionManifest,
    ) -> Result<LocateReport, LocateError> {
        let detections = manifest.resolve(layout, &self.config.filter, &self.config.class_names)?;
        let mut report = self.locate_detections(panorama, layout, &detections)?;
        report.failed_faces = manifest
            .faces
            .iter()
            .filter_map(|(name, entry)| {
                entry.error.as_ref().map(|e| FaceFailure {
                    face_name: name.clone(),
                    error: e.clone(),
                })
            })
            .collect();
        Ok(report)
    }

    /// Full in-process run: layout, faces, detector, back-projection.
    pub fn locate(
        &self,
        panorama: &Panorama,
        detector: &dyn ObjectDetector,
    ) -> Result<LocateRun, LocateError> {
        let layout = self.layout_for(panorama)?;
        let faces = self.render_faces(panorama, &layout);
        let manifest = self.run_detector(&faces, detector);
        let report = self.locate_manifest(panorama, &layout, &manifest)?;
        Ok(LocateRun {
            layout,
            faces,
            manifest,
            report,
        })
    }

    /// Annotated copy of the panorama with one marker per located object.
    pub fn annotate(&self, panorama: &Panorama, report: &LocateReport) -> RgbImage {
        let marks: Vec<Mark> = report
            .objects
            .iter()
            .map(|o| Mark {
                center: o.center,
                class_id: o.class_id,
                outline: o.outline.clone(),
            })
            .collect();
        annotate::annotate(panorama, &marks, &self.config.marker)
    }

    /// Crop images, one per located object, in report order.
    pub fn extract_crops(&self, panorama: &Panorama, report: &LocateReport) -> Vec<RgbImage> {
        report
            .objects
            .par_iter()
            .map(|o| region::extract_crop(panorama, &o.region))
            .collect()
    }

    /// Ask the analyzer `prompts` about every crop, one call per crop.
    pub fn analyze_crops(
        &self,
        crops: &[RgbImage],
        analyzer: &dyn VisionAnalyzer,
        prompts: &[String],
    ) -> Result<Vec<CropAnalysis>, LocateError> {
        crops
            .iter()
            .enumerate()
            .map(|(i, crop)| {
                let answers = analyzer
                    .analyze(crop, prompts)
                    .map_err(|source| LocateError::Analyzer {
                        crop_index: i,
                        source,
                    })?;
                if answers.len() != prompts.len() {
                    tracing::warn!(
                        "crop {}: {} answers for {} prompts",
                        i,
                        answers.len(),
                        prompts.len()
                    );
                }
                Ok(CropAnalysis {
                    object_index: i,
                    answers,
                })
            })
            .collect()
    }
}
