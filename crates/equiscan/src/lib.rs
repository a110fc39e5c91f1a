//! equiscan — locate objects in equirectangular 360° panoramas with a
//! planar detector.
//!
//! A panorama is split into rectilinear faces, an external detector runs on
//! each face, and every detection is mapped back onto the sphere and into
//! panorama pixels. From there the crate derives seam-aware crop regions,
//! annotated copies of the panorama and crop images for downstream analysis.
//!
//! Stages, leaf first:
//!
//! 1. **Sphere** – pixel ↔ angle ↔ unit-vector conversions and face rotations.
//! 2. **Face** – face orientations, layouts and rendering.
//! 3. **Back-projection** – face points and boxes to panorama pixels.
//! 4. **Region** – crop rectangles, split at the seam when needed.
//! 5. **Annotate** – wraparound markers and outlines.
//!
//! # Public API
//! - [`Locator`] and [`LocatorConfig`] run the whole pipeline
//! - [`ObjectDetector`] and [`VisionAnalyzer`] plug in the external services
//! - the geometry modules are public for callers that only need projections

pub mod annotate;
pub mod backproject;
mod collaborator;
mod error;
pub mod face;
pub mod geo;
pub mod manifest;
mod panorama;
mod pipeline;
pub mod region;
pub mod sphere;

#[cfg(test)]
pub(crate) mod test_utils;

pub use annotate::{Mark, MarkerStyle};
pub use backproject::{BackProjection, BoundingBox, Detection};
pub use collaborator::{ObjectDetector, RawDetection, VisionAnalyzer};
pub use error::{CollaboratorError, LocateError, ProjectionError};
pub use face::{FaceImage, FaceLayout, FaceOrientation, FaceSpec, LayoutError};
pub use manifest::{ClassNames, DetectionFilter, DetectionManifest, ManifestError};
pub use panorama::{Interpolation, Panorama};
pub use pipeline::{
    CropAnalysis, FaceFailure, LayoutPreset, LocateReport, LocateRun, LocatedObject, Locator,
    LocatorConfig, SkippedDetection,
};
pub use region::{AngularExtent, CropRegion, ExpansionPolicy, PixelRect, RegionConfig, TreeExpansion};
pub use sphere::{PanoramaPoint, SphericalAngles};
