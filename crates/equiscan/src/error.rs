//! Error types shared across the projection core and the locate pipeline.

use thiserror::Error;

/// Errors raised by the projection core.
///
/// `NotVisible` is an expected, non-fatal outcome: callers skip the affected
/// point instead of recording a coordinate. `OutOfBounds` means a computed
/// coordinate escaped the panorama after normalization and clamping, which
/// indicates a logic defect in the round-trip chain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// Malformed field of view, resolution or optical-axis direction.
    #[error("invalid face orientation: {reason}")]
    InvalidOrientation {
        /// Human-readable description of the failed check.
        reason: String,
    },
    /// Bounding box is degenerate, non-finite or outside the face bounds.
    #[error("invalid bounding box [{x_min}, {y_min}, {x_max}, {y_max}]: {reason}")]
    InvalidBoundingBox {
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
        /// Human-readable description of the failed check.
        reason: String,
    },
    /// The direction lies behind the face camera (`z <= 0` in the face frame).
    #[error("direction is not visible on this face (local z = {z})")]
    NotVisible {
        /// Local z component of the rejected direction.
        z: f64,
    },
    /// A computed panorama coordinate failed its sanity bound.
    #[error("panorama coordinate ({x}, {y}) outside {width}x{height}")]
    OutOfBounds {
        x: f64,
        y: f64,
        width: u32,
        height: u32,
    },
    /// A kernel input lies outside the function's domain.
    #[error("{what} = {value} is outside its domain")]
    OutOfDomain {
        /// Name of the offending input.
        what: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The panorama has a zero dimension.
    #[error("panorama dimensions {width}x{height} are invalid")]
    InvalidPanorama { width: u32, height: u32 },
    /// A detection references a face id the layout does not contain.
    #[error("unknown face id {face_id} (layout has {n_faces} faces)")]
    UnknownFace { face_id: usize, n_faces: usize },
}

impl ProjectionError {
    pub(crate) fn orientation(reason: impl Into<String>) -> Self {
        Self::InvalidOrientation {
            reason: reason.into(),
        }
    }

    /// Returns `true` for the non-fatal "behind the camera" outcome.
    pub fn is_not_visible(&self) -> bool {
        matches!(self, Self::NotVisible { .. })
    }
}

/// Boxed error returned by external collaborators (detector, analyzer).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the end-to-end locate pipeline.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Layout(#[from] crate::face::LayoutError),
    #[error(transparent)]
    Manifest(#[from] crate::manifest::ManifestError),
    /// The vision-analysis collaborator failed on one crop.
    #[error("analysis failed for crop {crop_index}: {source}")]
    Analyzer {
        crop_index: usize,
        #[source]
        source: CollaboratorError,
    },
}
