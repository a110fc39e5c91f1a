//! End-to-end locate pipeline.
//!
//! Glue between the projection core and the external collaborators:
//! layout → face rendering → detector (once per face) → manifest resolution
//! → back-projection → crop regions, then annotation, crop extraction and
//! crop analysis on demand.
//!
//! Geometry lives in `crate::sphere`, `crate::face`, `crate::backproject`
//! and `crate::region`; this layer only fixes stage order and data flow.

mod config;
mod locator;
mod report;


pub use config::{LayoutPreset, LocatorConfig};
pub use locator::{LocateRun, Locator};
pub use report::{CropAnalysis, FaceFailure, LocateReport, LocatedObject, SkippedDetection};
