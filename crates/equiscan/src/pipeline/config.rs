use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotate::MarkerStyle;
use crate::face::{default_face_size, FaceLayout, LayoutError};
use crate::manifest::{ClassNames, DetectionFilter};
use crate::panorama::Interpolation;
use crate::region::RegionConfig;

/// Face-set used to split a panorama. Sizes left unset default to a
/// quarter of the panorama width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum LayoutPreset {
    Cube {
        #[serde(default)]
        size: Option<u32>,
    },
    Ring {
        count: usize,
        #[serde(default)]
        pitch_deg: f64,
        fov_deg: f64,
        #[serde(default)]
        size: Option<u32>,
    },
    Grid {
        yaws_deg: Vec<f64>,
        pitches_deg: Vec<f64>,
        fov_deg: f64,
        #[serde(default)]
        size: Option<u32>,
    },
    TreeSurvey {
        elevation_deg: f64,
        #[serde(default)]
        size: Option<u32>,
    },
}

impl Default for LayoutPreset {
    fn default() -> Self {
        Self::Cube { size: None }
    }
}

impl LayoutPreset {
    /// Build the layout for a panorama of the given width.
    pub fn build(&self, panorama_width: u32) -> Result<FaceLayout, LayoutError> {
        let size = |s: &Option<u32>| s.unwrap_or_else(|| default_face_size(panorama_width));
        match self {
            Self::Cube { size: s } => FaceLayout::cube(size(s)),
            Self::Ring {
                count,
                pitch_deg,
                fov_deg,
                size: s,
            } => FaceLayout::ring(*count, *pitch_deg, *fov_deg, size(s)),
            Self::Grid {
                yaws_deg,
                pitches_deg,
                fov_deg,
                size: s,
            } => FaceLayout::grid(yaws_deg, pitches_deg, *fov_deg, size(s)),
            Self::TreeSurvey {
                elevation_deg,
                size: s,
            } => FaceLayout::tree_survey(*elevation_deg, size(s)),
        }
    }
}

/// Tunables of the locate pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub layout: LayoutPreset,
    pub interpolation: Interpolation,
    pub filter: DetectionFilter,
    pub class_names: ClassNames,
    pub region: RegionConfig,
    pub marker: MarkerStyle,
    /// Back-project the bbox perimeter and draw it as an outline.
    pub draw_outlines: bool,
    /// Perimeter samples per bbox side for outlines.
    pub outline_points_per_side: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            layout: LayoutPreset::default(),
            interpolation: Interpolation::Bilinear,
            filter: DetectionFilter::default(),
            class_names: ClassNames::default(),
            region: RegionConfig::default(),
            marker: MarkerStyle::default(),
            draw_outlines: true,
            outline_points_per_side: 20,
        }
    }
}

impl LocatorConfig {
    /// Load from JSON; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
