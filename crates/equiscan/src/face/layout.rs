//! Face-set configurations.
//!
//! A layout is the caller-defined list of faces a panorama is split into.
//! Layout JSON follows the `equiscan.layout.v1` schema; angles are stored in
//! degrees on disk and converted to radians on load.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::FaceOrientation;
use crate::error::ProjectionError;
use crate::sphere::{self, SphericalAngles};

const LAYOUT_SCHEMA_V1: &str = "equiscan.layout.v1";

const CUBE_FOV_DEG: f64 = 90.0;

/// Errors raised while building, loading or saving a [`FaceLayout`].
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to read or write layout: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported layout schema '{found}' (expected '{expected}')")]
    Schema { found: String, expected: &'static str },
    #[error("layout contains no faces")]
    Empty,
    #[error("duplicate face name '{0}'")]
    DuplicateName(String),
    #[error("face '{name}': {source}")]
    Face {
        name: String,
        #[source]
        source: ProjectionError,
    },
}

/// One named face of a layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceSpec {
    pub name: String,
    pub orientation: FaceOrientation,
}

/// Ordered, validated set of faces. A face id is the index into this list.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLayout {
    faces: Vec<FaceSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FaceEntryV1 {
    name: String,
    yaw_deg: f64,
    pitch_deg: f64,
    fov_h_deg: f64,
    fov_v_deg: f64,
    width: u32,
    height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FaceLayoutSpecV1 {
    schema: String,
    faces: Vec<FaceEntryV1>,
}

/// Angle in a face name: whole degrees, or one decimal when fractional.
fn angle_tag(deg: f64, signed: bool) -> String {
    let d = (deg * 10.0).round() / 10.0;
    match (d.fract() == 0.0, signed) {
        (true, false) => format!("{:03}", d as i64),
        (true, true) => format!("{:+03}", d as i64),
        (false, false) => format!("{:05.1}", d),
        (false, true) => format!("{:+05.1}", d),
    }
}

/// Default face edge length for a panorama of the given width.
pub fn default_face_size(panorama_width: u32) -> u32 {
    (panorama_width / 4).max(1)
}

impl FaceLayout {
    /// Build a layout from named faces. Names must be unique and non-empty.
    pub fn new(faces: Vec<FaceSpec>) -> Result<Self, LayoutError> {
        if faces.is_empty() {
            return Err(LayoutError::Empty);
        }
        let mut seen = HashSet::new();
        for f in &faces {
            if !seen.insert(f.name.as_str()) {
                return Err(LayoutError::DuplicateName(f.name.clone()));
            }
        }
        Ok(Self { faces })
    }

    /// Six 90° cube faces: front, right, back, left, up, down.
    pub fn cube(size: u32) -> Result<Self, LayoutError> {
        let dirs = [
            ("front", 0.0, 0.0),
            ("right", 90.0, 0.0),
            ("back", 180.0, 0.0),
            ("left", 270.0, 0.0),
            ("up", 0.0, 90.0),
            ("down", 0.0, -90.0),
        ];
        Self::from_directions(
            dirs.iter().map(|&(n, y, p)| (n.to_string(), y, p)),
            CUBE_FOV_DEG,
            size,
        )
    }

    /// `count` faces evenly spaced in yaw, all at `pitch_deg`.
    pub fn ring(count: usize, pitch_deg: f64, fov_deg: f64, size: u32) -> Result<Self, LayoutError> {
        let step = 360.0 / count.max(1) as f64;
        Self::from_directions(
            (0..count).map(|i| {
                let yaw = i as f64 * step;
                (format!("ring_yaw{:03}", yaw.round() as i64), yaw, pitch_deg)
            }),
            fov_deg,
            size,
        )
    }

    /// Yaw × pitch survey grid, pitch-major.
    ///
    /// Face names carry angles to 0.1°, so grid angles closer than that
    /// collide as `DuplicateName`.
    pub fn grid(
        yaws_deg: &[f64],
        pitches_deg: &[f64],
        fov_deg: f64,
        size: u32,
    ) -> Result<Self, LayoutError> {
        let dirs = pitches_deg.iter().flat_map(|&p| {
            yaws_deg.iter().map(move |&y| {
                (
                    format!("survey_yaw{}_pitch{}", angle_tag(y, false), angle_tag(p, true)),
                    y,
                    p,
                )
            })
        });
        Self::from_directions(dirs, fov_deg, size)
    }

    /// Vegetation survey: eight faces every 45° at `elevation_deg`, a zenith
    /// face and four horizon faces.
    pub fn tree_survey(elevation_deg: f64, size: u32) -> Result<Self, LayoutError> {
        let elevated = [
            ("north", 0.0),
            ("northeast", 45.0),
            ("east", 90.0),
            ("southeast", 135.0),
            ("south", 180.0),
            ("southwest", 225.0),
            ("west", 270.0),
            ("northwest", 315.0),
        ];
        let mut dirs: Vec<(String, f64, f64)> = elevated
            .iter()
            .map(|&(n, y)| (format!("{n}_elevated"), y, elevation_deg))
            .collect();
        dirs.push(("zenith".to_string(), 0.0, 90.0));
        for &(n, y) in elevated.iter().step_by(2) {
            dirs.push((format!("{n}_horizon"), y, 0.0));
        }
        Self::from_directions(dirs, CUBE_FOV_DEG, size)
    }

    fn from_directions(
        dirs: impl IntoIterator<Item = (String, f64, f64)>,
        fov_deg: f64,
        size: u32,
    ) -> Result<Self, LayoutError> {
        let faces = dirs
            .into_iter()
            .map(|(name, yaw, pitch)| {
                match FaceOrientation::from_degrees(yaw, pitch, fov_deg, fov_deg, size, size) {
                    Ok(orientation) => Ok(FaceSpec { name, orientation }),
                    Err(source) => Err(LayoutError::Face { name, source }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(faces)
    }

    /// Load a layout from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, LayoutError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Parse a layout from a JSON string.
    pub fn from_json_str(data: &str) -> Result<Self, LayoutError> {
        let spec: FaceLayoutSpecV1 = serde_json::from_str(data)?;
        if spec.schema != LAYOUT_SCHEMA_V1 {
            return Err(LayoutError::Schema {
                found: spec.schema,
                expected: LAYOUT_SCHEMA_V1,
            });
        }
        let faces = spec
            .faces
            .into_iter()
            .map(|e| {
                match FaceOrientation::from_degrees(
                    e.yaw_deg,
                    e.pitch_deg,
                    e.fov_h_deg,
                    e.fov_v_deg,
                    e.width,
                    e.height,
                ) {
                    Ok(orientation) => Ok(FaceSpec {
                        name: e.name,
                        orientation,
                    }),
                    Err(source) => Err(LayoutError::Face {
                        name: e.name,
                        source,
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(faces)
    }

    /// Serialize to the `equiscan.layout.v1` JSON schema.
    pub fn to_json_string(&self) -> Result<String, LayoutError> {
        let spec = FaceLayoutSpecV1 {
            schema: LAYOUT_SCHEMA_V1.to_string(),
            faces: self
                .faces
                .iter()
                .map(|f| {
                    let o = &f.orientation;
                    FaceEntryV1 {
                        name: f.name.clone(),
                        yaw_deg: o.yaw0().to_degrees(),
                        pitch_deg: o.pitch0().to_degrees(),
                        fov_h_deg: o.fov_h().to_degrees(),
                        fov_v_deg: o.fov_v().to_degrees(),
                        width: o.width(),
                        height: o.height(),
                    }
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&spec)?)
    }

    /// Write the layout as JSON.
    pub fn write_json_file(&self, path: &Path) -> Result<(), LayoutError> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn faces(&self) -> &[FaceSpec] {
        &self.faces
    }

    /// Face by id.
    pub fn get(&self, face_id: usize) -> Option<&FaceSpec> {
        self.faces.get(face_id)
    }

    /// Orientation by id, as a [`ProjectionError::UnknownFace`] when absent.
    pub fn orientation(&self, face_id: usize) -> Result<&FaceOrientation, ProjectionError> {
        self.faces
            .get(face_id)
            .map(|f| &f.orientation)
            .ok_or(ProjectionError::UnknownFace {
                face_id,
                n_faces: self.faces.len(),
            })
    }

    /// Face id for a name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.faces.iter().position(|f| f.name == name)
    }

    /// Fraction of a regular yaw × pitch direction grid that lands on at
    /// least one face raster.
    pub fn coverage_fraction(&self, n_yaw: usize, n_pitch: usize) -> f64 {
        let n_yaw = n_yaw.max(1);
        let n_pitch = n_pitch.max(1);
        let mut covered = 0usize;
        for j in 0..n_pitch {
            let pitch = -std::f64::consts::FRAC_PI_2
                + std::f64::consts::PI * (j as f64 + 0.5) / n_pitch as f64;
            for i in 0..n_yaw {
                let yaw = -std::f64::consts::PI
                    + std::f64::consts::TAU * (i as f64 + 0.5) / n_yaw as f64;
                let world = sphere::angles_to_vector(SphericalAngles::new(yaw, pitch));
                let seen = self.faces.iter().any(|f| {
                    let local = f.orientation.rotation().inverse() * world;
                    sphere::vector_to_face_pixel(&local, &f.orientation)
                        .map(|xy| f.orientation.contains_face_pixel(xy))
                        .unwrap_or(false)
                });
                if seen {
                    covered += 1;
                }
            }
        }
        covered as f64 / (n_yaw * n_pitch) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn cube_covers_the_sphere() {
        let cube = FaceLayout::cube(64).unwrap();
        assert_eq!(cube.len(), 6);
        assert_eq!(cube.find("back"), Some(2));
        assert_abs_diff_eq!(cube.coverage_fraction(72, 36), 1.0);
    }

    #[test]
    fn horizon_ring_leaves_poles_uncovered() {
        let ring = FaceLayout::ring(4, 0.0, 90.0, 64).unwrap();
        assert_eq!(ring.faces()[1].name, "ring_yaw090");
        let c = ring.coverage_fraction(72, 36);
        assert!(c > 0.4 && c < 1.0, "coverage {c}");
    }

    #[test]
    fn tree_survey_has_thirteen_faces() {
        let l = FaceLayout::tree_survey(30.0, 32).unwrap();
        assert_eq!(l.len(), 13);
        assert_eq!(l.faces()[8].name, "zenith");
        assert_eq!(l.faces()[9].name, "north_horizon");
        assert_eq!(l.faces()[12].name, "west_horizon");
        assert_abs_diff_eq!(l.faces()[0].orientation.pitch0(), 30f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn grid_names_are_unique() {
        let l = FaceLayout::grid(&[0.0, 90.0], &[-15.0, 0.0, 15.0], 90.0, 16).unwrap();
        assert_eq!(l.len(), 6);
        assert_eq!(l.faces()[0].name, "survey_yaw000_pitch-15");
        assert_eq!(l.faces()[5].name, "survey_yaw090_pitch+15");
    }

    #[test]
    fn fractional_grid_angles_keep_distinct_names() {
        let l = FaceLayout::grid(&[0.2, 0.4], &[-2.5, 10.0], 60.0, 16).unwrap();
        let names: Vec<_> = l.faces().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "survey_yaw000.2_pitch-02.5",
                "survey_yaw000.4_pitch-02.5",
                "survey_yaw000.2_pitch+10",
                "survey_yaw000.4_pitch+10",
            ]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let o = FaceOrientation::from_degrees(0.0, 0.0, 90.0, 90.0, 8, 8).unwrap();
        let faces = vec![
            FaceSpec { name: "a".into(), orientation: o },
            FaceSpec { name: "a".into(), orientation: o },
        ];
        assert!(matches!(FaceLayout::new(faces), Err(LayoutError::DuplicateName(_))));
        assert!(matches!(FaceLayout::new(Vec::new()), Err(LayoutError::Empty)));
    }

    #[test]
    fn invalid_fov_names_the_face() {
        let err = FaceLayout::ring(3, 0.0, 180.0, 8).unwrap_err();
        match err {
            LayoutError::Face { name, source } => {
                assert_eq!(name, "ring_yaw000");
                assert!(matches!(source, ProjectionError::InvalidOrientation { .. }));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn json_roundtrip_preserves_faces() {
        let cube = FaceLayout::cube(128).unwrap();
        let json = cube.to_json_string().unwrap();
        let back = FaceLayout::from_json_str(&json).unwrap();
        assert_eq!(back.len(), cube.len());
        for (a, b) in cube.faces().iter().zip(back.faces()) {
            assert_eq!(a.name, b.name);
            assert_abs_diff_eq!(a.orientation.yaw0(), b.orientation.yaw0(), epsilon = 1e-9);
            assert_abs_diff_eq!(a.orientation.pitch0(), b.orientation.pitch0(), epsilon = 1e-9);
            assert_eq!(a.orientation.width(), b.orientation.width());
        }
    }

    #[test]
    fn json_schema_is_checked() {
        let bad = r#"{"schema": "other", "faces": []}"#;
        assert!(matches!(
            FaceLayout::from_json_str(bad),
            Err(LayoutError::Schema { .. })
        ));
        let unknown = r#"{"schema": "equiscan.layout.v1", "faces": [], "extra": 1}"#;
        assert!(matches!(
            FaceLayout::from_json_str(unknown),
            Err(LayoutError::Json(_))
        ));
    }

    #[test]
    fn default_face_size_is_quarter_width() {
        assert_eq!(default_face_size(4000), 1000);
        assert_eq!(default_face_size(2), 1);
    }
}
