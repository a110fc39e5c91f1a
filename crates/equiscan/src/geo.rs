//! Views aimed at a geographic target.
//!
//! The panorama's center column (yaw 0) faces the camera heading, a compass
//! bearing in degrees clockwise from north. Yaw grows eastward, so a target
//! at bearing `b` sits at yaw `b - heading`.

use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;
use crate::face::{self, FaceImage, FaceLayout, FaceOrientation, FaceSpec, LayoutError};
use crate::panorama::{Interpolation, Panorama};
use crate::sphere;

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Initial great-circle bearing towards `to`, degrees in `[0, 360)`.
    pub fn bearing_to(&self, to: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = to.lat.to_radians();
        let dlon = (to.lon - self.lon).to_radians();
        let x = dlon.sin() * lat2.cos();
        let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        let b = x.atan2(y).to_degrees().rem_euclid(360.0);
        if b >= 360.0 {
            0.0
        } else {
            b
        }
    }
}

/// Panorama yaw (radians) of a compass bearing, given the camera heading.
pub fn yaw_for_bearing(bearing_deg: f64, heading_deg: f64) -> f64 {
    sphere::normalize_yaw((bearing_deg - heading_deg).to_radians())
}

/// One view to render at a compass bearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearingView {
    pub name: String,
    pub bearing_deg: f64,
    pub pitch_deg: f64,
    /// Horizontal field of view; the vertical one follows from the aspect ratio.
    pub fov_deg: f64,
    pub width: u32,
    pub height: u32,
}

impl BearingView {
    /// Face orientation for this view under the given camera heading.
    pub fn orientation(&self, heading_deg: f64) -> Result<FaceOrientation, ProjectionError> {
        let fov_h = self.fov_deg.to_radians();
        let aspect = self.height as f64 / self.width.max(1) as f64;
        let fov_v = 2.0 * ((fov_h * 0.5).tan() * aspect).atan();
        FaceOrientation::new(
            yaw_for_bearing(self.bearing_deg, heading_deg),
            self.pitch_deg.to_radians(),
            fov_h,
            fov_v,
            self.width,
            self.height,
        )
    }

    /// Standard views of an object at `bearing_deg`: centered, zoomed,
    /// elevated, lowered and wide.
    pub fn survey(bearing_deg: f64, size: u32) -> Vec<BearingView> {
        let wide_h = (size as u64 * 9 / 16).max(1) as u32;
        let specs = [
            ("target_centered_fov90", 0.0, 90.0, size, size),
            ("target_zoom_fov60", 0.0, 60.0, size, size),
            ("target_elevated_pitch15", 15.0, 90.0, size, size),
            ("target_base_pitch-15", -15.0, 90.0, size, size),
            ("target_wide_fov120", 0.0, 120.0, size, wide_h),
        ];
        specs
            .iter()
            .map(|&(name, pitch_deg, fov_deg, width, height)| BearingView {
                name: name.to_string(),
                bearing_deg,
                pitch_deg,
                fov_deg,
                width,
                height,
            })
            .collect()
    }
}

/// Layout with one face per view.
pub fn bearing_layout(views: &[BearingView], heading_deg: f64) -> Result<FaceLayout, LayoutError> {
    let faces = views
        .iter()
        .map(|v| match v.orientation(heading_deg) {
            Ok(orientation) => Ok(FaceSpec {
                name: v.name.clone(),
                orientation,
            }),
            Err(source) => Err(LayoutError::Face {
                name: v.name.clone(),
                source,
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    FaceLayout::new(faces)
}

/// Render the standard survey views of an object at `bearing_deg`.
pub fn render_survey(
    panorama: &Panorama,
    bearing_deg: f64,
    heading_deg: f64,
    size: u32,
    interpolation: Interpolation,
) -> Result<Vec<FaceImage>, LayoutError> {
    let layout = bearing_layout(&BearingView::survey(bearing_deg, size), heading_deg)?;
    tracing::info!(
        "rendering {} survey views at bearing {:.2} deg",
        layout.len(),
        bearing_deg
    );
    Ok(face::render_faces(panorama, &layout, interpolation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::SphericalAngles;
    use crate::test_utils::{target_panorama, TARGET};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn cardinal_bearings() {
        let o = GeoPoint::new(0.0, 0.0);
        assert_abs_diff_eq!(o.bearing_to(&GeoPoint::new(1.0, 0.0)), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(o.bearing_to(&GeoPoint::new(0.0, 1.0)), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(o.bearing_to(&GeoPoint::new(-1.0, 0.0)), 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(o.bearing_to(&GeoPoint::new(0.0, -1.0)), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn bearing_is_relative_to_heading() {
        assert_abs_diff_eq!(yaw_for_bearing(90.0, 90.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(yaw_for_bearing(10.0, 280.0), FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(yaw_for_bearing(0.0, 90.0), -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn wide_view_keeps_square_pixels() {
        let v = BearingView {
            name: "wide".into(),
            bearing_deg: 0.0,
            pitch_deg: 0.0,
            fov_deg: 120.0,
            width: 1280,
            height: 720,
        };
        let o = v.orientation(0.0).unwrap();
        let (th, tv) = o.half_fov_tangents();
        assert_abs_diff_eq!(th / 1280.0, tv / 720.0, epsilon = 1e-12);
    }

    #[test]
    fn survey_builds_a_layout() {
        let views = BearingView::survey(196.84, 256);
        let layout = bearing_layout(&views, 196.84).unwrap();
        assert_eq!(layout.len(), 5);
        let centered = layout.get(0).unwrap();
        assert_abs_diff_eq!(centered.orientation.yaw0(), 0.0, epsilon = 1e-12);
        assert_eq!(layout.get(4).unwrap().orientation.height(), 144);
    }

    #[test]
    fn survey_views_look_at_the_target() {
        let pano = target_panorama(400, 200, SphericalAngles::new(0.0, 0.0), 6.0);
        let faces = render_survey(&pano, 120.0, 120.0, 64, Interpolation::Nearest).unwrap();
        let names: Vec<_> = faces.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "target_centered_fov90",
                "target_zoom_fov60",
                "target_elevated_pitch15",
                "target_base_pitch-15",
                "target_wide_fov120",
            ]
        );
        for f in &faces[..2] {
            assert_eq!(*f.image.get_pixel(32, 32), TARGET, "{}", f.name);
        }
        assert_eq!(faces[4].image.dimensions(), (64, 36));
    }
}
