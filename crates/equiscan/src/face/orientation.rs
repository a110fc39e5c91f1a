use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::Rotation3;
use serde::Serialize;

use crate::error::ProjectionError;
use crate::sphere::{self, SphericalAngles};

/// Optical axis, field of view and raster size of one rectilinear face.
///
/// Immutable once constructed; [`FaceOrientation::new`] is the only way in
/// and it rejects malformed values, so every instance is valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceOrientation {
    yaw0: f64,
    pitch0: f64,
    fov_h: f64,
    fov_v: f64,
    width: u32,
    height: u32,
    #[serde(skip)]
    rotation: Rotation3<f64>,
    #[serde(skip)]
    tan_half: (f64, f64),
}

impl FaceOrientation {
    /// Validate and build an orientation. Angles are in radians.
    ///
    /// Rejects non-finite angles, pitch outside `[-π/2, π/2]`, a field of
    /// view outside `(0, π)` and zero resolution.
    pub fn new(
        yaw0: f64,
        pitch0: f64,
        fov_h: f64,
        fov_v: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, ProjectionError> {
        if !yaw0.is_finite() || !pitch0.is_finite() {
            return Err(ProjectionError::orientation(format!(
                "non-finite optical axis (yaw0 = {yaw0}, pitch0 = {pitch0})"
            )));
        }
        // degree conversions can overshoot the pole by an ulp
        let pitch0 = if pitch0.abs() > FRAC_PI_2 && pitch0.abs() <= FRAC_PI_2 + 1e-9 {
            FRAC_PI_2.copysign(pitch0)
        } else {
            pitch0
        };
        if !(-FRAC_PI_2..=FRAC_PI_2).contains(&pitch0) {
            return Err(ProjectionError::orientation(format!(
                "pitch0 = {pitch0} outside [-pi/2, pi/2]"
            )));
        }
        for (name, fov) in [("fov_h", fov_h), ("fov_v", fov_v)] {
            if !fov.is_finite() || fov <= 0.0 || fov >= PI {
                return Err(ProjectionError::orientation(format!(
                    "{name} = {fov} outside (0, pi)"
                )));
            }
        }
        if width == 0 || height == 0 {
            return Err(ProjectionError::orientation(format!(
                "resolution {width}x{height} is empty"
            )));
        }
        let yaw0 = sphere::normalize_yaw(yaw0);
        Ok(Self {
            yaw0,
            pitch0,
            fov_h,
            fov_v,
            width,
            height,
            rotation: sphere::face_rotation(yaw0, pitch0),
            tan_half: ((fov_h * 0.5).tan(), (fov_v * 0.5).tan()),
        })
    }

    /// Same as [`FaceOrientation::new`] with all angles in degrees.
    pub fn from_degrees(
        yaw0_deg: f64,
        pitch0_deg: f64,
        fov_h_deg: f64,
        fov_v_deg: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, ProjectionError> {
        Self::new(
            yaw0_deg.to_radians(),
            pitch0_deg.to_radians(),
            fov_h_deg.to_radians(),
            fov_v_deg.to_radians(),
            width,
            height,
        )
    }

    /// Square face with equal horizontal and vertical field of view.
    pub fn square(yaw0: f64, pitch0: f64, fov: f64, size: u32) -> Result<Self, ProjectionError> {
        Self::new(yaw0, pitch0, fov, fov, size, size)
    }

    pub fn yaw0(&self) -> f64 {
        self.yaw0
    }

    pub fn pitch0(&self) -> f64 {
        self.pitch0
    }

    pub fn fov_h(&self) -> f64 {
        self.fov_h
    }

    pub fn fov_v(&self) -> f64 {
        self.fov_v
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Direction of the optical axis.
    pub fn axis(&self) -> SphericalAngles {
        SphericalAngles::new(self.yaw0, self.pitch0)
    }

    /// Face-to-world rotation.
    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }

    /// `(tan(fov_h / 2), tan(fov_v / 2))`.
    #[inline]
    pub fn half_fov_tangents(&self) -> (f64, f64) {
        self.tan_half
    }

    /// Nominal angular size of one face pixel, `[rad/px horizontally, rad/px vertically]`.
    pub fn radians_per_pixel(&self) -> [f64; 2] {
        [
            self.fov_h / self.width as f64,
            self.fov_v / self.height as f64,
        ]
    }

    /// Whether a continuous face coordinate lies on the raster `[0, W] × [0, H]`.
    pub fn contains_face_pixel(&self, xy: [f64; 2]) -> bool {
        xy[0] >= 0.0 && xy[0] <= self.width as f64 && xy[1] >= 0.0 && xy[1] <= self.height as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rejects_bad_fov() {
        for fov in [0.0, -0.1, PI, 4.0, f64::NAN] {
            let err = FaceOrientation::new(0.0, 0.0, fov, 1.0, 10, 10).unwrap_err();
            assert!(matches!(err, ProjectionError::InvalidOrientation { .. }));
            let err = FaceOrientation::new(0.0, 0.0, 1.0, fov, 10, 10).unwrap_err();
            assert!(matches!(err, ProjectionError::InvalidOrientation { .. }));
        }
    }

    #[test]
    fn rejects_bad_axis_and_resolution() {
        assert!(FaceOrientation::new(f64::INFINITY, 0.0, 1.0, 1.0, 10, 10).is_err());
        assert!(FaceOrientation::new(0.0, 1.6, 1.0, 1.0, 10, 10).is_err());
        assert!(FaceOrientation::new(0.0, 0.0, 1.0, 1.0, 0, 10).is_err());
        assert!(FaceOrientation::new(0.0, 0.0, 1.0, 1.0, 10, 0).is_err());
    }

    #[test]
    fn poles_are_valid_axes() {
        assert!(FaceOrientation::new(0.0, FRAC_PI_2, 1.0, 1.0, 10, 10).is_ok());
        assert!(FaceOrientation::new(0.0, -FRAC_PI_2, 1.0, 1.0, 10, 10).is_ok());
    }

    #[test]
    fn yaw_is_normalized() {
        let f = FaceOrientation::from_degrees(270.0, 0.0, 90.0, 90.0, 8, 8).unwrap();
        assert_abs_diff_eq!(f.yaw0(), -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn contains_face_pixel_includes_edges() {
        let f = FaceOrientation::from_degrees(0.0, 0.0, 90.0, 60.0, 100, 50).unwrap();
        assert!(f.contains_face_pixel([0.0, 0.0]));
        assert!(f.contains_face_pixel([100.0, 50.0]));
        assert!(!f.contains_face_pixel([100.1, 10.0]));
        assert!(!f.contains_face_pixel([10.0, -0.1]));
    }
}
