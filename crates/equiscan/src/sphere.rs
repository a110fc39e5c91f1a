//! Spherical geometry kernel.
//!
//! Conversions between three coordinate systems:
//!
//! - **panorama pixels** `(x, y)` of a `W × H` equirectangular image, with
//!   `x` growing east (increasing yaw) and `y` growing down;
//! - **spherical angles** `(yaw, pitch)` in radians, yaw in `[-π, π)`, pitch in
//!   `[-π/2, π/2]` (positive looks up);
//! - **unit vectors** with `+z` forward (yaw = pitch = 0), `+y` up, `+x` right:
//!   `x = cos(pitch)·sin(yaw)`, `y = sin(pitch)`, `z = cos(pitch)·cos(yaw)`.
//!
//! Faces are rectilinear cameras. A face frame is obtained from the world
//! frame by a pitch rotation about `+x` (tilting `+z` up by `pitch0`),
//! followed by a yaw rotation about `+y` by `yaw0`. [`rotate_from_face`]
//! applies `R_yaw · R_pitch`; [`rotate_to_face`] applies its transpose.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;
use crate::face::FaceOrientation;

/// Spherical direction in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphericalAngles {
    /// Longitude, `[-π, π)` once normalized.
    pub yaw: f64,
    /// Latitude, `[-π/2, π/2]`; positive is up.
    pub pitch: f64,
}

impl SphericalAngles {
    pub fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }

    /// Build from degrees.
    pub fn from_degrees(yaw_deg: f64, pitch_deg: f64) -> Self {
        Self::new(yaw_deg.to_radians(), pitch_deg.to_radians())
    }

    /// `[yaw, pitch]` in degrees.
    pub fn to_degrees(self) -> [f64; 2] {
        [self.yaw.to_degrees(), self.pitch.to_degrees()]
    }
}

/// Continuous panorama pixel coordinate.
///
/// Produced by [`angles_to_pixel`], so `x ∈ [0, W)` and `y ∈ [0, H)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanoramaPoint {
    pub x: f64,
    pub y: f64,
}

impl PanoramaPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Integer pixel containing this point (column wrapped, row clamped).
    pub fn pixel(self, width: u32, height: u32) -> [u32; 2] {
        let col = (self.x.floor() as i64).rem_euclid(width.max(1) as i64) as u32;
        let row = (self.y.floor().max(0.0) as u32).min(height.saturating_sub(1));
        [col, row]
    }

    /// Verify `[0, W) × [0, H)`; a failure is a logic defect upstream.
    pub fn check_bounds(self, width: u32, height: u32) -> Result<Self, ProjectionError> {
        let inside = self.x >= 0.0
            && self.x < width as f64
            && self.y >= 0.0
            && self.y < height as f64;
        if inside {
            Ok(self)
        } else {
            Err(ProjectionError::OutOfBounds {
                x: self.x,
                y: self.y,
                width,
                height,
            })
        }
    }
}

/// Largest `f64` strictly below a positive finite `limit`.
#[inline]
fn just_below(limit: f64) -> f64 {
    f64::from_bits(limit.to_bits() - 1)
}

/// Wrap a yaw angle into `[-π, π)`.
#[inline]
pub fn normalize_yaw(yaw: f64) -> f64 {
    let mut u = (yaw + PI).rem_euclid(TAU);
    // rem_euclid may round up to exactly TAU
    if u >= TAU {
        u = 0.0;
    }
    u - PI
}

/// Shortest signed angular difference `b - a`, in `[-π, π)`.
#[inline]
pub fn yaw_delta(a: f64, b: f64) -> f64 {
    normalize_yaw(b - a)
}

fn check_dims(width: u32, height: u32) -> Result<(), ProjectionError> {
    if width == 0 || height == 0 {
        return Err(ProjectionError::InvalidPanorama { width, height });
    }
    Ok(())
}

/// Map a panorama pixel coordinate to spherical angles.
///
/// Defined for `x ∈ [0, W)`, `y ∈ [0, H)`; anything else is rejected.
pub fn pixel_to_angles(
    x: f64,
    y: f64,
    width: u32,
    height: u32,
) -> Result<SphericalAngles, ProjectionError> {
    check_dims(width, height)?;
    if !x.is_finite() || x < 0.0 || x >= width as f64 {
        return Err(ProjectionError::OutOfDomain { what: "x", value: x });
    }
    if !y.is_finite() || y < 0.0 || y >= height as f64 {
        return Err(ProjectionError::OutOfDomain { what: "y", value: y });
    }
    Ok(SphericalAngles {
        yaw: (x / width as f64) * TAU - PI,
        pitch: FRAC_PI_2 - (y / height as f64) * PI,
    })
}

/// Map spherical angles to a panorama pixel coordinate.
///
/// Yaw wraps around the seam; pitch is clamped to the poles. The result is
/// always inside `[0, W) × [0, H)`. Non-finite angles are rejected.
pub fn angles_to_pixel(
    angles: SphericalAngles,
    width: u32,
    height: u32,
) -> Result<PanoramaPoint, ProjectionError> {
    check_dims(width, height)?;
    if !angles.yaw.is_finite() {
        return Err(ProjectionError::OutOfDomain {
            what: "yaw",
            value: angles.yaw,
        });
    }
    if !angles.pitch.is_finite() {
        return Err(ProjectionError::OutOfDomain {
            what: "pitch",
            value: angles.pitch,
        });
    }
    let w = width as f64;
    let h = height as f64;

    let mut u = (angles.yaw + PI).rem_euclid(TAU);
    if u >= TAU {
        u = 0.0;
    }
    let mut x = u / TAU * w;
    if x >= w {
        x = 0.0;
    }

    let pitch = angles.pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
    let mut y = (FRAC_PI_2 - pitch) / PI * h;
    if y >= h {
        y = just_below(h);
    }
    Ok(PanoramaPoint { x, y: y.max(0.0) })
}

/// Unit vector for a spherical direction.
pub fn angles_to_vector(angles: SphericalAngles) -> Vector3<f64> {
    let (sy, cy) = angles.yaw.sin_cos();
    let (sp, cp) = angles.pitch.sin_cos();
    Vector3::new(cp * sy, sp, cp * cy)
}

/// Spherical direction of a (not necessarily unit) vector.
///
/// The zero vector maps to `(0, 0)`.
pub fn vector_to_angles(v: &Vector3<f64>) -> SphericalAngles {
    let horizontal = (v.x * v.x + v.z * v.z).sqrt();
    SphericalAngles {
        yaw: normalize_yaw(v.x.atan2(v.z)),
        pitch: v.y.atan2(horizontal),
    }
}

/// Face-to-world rotation `R_yaw(yaw0) · R_pitch(pitch0)`.
pub fn face_rotation(yaw0: f64, pitch0: f64) -> Rotation3<f64> {
    // Right-handed rotation about +x by -pitch0 tilts +z towards +y.
    let pitch = Rotation3::from_axis_angle(&Vector3::x_axis(), -pitch0);
    let yaw = Rotation3::from_axis_angle(&Vector3::y_axis(), yaw0);
    yaw * pitch
}

/// Rotate a world-space vector into the frame of a face looking at `(yaw0, pitch0)`.
pub fn rotate_to_face(v: &Vector3<f64>, yaw0: f64, pitch0: f64) -> Vector3<f64> {
    face_rotation(yaw0, pitch0).inverse() * v
}

/// Rotate a face-local vector back to world space. Inverse of [`rotate_to_face`].
pub fn rotate_from_face(v: &Vector3<f64>, yaw0: f64, pitch0: f64) -> Vector3<f64> {
    face_rotation(yaw0, pitch0) * v
}

/// Gnomonic projection of a face-local direction to face pixel coordinates.
///
/// The optical axis hits `(face_width / 2, face_height / 2)`. The returned
/// point may fall outside the face raster when the direction is outside the
/// field of view; directions with `z <= 0` are [`ProjectionError::NotVisible`].
pub fn vector_to_face_pixel(
    v_local: &Vector3<f64>,
    orientation: &FaceOrientation,
) -> Result<[f64; 2], ProjectionError> {
    if v_local.z.is_nan() || v_local.z <= 0.0 {
        return Err(ProjectionError::NotVisible { z: v_local.z });
    }
    let (tan_h, tan_v) = orientation.half_fov_tangents();
    let nx = v_local.x / v_local.z / tan_h;
    let ny = v_local.y / v_local.z / tan_v;
    let w = orientation.width() as f64;
    let h = orientation.height() as f64;
    Ok([(nx + 1.0) * 0.5 * w, (1.0 - ny) * 0.5 * h])
}

/// Inverse of [`vector_to_face_pixel`]: the unit direction seen at face pixel `(fx, fy)`.
pub fn face_pixel_to_vector(
    fx: f64,
    fy: f64,
    orientation: &FaceOrientation,
) -> Result<Vector3<f64>, ProjectionError> {
    if !fx.is_finite() {
        return Err(ProjectionError::OutOfDomain { what: "fx", value: fx });
    }
    if !fy.is_finite() {
        return Err(ProjectionError::OutOfDomain { what: "fy", value: fy });
    }
    let (tan_h, tan_v) = orientation.half_fov_tangents();
    let a = 2.0 * fx / orientation.width() as f64 - 1.0;
    let b = 1.0 - 2.0 * fy / orientation.height() as f64;
    Ok(Vector3::new(a * tan_h, b * tan_v, 1.0).normalize())
}

/// Full inverse chain: face pixel → panorama pixel.
pub fn face_pixel_to_panorama(
    face_xy: [f64; 2],
    orientation: &FaceOrientation,
    width: u32,
    height: u32,
) -> Result<PanoramaPoint, ProjectionError> {
    let local = face_pixel_to_vector(face_xy[0], face_xy[1], orientation)?;
    let world = orientation.rotation() * local;
    angles_to_pixel(vector_to_angles(&world), width, height)
}

/// Full forward chain: panorama pixel → face pixel.
///
/// Fails with [`ProjectionError::NotVisible`] when the direction lies behind
/// the face camera. The result may lie outside the face raster.
pub fn panorama_to_face_pixel(
    point: PanoramaPoint,
    orientation: &FaceOrientation,
    width: u32,
    height: u32,
) -> Result<[f64; 2], ProjectionError> {
    let angles = pixel_to_angles(point.x, point.y, width, height)?;
    let world = angles_to_vector(angles);
    let local = orientation.rotation().inverse() * world;
    vector_to_face_pixel(&local, orientation)
}
