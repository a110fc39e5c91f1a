//! Face detections mapped back into panorama coordinates.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;
use crate::face::{FaceLayout, FaceOrientation};
use crate::region::AngularExtent;
use crate::sphere::{self, PanoramaPoint, SphericalAngles};

/// Axis-aligned box in face pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// From `[x_min, y_min, x_max, y_max]`.
    pub fn from_array(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> [f64; 2] {
        [
            0.5 * (self.x_min + self.x_max),
            0.5 * (self.y_min + self.y_max),
        ]
    }

    /// Corners clockwise from top-left.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        [
            [self.x_min, self.y_min],
            [self.x_max, self.y_min],
            [self.x_max, self.y_max],
            [self.x_min, self.y_max],
        ]
    }

    /// `points_per_side` samples along each side, clockwise from top-left,
    /// each side excluding its end corner.
    pub fn perimeter(&self, points_per_side: usize) -> Vec<[f64; 2]> {
        let n = points_per_side.max(1);
        let c = self.corners();
        let mut out = Vec::with_capacity(4 * n);
        for k in 0..4 {
            let a = c[k];
            let b = c[(k + 1) % 4];
            for i in 0..n {
                let t = i as f64 / n as f64;
                out.push([a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])]);
            }
        }
        out
    }

    /// Check well-formedness against the face the box was detected on.
    pub fn validate(&self, orientation: &FaceOrientation) -> Result<(), ProjectionError> {
        let fail = |reason: &str| ProjectionError::InvalidBoundingBox {
            x_min: self.x_min,
            y_min: self.y_min,
            x_max: self.x_max,
            y_max: self.y_max,
            reason: reason.to_string(),
        };
        if !self.to_array().iter().all(|v| v.is_finite()) {
            return Err(fail("non-finite coordinate"));
        }
        if self.x_min >= self.x_max || self.y_min >= self.y_max {
            return Err(fail("empty or inverted box"));
        }
        let w = orientation.width() as f64;
        let h = orientation.height() as f64;
        if self.x_min < 0.0 || self.y_min < 0.0 || self.x_max > w || self.y_max > h {
            return Err(fail("outside the face raster"));
        }
        Ok(())
    }

    /// Angular half-extent of the box, assuming uniform angular pixel pitch
    /// across the face.
    pub fn angular_extent(&self, orientation: &FaceOrientation) -> AngularExtent {
        let [rad_x, rad_y] = orientation.radians_per_pixel();
        AngularExtent::new(0.5 * self.width() * rad_x, 0.5 * self.height() * rad_y)
    }
}

/// One detector output on one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Index of the face in the layout.
    pub face_id: usize,
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub label: String,
    pub confidence: f32,
}

/// A detection expressed in panorama space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackProjection {
    /// Bbox center in panorama pixels.
    pub center: PanoramaPoint,
    /// Bbox center direction.
    pub center_angles: SphericalAngles,
    /// Bbox corners, clockwise from top-left. May straddle the seam.
    pub corners: [PanoramaPoint; 4],
    /// Angular half-extent estimated from the box size.
    pub extent: AngularExtent,
}

fn face_direction(
    face_xy: [f64; 2],
    orientation: &FaceOrientation,
) -> Result<SphericalAngles, ProjectionError> {
    let local = sphere::face_pixel_to_vector(face_xy[0], face_xy[1], orientation)?;
    Ok(sphere::vector_to_angles(&(orientation.rotation() * local)))
}

/// Map one face point to panorama pixels.
///
/// `x` is normalized into `[0, W)`, `y` clamped into `[0, H)`.
pub fn back_project_point(
    face_xy: [f64; 2],
    orientation: &FaceOrientation,
    width: u32,
    height: u32,
) -> Result<PanoramaPoint, ProjectionError> {
    sphere::face_pixel_to_panorama(face_xy, orientation, width, height)?.check_bounds(width, height)
}

/// Back-project the center and corners of a detection.
pub fn back_project(
    detection: &Detection,
    layout: &FaceLayout,
    width: u32,
    height: u32,
) -> Result<BackProjection, ProjectionError> {
    let orientation = layout.orientation(detection.face_id)?;
    let bbox = &detection.bbox;
    bbox.validate(orientation)?;

    let center_angles = face_direction(bbox.center(), orientation)?;
    let center = sphere::angles_to_pixel(center_angles, width, height)?.check_bounds(width, height)?;
    let c = bbox.corners();
    let corners = [
        back_project_point(c[0], orientation, width, height)?,
        back_project_point(c[1], orientation, width, height)?,
        back_project_point(c[2], orientation, width, height)?,
        back_project_point(c[3], orientation, width, height)?,
    ];
    Ok(BackProjection {
        center,
        center_angles,
        corners,
        extent: bbox.angular_extent(orientation),
    })
}

/// Back-project points sampled along the bbox perimeter, for outline drawing.
pub fn back_project_outline(
    detection: &Detection,
    layout: &FaceLayout,
    width: u32,
    height: u32,
    points_per_side: usize,
) -> Result<Vec<PanoramaPoint>, ProjectionError> {
    let orientation = layout.orientation(detection.face_id)?;
    detection.bbox.validate(orientation)?;
    detection
        .bbox
        .perimeter(points_per_side)
        .into_iter()
        .map(|p| back_project_point(p, orientation, width, height))
        .collect()
}

/// Back-project many detections in parallel; results keep input order.
pub fn back_project_all(
    detections: &[Detection],
    layout: &FaceLayout,
    width: u32,
    height: u32,
) -> Vec<Result<BackProjection, ProjectionError>> {
    detections
        .par_iter()
        .map(|d| back_project(d, layout, width, height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn det(face_id: usize, bbox: [f64; 4]) -> Detection {
        Detection {
            face_id,
            bbox: BoundingBox::from_array(bbox),
            class_id: 3,
            label: "arbol".to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn centered_box_on_front_face_maps_to_panorama_center() {
        let layout = FaceLayout::cube(1000).unwrap();
        let bp = back_project(&det(0, [450.0, 450.0, 550.0, 550.0]), &layout, 4000, 2000).unwrap();
        assert_eq!(bp.center.x, 2000.0);
        assert_eq!(bp.center.y, 1000.0);
        assert_abs_diff_eq!(bp.center_angles.yaw, 0.0, epsilon = 1e-12);
        // 100 px of a 90 deg / 1000 px face
        assert_abs_diff_eq!(bp.extent.half_yaw, 4.5f64.to_radians(), epsilon = 1e-12);
        assert!(bp.corners[0].x < 2000.0 && bp.corners[0].y < 1000.0);
        assert!(bp.corners[2].x > 2000.0 && bp.corners[2].y > 1000.0);
    }

    #[test]
    fn left_edge_point_maps_west() {
        let layout = FaceLayout::cube(1000).unwrap();
        let o = layout.orientation(0).unwrap();
        let p = back_project_point([0.0, 500.0], o, 4000, 2000).unwrap();
        assert!(p.x < 2000.0);
        assert_abs_diff_eq!(p.y, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn back_face_corners_straddle_the_seam() {
        let layout = FaceLayout::cube(100).unwrap();
        let bp = back_project(&det(2, [30.0, 40.0, 70.0, 60.0]), &layout, 4000, 2000).unwrap();
        assert!(bp.corners[0].x > 3500.0, "{:?}", bp.corners[0]);
        assert!(bp.corners[1].x < 500.0, "{:?}", bp.corners[1]);
        assert!(bp.center.x < 1.0 || bp.center.x > 3999.0);
    }

    #[test]
    fn invalid_boxes_are_rejected() {
        let layout = FaceLayout::cube(100).unwrap();
        for b in [
            [10.0, 10.0, 10.0, 20.0],
            [10.0, 30.0, 20.0, 20.0],
            [-1.0, 10.0, 20.0, 20.0],
            [10.0, 10.0, 101.0, 20.0],
            [f64::NAN, 10.0, 20.0, 20.0],
        ] {
            let err = back_project(&det(0, b), &layout, 400, 200).unwrap_err();
            assert!(matches!(err, ProjectionError::InvalidBoundingBox { .. }), "{b:?}");
        }
    }

    #[test]
    fn unknown_face_is_rejected() {
        let layout = FaceLayout::cube(100).unwrap();
        let err = back_project(&det(6, [1.0, 1.0, 2.0, 2.0]), &layout, 400, 200).unwrap_err();
        assert_eq!(err, ProjectionError::UnknownFace { face_id: 6, n_faces: 6 });
    }

    #[test]
    fn zenith_box_maps_to_top_rows() {
        let layout = FaceLayout::cube(100).unwrap();
        let bp = back_project(&det(4, [45.0, 45.0, 55.0, 55.0]), &layout, 400, 200).unwrap();
        assert!(bp.center.y < 1.0, "{:?}", bp.center);
        // corners sit about 8 deg from the pole
        for c in &bp.corners {
            assert!(c.y < 10.0, "{c:?}");
        }
    }

    #[test]
    fn perimeter_samples_every_side() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 20.0);
        let pts = b.perimeter(5);
        assert_eq!(pts.len(), 20);
        assert_eq!(pts[0], [0.0, 0.0]);
        assert_eq!(pts[5], [10.0, 0.0]);
        assert_eq!(pts[10], [10.0, 20.0]);
        assert_eq!(pts[15], [0.0, 20.0]);

        let layout = FaceLayout::cube(100).unwrap();
        let d = det(1, [20.0, 20.0, 80.0, 80.0]);
        let outline = back_project_outline(&d, &layout, 400, 200, 5).unwrap();
        assert_eq!(outline.len(), 20);
    }

    #[test]
    fn batch_keeps_order_and_per_item_errors() {
        let layout = FaceLayout::cube(100).unwrap();
        let dets = vec![
            det(0, [40.0, 40.0, 60.0, 60.0]),
            det(9, [40.0, 40.0, 60.0, 60.0]),
            det(1, [40.0, 40.0, 60.0, 60.0]),
        ];
        let out = back_project_all(&dets, &layout, 400, 200);
        assert_eq!(out.len(), 3);
        assert_abs_diff_eq!(out[0].as_ref().unwrap().center.x, 200.0, epsilon = 1e-9);
        assert!(out[1].is_err());
        assert_abs_diff_eq!(out[2].as_ref().unwrap().center.x, 300.0, epsilon = 1e-6);
    }
}
