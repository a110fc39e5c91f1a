//! Rectilinear face rendering from an equirectangular panorama.

use image::RgbImage;
use nalgebra::Vector3;
use rayon::prelude::*;

use super::{FaceLayout, FaceOrientation};
use crate::panorama::{Interpolation, Panorama};
use crate::sphere;

/// One rendered face.
#[derive(Debug, Clone)]
pub struct FaceImage {
    /// Index of the face in its layout.
    pub face_id: usize,
    pub name: String,
    pub orientation: FaceOrientation,
    pub image: RgbImage,
}

/// Render one face.
///
/// Face pixel `(i, j)` shows the direction through its center
/// `(i + 0.5, j + 0.5)`. Rows are filled in parallel.
pub fn render_face(
    panorama: &Panorama,
    orientation: &FaceOrientation,
    interpolation: Interpolation,
) -> RgbImage {
    let fw = orientation.width();
    let fh = orientation.height();
    let (pw, ph) = panorama.dimensions();
    let (tan_h, tan_v) = orientation.half_fov_tangents();
    let rot = *orientation.rotation();
    let w = fw as f64;
    let h = fh as f64;

    let mut out = RgbImage::new(fw, fh);
    let stride = fw as usize * 3;
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(j, row)| {
            let b = (1.0 - 2.0 * (j as f64 + 0.5) / h) * tan_v;
            for (i, px) in row.chunks_exact_mut(3).enumerate() {
                let a = (2.0 * (i as f64 + 0.5) / w - 1.0) * tan_h;
                let world = rot * Vector3::new(a, b, 1.0);
                let angles = sphere::vector_to_angles(&world);
                // finite by construction; a failure leaves the pixel black
                let Ok(p) = sphere::angles_to_pixel(angles, pw, ph) else {
                    continue;
                };
                px.copy_from_slice(&panorama.sample(p, interpolation).0);
            }
        });
    out
}

/// Render every face of a layout, in layout order.
pub fn render_faces(
    panorama: &Panorama,
    layout: &FaceLayout,
    interpolation: Interpolation,
) -> Vec<FaceImage> {
    let (pw, ph) = panorama.dimensions();
    tracing::info!(
        "rendering {} faces from {}x{} panorama ({:?})",
        layout.len(),
        pw,
        ph,
        interpolation
    );
    let faces: Vec<FaceImage> = layout
        .faces()
        .par_iter()
        .enumerate()
        .map(|(face_id, spec)| {
            let image = render_face(panorama, &spec.orientation, interpolation);
            tracing::debug!(
                "face {} '{}' rendered at {}x{}",
                face_id,
                spec.name,
                image.width(),
                image.height()
            );
            FaceImage {
                face_id,
                name: spec.name.clone(),
                orientation: spec.orientation,
                image,
            }
        })
        .collect();
    faces
}
