//! Markers and outlines drawn onto a copy of the panorama.
//!
//! Everything here wraps horizontally across the seam and clips vertically
//! at the poles. Disks use the pixel-center convention: pixel `(c, r)` is
//! painted when `(c + 0.5, r + 0.5)` lies within the radius.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use serde::{Deserialize, Serialize};

use crate::panorama::Panorama;
use crate::sphere::PanoramaPoint;

/// Appearance of detection markers and outlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    /// Radius of the class-coloured disk, in pixels.
    pub radius: f64,
    /// Width of the black ring around the disk.
    pub border: f64,
    /// Radius of the white center dot; 0 disables it.
    pub center_dot: f64,
    /// Outline stroke width in pixels.
    pub outline_width: u32,
    /// Class colours, indexed by `class_id % len`.
    pub palette: Vec<[u8; 3]>,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 8.0,
            border: 1.0,
            center_dot: 2.0,
            outline_width: 3,
            palette: vec![
                [255, 0, 0],
                [0, 255, 0],
                [0, 0, 255],
                [255, 255, 0],
                [255, 0, 255],
                [0, 255, 255],
            ],
        }
    }
}

impl MarkerStyle {
    /// Colour for a class id.
    pub fn color_for(&self, class_id: u32) -> Rgb<u8> {
        if self.palette.is_empty() {
            return Rgb([255, 0, 0]);
        }
        Rgb(self.palette[class_id as usize % self.palette.len()])
    }
}

/// One located object to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub center: PanoramaPoint,
    pub class_id: u32,
    /// Back-projected bbox perimeter, drawn as a closed polygon when non-empty.
    pub outline: Vec<PanoramaPoint>,
}

/// Fill a disk of `radius` pixels around `center`.
pub fn draw_disk(image: &mut RgbImage, center: PanoramaPoint, radius: f64, color: Rgb<u8>) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || !radius.is_finite() || radius <= 0.0 {
        return;
    }
    let r2 = radius * radius;
    let c0 = (center.x - radius - 0.5).floor() as i64;
    let c1 = (center.x + radius - 0.5).ceil() as i64;
    let r0 = ((center.y - radius - 0.5).floor() as i64).max(0);
    let r1 = ((center.y + radius - 0.5).ceil() as i64).min(h as i64 - 1);
    for row in r0..=r1 {
        let dy = row as f64 + 0.5 - center.y;
        for col in c0..=c1 {
            let dx = col as f64 + 0.5 - center.x;
            if dx * dx + dy * dy <= r2 {
                let x = col.rem_euclid(w as i64) as u32;
                image.put_pixel(x, row as u32, color);
            }
        }
    }
}

/// Draw a layered marker: black border, class-coloured disk, white center dot.
pub fn draw_marker(image: &mut RgbImage, center: PanoramaPoint, class_id: u32, style: &MarkerStyle) {
    if style.border > 0.0 {
        draw_disk(image, center, style.radius + style.border, Rgb([0, 0, 0]));
    }
    draw_disk(image, center, style.radius, style.color_for(class_id));
    if style.center_dot > 0.0 {
        draw_disk(image, center, style.center_dot, Rgb([255, 255, 255]));
    }
}

fn draw_thick_segment(image: &mut RgbImage, a: (f32, f32), b: (f32, f32), width: u32, color: Rgb<u8>) {
    let half = (width.max(1) as i32 - 1) / 2;
    for k in -half..=(width.max(1) as i32 - 1 - half) {
        let o = k as f32;
        draw_line_segment_mut(image, (a.0 + o, a.1), (b.0 + o, b.1), color);
        draw_line_segment_mut(image, (a.0, a.1 + o), (b.0, b.1 + o), color);
    }
}

/// Draw a closed polygon through panorama points.
///
/// An edge whose endpoints are more than half the width apart is taken to
/// cross the seam; it is drawn twice, once unwrapped past each image edge,
/// and the canvas clips the excess.
pub fn draw_outline(image: &mut RgbImage, points: &[PanoramaPoint], width: u32, color: Rgb<u8>) {
    let w = image.width() as f32;
    let n = points.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let (ax, ay) = (a.x as f32, a.y as f32);
        let (bx, by) = (b.x as f32, b.y as f32);
        let dx = bx - ax;
        if dx.abs() <= 0.5 * w {
            draw_thick_segment(image, (ax, ay), (bx, by), width, color);
        } else {
            let shift = if dx > 0.0 { w } else { -w };
            draw_thick_segment(image, (ax, ay), (bx - shift, by), width, color);
            draw_thick_segment(image, (ax + shift, ay), (bx, by), width, color);
        }
    }
}

/// Annotated copy of the panorama. Outlines go under markers.
pub fn annotate(panorama: &Panorama, marks: &[Mark], style: &MarkerStyle) -> RgbImage {
    let mut out = panorama.image().clone();
    for m in marks {
        if !m.outline.is_empty() {
            draw_outline(&mut out, &m.outline, style.outline_width, style.color_for(m.class_id));
        }
    }
    for m in marks {
        draw_marker(&mut out, m.center, m.class_id, style);
    }
    tracing::debug!("annotated {} marks", marks.len());
    out
}
