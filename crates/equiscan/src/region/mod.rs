//! Seam-aware crop regions in panorama pixel space.
//!
//! A region is derived from a reference point and an angular extent. When its
//! horizontal span crosses the seam it is split into two rectangles, a tail
//! `[x_min mod W, W)` and a head `[0, x_max mod W)`, which concatenate (tail
//! first) into one contiguous image.

mod extract;

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;
use crate::sphere::PanoramaPoint;

pub use extract::extract_crop;

/// Angular half-extent around a direction, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularExtent {
    pub half_yaw: f64,
    pub half_pitch: f64,
}

impl AngularExtent {
    pub fn new(half_yaw: f64, half_pitch: f64) -> Self {
        Self {
            half_yaw,
            half_pitch,
        }
    }

    /// Build from half-extents in degrees.
    pub fn from_degrees(half_yaw_deg: f64, half_pitch_deg: f64) -> Self {
        Self::new(half_yaw_deg.to_radians(), half_pitch_deg.to_radians())
    }
}

/// Integer pixel rectangle, `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn x_end(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn y_end(&self) -> u32 {
        self.y + self.height
    }
}

/// Crop region in the panorama: one rectangle, or two when it wraps the seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CropRegion {
    Single(PixelRect),
    /// `tail` ends at the right edge, `head` starts at column 0.
    Split { tail: PixelRect, head: PixelRect },
}

impl CropRegion {
    /// Width of the composited crop.
    pub fn width(&self) -> u32 {
        match self {
            Self::Single(r) => r.width,
            Self::Split { tail, head } => tail.width + head.width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Single(r) => r.height,
            Self::Split { tail, .. } => tail.height,
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split { .. })
    }

    /// Rectangles in composite order.
    pub fn rects(&self) -> Vec<PixelRect> {
        match *self {
            Self::Single(r) => vec![r],
            Self::Split { tail, head } => vec![tail, head],
        }
    }

    /// `[x_min, y_min, x_max, y_max]` with exclusive maxima. For a split
    /// region `x_max <= x_min`, i.e. the span wraps through the seam.
    pub fn bounds(&self) -> [u32; 4] {
        match self {
            Self::Single(r) => [r.x, r.y, r.x_end(), r.y_end()],
            Self::Split { tail, head } => [tail.x, tail.y, head.x_end(), tail.y_end()],
        }
    }
}

/// Per-side angular margins around a point, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Margins {
    left: f64,
    right: f64,
    up: f64,
    down: f64,
}

/// How the angular extent of a detection grows before cropping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpansionPolicy {
    /// Keep the extent as measured.
    #[default]
    Symmetric,
    /// Tree-shaped growth: the trunk side of the box is extended further.
    Tree(TreeExpansion),
}

/// Expansion factors for [`ExpansionPolicy::Tree`], applied to full extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeExpansion {
    /// Pitch above which the camera is looking up at the canopy (degrees).
    pub steep_pitch_deg: f64,
    pub sides: f64,
    /// `(bottom, top)` when looking up.
    pub looking_up: (f64, f64),
    /// `(bottom, top)` when looking down.
    pub looking_down: (f64, f64),
    /// `(bottom, top)` near the horizon.
    pub level: (f64, f64),
}

impl Default for TreeExpansion {
    fn default() -> Self {
        Self {
            steep_pitch_deg: 30.0,
            sides: 1.3,
            looking_up: (3.0, 1.2),
            looking_down: (1.2, 3.0),
            level: (2.0, 1.5),
        }
    }
}

impl TreeExpansion {
    /// `(sides, bottom, top)` factors for a detection centered at `pitch` (radians).
    pub fn factors(&self, pitch: f64) -> (f64, f64, f64) {
        let deg = pitch.to_degrees();
        let (bottom, top) = if deg > self.steep_pitch_deg {
            self.looking_up
        } else if deg < -self.steep_pitch_deg {
            self.looking_down
        } else {
            self.level
        };
        (self.sides, bottom, top)
    }
}

/// Crop sizing for located objects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Extra margin per side, as a fraction of the expanded size.
    pub padding: f64,
    pub expansion: ExpansionPolicy,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            padding: 0.1,
            expansion: ExpansionPolicy::Symmetric,
        }
    }
}

impl RegionConfig {
    /// Region for a detection centered at `point` / `pitch` with measured `extent`.
    pub fn region_for(
        &self,
        point: PanoramaPoint,
        pitch: f64,
        extent: AngularExtent,
        width: u32,
        height: u32,
    ) -> Result<CropRegion, ProjectionError> {
        check_extent(extent)?;
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(ProjectionError::OutOfDomain {
                what: "padding",
                value: self.padding,
            });
        }
        let (sides, bottom, top) = match self.expansion {
            ExpansionPolicy::Symmetric => (1.0, 1.0, 1.0),
            ExpansionPolicy::Tree(t) => t.factors(pitch),
        };
        let half_w = extent.half_yaw * sides;
        let up = extent.half_pitch * top;
        let down = extent.half_pitch * bottom;
        let pad_x = 2.0 * half_w * self.padding;
        let pad_y = (up + down) * self.padding;
        region_from_margins(
            point,
            Margins {
                left: half_w + pad_x,
                right: half_w + pad_x,
                up: up + pad_y,
                down: down + pad_y,
            },
            width,
            height,
        )
    }
}

fn check_extent(extent: AngularExtent) -> Result<(), ProjectionError> {
    for (what, value) in [("half_yaw", extent.half_yaw), ("half_pitch", extent.half_pitch)] {
        if !value.is_finite() || value < 0.0 {
            return Err(ProjectionError::OutOfDomain { what, value });
        }
    }
    Ok(())
}

/// Symmetric crop region around `point`.
///
/// Margins are `half_yaw · W / 2π` horizontally and `half_pitch · H / π`
/// vertically. The result always has positive size and lies inside the
/// panorama; a span of the whole circumference is one full-width rectangle.
pub fn crop_region(
    point: PanoramaPoint,
    extent: AngularExtent,
    width: u32,
    height: u32,
) -> Result<CropRegion, ProjectionError> {
    check_extent(extent)?;
    region_from_margins(
        point,
        Margins {
            left: extent.half_yaw,
            right: extent.half_yaw,
            up: extent.half_pitch,
            down: extent.half_pitch,
        },
        width,
        height,
    )
}

fn region_from_margins(
    point: PanoramaPoint,
    m: Margins,
    width: u32,
    height: u32,
) -> Result<CropRegion, ProjectionError> {
    if width == 0 || height == 0 {
        return Err(ProjectionError::InvalidPanorama { width, height });
    }
    let point = point.check_bounds(width, height)?;
    let w = width as f64;
    let h = height as f64;
    let px_per_rad_x = w / TAU;
    let px_per_rad_y = h / PI;

    // vertical: clamp to the poles
    let top = (point.y - m.up * px_per_rad_y).clamp(0.0, h);
    let bottom = (point.y + m.down * px_per_rad_y).clamp(0.0, h);
    let mut y0 = top.floor() as i64;
    let mut y1 = bottom.ceil() as i64;
    if y0 >= height as i64 {
        y0 = height as i64 - 1;
    }
    if y1 <= y0 {
        y1 = y0 + 1;
    }
    let y1 = y1.min(height as i64);

    let y = y0 as u32;
    let rh = (y1 - y0) as u32;
    let left_px = m.left * px_per_rad_x;
    let right_px = m.right * px_per_rad_x;
    if left_px + right_px >= w {
        return Ok(CropRegion::Single(PixelRect::new(0, y, width, rh)));
    }

    // horizontal: unwrapped integer span, then fold onto [0, W)
    let mut x0 = (point.x - left_px).floor() as i64;
    let mut x1 = (point.x + right_px).ceil() as i64;
    if x1 <= x0 {
        x1 = x0 + 1;
    }
    let wi = width as i64;
    if x1 - x0 >= wi {
        return Ok(CropRegion::Single(PixelRect::new(0, y, width, rh)));
    }
    let shift = x0.div_euclid(wi) * wi;
    x0 -= shift;
    x1 -= shift;
    if x1 <= wi {
        Ok(CropRegion::Single(PixelRect::new(
            x0 as u32,
            y,
            (x1 - x0) as u32,
            rh,
        )))
    } else {
        Ok(CropRegion::Split {
            tail: PixelRect::new(x0 as u32, y, (wi - x0) as u32, rh),
            head: PixelRect::new(0, y, (x1 - wi) as u32, rh),
        })
    }
}
