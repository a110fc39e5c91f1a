//! Rectilinear faces: orientation, layouts and rendering.

mod layout;
mod orientation;
mod render;

pub use layout::{default_face_size, FaceLayout, FaceSpec, LayoutError};
pub use orientation::FaceOrientation;
pub use render::{render_face, render_faces, FaceImage};
