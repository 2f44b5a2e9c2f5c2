//! Per-frame geometry used by the mixer when compositing.
//!
//! Frames only carry geometry; they never interpret it.

use crate::error::{FrameError, Result};
use bytemuck::{Pod, Zeroable};
use glam::Vec2 as GlamVec2;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// 2D vector.
pub type Vec2 = GlamVec2;

/// Axis-aligned rectangle in normalized output coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two corners.
    pub fn from_corners(min: Vec2, max: Vec2) -> Self {
        Self {
            x: min.x,
            y: min.y,
            width: max.x - min.x,
            height: max.y - min.y,
        }
    }

    /// Minimum corner (top-left).
    #[inline]
    pub fn min(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Maximum corner (bottom-right).
    #[inline]
    pub fn max(self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }
}

/// One vertex: output position plus texture coordinates.
///
/// `texture_r` and `texture_q` carry the perspective terms for
/// non-affine quads; both are 0 and 1 for plain quads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Coord {
    pub vertex_x: f32,
    pub vertex_y: f32,
    pub texture_x: f32,
    pub texture_y: f32,
    pub texture_r: f32,
    pub texture_q: f32,
}

impl Coord {
    #[inline]
    pub const fn new(vertex_x: f32, vertex_y: f32, texture_x: f32, texture_y: f32) -> Self {
        Self {
            vertex_x,
            vertex_y,
            texture_x,
            texture_y,
            texture_r: 0.0,
            texture_q: 1.0,
        }
    }

    #[inline]
    pub fn vertex(&self) -> Vec2 {
        Vec2::new(self.vertex_x, self.vertex_y)
    }

    #[inline]
    pub fn texture(&self) -> Vec2 {
        Vec2::new(self.texture_x, self.texture_y)
    }
}

/// How the coordinate list is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// Exactly four corners.
    Quad,
    /// Any number of quads, four coordinates each.
    QuadList,
}

static DEFAULT_GEOMETRY: Lazy<FrameGeometry> = Lazy::new(|| {
    FrameGeometry::quad([
        Coord::new(0.0, 0.0, 0.0, 0.0),
        Coord::new(1.0, 0.0, 1.0, 0.0),
        Coord::new(1.0, 1.0, 1.0, 1.0),
        Coord::new(0.0, 1.0, 0.0, 1.0),
    ])
});

/// Placement of a frame in the output, attached to every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    kind: GeometryKind,
    coords: Vec<Coord>,
}

impl FrameGeometry {
    /// The process-wide default: a full-frame quad with full texture.
    pub fn get_default() -> &'static FrameGeometry {
        &DEFAULT_GEOMETRY
    }

    /// A single quad with corners in clockwise order from top-left.
    pub fn quad(corners: [Coord; 4]) -> Self {
        Self {
            kind: GeometryKind::Quad,
            coords: corners.to_vec(),
        }
    }

    /// A list of quads. Fails unless `coords` holds a multiple of four.
    pub fn quad_list(coords: Vec<Coord>) -> Result<Self> {
        if coords.len() % 4 != 0 {
            return Err(FrameError::InvalidArgument(format!(
                "quad list needs a multiple of 4 coordinates, got {}",
                coords.len()
            )));
        }
        Ok(Self {
            kind: GeometryKind::QuadList,
            coords,
        })
    }

    /// A quad covering `rect` that samples the whole texture.
    pub fn from_rect(rect: Rect) -> Self {
        let (min, max) = (rect.min(), rect.max());
        Self::quad([
            Coord::new(min.x, min.y, 0.0, 0.0),
            Coord::new(max.x, min.y, 1.0, 0.0),
            Coord::new(max.x, max.y, 1.0, 1.0),
            Coord::new(min.x, max.y, 0.0, 1.0),
        ])
    }

    #[inline]
    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    #[inline]
    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    /// Coordinates as raw bytes for vertex buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.coords)
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self::get_default().clone()
    }
}
