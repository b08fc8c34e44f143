//! Types for face encoding

use glam::{Vec2, Vec3};

/// One triangle ready for packing
///
/// Positions are already in the space the record stores (world or object-local),
/// UVs are still in the host convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Triangle {
    pub positions: [Vec3; 3],
    pub uvs: [Vec2; 3],
}

/// Packed geometry blocks of one object, without count prefixes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedGeometry {
    /// Number of triangle corners (= positions = texcoords = indices)
    pub vertex_count: u32,
    /// Float32x3 big-endian per corner
    pub positions: Vec<u8>,
    /// Float32x2 big-endian per corner, V flipped
    pub texcoords: Vec<u8>,
    /// u32 big-endian per corner, present when the layout emits indices
    pub indices: Option<Vec<u8>>,
}

impl EncodedGeometry {
    pub fn triangle_count(&self) -> u32 {
        self.vertex_count / 3
    }
}
