//! Big-endian geometry packing
//!
//! Converts f32 geometry into the byte layout of MDL records:
//! - scalars and 3D points → IEEE 754 single precision, big-endian, no padding
//! - UV pairs → V-flipped pairs (host bottom-left origin → MDL top-left origin)
//! - 4x4 transforms → transposed, 16 floats row-major
//!
//! Used by both `mdl-export` (writing) and the record decoder in [`crate::formats`].

use glam::{Mat4, Vec2, Vec3};

// ============================================================================
// Size Constants
// ============================================================================

/// Size of a packed f32 or u32 (bytes)
pub const SCALAR_SIZE: usize = 4;

/// Size of a packed position: Float32x3
pub const POSITION_SIZE: usize = 3 * SCALAR_SIZE;

/// Size of a packed UV pair: Float32x2
pub const UV_SIZE: usize = 2 * SCALAR_SIZE;

/// Size of a packed transform: Float32x16
pub const MATRIX_SIZE: usize = 16 * SCALAR_SIZE;

// ============================================================================
// Scalar / Vector Packing
// ============================================================================

/// Append raw floats to `out` as big-endian f32, in the order given
#[inline]
pub fn pack_f32s_be(values: &[f32], out: &mut Vec<u8>) {
    out.reserve(values.len() * SCALAR_SIZE);
    for value in values {
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// Pack a 3D point as Float32x3 big-endian (x, y, z)
#[inline]
pub fn pack_position_be(position: Vec3) -> [u8; POSITION_SIZE] {
    let mut bytes = [0u8; POSITION_SIZE];
    bytes[0..4].copy_from_slice(&position.x.to_be_bytes());
    bytes[4..8].copy_from_slice(&position.y.to_be_bytes());
    bytes[8..12].copy_from_slice(&position.z.to_be_bytes());
    bytes
}

// ============================================================================
// UV Packing
// ============================================================================

/// Convert a host UV (bottom-left origin) to MDL texture space (top-left origin)
///
/// This is a one-way space conversion: `(u, v) → (u, 1.0 - v)`.
#[inline]
pub fn flip_uv(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y)
}

/// Pack a host UV as a V-flipped Float32x2 big-endian pair
#[inline]
pub fn pack_uv_flipped_be(uv: Vec2) -> [u8; UV_SIZE] {
    let flipped = flip_uv(uv);
    let mut bytes = [0u8; UV_SIZE];
    bytes[0..4].copy_from_slice(&flipped.x.to_be_bytes());
    bytes[4..8].copy_from_slice(&flipped.y.to_be_bytes());
    bytes
}

// ============================================================================
// Matrix Packing
// ============================================================================

/// Pack a 4x4 host transform as 16 big-endian floats
///
/// The matrix is transposed and then written row 0 through row 3, each row's
/// four components in order. For a glam matrix this is the original column-major
/// storage, so the translation ends up in the last four floats.
pub fn pack_matrix_be(transform: &Mat4) -> [u8; MATRIX_SIZE] {
    let transposed = transform.transpose();
    let mut bytes = [0u8; MATRIX_SIZE];

    for row in 0..4 {
        let row_values = transposed.row(row).to_array();
        for (col, value) in row_values.iter().enumerate() {
            let offset = (row * 4 + col) * SCALAR_SIZE;
            bytes[offset..offset + SCALAR_SIZE].copy_from_slice(&value.to_be_bytes());
        }
    }

    bytes
}

// ============================================================================
// Unpacking
// ============================================================================

/// Read a big-endian f32 from the first 4 bytes of `bytes`
///
/// Callers guarantee `bytes.len() >= 4`.
#[inline]
pub fn unpack_f32_be(bytes: &[u8]) -> f32 {
    f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a big-endian u32 from the first 4 bytes of `bytes`
///
/// Callers guarantee `bytes.len() >= 4`.
#[inline]
pub fn unpack_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
