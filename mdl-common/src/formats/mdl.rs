//! MDL model records (.mdl)
//!
//! A `.mdl` file is a flat concatenation of object records, one per exported
//! object, in selection order. POD format - no magic bytes, no version, no end
//! marker. Readers must agree on the [`RecordLayout`] out-of-band and read until
//! the stream is exhausted.
//!
//! All integers and floats are big-endian.
//!
//! # World-space layout (no transform, position-addressed)
//! ```text
//! u32          vertex_count
//! [f32; 3] *   vertex_count          positions (world space)
//! u32          vertex_count          texcoord count, equal to vertex_count
//! [f32; 6] *   vertex_count / 3      u1,v1,u2,v2,u3,v3 per triangle (V flipped)
//! ```
//!
//! # Indexed layout (transform + index block)
//! ```text
//! [f32; 16]                          transform (transposed host matrix, row-major)
//! u32          index_count
//! u32 *        index_count           0..vertex_count, one per triangle corner
//! u32          vertex_count
//! [f32; 3] *   vertex_count          positions (object-local space)
//! u32          vertex_count
//! [f32; 6] *   vertex_count / 3      u1,v1,u2,v2,u3,v3 per triangle (V flipped)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::packing::{
    MATRIX_SIZE, POSITION_SIZE, SCALAR_SIZE, UV_SIZE, unpack_f32_be, unpack_u32_be,
};

/// File extension for MDL model files
pub const MDL_EXT: &str = "mdl";

/// Size of the per-triangle texcoord record: 3 corners × Float32x2
pub const TEXCOORD_TRIANGLE_SIZE: usize = 3 * UV_SIZE;

/// Size of a block count prefix (u32)
pub const COUNT_SIZE: usize = SCALAR_SIZE;

/// Record layout flags
///
/// `embed_transform` writes the object's transform ahead of the geometry and keeps
/// positions in object-local space; without it the transform is baked into the
/// positions. `emit_indices` writes the trivial index block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    pub embed_transform: bool,
    pub emit_indices: bool,
}

impl RecordLayout {
    /// World-space positions, no transform, no indices
    pub const WORLD: Self = Self {
        embed_transform: false,
        emit_indices: false,
    };

    /// Object-local positions with a leading transform and an index block
    pub const INDEXED: Self = Self {
        embed_transform: true,
        emit_indices: true,
    };

    /// Whether positions must be transformed into world space before packing
    #[inline]
    pub const fn bakes_transform(&self) -> bool {
        !self.embed_transform
    }

    /// Total encoded size of a record holding `vertex_count` corners
    pub const fn record_size(&self, vertex_count: usize) -> usize {
        let mut size = COUNT_SIZE + vertex_count * POSITION_SIZE;
        size += COUNT_SIZE + (vertex_count / 3) * TEXCOORD_TRIANGLE_SIZE;

        if self.embed_transform {
            size += MATRIX_SIZE;
        }
        if self.emit_indices {
            size += COUNT_SIZE + vertex_count * SCALAR_SIZE;
        }

        size
    }
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self::WORLD
    }
}

/// Record decoding failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated record: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("texcoord count {texcoords} does not match vertex count {vertices}")]
    TexcoordCountMismatch { vertices: u32, texcoords: u32 },

    #[error("index count {indices} does not match vertex count {vertices}")]
    IndexCountMismatch { indices: u32, vertices: u32 },

    #[error("vertex count {vertices} is not a whole number of triangles")]
    PartialTriangle { vertices: u32 },
}

/// One decoded object record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MdlRecord {
    /// Transform as stored (16 floats, row-major), if the layout embeds it
    pub transform: Option<[f32; 16]>,
    /// Index block, if the layout emits it
    pub indices: Option<Vec<u32>>,
    /// One position per triangle corner
    pub positions: Vec<[f32; 3]>,
    /// One UV per triangle corner, as stored (V flipped)
    pub texcoords: Vec<[f32; 2]>,
}

impl MdlRecord {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Texcoords converted back to the host's bottom-left origin
    pub fn source_uvs(&self) -> Vec<[f32; 2]> {
        self.texcoords.iter().map(|&[u, v]| [u, 1.0 - v]).collect()
    }
}

/// Bounds-checked cursor over a record stream
struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.bytes.len() - self.offset;
        if len > available {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed: len,
                available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.take(SCALAR_SIZE).map(unpack_u32_be)
    }

    fn read_f32s<const N: usize>(&mut self) -> Result<[f32; N], DecodeError> {
        let bytes = self.take(N * SCALAR_SIZE)?;
        let mut values = [0.0f32; N];
        for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(SCALAR_SIZE)) {
            *value = unpack_f32_be(chunk);
        }
        Ok(values)
    }

    /// Check a whole block fits before allocating for it
    fn ensure(&self, count: u32, element_size: usize) -> Result<(), DecodeError> {
        let needed = count as usize * element_size;
        let available = self.bytes.len() - self.offset;
        if needed > available {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                needed,
                available,
            });
        }
        Ok(())
    }
}

/// Decode one record from the start of `bytes`
///
/// Returns the record and the number of bytes consumed.
pub fn read_record(bytes: &[u8], layout: RecordLayout) -> Result<(MdlRecord, usize), DecodeError> {
    let mut cursor = Cursor { bytes, offset: 0 };
    let record = read_record_at(&mut cursor, layout)?;
    Ok((record, cursor.offset))
}

/// Decode every record in a stream until it is exhausted
pub fn read_records(bytes: &[u8], layout: RecordLayout) -> Result<Vec<MdlRecord>, DecodeError> {
    let mut cursor = Cursor { bytes, offset: 0 };
    let mut records = Vec::new();

    while cursor.offset < bytes.len() {
        records.push(read_record_at(&mut cursor, layout)?);
    }

    Ok(records)
}

fn read_record_at(cursor: &mut Cursor<'_>, layout: RecordLayout) -> Result<MdlRecord, DecodeError> {
    let transform = if layout.embed_transform {
        Some(cursor.read_f32s::<16>()?)
    } else {
        None
    };

    let indices = if layout.emit_indices {
        let index_count = cursor.read_u32()?;
        cursor.ensure(index_count, SCALAR_SIZE)?;
        let mut indices = Vec::with_capacity(index_count as usize);
        for _ in 0..index_count {
            indices.push(cursor.read_u32()?);
        }
        Some(indices)
    } else {
        None
    };

    let vertex_count = cursor.read_u32()?;
    if vertex_count % 3 != 0 {
        return Err(DecodeError::PartialTriangle {
            vertices: vertex_count,
        });
    }
    if let Some(indices) = &indices {
        if indices.len() != vertex_count as usize {
            return Err(DecodeError::IndexCountMismatch {
                indices: indices.len() as u32,
                vertices: vertex_count,
            });
        }
    }

    cursor.ensure(vertex_count, POSITION_SIZE)?;
    let mut positions = Vec::with_capacity(vertex_count as usize);
    for _ in 0..vertex_count {
        positions.push(cursor.read_f32s::<3>()?);
    }

    let texcoord_count = cursor.read_u32()?;
    if texcoord_count != vertex_count {
        return Err(DecodeError::TexcoordCountMismatch {
            vertices: vertex_count,
            texcoords: texcoord_count,
        });
    }

    cursor.ensure(texcoord_count, UV_SIZE)?;
    let mut texcoords = Vec::with_capacity(texcoord_count as usize);
    for _ in 0..texcoord_count / 3 {
        let [u1, v1, u2, v2, u3, v3] = cursor.read_f32s::<6>()?;
        texcoords.extend_from_slice(&[[u1, v1], [u2, v2], [u3, v3]]);
    }

    Ok(MdlRecord {
        transform,
        indices,
        positions,
        texcoords,
    })
}
