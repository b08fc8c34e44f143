//! MDL record writing
//!
//! Re-exports the format definitions from mdl-common and assembles the packed
//! geometry blocks into complete object records.

pub use mdl_common::formats::*;

use glam::Mat4;
use mdl_common::{SCALAR_SIZE, pack_matrix_be};
use std::io::Write;

use crate::error::ExportResult;
use crate::mesh::{EncodedGeometry, encode_faces};
use crate::scene::EvaluatedMesh;

/// Write one object record
///
/// Order: transform (if given), index block (if present), vertex block, texcoord
/// block. Every block is prefixed with its u32 big-endian element count; the
/// texcoord count repeats the vertex count.
pub fn write_mdl_record<W: Write>(
    w: &mut W,
    transform: Option<&Mat4>,
    geometry: &EncodedGeometry,
) -> ExportResult<()> {
    if let Some(transform) = transform {
        w.write_all(&pack_matrix_be(transform))?;
    }

    if let Some(indices) = &geometry.indices {
        let index_count = (indices.len() / SCALAR_SIZE) as u32;
        w.write_all(&index_count.to_be_bytes())?;
        w.write_all(indices)?;
    }

    w.write_all(&geometry.vertex_count.to_be_bytes())?;
    w.write_all(&geometry.positions)?;

    w.write_all(&geometry.vertex_count.to_be_bytes())?;
    w.write_all(&geometry.texcoords)?;

    Ok(())
}

/// One complete object record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    pub vertex_count: u32,
    pub bytes: Vec<u8>,
}

/// Encode a complete record for one evaluated mesh
///
/// Nothing is returned unless every face encoded, so a failed object never
/// leaves a partial record behind.
pub fn encode_record(
    object: &str,
    mesh: &EvaluatedMesh,
    world_transform: &Mat4,
    layout: RecordLayout,
) -> ExportResult<EncodedRecord> {
    let geometry = encode_faces(object, mesh, world_transform, layout)?;

    let mut bytes = Vec::with_capacity(layout.record_size(geometry.vertex_count as usize));
    let transform = layout.embed_transform.then_some(world_transform);
    write_mdl_record(&mut bytes, transform, &geometry)?;

    Ok(EncodedRecord {
        vertex_count: geometry.vertex_count,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Face, UvLayer};
    use glam::{Vec2, Vec3};
    use mdl_common::{read_record, unpack_f32_be, unpack_u32_be};
    use smallvec::smallvec;

    fn triangle_mesh() -> EvaluatedMesh {
        EvaluatedMesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            faces: vec![Face::triangle(0, 1, 2)],
            uv_layer: Some(UvLayer {
                name: "UVMap".to_string(),
                faces: vec![smallvec![Vec2::ZERO, Vec2::X, Vec2::Y]],
            }),
        }
    }

    #[test]
    fn test_world_record_layout() {
        let record =
            encode_record("Tri", &triangle_mesh(), &Mat4::IDENTITY, RecordLayout::WORLD).unwrap();

        assert_eq!(record.vertex_count, 3);
        let record = record.bytes;
        assert_eq!(record.len(), RecordLayout::WORLD.record_size(3));
        assert_eq!(unpack_u32_be(&record[0..4]), 3);
        // Texcoord count follows 3 positions
        assert_eq!(unpack_u32_be(&record[40..44]), 3);
        assert_eq!(unpack_f32_be(&record[44..48]), 0.0);
        assert_eq!(unpack_f32_be(&record[48..52]), 1.0);
    }

    #[test]
    fn test_indexed_record_layout() {
        let transform = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let record =
            encode_record("Tri", &triangle_mesh(), &transform, RecordLayout::INDEXED)
                .unwrap()
                .bytes;

        assert_eq!(record.len(), RecordLayout::INDEXED.record_size(3));
        // Translation in the last row of the transform block
        assert_eq!(unpack_f32_be(&record[48..52]), 1.0);
        assert_eq!(unpack_f32_be(&record[60..64]), 1.0);
        // Index count, then indices
        assert_eq!(unpack_u32_be(&record[64..68]), 3);
        assert_eq!(unpack_u32_be(&record[68..72]), 0);
        assert_eq!(unpack_u32_be(&record[76..80]), 2);
        // Vertex count
        assert_eq!(unpack_u32_be(&record[80..84]), 3);
    }

    #[test]
    fn test_record_decodes() {
        let transform = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let record =
            encode_record("Tri", &triangle_mesh(), &transform, RecordLayout::INDEXED)
                .unwrap()
                .bytes;

        let (decoded, consumed) = read_record(&record, RecordLayout::INDEXED).unwrap();
        assert_eq!(consumed, record.len());
        assert_eq!(decoded.transform, Some(transform.to_cols_array()));
        assert_eq!(decoded.indices, Some(vec![0, 1, 2]));
        assert_eq!(decoded.positions, vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        assert_eq!(decoded.source_uvs(), vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    }

    #[test]
    fn test_failed_encode_returns_no_bytes() {
        let mut mesh = triangle_mesh();
        mesh.faces.push(Face::from_slice(&[0, 1, 2, 0]));
        let result = encode_record("Quad", &mesh, &Mat4::IDENTITY, RecordLayout::WORLD);
        assert!(result.is_err());
    }

    #[test]
    fn test_write_into_failing_stream() {
        struct FullDisk;

        impl Write for FullDisk {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let geometry = EncodedGeometry::default();
        let err = write_mdl_record(&mut FullDisk, None, &geometry).unwrap_err();
        assert!(matches!(err, crate::ExportError::Io(_)));
    }
}
