//! Face encoder
//!
//! Walks an evaluated mesh face by face and packs each triangle corner into the
//! parallel position / texcoord / index blocks of an MDL record.

use glam::{Mat4, Vec2, Vec3};
use mdl_common::{
    POSITION_SIZE, RecordLayout, SCALAR_SIZE, UV_SIZE, pack_position_be, pack_uv_flipped_be,
};

use super::types::{EncodedGeometry, Triangle};
use crate::error::{ExportError, ExportResult};
use crate::scene::{EvaluatedMesh, UvLayer};

/// Encode every face of `mesh` into packed geometry blocks
///
/// Faces are visited in face-index order and corners in the order the face lists
/// them. Each corner becomes its own vertex; coincident corners are never welded.
/// When the layout does not embed the transform, positions are transformed into
/// world space with `world_transform`.
///
/// Fails on the first face that is not a triangle, and when the mesh has no UV layer.
pub fn encode_faces(
    object: &str,
    mesh: &EvaluatedMesh,
    world_transform: &Mat4,
    layout: RecordLayout,
) -> ExportResult<EncodedGeometry> {
    let uv_layer = mesh
        .uv_layer
        .as_ref()
        .ok_or_else(|| ExportError::MissingUvChannel {
            object: object.to_string(),
        })?;

    let corner_count = mesh.corner_count();
    let vertex_count = u32::try_from(corner_count).map_err(|_| ExportError::TooManyVertices {
        object: object.to_string(),
        count: corner_count,
    })?;

    let mut geometry = EncodedGeometry {
        vertex_count,
        positions: Vec::with_capacity(corner_count * POSITION_SIZE),
        texcoords: Vec::with_capacity(corner_count * UV_SIZE),
        indices: layout
            .emit_indices
            .then(|| Vec::with_capacity(corner_count * SCALAR_SIZE)),
    };

    for face_index in 0..mesh.faces.len() {
        let mut triangle = fetch_triangle(object, mesh, uv_layer, face_index)?;

        if layout.bakes_transform() {
            for position in &mut triangle.positions {
                *position = world_transform.transform_point3(*position);
            }
        }

        for position in triangle.positions {
            geometry.positions.extend_from_slice(&pack_position_be(position));
        }
        for uv in triangle.uvs {
            geometry.texcoords.extend_from_slice(&pack_uv_flipped_be(uv));
        }
        if let Some(indices) = &mut geometry.indices {
            // Bounded by vertex_count, which fits in u32
            let first = (face_index * 3) as u32;
            for index in first..first + 3 {
                indices.extend_from_slice(&index.to_be_bytes());
            }
        }
    }

    Ok(geometry)
}

/// Gather one face's corners, validating topology, UVs and vertex references
fn fetch_triangle(
    object: &str,
    mesh: &EvaluatedMesh,
    uv_layer: &UvLayer,
    face_index: usize,
) -> ExportResult<Triangle> {
    let face = &mesh.faces[face_index];
    if face.len() != 3 {
        return Err(ExportError::UnsupportedTopology {
            object: object.to_string(),
            face: face_index,
            vertex_count: face.len(),
        });
    }

    let face_uvs = uv_layer
        .faces
        .get(face_index)
        .filter(|uvs| uvs.len() >= 3)
        .ok_or_else(|| ExportError::UvLayerMismatch {
            object: object.to_string(),
            face: face_index,
        })?;

    let mut positions = [Vec3::ZERO; 3];
    for (position, &vertex) in positions.iter_mut().zip(face.vertices.iter()) {
        *position = mesh.positions.get(vertex as usize).copied().ok_or_else(|| {
            ExportError::InvalidVertexIndex {
                object: object.to_string(),
                face: face_index,
                index: vertex,
                vertex_count: mesh.positions.len(),
            }
        })?;
    }

    let uvs: [Vec2; 3] = [face_uvs[0], face_uvs[1], face_uvs[2]];

    Ok(Triangle { positions, uvs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Face;
    use mdl_common::unpack_f32_be;
    use smallvec::smallvec;

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes.chunks_exact(4).map(unpack_f32_be).collect()
    }

    fn u32s(bytes: &[u8]) -> Vec<u32> {
        bytes.chunks_exact(4).map(mdl_common::unpack_u32_be).collect()
    }

    /// Two triangles sharing an edge, with UVs from the reference scenario
    fn two_triangles() -> EvaluatedMesh {
        EvaluatedMesh {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            faces: vec![Face::triangle(0, 1, 2), Face::triangle(1, 3, 2)],
            uv_layer: Some(UvLayer {
                name: "UVMap".to_string(),
                faces: vec![
                    smallvec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
                    smallvec![Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)],
                ],
            }),
        }
    }

    #[test]
    fn test_reference_scenario_world_layout() {
        let mesh = two_triangles();
        let geometry =
            encode_faces("Plane", &mesh, &Mat4::IDENTITY, RecordLayout::WORLD).unwrap();

        assert_eq!(geometry.vertex_count, 6);
        assert_eq!(geometry.triangle_count(), 2);
        assert!(geometry.indices.is_none());
        assert_eq!(
            floats(&geometry.positions),
            vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
                1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ]
        );
        assert_eq!(
            floats(&geometry.texcoords),
            vec![
                0.0, 1.0, 1.0, 1.0, 0.0, 0.0, //
                1.0, 1.0, 1.0, 0.0, 0.0, 0.0,
            ]
        );
    }

    #[test]
    fn test_world_layout_bakes_translation() {
        let mesh = two_triangles();
        let transform = Mat4::from_translation(Vec3::new(10.0, 0.0, -2.0));
        let geometry = encode_faces("Plane", &mesh, &transform, RecordLayout::WORLD).unwrap();
        let values = floats(&geometry.positions);
        assert_eq!(&values[0..3], &[10.0, 0.0, -2.0]);
        assert_eq!(&values[3..6], &[11.0, 0.0, -2.0]);
    }

    #[test]
    fn test_indexed_layout_keeps_local_space() {
        let mesh = two_triangles();
        let transform = Mat4::from_scale(Vec3::splat(3.0));
        let geometry = encode_faces("Plane", &mesh, &transform, RecordLayout::INDEXED).unwrap();
        let values = floats(&geometry.positions);
        assert_eq!(&values[3..6], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_indices_are_identity_sequence() {
        let mesh = two_triangles();
        let geometry =
            encode_faces("Plane", &mesh, &Mat4::IDENTITY, RecordLayout::INDEXED).unwrap();
        let indices = u32s(geometry.indices.as_ref().unwrap());
        assert_eq!(indices, (0..6).collect::<Vec<u32>>());
    }

    #[test]
    fn test_coincident_corners_are_not_welded() {
        let mut mesh = two_triangles();
        // Same face twice: identical positions and UVs
        mesh.faces[1] = mesh.faces[0].clone();
        let first_uvs = mesh.uv_layer.as_ref().unwrap().faces[0].clone();
        mesh.uv_layer.as_mut().unwrap().faces[1] = first_uvs;

        let geometry =
            encode_faces("Plane", &mesh, &Mat4::IDENTITY, RecordLayout::INDEXED).unwrap();
        assert_eq!(geometry.vertex_count, 6);
        assert_eq!(u32s(geometry.indices.as_ref().unwrap()), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(geometry.positions[..36], geometry.positions[36..]);
    }

    #[test]
    fn test_quad_is_rejected() {
        let mut mesh = two_triangles();
        mesh.faces[1] = Face::from_slice(&[0, 1, 3, 2]);
        mesh.uv_layer.as_mut().unwrap().faces[1].push(Vec2::ZERO);

        let err = encode_faces("Plane", &mesh, &Mat4::IDENTITY, RecordLayout::WORLD).unwrap_err();
        match err {
            ExportError::UnsupportedTopology {
                object,
                face,
                vertex_count,
            } => {
                assert_eq!(object, "Plane");
                assert_eq!(face, 1);
                assert_eq!(vertex_count, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_uv_layer() {
        let mut mesh = two_triangles();
        mesh.uv_layer = None;
        let err = encode_faces("Plane", &mesh, &Mat4::IDENTITY, RecordLayout::WORLD).unwrap_err();
        assert!(matches!(err, ExportError::MissingUvChannel { object } if object == "Plane"));
    }

    #[test]
    fn test_missing_uv_layer_on_empty_mesh() {
        let mesh = EvaluatedMesh::default();
        let err = encode_faces("Empty", &mesh, &Mat4::IDENTITY, RecordLayout::WORLD).unwrap_err();
        assert!(matches!(err, ExportError::MissingUvChannel { .. }));
    }

    #[test]
    fn test_empty_mesh_with_uv_layer() {
        let mesh = EvaluatedMesh {
            uv_layer: Some(UvLayer::default()),
            ..Default::default()
        };
        let geometry =
            encode_faces("Empty", &mesh, &Mat4::IDENTITY, RecordLayout::INDEXED).unwrap();
        assert_eq!(geometry.vertex_count, 0);
        assert!(geometry.positions.is_empty());
        assert_eq!(geometry.indices, Some(Vec::new()));
    }

    #[test]
    fn test_uv_layer_mismatch() {
        let mut mesh = two_triangles();
        mesh.uv_layer.as_mut().unwrap().faces.pop();
        let err = encode_faces("Plane", &mesh, &Mat4::IDENTITY, RecordLayout::WORLD).unwrap_err();
        assert!(matches!(err, ExportError::UvLayerMismatch { face: 1, .. }));
    }

    #[test]
    fn test_invalid_vertex_index() {
        let mut mesh = two_triangles();
        mesh.faces[0] = Face::triangle(0, 1, 9);
        let err = encode_faces("Plane", &mesh, &Mat4::IDENTITY, RecordLayout::WORLD).unwrap_err();
        assert!(matches!(
            err,
            ExportError::InvalidVertexIndex {
                face: 0,
                index: 9,
                vertex_count: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_winding_is_preserved() {
        let mut mesh = two_triangles();
        mesh.faces.truncate(1);
        mesh.uv_layer.as_mut().unwrap().faces.truncate(1);
        mesh.faces[0] = Face::triangle(2, 1, 0);

        let geometry =
            encode_faces("Plane", &mesh, &Mat4::IDENTITY, RecordLayout::WORLD).unwrap();
        let values = floats(&geometry.positions);
        assert_eq!(&values[0..3], &[0.0, 1.0, 0.0]);
        assert_eq!(&values[6..9], &[0.0, 0.0, 0.0]);
    }
}
