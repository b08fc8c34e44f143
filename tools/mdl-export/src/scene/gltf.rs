//! glTF/GLB scene backend
//!
//! Every node with a mesh in the default scene is an exportable object. Meshes are
//! read from the document only when an object is evaluated.

use anyhow::{Context, Result};
use glam::{Mat4, Vec2, Vec3};
use gltf::mesh::Mode;
use smallvec::SmallVec;
use std::path::Path;

use super::{EvaluatedMesh, Face, ObjectSource, UvLayer};
use crate::error::ExportError;

/// A loaded glTF document with its buffers
pub struct GltfScene {
    document: gltf::Document,
    buffers: Vec<gltf::buffer::Data>,
    objects: Vec<NodeInfo>,
}

/// Mesh node discovered while walking the scene
#[derive(Debug, Clone)]
struct NodeInfo {
    node_index: usize,
    name: String,
    world_transform: Mat4,
}

/// One mesh node of a [`GltfScene`]
pub struct GltfObject<'a> {
    scene: &'a GltfScene,
    info: &'a NodeInfo,
}

impl GltfScene {
    /// Load a .gltf or .glb file (external buffers are resolved relative to it)
    pub fn load(input: &Path) -> Result<Self> {
        let (document, buffers, _images) =
            gltf::import(input).with_context(|| format!("Failed to load glTF: {:?}", input))?;
        Ok(Self::from_parts(document, buffers))
    }

    /// Load a GLB (or self-contained glTF) from memory
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let (document, buffers, _images) =
            gltf::import_slice(bytes).context("Failed to load glTF from memory")?;
        Ok(Self::from_parts(document, buffers))
    }

    fn from_parts(document: gltf::Document, buffers: Vec<gltf::buffer::Data>) -> Self {
        let mut objects = Vec::new();

        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    collect_mesh_nodes(&node, Mat4::IDENTITY, &mut objects);
                }
            }
            None => {
                // No scene: every mesh node stands on its own
                for node in document.nodes().filter(|n| n.mesh().is_some()) {
                    objects.push(NodeInfo {
                        node_index: node.index(),
                        name: node_name(&node),
                        world_transform: local_transform(&node),
                    });
                }
            }
        }

        tracing::debug!("glTF scene has {} mesh objects", objects.len());

        Self {
            document,
            buffers,
            objects,
        }
    }

    /// Exportable objects in scene order (depth-first)
    pub fn objects(&self) -> Vec<GltfObject<'_>> {
        self.objects
            .iter()
            .map(|info| GltfObject { scene: self, info })
            .collect()
    }

    fn evaluate_node(&self, info: &NodeInfo) -> Result<EvaluatedMesh> {
        let node_index = info.node_index;
        let node = self
            .document
            .nodes()
            .nth(node_index)
            .with_context(|| format!("Node {} not found in glTF", node_index))?;
        let mesh = node
            .mesh()
            .with_context(|| format!("Node {} has no mesh", node_index))?;

        let mut positions: Vec<Vec3> = Vec::new();
        let mut faces: Vec<Face> = Vec::new();
        let mut uv_faces: Vec<SmallVec<[Vec2; 4]>> = Vec::new();
        let mut any_uvs = false;

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&self.buffers[buffer.index()]));

            let base = positions.len() as u32;
            let primitive_positions: Vec<Vec3> = reader
                .read_positions()
                .with_context(|| {
                    format!("Primitive {} has no positions", primitive.index())
                })?
                .map(Vec3::from_array)
                .collect();

            // glTF UVs have a top-left origin; the host convention is bottom-left
            let uvs: Option<Vec<Vec2>> = reader.read_tex_coords(0).map(|iter| {
                iter.into_f32()
                    .map(|[u, v]| Vec2::new(u, 1.0 - v))
                    .collect()
            });
            if reader.read_tex_coords(1).is_some() {
                tracing::warn!(
                    "Mesh '{}' has extra UV sets, only TEXCOORD_0 is exported",
                    mesh.name().unwrap_or("unnamed")
                );
            }

            let indices: Vec<u32> = match reader.read_indices() {
                Some(iter) => iter.into_u32().collect(),
                None => (0..primitive_positions.len() as u32).collect(),
            };

            for corners in primitive_faces(primitive.mode(), &indices) {
                // Indices address this primitive only, never the ones after it
                if let Some(&index) = corners
                    .iter()
                    .find(|&&i| i as usize >= primitive_positions.len())
                {
                    return Err(ExportError::InvalidVertexIndex {
                        object: info.name.clone(),
                        face: faces.len(),
                        index,
                        vertex_count: primitive_positions.len(),
                    }
                    .into());
                }

                let corner_uvs: SmallVec<[Vec2; 4]> = match &uvs {
                    Some(uvs) => corners
                        .iter()
                        .filter_map(|&i| uvs.get(i as usize).copied())
                        .collect(),
                    None => SmallVec::new(),
                };
                uv_faces.push(corner_uvs);
                faces.push(Face {
                    vertices: corners.iter().map(|&i| base + i).collect(),
                });
            }

            any_uvs |= uvs.is_some();
            positions.extend(primitive_positions);
        }

        // Primitives without UVs leave empty entries, which the encoder rejects
        let uv_layer = any_uvs.then(|| UvLayer {
            name: "TEXCOORD_0".to_string(),
            faces: uv_faces,
        });

        Ok(EvaluatedMesh {
            positions,
            faces,
            uv_layer,
        })
    }
}

impl ObjectSource for GltfObject<'_> {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn world_transform(&self) -> Mat4 {
        self.info.world_transform
    }

    fn evaluate(&self) -> Result<EvaluatedMesh> {
        self.scene.evaluate_node(self.info)
    }
}

fn collect_mesh_nodes(node: &gltf::Node, parent: Mat4, out: &mut Vec<NodeInfo>) {
    let world_transform = parent * local_transform(node);

    if node.mesh().is_some() {
        out.push(NodeInfo {
            node_index: node.index(),
            name: node_name(node),
            world_transform,
        });
    }

    for child in node.children() {
        collect_mesh_nodes(&child, world_transform, out);
    }
}

fn local_transform(node: &gltf::Node) -> Mat4 {
    Mat4::from_cols_array_2d(&node.transform().matrix())
}

fn node_name(node: &gltf::Node) -> String {
    node.name()
        .or_else(|| node.mesh().and_then(|m| m.name()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()))
}

/// Group a primitive's indices into faces according to its topology
///
/// Strips and fans are expanded to triangles. Point and line primitives produce
/// one- and two-vertex faces.
fn primitive_faces(mode: Mode, indices: &[u32]) -> Vec<SmallVec<[u32; 4]>> {
    let n = indices.len();
    match mode {
        Mode::Triangles => indices.chunks(3).map(SmallVec::from_slice).collect(),
        Mode::TriangleStrip => (0..n.saturating_sub(2))
            .map(|i| {
                if i % 2 == 0 {
                    SmallVec::from_slice(&[indices[i], indices[i + 1], indices[i + 2]])
                } else {
                    SmallVec::from_slice(&[indices[i], indices[i + 2], indices[i + 1]])
                }
            })
            .collect(),
        Mode::TriangleFan => (0..n.saturating_sub(2))
            .map(|i| SmallVec::from_slice(&[indices[i + 1], indices[i + 2], indices[0]]))
            .collect(),
        Mode::Points => indices.chunks(1).map(SmallVec::from_slice).collect(),
        Mode::Lines => indices.chunks(2).map(SmallVec::from_slice).collect(),
        Mode::LineStrip => indices.windows(2).map(SmallVec::from_slice).collect(),
        Mode::LineLoop => {
            let mut segments: Vec<SmallVec<[u32; 4]>> =
                indices.windows(2).map(SmallVec::from_slice).collect();
            if n > 2 {
                segments.push(SmallVec::from_slice(&[indices[n - 1], indices[0]]));
            }
            segments
        }
    }
}
