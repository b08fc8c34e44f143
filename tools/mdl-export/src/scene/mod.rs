//! Scene read interfaces
//!
//! The exporter never owns a scene graph. It reads objects through [`ObjectSource`]:
//! a name, a world transform, and an evaluated mesh that lives only for the
//! duration of that object's export.
//!
//! Two scene backends are provided: [`gltf`] (glTF/GLB) and [`obj`] (Wavefront OBJ).

pub mod gltf;
pub mod obj;

use anyhow::{Result, bail};
use glam::{Mat4, Vec2, Vec3};
use smallvec::SmallVec;

pub use self::gltf::GltfScene;
pub use self::obj::load_obj_scene;

/// Scene loading options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fan-triangulate polygons before export (OBJ only; glTF is already triangulated)
    pub triangulate: bool,
}

/// One face of an evaluated mesh, as an ordered list of vertex references
///
/// Faces keep whatever size the scene produced; the encoder rejects anything
/// that is not a triangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub vertices: SmallVec<[u32; 4]>,
}

impl Face {
    pub fn triangle(a: u32, b: u32, c: u32) -> Self {
        Self {
            vertices: SmallVec::from_slice(&[a, b, c]),
        }
    }

    pub fn from_slice(vertices: &[u32]) -> Self {
        Self {
            vertices: SmallVec::from_slice(vertices),
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Per-face UV coordinates, aligned with the mesh faces by face index
///
/// Coordinates use the host convention: origin at the bottom-left of the texture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UvLayer {
    pub name: String,
    pub faces: Vec<SmallVec<[Vec2; 4]>>,
}

/// A mesh evaluated for the current scene state
///
/// Dropping it releases everything the evaluation allocated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluatedMesh {
    pub positions: Vec<Vec3>,
    pub faces: Vec<Face>,
    /// Active UV layer, `None` when the mesh has no texture coordinates
    pub uv_layer: Option<UvLayer>,
}

impl EvaluatedMesh {
    /// Number of corners the mesh contributes to a record, assuming all triangles
    pub fn corner_count(&self) -> usize {
        self.faces.len() * 3
    }
}

/// Read-only view of one exportable scene object
pub trait ObjectSource {
    /// Object name, used in logs and errors
    fn name(&self) -> &str;

    /// Local-to-world transform
    fn world_transform(&self) -> Mat4;

    /// Evaluate the object's final mesh for the current scene state
    ///
    /// The returned mesh is owned by the caller and released when dropped.
    fn evaluate(&self) -> Result<EvaluatedMesh>;
}

impl<T: ObjectSource + ?Sized> ObjectSource for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn world_transform(&self) -> Mat4 {
        (**self).world_transform()
    }

    fn evaluate(&self) -> Result<EvaluatedMesh> {
        (**self).evaluate()
    }
}

/// An object whose mesh has already been evaluated
///
/// Used by the OBJ backend and anywhere geometry is built in memory.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub world_transform: Mat4,
    pub mesh: EvaluatedMesh,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, world_transform: Mat4, mesh: EvaluatedMesh) -> Self {
        Self {
            name: name.into(),
            world_transform,
            mesh,
        }
    }
}

impl ObjectSource for SceneObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    fn evaluate(&self) -> Result<EvaluatedMesh> {
        Ok(self.mesh.clone())
    }
}

/// Pick the selected objects, in selection order
///
/// An empty selection means every object, in scene order. Unknown names are an error.
pub fn select<'a, T, S>(objects: &'a [T], selection: &[S]) -> Result<Vec<&'a T>>
where
    T: ObjectSource,
    S: AsRef<str>,
{
    if selection.is_empty() {
        return Ok(objects.iter().collect());
    }

    let mut selected = Vec::with_capacity(selection.len());
    for name in selection {
        let name = name.as_ref();
        match objects.iter().find(|o| o.name() == name) {
            Some(object) => selected.push(object),
            None => {
                let available: Vec<&str> = objects.iter().map(|o| o.name()).collect();
                bail!(
                    "Object '{}' not found in scene (available: {})",
                    name,
                    available.join(", ")
                );
            }
        }
    }

    Ok(selected)
}

/// Split a polygon into a triangle fan around its first corner
///
/// Returns the corner positions (indices into `polygon`) of each triangle.
pub(crate) fn fan_triangles(corner_count: usize) -> impl Iterator<Item = [usize; 3]> {
    (1..corner_count.saturating_sub(1)).map(|i| [0, i, i + 1])
}
