//! Export driver
//!
//! Evaluates each selected object in turn, encodes its record and appends it to
//! the output. The export is all-or-nothing: records are staged in memory and
//! only written once every object encoded, and files are replaced atomically.

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{ExportError, ExportResult};
use crate::formats::{RecordLayout, encode_record};
use crate::scene::{GltfScene, LoadOptions, ObjectSource, load_obj_scene, select};

/// What to export and how
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub layout: RecordLayout,
    pub load: LoadOptions,
    /// Object names in selection order; empty selects every object
    pub selection: Vec<String>,
}

/// Totals of a finished export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub objects: usize,
    pub vertices: u64,
    pub bytes: usize,
}

/// Scene file formats understood by [`export_scene_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    Obj,
    Gltf,
}

impl SceneFormat {
    /// Detect the format from the file extension
    pub fn detect(input: &Path) -> Result<Self> {
        let ext = input
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "obj" => Ok(Self::Obj),
            "gltf" | "glb" => Ok(Self::Gltf),
            _ => bail!(
                "Unsupported scene format: {:?} (use .obj, .gltf, or .glb)",
                input
            ),
        }
    }
}

/// Resolve a layout name: "world" (no transform, baked positions) or "indexed"
/// (embedded transform and index block, local positions)
pub fn parse_layout(name: &str) -> Result<RecordLayout> {
    match name.to_lowercase().as_str() {
        "world" => Ok(RecordLayout::WORLD),
        "indexed" => Ok(RecordLayout::INDEXED),
        _ => bail!("Unknown record layout '{}' (use world or indexed)", name),
    }
}

/// Encode the records of `objects`, in order, into one buffer
///
/// Each object's mesh is evaluated, consumed and released before the next object
/// is evaluated. The first failure aborts the whole export.
pub fn encode_objects<O: ObjectSource>(
    objects: &[O],
    layout: RecordLayout,
) -> ExportResult<(Vec<u8>, ExportSummary)> {
    let mut bytes = Vec::new();
    let mut summary = ExportSummary::default();

    for object in objects {
        let name = object.name();
        let record = {
            let mesh = object.evaluate().map_err(|source| ExportError::Evaluation {
                object: name.to_string(),
                source,
            })?;
            encode_record(name, &mesh, &object.world_transform(), layout)?
        };

        tracing::debug!(
            "Encoded '{}': {} vertices, {} bytes",
            name,
            record.vertex_count,
            record.bytes.len()
        );

        summary.objects += 1;
        summary.vertices += u64::from(record.vertex_count);
        bytes.extend_from_slice(&record.bytes);
    }

    summary.bytes = bytes.len();
    Ok((bytes, summary))
}

/// Export `objects` into a stream
///
/// Nothing is written to `out` unless every object encoded.
pub fn export_objects<O: ObjectSource, W: Write>(
    objects: &[O],
    layout: RecordLayout,
    out: &mut W,
) -> ExportResult<ExportSummary> {
    let (bytes, summary) = encode_objects(objects, layout)?;
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(summary)
}

/// Export `objects` into a file, replacing it atomically
///
/// On failure the destination is left untouched (and not created).
pub fn export_to_file<O: ObjectSource>(
    objects: &[O],
    layout: RecordLayout,
    output: &Path,
) -> ExportResult<ExportSummary> {
    let (bytes, summary) = encode_objects(objects, layout)?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(&bytes)?;
    staged.flush()?;
    staged.persist(output).map_err(|e| e.error)?;

    Ok(summary)
}

/// Load a scene file, select objects and export them to `output`
pub fn export_scene_file(
    input: &Path,
    output: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary> {
    let summary = match SceneFormat::detect(input)? {
        SceneFormat::Obj => {
            let objects = load_obj_scene(input, &options.load)?;
            let selected = select(&objects, &options.selection)?;
            export_to_file(&selected, options.layout, output)
        }
        SceneFormat::Gltf => {
            let scene = GltfScene::load(input)?;
            let objects = scene.objects();
            let selected = select(&objects, &options.selection)?;
            export_to_file(&selected, options.layout, output)
        }
    }
    .with_context(|| format!("Failed to export {:?} -> {:?}", input, output))?;

    tracing::info!(
        "Exported {} objects: {} vertices, {} bytes",
        summary.objects,
        summary.vertices,
        summary.bytes
    );

    Ok(summary)
}

/// Names of the exportable objects of a scene file, in scene order
pub fn list_scene_objects(input: &Path, load: &LoadOptions) -> Result<Vec<String>> {
    let names = match SceneFormat::detect(input)? {
        SceneFormat::Obj => load_obj_scene(input, load)?
            .iter()
            .map(|o| o.name().to_string())
            .collect(),
        SceneFormat::Gltf => GltfScene::load(input)?
            .objects()
            .iter()
            .map(|o| o.name().to_string())
            .collect(),
    };
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{EvaluatedMesh, Face, SceneObject, UvLayer};
    use glam::{Mat4, Vec2, Vec3};
    use mdl_common::read_records;
    use smallvec::smallvec;

    fn triangle(name: &str, offset: f32) -> SceneObject {
        SceneObject::new(
            name,
            Mat4::from_translation(Vec3::new(offset, 0.0, 0.0)),
            EvaluatedMesh {
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                faces: vec![Face::triangle(0, 1, 2)],
                uv_layer: Some(UvLayer {
                    name: "UVMap".to_string(),
                    faces: vec![smallvec![Vec2::ZERO, Vec2::X, Vec2::Y]],
                }),
            },
        )
    }

    fn quad(name: &str) -> SceneObject {
        let mut object = triangle(name, 0.0);
        object.mesh.positions.push(Vec3::ONE);
        object.mesh.faces[0] = Face::from_slice(&[0, 1, 3, 2]);
        object.mesh.uv_layer.as_mut().unwrap().faces[0].push(Vec2::ONE);
        object
    }

    /// Object whose evaluation fails
    struct Broken;

    impl ObjectSource for Broken {
        fn name(&self) -> &str {
            "Broken"
        }

        fn world_transform(&self) -> Mat4 {
            Mat4::IDENTITY
        }

        fn evaluate(&self) -> Result<EvaluatedMesh> {
            bail!("modifier stack failed")
        }
    }

    #[test]
    fn test_empty_selection_writes_nothing() {
        let objects: Vec<SceneObject> = Vec::new();
        let mut out = Vec::new();
        let summary = export_objects(&objects, RecordLayout::WORLD, &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(summary, ExportSummary::default());
    }

    #[test]
    fn test_records_follow_selection_order() {
        let objects = vec![triangle("a", 1.0), triangle("b", 2.0)];
        let selected = select(&objects, &["b", "a"]).unwrap();
        let mut out = Vec::new();
        let summary = export_objects(&selected, RecordLayout::WORLD, &mut out).unwrap();

        assert_eq!(summary.objects, 2);
        assert_eq!(summary.vertices, 6);
        assert_eq!(summary.bytes, out.len());

        let records = read_records(&out, RecordLayout::WORLD).unwrap();
        assert_eq!(records.len(), 2);
        // World layout bakes each object's translation
        assert_eq!(records[0].positions[0], [2.0, 0.0, 0.0]);
        assert_eq!(records[1].positions[0], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_failure_writes_nothing() {
        let objects = vec![triangle("ok", 0.0), quad("bad")];
        let mut out = Vec::new();
        let err = export_objects(&objects, RecordLayout::WORLD, &mut out).unwrap_err();
        assert!(matches!(
            err,
            ExportError::UnsupportedTopology { ref object, face: 0, vertex_count: 4 } if object == "bad"
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_evaluation_failure_names_object() {
        let objects = vec![Broken];
        let err = encode_objects(&objects, RecordLayout::INDEXED).unwrap_err();
        assert!(matches!(err, ExportError::Evaluation { ref object, .. } if object == "Broken"));
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn test_indexed_export_vertex_count() {
        let objects = vec![triangle("a", 0.0)];
        let (bytes, summary) = encode_objects(&objects, RecordLayout::INDEXED).unwrap();
        assert_eq!(summary.vertices, 3);
        assert_eq!(bytes.len(), RecordLayout::INDEXED.record_size(3));
    }

    #[test]
    fn test_export_to_file_replaces_atomically() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let output = dir.path().join("scene.mdl");
        std::fs::write(&output, b"previous").unwrap();

        // A failing export leaves the previous file intact
        let bad = vec![quad("bad")];
        assert!(export_to_file(&bad, RecordLayout::WORLD, &output).is_err());
        assert_eq!(std::fs::read(&output).unwrap(), b"previous");

        let good = vec![triangle("good", 0.0)];
        let summary = export_to_file(&good, RecordLayout::WORLD, &output).unwrap();
        assert_eq!(std::fs::read(&output).unwrap().len(), summary.bytes);
    }

    #[test]
    fn test_failed_export_creates_no_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let output = dir.path().join("never.mdl");
        let bad = vec![quad("bad")];
        assert!(export_to_file(&bad, RecordLayout::WORLD, &output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_scene_format_detection() {
        assert_eq!(SceneFormat::detect(Path::new("a.OBJ")).unwrap(), SceneFormat::Obj);
        assert_eq!(SceneFormat::detect(Path::new("a.glb")).unwrap(), SceneFormat::Gltf);
        assert!(SceneFormat::detect(Path::new("a.fbx")).is_err());
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!(parse_layout("world").unwrap(), RecordLayout::WORLD);
        assert_eq!(parse_layout("Indexed").unwrap(), RecordLayout::INDEXED);
        assert!(parse_layout("packed").is_err());
    }
}
