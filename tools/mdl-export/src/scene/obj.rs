//! Wavefront OBJ scene backend
//!
//! `o` lines start objects, and so do `g` lines outside of an `o` object. Faces
//! keep their polygon size unless triangulation is requested. Positions are
//! re-indexed into a compact pool per object. OBJ texture coordinates already use
//! a bottom-left origin.

use anyhow::{Context, Result, bail};
use glam::{Mat4, Vec2, Vec3};
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{EvaluatedMesh, Face, LoadOptions, SceneObject, UvLayer, fan_triangles};

/// Face corner: global position index and optional global texcoord index
type Corner = (u32, Option<u32>);

/// Object being accumulated while parsing
struct ObjObject {
    name: String,
    /// Named by an `o` statement; groups inside it do not rename or split it
    named_by_o: bool,
    faces: Vec<SmallVec<[Corner; 4]>>,
}

/// Load every object of an OBJ file
///
/// A file without `o`/`g` statements yields a single object named after the file stem.
pub fn load_obj_scene(input: &Path, options: &LoadOptions) -> Result<Vec<SceneObject>> {
    let file = File::open(input).with_context(|| format!("Failed to open OBJ: {:?}", input))?;
    let default_name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("object");

    parse_obj(BufReader::new(file), default_name, options)
        .with_context(|| format!("Failed to parse OBJ: {:?}", input))
}

/// Parse OBJ text into scene objects
pub fn parse_obj<R: BufRead>(
    reader: R,
    default_name: &str,
    options: &LoadOptions,
) -> Result<Vec<SceneObject>> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut tex_coords: Vec<Vec2> = Vec::new();
    let mut objects: Vec<ObjObject> = vec![ObjObject {
        name: default_name.to_string(),
        named_by_o: false,
        faces: Vec::new(),
    }];

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" if parts.len() >= 4 => {
                let x = parse_float(parts[1], line_number)?;
                let y = parse_float(parts[2], line_number)?;
                let z = parse_float(parts[3], line_number)?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" if parts.len() >= 3 => {
                let u = parse_float(parts[1], line_number)?;
                let v = parse_float(parts[2], line_number)?;
                tex_coords.push(Vec2::new(u, v));
            }
            "o" | "g" => {
                let named_by_o = parts[0] == "o";
                let name = parts[1..].join(" ");
                let name = if name.is_empty() {
                    default_name.to_string()
                } else {
                    name
                };
                match objects.last_mut() {
                    // `o Cube` followed by `g Cube_Material` is still object "Cube"
                    Some(current) if !named_by_o && current.named_by_o => {}
                    Some(current) if current.faces.is_empty() => {
                        current.name = name;
                        current.named_by_o = named_by_o;
                    }
                    _ => objects.push(ObjObject {
                        name,
                        named_by_o,
                        faces: Vec::new(),
                    }),
                }
            }
            "f" => {
                let mut corners: SmallVec<[Corner; 4]> = SmallVec::new();
                for reference in &parts[1..] {
                    corners.push(parse_obj_vertex(
                        reference,
                        positions.len(),
                        tex_coords.len(),
                        line_number,
                    )?);
                }

                let Some(current) = objects.last_mut() else {
                    continue;
                };
                if options.triangulate && corners.len() > 3 {
                    for [a, b, c] in fan_triangles(corners.len()) {
                        current
                            .faces
                            .push(SmallVec::from_slice(&[corners[a], corners[b], corners[c]]));
                    }
                } else {
                    current.faces.push(corners);
                }
            }
            _ => {}
        }
    }

    let scene: Vec<SceneObject> = objects
        .into_iter()
        .filter(|o| !o.faces.is_empty())
        .map(|o| build_object(o, &positions, &tex_coords))
        .collect();

    tracing::debug!(
        "OBJ scene: {} objects, {} positions, {} texcoords",
        scene.len(),
        positions.len(),
        tex_coords.len()
    );

    Ok(scene)
}

/// Build an object's mesh with its own compact position pool
fn build_object(object: ObjObject, positions: &[Vec3], tex_coords: &[Vec2]) -> SceneObject {
    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut local_positions: Vec<Vec3> = Vec::new();
    let mut faces = Vec::with_capacity(object.faces.len());
    let mut uv_faces = Vec::with_capacity(object.faces.len());
    let mut any_uvs = false;

    for corners in &object.faces {
        let mut vertices: SmallVec<[u32; 4]> = SmallVec::new();
        let mut uvs: SmallVec<[Vec2; 4]> = SmallVec::new();

        for &(position_index, uv_index) in corners {
            let local = *remap.entry(position_index).or_insert_with(|| {
                local_positions.push(positions[position_index as usize]);
                (local_positions.len() - 1) as u32
            });
            vertices.push(local);

            if let Some(uv_index) = uv_index {
                uvs.push(tex_coords[uv_index as usize]);
                any_uvs = true;
            }
        }

        faces.push(Face { vertices });
        uv_faces.push(uvs);
    }

    let uv_layer = any_uvs.then(|| UvLayer {
        name: "vt".to_string(),
        faces: uv_faces,
    });

    SceneObject::new(
        object.name,
        Mat4::IDENTITY,
        EvaluatedMesh {
            positions: local_positions,
            faces,
            uv_layer,
        },
    )
}

fn parse_float(s: &str, line_number: usize) -> Result<f32> {
    s.parse()
        .with_context(|| format!("Line {}: invalid number '{}'", line_number + 1, s))
}

/// Parse OBJ vertex reference: "v", "v/vt", "v/vt/vn", or "v//vn"
///
/// Indices are 1-based; negative indices count back from the latest element.
fn parse_obj_vertex(
    s: &str,
    position_count: usize,
    tex_coord_count: usize,
    line_number: usize,
) -> Result<Corner> {
    let mut parts = s.split('/');

    let vi = match parts.next() {
        Some(p) if !p.is_empty() => resolve_index(p, position_count, line_number)?,
        _ => bail!("Line {}: face corner '{}' has no vertex", line_number + 1, s),
    };

    let vti = match parts.next() {
        Some(p) if !p.is_empty() => Some(resolve_index(p, tex_coord_count, line_number)?),
        _ => None,
    };

    Ok((vi, vti))
}

fn resolve_index(s: &str, count: usize, line_number: usize) -> Result<u32> {
    let raw: i64 = s
        .parse()
        .with_context(|| format!("Line {}: invalid index '{}'", line_number + 1, s))?;

    let resolved = if raw > 0 {
        raw - 1
    } else {
        count as i64 + raw
    };

    if raw == 0 || resolved < 0 || resolved >= count as i64 {
        bail!(
            "Line {}: index {} out of range ({} defined)",
            line_number + 1,
            raw,
            count
        );
    }

    Ok(resolved as u32)
}
