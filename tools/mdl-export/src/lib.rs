//! mdl-export library
//!
//! Encodes scene objects into big-endian MDL geometry records, for use by the
//! `mdl-export` binary and other tools.

pub mod error;
pub mod export;
pub mod formats;
pub mod manifest;
pub mod mesh;
pub mod scene;

pub use error::{ExportError, ExportResult};

// Re-export the format definitions and packers from mdl-common
pub use mdl_common::{
    DecodeError, MDL_EXT, MdlRecord, RecordLayout, flip_uv, pack_matrix_be, pack_position_be,
    pack_uv_flipped_be, read_record, read_records,
};

pub use export::{
    ExportOptions, ExportSummary, SceneFormat, encode_objects, export_objects, export_scene_file,
    export_to_file, list_scene_objects, parse_layout,
};
pub use formats::{EncodedRecord, encode_record, write_mdl_record};
pub use mesh::{EncodedGeometry, encode_faces};
pub use scene::{
    EvaluatedMesh, Face, GltfScene, LoadOptions, ObjectSource, SceneObject, UvLayer, select,
};
