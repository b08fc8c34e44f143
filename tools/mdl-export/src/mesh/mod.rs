//! Mesh encoding (evaluated scene mesh -> packed MDL geometry blocks)

mod encoder;
mod types;

// Re-export public API
pub use encoder::encode_faces;
pub use types::EncodedGeometry;
