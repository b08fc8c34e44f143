//! Shared types and utilities for MDL model files
//!
//! This crate provides format-level code shared between:
//! - `mdl-export` (scene export pipeline)
//! - engine-side loaders reading `.mdl` records
//!
//! # Modules
//!
//! - [`packing`] - Big-endian geometry packing (positions, flipped UVs, transforms)
//! - [`formats`] - MDL record layout and decoder

pub mod formats;
pub mod packing;

// Re-export commonly used packing items
pub use packing::{
    MATRIX_SIZE, POSITION_SIZE, SCALAR_SIZE, UV_SIZE, flip_uv, pack_f32s_be, pack_matrix_be,
    pack_position_be, pack_uv_flipped_be, unpack_f32_be, unpack_u32_be,
};

// Re-export commonly used format items
pub use formats::{
    COUNT_SIZE, DecodeError, MDL_EXT, MdlRecord, RecordLayout, TEXCOORD_TRIANGLE_SIZE,
    read_record, read_records,
};
