//! MDL binary model formats
//!
//! POD (Plain Old Data) records with no magic bytes. The record layout is decided
//! by context, so writers and readers share [`RecordLayout`].

pub mod mdl;

pub use mdl::*;
