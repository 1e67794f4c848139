//! Polygonal mesh I/O for the PLY (Stanford polygon) family of formats.
//!
//! The interesting half is the reader: an ASCII header is parsed into a
//! declarative [`formats::ply::Schema`], which then drives a type-directed
//! streaming decode of the ASCII or binary payload into any sink implementing
//! [`importer::Importer`]. A compact [`mesh::ArrayMesh`] is provided as the
//! default sink, and a writer covers the same attribute set for round trips.

pub mod formats;
pub mod importer;
pub mod mesh;

pub use formats::options::Options;
pub use importer::Importer;
pub use mesh::ArrayMesh;
