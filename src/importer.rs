//! The sink contract format readers deliver decoded meshes into.

use crate::mesh::attrib::AttrValue;
use crate::mesh::{FaceHandle, PropHandle, Rgba, Vec2f, Vec3f, VertexHandle};

/// Receives a mesh as a reader decodes it.
///
/// Readers call these operations in stream order and never look back at data
/// they have already delivered; an implementation is free to build whatever
/// structure it likes. Attribute setters may be called for handles in any
/// order but always with handles the same read call produced.
pub trait Importer {
    /// Capacity hint. Has no observable effect.
    fn reserve(&mut self, n_vertices: usize, n_edges: usize, n_faces: usize);

    /// Creates a vertex with default attributes, to be filled in afterwards.
    fn add_vertex(&mut self) -> VertexHandle;

    /// Creates a vertex with its final position in one call.
    fn add_vertex_at(&mut self, point: Vec3f) -> VertexHandle;

    fn set_point(&mut self, vh: VertexHandle, point: Vec3f);
    fn set_normal(&mut self, vh: VertexHandle, normal: Vec3f);
    fn set_texcoord(&mut self, vh: VertexHandle, uv: Vec2f);
    fn set_color(&mut self, vh: VertexHandle, color: Rgba);

    /// Adds a face over the given vertex loop, or `None` if the sink rejects
    /// the topology. Readers skip per-face attribute delivery for rejected
    /// faces but keep decoding.
    fn add_face(&mut self, vertices: &[VertexHandle]) -> Option<FaceHandle>;

    /// Delivers per-corner texture coordinates for `fh`, starting at the
    /// corner that leaves `anchor`.
    fn add_face_texcoords(&mut self, fh: FaceHandle, anchor: VertexHandle, coords: &[Vec2f]);

    /// Records the texture file referenced by the stream, if any.
    fn set_texfile(&mut self, name: &str);

    fn vertex_property_handle(&self, name: &str) -> Option<PropHandle>;
    fn add_vertex_property(&mut self, name: &str) -> PropHandle;
    fn set_vertex_property(&mut self, ph: PropHandle, vh: VertexHandle, value: AttrValue);

    fn face_property_handle(&self, name: &str) -> Option<PropHandle>;
    fn add_face_property(&mut self, name: &str) -> PropHandle;
    fn set_face_property(&mut self, ph: PropHandle, fh: FaceHandle, value: AttrValue);
}
