//! A compact polygonal mesh assembled by the format readers.
//!
//! `ArrayMesh` stores what the readers can deliver and no more: flat vertex
//! records, faces as vertex loops, derived unique-edge and halfedge counts,
//! optional per-halfedge texture coordinates and named custom attributes.
//! Halfedge ids are allocated sequentially per face corner in insertion
//! order, so a face of arity `k` owns the contiguous id range starting at its
//! first corner; ids are therefore stable across a write/read round trip that
//! preserves face order and winding.

pub mod attrib;

use fnv::{FnvHashMap, FnvHashSet};

use crate::importer::Importer;
use attrib::{AttrTable, AttrValue};

pub type Vec2f = vek::Vec2<f32>;
pub type Vec3f = vek::Vec3<f32>;
pub type Rgba = vek::Rgba<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HalfedgeHandle(pub u32);

/// Opaque handle to a named custom attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropHandle(pub u32);

impl VertexHandle {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl FaceHandle {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl HalfedgeHandle {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub point: Vec3f,
    pub normal: Vec3f,
    pub texcoord: Vec2f,
    pub color: Rgba,
}

impl Default for Vertex {
    fn default() -> Self {
        Vertex {
            point: Vec3f::zero(),
            normal: Vec3f::zero(),
            texcoord: Vec2f::zero(),
            color: Rgba::new(0, 0, 0, 255),
        }
    }
}

#[derive(Debug)]
struct Face {
    vertices: Vec<VertexHandle>,
    halfedge_start: u32,
}

#[derive(Debug, Default)]
pub struct ArrayMesh {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    edges: FnvHashSet<(u32, u32)>,
    n_halfedges: u32,
    halfedge_texcoords: FnvHashMap<u32, Vec2f>,
    texfile: Option<String>,
    vertex_attrs: AttrTable,
    face_attrs: AttrTable,
}

impl ArrayMesh {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn n_halfedges(&self) -> usize {
        self.n_halfedges as usize
    }

    pub fn point(&self, vh: VertexHandle) -> Vec3f {
        self.vertices[vh.idx()].point
    }

    pub fn normal(&self, vh: VertexHandle) -> Vec3f {
        self.vertices[vh.idx()].normal
    }

    pub fn texcoord(&self, vh: VertexHandle) -> Vec2f {
        self.vertices[vh.idx()].texcoord
    }

    pub fn color(&self, vh: VertexHandle) -> Rgba {
        self.vertices[vh.idx()].color
    }

    pub fn face_vertices(&self, fh: FaceHandle) -> &[VertexHandle] {
        &self.faces[fh.idx()].vertices
    }

    /// Handle of the `corner`-th halfedge of a face (corner 0 leaves the
    /// first vertex of the face loop).
    pub fn halfedge_handle(&self, fh: FaceHandle, corner: usize) -> HalfedgeHandle {
        let face = &self.faces[fh.idx()];
        debug_assert!(corner < face.vertices.len());
        HalfedgeHandle(face.halfedge_start + corner as u32)
    }

    pub fn halfedge_texcoord(&self, heh: HalfedgeHandle) -> Vec2f {
        self.halfedge_texcoords
            .get(&heh.0)
            .copied()
            .unwrap_or_else(Vec2f::zero)
    }

    pub fn set_halfedge_texcoord(&mut self, heh: HalfedgeHandle, uv: Vec2f) {
        self.halfedge_texcoords.insert(heh.0, uv);
    }

    pub fn texfile(&self) -> Option<&str> {
        self.texfile.as_deref()
    }

    pub fn vertex_property(&self, ph: PropHandle, vh: VertexHandle) -> Option<&AttrValue> {
        self.vertex_attrs.get(ph.0 as usize, vh.idx())
    }

    pub fn face_property(&self, ph: PropHandle, fh: FaceHandle) -> Option<&AttrValue> {
        self.face_attrs.get(ph.0 as usize, fh.idx())
    }
}

impl Importer for ArrayMesh {
    fn reserve(&mut self, n_vertices: usize, _n_edges: usize, n_faces: usize) {
        self.vertices.reserve(n_vertices);
        self.faces.reserve(n_faces);
    }

    fn add_vertex(&mut self) -> VertexHandle {
        let vh = VertexHandle(self.vertices.len() as u32);
        self.vertices.push(Vertex::default());
        vh
    }

    fn add_vertex_at(&mut self, point: Vec3f) -> VertexHandle {
        let vh = self.add_vertex();
        self.vertices[vh.idx()].point = point;
        vh
    }

    fn set_point(&mut self, vh: VertexHandle, point: Vec3f) {
        self.vertices[vh.idx()].point = point;
    }

    fn set_normal(&mut self, vh: VertexHandle, normal: Vec3f) {
        self.vertices[vh.idx()].normal = normal;
    }

    fn set_texcoord(&mut self, vh: VertexHandle, uv: Vec2f) {
        self.vertices[vh.idx()].texcoord = uv;
    }

    fn set_color(&mut self, vh: VertexHandle, color: Rgba) {
        self.vertices[vh.idx()].color = color;
    }

    fn add_face(&mut self, vertices: &[VertexHandle]) -> Option<FaceHandle> {
        if vertices.len() < 3 {
            return None;
        }
        for (i, vh) in vertices.iter().enumerate() {
            if vh.idx() >= self.vertices.len() || vertices[..i].contains(vh) {
                return None;
            }
        }

        let fh = FaceHandle(self.faces.len() as u32);
        let halfedge_start = self.n_halfedges;
        self.n_halfedges += vertices.len() as u32;

        for (i, vh) in vertices.iter().enumerate() {
            let a = vh.0;
            let b = vertices[(i + 1) % vertices.len()].0;
            self.edges.insert((a.min(b), a.max(b)));
        }

        self.faces.push(Face {
            vertices: vertices.to_vec(),
            halfedge_start,
        });
        Some(fh)
    }

    fn add_face_texcoords(&mut self, fh: FaceHandle, anchor: VertexHandle, coords: &[Vec2f]) {
        let (start, arity, anchor_corner) = {
            let face = &self.faces[fh.idx()];
            let corner = face.vertices.iter().position(|vh| *vh == anchor);
            match corner {
                Some(c) => (face.halfedge_start, face.vertices.len(), c),
                None => return,
            }
        };
        for (i, uv) in coords.iter().enumerate().take(arity) {
            let corner = (anchor_corner + i) % arity;
            self.halfedge_texcoords.insert(start + corner as u32, *uv);
        }
    }

    fn set_texfile(&mut self, name: &str) {
        self.texfile = Some(name.to_owned());
    }

    fn vertex_property_handle(&self, name: &str) -> Option<PropHandle> {
        self.vertex_attrs.handle(name).map(|c| PropHandle(c as u32))
    }

    fn add_vertex_property(&mut self, name: &str) -> PropHandle {
        PropHandle(self.vertex_attrs.ensure(name) as u32)
    }

    fn set_vertex_property(&mut self, ph: PropHandle, vh: VertexHandle, value: AttrValue) {
        self.vertex_attrs.set(ph.0 as usize, vh.idx(), value);
    }

    fn face_property_handle(&self, name: &str) -> Option<PropHandle> {
        self.face_attrs.handle(name).map(|c| PropHandle(c as u32))
    }

    fn add_face_property(&mut self, name: &str) -> PropHandle {
        PropHandle(self.face_attrs.ensure(name) as u32)
    }

    fn set_face_property(&mut self, ph: PropHandle, fh: FaceHandle, value: AttrValue) {
        self.face_attrs.set(ph.0 as usize, fh.idx(), value);
    }
}
