//! Binary decoding, round trips and endianness behavior.

use plymesh::formats::ply::{read_ply, write_ply, PlyError};
use plymesh::mesh::{ArrayMesh, HalfedgeHandle, Vec2f, VertexHandle};
use plymesh::{Importer, Options};

const CUBE_MINIMAL: &str = "\
ply
format ascii 1.0
element vertex 8
property float32 x
property float32 y
property float32 z
element face 12
property list uint8 int32 vertex_indices
end_header
-1 -1 -1
1 -1 -1
1 1 -1
-1 1 -1
-1 -1 1
1 -1 1
1 1 1
-1 1 1
3 0 1 2
3 0 2 3
3 7 6 5
3 7 5 4
3 0 4 5
3 0 5 1
3 1 5 6
3 1 6 2
3 2 6 7
3 2 7 3
3 3 7 4
3 3 4 0
";

fn load_ascii(text: &str, requested: Options) -> ArrayMesh {
    let mut mesh = ArrayMesh::new();
    read_ply(text.as_bytes(), &mut mesh, requested).expect("ascii fixture should load");
    mesh
}

fn roundtrip(mesh: &ArrayMesh, write_options: Options, requested: Options) -> (ArrayMesh, Options) {
    let mut bytes = Vec::new();
    write_ply(mesh, &mut bytes, write_options).expect("write should succeed");
    let mut reread = ArrayMesh::new();
    let observed =
        read_ply(bytes.as_slice(), &mut reread, requested).expect("reread should succeed");
    (reread, observed)
}

#[test]
fn little_and_big_endian_payloads_decode_identically() {
    let mesh = load_ascii(CUBE_MINIMAL, Options::empty());

    let le_options = Options::BINARY | Options::LSB;
    let be_options = Options::BINARY | Options::MSB;
    let (le, le_observed) = roundtrip(&mesh, le_options, Options::empty());
    let (be, be_observed) = roundtrip(&mesh, be_options, Options::empty());

    assert!(le_observed.is_binary());
    assert!(be_observed.is_binary());

    assert_eq!(le.n_vertices(), 8);
    assert_eq!(be.n_vertices(), 8);
    assert_eq!(le.n_edges(), 18);
    assert_eq!(be.n_edges(), 18);
    assert_eq!(le.n_faces(), 12);
    assert_eq!(be.n_faces(), 12);

    for i in 0..8 {
        let vh = VertexHandle(i);
        assert_eq!(le.point(vh), mesh.point(vh));
        assert_eq!(be.point(vh), mesh.point(vh));
    }
    for i in 0..12 {
        let fh = plymesh::mesh::FaceHandle(i);
        assert_eq!(le.face_vertices(fh), mesh.face_vertices(fh));
        assert_eq!(be.face_vertices(fh), mesh.face_vertices(fh));
    }
}

#[test]
fn swap_flips_the_written_byte_order() {
    let mesh = load_ascii(CUBE_MINIMAL, Options::empty());

    let mut straight = Vec::new();
    write_ply(&mesh, &mut straight, Options::BINARY | Options::MSB).unwrap();
    let mut swapped = Vec::new();
    write_ply(&mesh, &mut swapped, Options::BINARY | Options::SWAP).unwrap();

    // swapping the default little-endian order declares and writes big endian
    assert_eq!(straight, swapped);
}

#[test]
fn binary_vertex_colors_roundtrip() {
    let mut mesh = ArrayMesh::new();
    let colors = [(10u8, 100u8, 200u8), (255, 0, 0), (0, 0, 255)];
    for (i, _) in colors.iter().enumerate() {
        let vh = mesh.add_vertex_at(plymesh::mesh::Vec3f::new(i as f32, 0.0, 0.0));
        let (r, g, b) = colors[i];
        mesh.set_color(vh, plymesh::mesh::Rgba::new(r, g, b, 255));
    }
    assert!(mesh.add_face(&[VertexHandle(0), VertexHandle(1), VertexHandle(2)]).is_some());

    let write_options = Options::BINARY | Options::VERTEX_COLOR;
    let (reread, observed) = roundtrip(&mesh, write_options, Options::VERTEX_COLOR);

    assert!(observed.is_binary());
    assert!(observed.vertex_has_color());
    for i in 0..3 {
        let vh = VertexHandle(i as u32);
        assert_eq!(reread.color(vh), mesh.color(vh), "color of vertex {}", i);
    }
}

#[test]
fn float_color_roundtrip_stays_within_one_lsb() {
    let mut mesh = ArrayMesh::new();
    let channels = [0u8, 1, 86, 127, 128, 200, 254, 255];
    for (i, c) in channels.iter().enumerate() {
        let vh = mesh.add_vertex_at(plymesh::mesh::Vec3f::new(i as f32, 0.0, 0.0));
        mesh.set_color(vh, plymesh::mesh::Rgba::new(*c, *c, *c, 255));
    }
    assert!(mesh.add_face(&[VertexHandle(0), VertexHandle(1), VertexHandle(2)]).is_some());

    for write_options in [
        Options::VERTEX_COLOR | Options::COLOR_FLOAT,
        Options::VERTEX_COLOR | Options::COLOR_FLOAT | Options::BINARY,
    ] {
        let (reread, observed) = roundtrip(&mesh, write_options, Options::VERTEX_COLOR);
        assert!(observed.color_is_float());
        assert!(observed.vertex_has_color());
        for (i, c) in channels.iter().enumerate() {
            let got = reread.color(VertexHandle(i as u32)).r;
            assert!(
                (got as i32 - *c as i32).abs() <= 1,
                "channel {} came back as {}",
                c,
                got
            );
        }
    }
}

#[test]
fn binary_face_texcoords_and_texfile_roundtrip() {
    let mut mesh = load_ascii(CUBE_MINIMAL, Options::empty());

    let assignments = [
        (0u32, (1.0f32, 1.0f32)),
        (10, (3.0, 3.0)),
        (19, (6.0, 6.0)),
        (24, (7.0, 7.0)),
        (30, (9.0, 9.0)),
        (35, (12.0, 12.0)),
    ];
    for (heh, (u, v)) in assignments {
        mesh.set_halfedge_texcoord(HalfedgeHandle(heh), Vec2f::new(u, v));
    }
    mesh.set_texfile("texture.png");

    let write_options = Options::BINARY | Options::FACE_TEXCOORD | Options::TEX_FILE;
    let requested = Options::FACE_TEXCOORD | Options::TEX_FILE;
    let (reread, observed) = roundtrip(&mesh, write_options, requested);

    assert_eq!(reread.n_vertices(), 8);
    assert_eq!(reread.n_edges(), 18);
    assert_eq!(reread.n_faces(), 12);

    assert!(observed.is_binary());
    assert!(observed.face_has_texcoord());
    assert!(observed.has_texfile());

    for (heh, (u, v)) in assignments {
        assert_eq!(
            reread.halfedge_texcoord(HalfedgeHandle(heh)),
            Vec2f::new(u, v),
            "texcoord at halfedge {}",
            heh
        );
    }
    assert_eq!(reread.texfile(), Some("texture.png"));
}

/// Builds a little-endian binary cube whose vertex element carries an extra
/// float property the reader must skip over.
fn binary_cube_with_vertex_quality() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(
        b"ply\n\
          format binary_little_endian 1.0\n\
          element vertex 3\n\
          property float x\n\
          property float y\n\
          property float z\n\
          property float quality\n\
          element face 1\n\
          property list uchar int vertex_indices\n\
          end_header\n",
    );
    for i in 0..3u32 {
        for v in [i as f32, 2.0 * i as f32, 3.0 * i as f32, 0.25] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    bytes.push(3);
    for idx in [0i32, 1, 2] {
        bytes.extend_from_slice(&idx.to_le_bytes());
    }
    bytes
}

#[test]
fn binary_vertex_customs_are_consumed_but_not_materialized() {
    let bytes = binary_cube_with_vertex_quality();
    let mut mesh = ArrayMesh::new();
    let observed = read_ply(bytes.as_slice(), &mut mesh, Options::CUSTOM).expect("should load");

    assert_eq!(mesh.n_vertices(), 3);
    assert_eq!(mesh.n_faces(), 1);
    assert_eq!(mesh.point(VertexHandle(2)), plymesh::mesh::Vec3f::new(2.0, 4.0, 6.0));
    // demoted, so no custom property appears even though one was requested
    assert!(mesh.vertex_property_handle("quality").is_none());
    assert!(!observed.contains(Options::CUSTOM));
}

#[test]
fn binary_custom_face_properties_are_fatal() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(
        b"ply\n\
          format binary_little_endian 1.0\n\
          element vertex 3\n\
          property float x\n\
          property float y\n\
          property float z\n\
          element face 1\n\
          property list uchar int vertex_indices\n\
          property uint faceIndex\n\
          end_header\n",
    );
    for v in [0.0f32; 9] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes.push(3);
    for idx in [0i32, 1, 2] {
        bytes.extend_from_slice(&idx.to_le_bytes());
    }
    bytes.extend_from_slice(&0u32.to_le_bytes());

    let mut mesh = ArrayMesh::new();
    let err = read_ply(bytes.as_slice(), &mut mesh, Options::CUSTOM);
    assert!(matches!(err, Err(PlyError::UnsupportedBinaryFace(name)) if name == "faceIndex"));
}

#[test]
fn truncated_binary_payload_is_fatal() {
    let bytes = binary_cube_with_vertex_quality();
    let cut = bytes.len() - 5;
    let mut mesh = ArrayMesh::new();
    let err = read_ply(&bytes[..cut], &mut mesh, Options::empty());
    assert!(matches!(err, Err(PlyError::TruncatedStream)));
}
