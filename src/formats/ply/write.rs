//! Writer half: serializes an [`ArrayMesh`] back out as PLY.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use itertools::Itertools;

use super::PlyError;
use crate::formats::options::Options;
use crate::mesh::{ArrayMesh, FaceHandle, VertexHandle};

/// Writes `mesh` as PLY. `options` picks the encoding (`BINARY` plus
/// `MSB`/`LSB`, with `SWAP` flipping the chosen byte order) and which
/// attributes appear: normals, texcoords, colors (`COLOR_FLOAT` emits float
/// channels in [0, 1], `COLOR_ALPHA` adds the alpha channel), per-face
/// texture coordinates and the `TextureFile` comment.
///
/// Face texcoords follow the reader's two count conventions: binary rows
/// carry a leading coordinate count of `2k`, ascii rows carry the `k` pairs
/// alone (the reader derives their count from the face's vertex arity).
pub fn write_ply<W: Write>(mesh: &ArrayMesh, out: &mut W, options: Options) -> Result<(), PlyError> {
    let binary = options.is_binary();
    let mut big_endian = options.contains(Options::MSB);
    if options.contains(Options::SWAP) {
        big_endian = !big_endian;
    }

    writeln!(out, "ply")?;
    let format = if !binary {
        "ascii"
    } else if big_endian {
        "binary_big_endian"
    } else {
        "binary_little_endian"
    };
    writeln!(out, "format {} 1.0", format)?;

    if options.has_texfile() {
        if let Some(name) = mesh.texfile() {
            writeln!(out, "comment TextureFile {}", name)?;
        }
    }

    writeln!(out, "element vertex {}", mesh.n_vertices())?;
    writeln!(out, "property float x")?;
    writeln!(out, "property float y")?;
    writeln!(out, "property float z")?;
    if options.vertex_has_normal() {
        writeln!(out, "property float nx")?;
        writeln!(out, "property float ny")?;
        writeln!(out, "property float nz")?;
    }
    if options.vertex_has_texcoord() {
        writeln!(out, "property float u")?;
        writeln!(out, "property float v")?;
    }
    if options.vertex_has_color() {
        let channel = if options.color_is_float() { "float" } else { "uchar" };
        writeln!(out, "property {} red", channel)?;
        writeln!(out, "property {} green", channel)?;
        writeln!(out, "property {} blue", channel)?;
        if options.color_has_alpha() {
            writeln!(out, "property {} alpha", channel)?;
        }
    }

    writeln!(out, "element face {}", mesh.n_faces())?;
    writeln!(out, "property list uchar int vertex_indices")?;
    if options.face_has_texcoord() {
        writeln!(out, "property list uchar float texcoord")?;
    }
    writeln!(out, "end_header")?;

    if binary {
        if big_endian {
            write_payload_binary::<BigEndian, W>(mesh, out, options)
        } else {
            write_payload_binary::<LittleEndian, W>(mesh, out, options)
        }
    } else {
        write_payload_ascii(mesh, out, options)
    }
}

/// [`write_ply`] to a freshly created file.
pub fn write_ply_path<P: AsRef<Path>>(
    mesh: &ArrayMesh,
    path: P,
    options: Options,
) -> Result<(), PlyError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_ply(mesh, &mut out, options)?;
    out.flush()?;
    Ok(())
}

fn write_payload_ascii<W: Write>(
    mesh: &ArrayMesh,
    out: &mut W,
    options: Options,
) -> Result<(), PlyError> {
    for i in 0..mesh.n_vertices() {
        let vh = VertexHandle(i as u32);
        let mut fields: Vec<String> = Vec::new();
        let p = mesh.point(vh);
        fields.extend([p.x, p.y, p.z].iter().map(|v| v.to_string()));
        if options.vertex_has_normal() {
            let n = mesh.normal(vh);
            fields.extend([n.x, n.y, n.z].iter().map(|v| v.to_string()));
        }
        if options.vertex_has_texcoord() {
            let uv = mesh.texcoord(vh);
            fields.extend([uv.x, uv.y].iter().map(|v| v.to_string()));
        }
        if options.vertex_has_color() {
            let c = mesh.color(vh);
            let mut channels = vec![c.r, c.g, c.b];
            if options.color_has_alpha() {
                channels.push(c.a);
            }
            if options.color_is_float() {
                fields.extend(channels.iter().map(|c| (*c as f32 / 255.0).to_string()));
            } else {
                fields.extend(channels.iter().map(|c| c.to_string()));
            }
        }
        writeln!(out, "{}", fields.iter().join(" "))?;
    }

    for i in 0..mesh.n_faces() {
        let fh = FaceHandle(i as u32);
        let loop_ = mesh.face_vertices(fh);
        let mut fields: Vec<String> = Vec::with_capacity(loop_.len() + 1);
        fields.push(loop_.len().to_string());
        fields.extend(loop_.iter().map(|vh| vh.0.to_string()));
        if options.face_has_texcoord() {
            // no leading count in ascii: the reader takes the pair count
            // from the face's vertex arity
            for corner in 0..loop_.len() {
                let uv = mesh.halfedge_texcoord(mesh.halfedge_handle(fh, corner));
                fields.push(uv.x.to_string());
                fields.push(uv.y.to_string());
            }
        }
        writeln!(out, "{}", fields.iter().join(" "))?;
    }

    Ok(())
}

fn write_payload_binary<O: ByteOrder, W: Write>(
    mesh: &ArrayMesh,
    out: &mut W,
    options: Options,
) -> Result<(), PlyError> {
    for i in 0..mesh.n_vertices() {
        let vh = VertexHandle(i as u32);
        let p = mesh.point(vh);
        out.write_f32::<O>(p.x)?;
        out.write_f32::<O>(p.y)?;
        out.write_f32::<O>(p.z)?;
        if options.vertex_has_normal() {
            let n = mesh.normal(vh);
            out.write_f32::<O>(n.x)?;
            out.write_f32::<O>(n.y)?;
            out.write_f32::<O>(n.z)?;
        }
        if options.vertex_has_texcoord() {
            let uv = mesh.texcoord(vh);
            out.write_f32::<O>(uv.x)?;
            out.write_f32::<O>(uv.y)?;
        }
        if options.vertex_has_color() {
            let c = mesh.color(vh);
            let mut channels = vec![c.r, c.g, c.b];
            if options.color_has_alpha() {
                channels.push(c.a);
            }
            for channel in channels {
                if options.color_is_float() {
                    out.write_f32::<O>(channel as f32 / 255.0)?;
                } else {
                    out.write_u8(channel)?;
                }
            }
        }
    }

    for i in 0..mesh.n_faces() {
        let fh = FaceHandle(i as u32);
        let loop_ = mesh.face_vertices(fh);
        out.write_u8(loop_.len() as u8)?;
        for vh in loop_ {
            out.write_i32::<O>(vh.0 as i32)?;
        }
        if options.face_has_texcoord() {
            // the count is the total number of coordinates, not corners
            out.write_u8((2 * loop_.len()) as u8)?;
            for corner in 0..loop_.len() {
                let uv = mesh.halfedge_texcoord(mesh.halfedge_handle(fh, corner));
                out.write_f32::<O>(uv.x)?;
                out.write_f32::<O>(uv.y)?;
            }
        }
    }

    Ok(())
}
