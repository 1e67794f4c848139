//! Header capture: the declarative schema a PLY payload is decoded against.

use std::io::BufRead;

use log::warn;

use super::{Format, PlyError, ValueType};
use crate::formats::options::Options;

/// Semantic role the reader attaches to a declared property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRole {
    XCoord,
    YCoord,
    ZCoord,
    XNorm,
    YNorm,
    ZNorm,
    TexX,
    TexY,
    ColorRed,
    ColorGreen,
    ColorBlue,
    ColorAlpha,
    VertexIndices,
    FaceTexcoords,
    CustomProp,
    /// Declared but undecodable; its bytes are still consumed.
    Unsupported,
}

/// One property slot, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    pub role: PropertyRole,
    pub value_type: ValueType,
    pub name: String,
    /// Count-prefix type when the property is a list, `None` for scalars.
    pub list_index_type: Option<ValueType>,
}

/// Everything the header declared, in a form that drives payload decoding.
///
/// Property order within each element is authoritative for the binary
/// layout. Comments are kept in declaration order; only the first
/// whitespace-delimited word after the comment key is stored, matching what
/// writers in the wild rely on for `TextureFile`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub format: Format,
    pub vertex_count: u32,
    pub face_count: u32,
    pub vertex_dim: u32,
    pub vertex_props: Vec<PropertyInfo>,
    pub face_props: Vec<PropertyInfo>,
    pub comments: Vec<(String, String)>,
    pub observed: Options,
}

impl Schema {
    pub fn comment(&self, key: &str) -> Option<&str> {
        self.comments
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Scope {
    None,
    Vertex,
    Face,
    Other,
}

/// Consumes the ASCII header from `input`, leaving the cursor at the first
/// payload byte (the byte immediately after `end_header`'s line terminator,
/// whether that is LF or CRLF).
pub fn parse_header<R: BufRead>(input: &mut R) -> Result<Schema, PlyError> {
    let mut buf = Vec::new();

    // Magic line: the first non-empty line, exactly `ply` or `PLY`.
    loop {
        let line = match next_line(input, &mut buf)? {
            Some(line) => line,
            None => return Err(PlyError::BadMagic),
        };
        if line.is_empty() {
            continue;
        }
        if line == "ply" || line == "PLY" {
            break;
        }
        return Err(PlyError::BadMagic);
    }

    let mut format = None;
    let mut observed = Options::empty();
    let mut vertex_count = 0u32;
    let mut face_count = 0u32;
    let mut vertex_dim = 0u32;
    let mut vertex_props: Vec<PropertyInfo> = Vec::new();
    let mut face_props: Vec<PropertyInfo> = Vec::new();
    let mut comments: Vec<(String, String)> = Vec::new();
    let mut scope = Scope::None;

    loop {
        let line = match next_line(input, &mut buf)? {
            Some(line) => line,
            None => return Err(PlyError::MalformedHeader("missing end_header".into())),
        };
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens[0] {
            "format" => {
                let kind = *tokens
                    .get(1)
                    .ok_or_else(|| PlyError::MalformedHeader(line.clone()))?;
                // the version token is consumed but not validated
                format = Some(match kind {
                    "ascii" => Format::Ascii,
                    "binary_little_endian" => {
                        observed |= Options::BINARY | Options::LSB;
                        Format::BinaryLittleEndian
                    }
                    "binary_big_endian" => {
                        observed |= Options::BINARY | Options::MSB;
                        Format::BinaryBigEndian
                    }
                    other => return Err(PlyError::UnsupportedFormat(other.to_owned())),
                });
            }
            "comment" => {
                if let Some(key) = tokens.get(1) {
                    // only the first word of the value survives
                    let value = tokens.get(2).copied().unwrap_or("");
                    if *key == "TextureFile" {
                        observed |= Options::TEX_FILE;
                    }
                    comments.push((key.to_string(), value.to_string()));
                }
            }
            "obj_info" => {}
            "element" => {
                let name = *tokens
                    .get(1)
                    .ok_or_else(|| PlyError::MalformedHeader(line.clone()))?;
                let count: u32 = tokens
                    .get(2)
                    .and_then(|c| c.parse().ok())
                    .ok_or_else(|| PlyError::MalformedHeader(line.clone()))?;
                scope = match name {
                    "vertex" => {
                        vertex_count = count;
                        Scope::Vertex
                    }
                    "face" => {
                        face_count = count;
                        Scope::Face
                    }
                    other => {
                        warn!("ignoring unsupported element {:?} ({} entries)", other, count);
                        Scope::Other
                    }
                };
            }
            "property" => {
                let is_binary = format.map_or(false, |f| f != Format::Ascii);
                match scope {
                    Scope::Vertex => parse_vertex_property(
                        &tokens,
                        &line,
                        is_binary,
                        &mut vertex_props,
                        &mut vertex_dim,
                        &mut observed,
                    )?,
                    Scope::Face => {
                        parse_face_property(&tokens, &line, &mut face_props, &mut observed)?
                    }
                    Scope::Other => {}
                    Scope::None => {
                        warn!("ignoring property declared before any element: {:?}", line)
                    }
                }
            }
            "end_header" => break,
            _ => warn!("ignoring unrecognized header line {:?}", line),
        }
    }

    let format = format.ok_or_else(|| PlyError::MalformedHeader("missing format line".into()))?;

    Ok(Schema {
        format,
        vertex_count,
        face_count,
        vertex_dim,
        vertex_props,
        face_props,
        comments,
        observed,
    })
}

/// Reads one header line, stripped of its terminator and surrounding
/// whitespace. `None` at end of stream.
fn next_line<R: BufRead>(input: &mut R, buf: &mut Vec<u8>) -> Result<Option<String>, PlyError> {
    buf.clear();
    let n = input.read_until(b'\n', buf)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(buf).trim().to_owned()))
}

/// Splits a scalar `property <a> <b>` declaration into type and name.
/// Files in the wild disagree on the token order, so both are tried.
fn scalar_declaration<'a>(a: &'a str, b: &'a str) -> Option<(ValueType, &'a str)> {
    let ty = ValueType::from_token(a);
    if ty.is_valid() {
        return Some((ty, b));
    }
    let ty = ValueType::from_token(b);
    if ty.is_valid() {
        return Some((ty, a));
    }
    None
}

/// Splits a `property list <idx> <entry> <name>` declaration, enforcing the
/// byte-sized count prefix. `None` means the slot must be skipped entirely.
fn list_declaration<'a>(tokens: &[&'a str], line: &str) -> Option<(ValueType, ValueType, &'a str)> {
    let idx_ty = ValueType::from_token(tokens.get(2)?);
    let entry_ty = ValueType::from_token(tokens.get(3)?);
    let name = *tokens.get(4)?;
    if !idx_ty.is_byte_count() {
        warn!(
            "skipping list property {:?}: count prefix {:?} is not uint8/uchar ({})",
            name,
            idx_ty.token(),
            line
        );
        return None;
    }
    if !entry_ty.is_valid() {
        warn!("skipping list property {:?}: unknown entry type ({})", name, line);
        return None;
    }
    Some((idx_ty, entry_ty, name))
}

fn vertex_role(name: &str) -> PropertyRole {
    match name {
        "x" => PropertyRole::XCoord,
        "y" => PropertyRole::YCoord,
        "z" => PropertyRole::ZCoord,
        "nx" => PropertyRole::XNorm,
        "ny" => PropertyRole::YNorm,
        "nz" => PropertyRole::ZNorm,
        "u" | "s" => PropertyRole::TexX,
        "v" | "t" => PropertyRole::TexY,
        "red" | "diffuse_red" => PropertyRole::ColorRed,
        "green" | "diffuse_green" => PropertyRole::ColorGreen,
        "blue" | "diffuse_blue" => PropertyRole::ColorBlue,
        "alpha" => PropertyRole::ColorAlpha,
        _ => PropertyRole::CustomProp,
    }
}

fn parse_vertex_property(
    tokens: &[&str],
    line: &str,
    is_binary: bool,
    props: &mut Vec<PropertyInfo>,
    vertex_dim: &mut u32,
    observed: &mut Options,
) -> Result<(), PlyError> {
    if tokens.get(1) == Some(&"list") {
        let (idx_ty, entry_ty, name) = match list_declaration(tokens, line) {
            Some(decl) => decl,
            None => return Ok(()),
        };
        // vertex lists are always custom data; binary streams cannot carry
        // them as attributes but their bytes must still be walked over
        let role = if is_binary {
            warn!("custom vertex property {:?} is not supported in binary ply, skipping its data", name);
            PropertyRole::Unsupported
        } else {
            *observed |= Options::CUSTOM;
            PropertyRole::CustomProp
        };
        props.push(PropertyInfo {
            role,
            value_type: entry_ty,
            name: name.to_owned(),
            list_index_type: Some(idx_ty),
        });
        return Ok(());
    }

    let (a, b) = match (tokens.get(1), tokens.get(2)) {
        (Some(a), Some(b)) => (*a, *b),
        _ => return Err(PlyError::MalformedHeader(line.to_owned())),
    };
    let (value_type, name) = match scalar_declaration(a, b) {
        Some(decl) => decl,
        None => {
            warn!("skipping vertex property with no recognizable type: {:?}", line);
            return Ok(());
        }
    };

    let mut role = vertex_role(name);
    match role {
        PropertyRole::XCoord | PropertyRole::YCoord | PropertyRole::ZCoord => *vertex_dim += 1,
        PropertyRole::XNorm | PropertyRole::YNorm | PropertyRole::ZNorm => {
            *observed |= Options::VERTEX_NORMAL
        }
        PropertyRole::TexX | PropertyRole::TexY => *observed |= Options::VERTEX_TEXCOORD,
        PropertyRole::ColorRed | PropertyRole::ColorGreen | PropertyRole::ColorBlue => {
            *observed |= Options::VERTEX_COLOR;
            if value_type.is_float() {
                *observed |= Options::COLOR_FLOAT;
            }
        }
        PropertyRole::ColorAlpha => {
            *observed |= Options::VERTEX_COLOR | Options::COLOR_ALPHA;
            if value_type.is_float() {
                *observed |= Options::COLOR_FLOAT;
            }
        }
        PropertyRole::CustomProp => {
            if is_binary {
                warn!("custom vertex property {:?} is not supported in binary ply, skipping its data", name);
                role = PropertyRole::Unsupported;
            } else {
                *observed |= Options::CUSTOM;
            }
        }
        _ => {}
    }

    props.push(PropertyInfo {
        role,
        value_type,
        name: name.to_owned(),
        list_index_type: None,
    });
    Ok(())
}

fn parse_face_property(
    tokens: &[&str],
    line: &str,
    props: &mut Vec<PropertyInfo>,
    observed: &mut Options,
) -> Result<(), PlyError> {
    if tokens.get(1) == Some(&"list") {
        let (idx_ty, entry_ty, name) = match list_declaration(tokens, line) {
            Some(decl) => decl,
            None => return Ok(()),
        };

        let role = match name {
            "vertex_index" | "vertex_indices" => {
                if props.iter().any(|p| p.role == PropertyRole::VertexIndices) {
                    warn!("ignoring duplicate {:?} declaration", name);
                    return Ok(());
                }
                // face arity must be known before any other face data can be
                // interpreted, so everything declared ahead of it is dropped
                if !props.is_empty() {
                    warn!(
                        "face properties declared before {:?} cannot be read, dropping {} of them",
                        name,
                        props.len()
                    );
                    props.clear();
                }
                PropertyRole::VertexIndices
            }
            "texcoord" => {
                if entry_ty.is_float() {
                    *observed |= Options::FACE_TEXCOORD;
                    PropertyRole::FaceTexcoords
                } else {
                    warn!(
                        "face texcoord list declared as {:?}, expected a float type; treating as custom data",
                        entry_ty.token()
                    );
                    *observed |= Options::CUSTOM;
                    PropertyRole::CustomProp
                }
            }
            _ => {
                *observed |= Options::CUSTOM;
                PropertyRole::CustomProp
            }
        };
        props.push(PropertyInfo {
            role,
            value_type: entry_ty,
            name: name.to_owned(),
            list_index_type: Some(idx_ty),
        });
        return Ok(());
    }

    let (a, b) = match (tokens.get(1), tokens.get(2)) {
        (Some(a), Some(b)) => (*a, *b),
        _ => return Err(PlyError::MalformedHeader(line.to_owned())),
    };
    let (value_type, name) = match scalar_declaration(a, b) {
        Some(decl) => decl,
        None => {
            warn!("skipping face property with no recognizable type: {:?}", line);
            return Ok(());
        }
    };

    *observed |= Options::CUSTOM;
    props.push(PropertyInfo {
        role: PropertyRole::CustomProp,
        value_type,
        name: name.to_owned(),
        list_index_type: None,
    });
    Ok(())
}
