//! Streaming payload decode, scalar codecs and the read entry points.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};

use super::header::{parse_header, PropertyInfo, PropertyRole, Schema};
use super::{Format, PlyError, ValueType};
use crate::formats::options::Options;
use crate::importer::Importer;
use crate::mesh::attrib::{AttrValue, Scalar};
use crate::mesh::{FaceHandle, Rgba, Vec2f, Vec3f, VertexHandle};

/// Reads a PLY stream into `importer`.
///
/// `requested` carries the caller's intent (which attributes to publish,
/// whether to materialize custom properties); the returned options describe
/// what the stream actually provided, reconciled per
/// [`Options::reconcile`]. On error the importer is left with whatever had
/// been delivered up to that point; no rollback is attempted.
pub fn read_ply<R, I>(mut input: R, importer: &mut I, requested: Options) -> Result<Options, PlyError>
where
    R: BufRead,
    I: Importer,
{
    let schema = parse_header(&mut input)?;
    if schema.vertex_dim != 3 {
        return Err(PlyError::UnsupportedVertexDim(schema.vertex_dim));
    }

    let effective = requested & schema.observed;
    importer.reserve(
        schema.vertex_count as usize,
        3 * schema.vertex_count as usize,
        schema.face_count as usize,
    );
    if let Some(name) = schema.comment("TextureFile") {
        importer.set_texfile(name);
    }

    match schema.format {
        Format::Ascii => {
            let mut src = AsciiTokens::new(input);
            decode_ascii(&mut src, &schema, effective, importer)?;
        }
        Format::BinaryLittleEndian => {
            let mut src = BinarySource::<LittleEndian, R>::new(input);
            decode_binary(&mut src, &schema, effective, importer)?;
        }
        Format::BinaryBigEndian => {
            let mut src = BinarySource::<BigEndian, R>::new(input);
            decode_binary(&mut src, &schema, effective, importer)?;
        }
    }

    Ok(Options::reconcile(requested, schema.observed))
}

/// [`read_ply`] over a file path. The handle is held only for the duration
/// of the call and released on every exit path.
pub fn read_ply_path<P, I>(path: P, importer: &mut I, requested: Options) -> Result<Options, PlyError>
where
    P: AsRef<Path>,
    I: Importer,
{
    let file = File::open(path)?;
    read_ply(BufReader::new(file), importer, requested)
}

/// One typed scalar at a time, from either payload encoding.
trait ScalarSource {
    fn read_scalar(&mut self, ty: ValueType) -> Result<Scalar, PlyError>;
}

/// Whitespace-delimited token stream over an ASCII payload. Spaces, tabs and
/// CR/LF line breaks are all equivalent separators, so sloppily encoded
/// files decode the same as clean ones.
struct AsciiTokens<R> {
    input: R,
}

impl<R: BufRead> AsciiTokens<R> {
    fn new(input: R) -> Self {
        AsciiTokens { input }
    }

    fn next_token(&mut self) -> Result<String, PlyError> {
        let mut token = Vec::new();
        loop {
            let (used, complete, at_eof) = {
                let buf = self.input.fill_buf().map_err(truncated)?;
                if buf.is_empty() {
                    (0, false, true)
                } else {
                    let mut used = 0;
                    let mut complete = false;
                    for &byte in buf {
                        used += 1;
                        if byte.is_ascii_whitespace() {
                            if !token.is_empty() {
                                complete = true;
                                break;
                            }
                        } else {
                            token.push(byte);
                        }
                    }
                    (used, complete, false)
                }
            };
            self.input.consume(used);
            if complete {
                break;
            }
            if at_eof {
                if token.is_empty() {
                    return Err(PlyError::TruncatedStream);
                }
                break;
            }
        }
        Ok(String::from_utf8_lossy(&token).into_owned())
    }
}

impl<R: BufRead> ScalarSource for AsciiTokens<R> {
    fn read_scalar(&mut self, ty: ValueType) -> Result<Scalar, PlyError> {
        let token = self.next_token()?;
        parse_scalar(&token, ty)
    }
}

/// Textual decode of one field into its declared width. Integer overflow is
/// not detected; the value is narrowed with a plain cast.
fn parse_scalar(token: &str, ty: ValueType) -> Result<Scalar, PlyError> {
    fn int(token: &str) -> Result<i64, PlyError> {
        token
            .parse::<i64>()
            .or_else(|_| token.parse::<u64>().map(|v| v as i64))
            .map_err(|_| PlyError::BadValue(token.to_owned()))
    }

    Ok(match ty {
        ValueType::Int8 | ValueType::Char => Scalar::I8(int(token)? as i8),
        ValueType::Uint8 | ValueType::Uchar => Scalar::U8(int(token)? as u8),
        ValueType::Int16 | ValueType::Short => Scalar::I16(int(token)? as i16),
        ValueType::Uint16 | ValueType::Ushort => Scalar::U16(int(token)? as u16),
        ValueType::Int32 | ValueType::Int => Scalar::I32(int(token)? as i32),
        ValueType::Uint32 | ValueType::Uint => Scalar::U32(int(token)? as u32),
        ValueType::Float32 | ValueType::Float => Scalar::F32(
            token
                .parse()
                .map_err(|_| PlyError::BadValue(token.to_owned()))?,
        ),
        ValueType::Float64 | ValueType::Double => Scalar::F64(
            token
                .parse()
                .map_err(|_| PlyError::BadValue(token.to_owned()))?,
        ),
        ValueType::Unsupported => {
            return Err(PlyError::mismatch("a declared numeric type", ty))
        }
    })
}

/// Byte-order-corrected scalar reads from a binary payload.
struct BinarySource<O, R> {
    input: R,
    _order: PhantomData<O>,
}

impl<O: ByteOrder, R: Read> BinarySource<O, R> {
    fn new(input: R) -> Self {
        BinarySource {
            input,
            _order: PhantomData,
        }
    }
}

impl<O: ByteOrder, R: Read> ScalarSource for BinarySource<O, R> {
    fn read_scalar(&mut self, ty: ValueType) -> Result<Scalar, PlyError> {
        let input = &mut self.input;
        Ok(match ty {
            ValueType::Int8 | ValueType::Char => Scalar::I8(input.read_i8().map_err(truncated)?),
            ValueType::Uint8 | ValueType::Uchar => Scalar::U8(input.read_u8().map_err(truncated)?),
            ValueType::Int16 | ValueType::Short => {
                Scalar::I16(input.read_i16::<O>().map_err(truncated)?)
            }
            ValueType::Uint16 | ValueType::Ushort => {
                Scalar::U16(input.read_u16::<O>().map_err(truncated)?)
            }
            ValueType::Int32 | ValueType::Int => {
                Scalar::I32(input.read_i32::<O>().map_err(truncated)?)
            }
            ValueType::Uint32 | ValueType::Uint => {
                Scalar::U32(input.read_u32::<O>().map_err(truncated)?)
            }
            ValueType::Float32 | ValueType::Float => {
                Scalar::F32(input.read_f32::<O>().map_err(truncated)?)
            }
            ValueType::Float64 | ValueType::Double => {
                Scalar::F64(input.read_f64::<O>().map_err(truncated)?)
            }
            ValueType::Unsupported => {
                return Err(PlyError::mismatch("a declared numeric type", ty))
            }
        })
    }
}

/// Running out of payload mid-element is a format error, not an i/o error.
fn truncated(e: std::io::Error) -> PlyError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        PlyError::TruncatedStream
    } else {
        PlyError::Io(e)
    }
}

/// Reads a float-destined slot. Only float-declared properties qualify;
/// an integer declaration here is a type mismatch rather than a silent zero.
fn read_float_slot<S: ScalarSource>(src: &mut S, ty: ValueType) -> Result<f32, PlyError> {
    match src.read_scalar(ty)? {
        Scalar::F32(v) => Ok(v),
        Scalar::F64(v) => Ok(v as f32),
        _ => Err(PlyError::mismatch("a float-declared property", ty)),
    }
}

/// Reads an integer-destined slot, zero-/sign-extended to 32 bits.
fn read_integer_u32<S: ScalarSource>(src: &mut S, ty: ValueType) -> Result<u32, PlyError> {
    src.read_scalar(ty)?
        .widen_u32()
        .ok_or_else(|| PlyError::mismatch("an integer-declared property", ty))
}

fn read_integer_i32<S: ScalarSource>(src: &mut S, ty: ValueType) -> Result<i32, PlyError> {
    src.read_scalar(ty)?
        .widen_i32()
        .ok_or_else(|| PlyError::mismatch("an integer-declared property", ty))
}

/// Reads one color channel as `u8`. Float channels are expected in [0, 1]
/// and quantized as `floor(x * 255)` (so 1.0 maps to 255 but 0.999… maps to
/// 254); integer channels are clamped to [0, 255] before narrowing.
fn read_color_channel<S: ScalarSource>(src: &mut S, ty: ValueType) -> Result<u8, PlyError> {
    if ty.is_float() {
        let v = read_float_slot(src, ty)?;
        Ok((v * 255.0) as u8)
    } else {
        let v = read_integer_i32(src, ty)?;
        Ok(v.clamp(0, 255) as u8)
    }
}

/// Reads one custom slot (scalar, or count-prefixed list) in its declared
/// width. Also used to walk over slots whose value is discarded, since the
/// consumed bytes/tokens are identical.
fn read_custom_value<S: ScalarSource>(
    src: &mut S,
    prop: &PropertyInfo,
) -> Result<AttrValue, PlyError> {
    match prop.list_index_type {
        Some(idx_ty) => {
            let count = read_integer_u32(src, idx_ty)?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(src.read_scalar(prop.value_type)?);
            }
            Ok(AttrValue::List(items))
        }
        None => Ok(AttrValue::Scalar(src.read_scalar(prop.value_type)?)),
    }
}

fn store_vertex_custom<S: ScalarSource, I: Importer>(
    src: &mut S,
    imp: &mut I,
    prop: &PropertyInfo,
    vh: VertexHandle,
) -> Result<(), PlyError> {
    let value = read_custom_value(src, prop)?;
    let ph = match imp.vertex_property_handle(&prop.name) {
        Some(ph) => ph,
        None => imp.add_vertex_property(&prop.name),
    };
    imp.set_vertex_property(ph, vh, value);
    Ok(())
}

fn store_face_custom<S: ScalarSource, I: Importer>(
    src: &mut S,
    imp: &mut I,
    prop: &PropertyInfo,
    fh: FaceHandle,
) -> Result<(), PlyError> {
    let value = read_custom_value(src, prop)?;
    let ph = match imp.face_property_handle(&prop.name) {
        Some(ph) => ph,
        None => imp.add_face_property(&prop.name),
    };
    imp.set_face_property(ph, fh, value);
    Ok(())
}

fn decode_ascii<R: BufRead, I: Importer>(
    src: &mut AsciiTokens<R>,
    schema: &Schema,
    effective: Options,
    imp: &mut I,
) -> Result<(), PlyError> {
    for _ in 0..schema.vertex_count {
        let vh = imp.add_vertex();
        let mut point = Vec3f::zero();
        let mut normal = Vec3f::zero();
        let mut uv = Vec2f::zero();
        let mut color = Rgba::new(0, 0, 0, 255);

        for prop in &schema.vertex_props {
            match prop.role {
                PropertyRole::XCoord => point.x = read_float_slot(src, prop.value_type)?,
                PropertyRole::YCoord => point.y = read_float_slot(src, prop.value_type)?,
                PropertyRole::ZCoord => point.z = read_float_slot(src, prop.value_type)?,
                PropertyRole::XNorm => normal.x = read_float_slot(src, prop.value_type)?,
                PropertyRole::YNorm => normal.y = read_float_slot(src, prop.value_type)?,
                PropertyRole::ZNorm => normal.z = read_float_slot(src, prop.value_type)?,
                PropertyRole::TexX => uv.x = read_float_slot(src, prop.value_type)?,
                PropertyRole::TexY => uv.y = read_float_slot(src, prop.value_type)?,
                PropertyRole::ColorRed => color.r = read_color_channel(src, prop.value_type)?,
                PropertyRole::ColorGreen => color.g = read_color_channel(src, prop.value_type)?,
                PropertyRole::ColorBlue => color.b = read_color_channel(src, prop.value_type)?,
                PropertyRole::ColorAlpha => color.a = read_color_channel(src, prop.value_type)?,
                PropertyRole::CustomProp if effective.contains(Options::CUSTOM) => {
                    store_vertex_custom(src, imp, prop, vh)?
                }
                _ => {
                    read_custom_value(src, prop)?;
                }
            }
        }

        imp.set_point(vh, point);
        if effective.vertex_has_normal() {
            imp.set_normal(vh, normal);
        }
        if effective.vertex_has_texcoord() {
            imp.set_texcoord(vh, uv);
        }
        if effective.vertex_has_color() {
            imp.set_color(vh, color);
        }
    }

    for _ in 0..schema.face_count {
        let mut arity = 0usize;
        let mut handles: Vec<VertexHandle> = Vec::new();
        let mut fh = None;

        for prop in &schema.face_props {
            match prop.role {
                PropertyRole::VertexIndices => {
                    let idx_ty = prop.list_index_type.unwrap_or(ValueType::Uchar);
                    arity = read_integer_u32(src, idx_ty)? as usize;
                    handles.clear();
                    handles.reserve(arity);
                    for _ in 0..arity {
                        handles.push(VertexHandle(read_integer_u32(src, prop.value_type)?));
                    }
                    fh = imp.add_face(&handles);
                }
                PropertyRole::FaceTexcoords => {
                    // the coordinate count is taken from the vertex list's
                    // arity; the slot's own count field is not read here
                    let mut coords = Vec::with_capacity(arity);
                    for _ in 0..arity {
                        let u = read_float_slot(src, prop.value_type)?;
                        let v = read_float_slot(src, prop.value_type)?;
                        coords.push(Vec2f::new(u, v));
                    }
                    if let (Some(fh), Some(anchor)) = (fh, handles.first().copied()) {
                        if effective.face_has_texcoord() {
                            imp.add_face_texcoords(fh, anchor, &coords);
                        }
                    }
                }
                PropertyRole::CustomProp => match fh {
                    Some(fh) if effective.contains(Options::CUSTOM) => {
                        store_face_custom(src, imp, prop, fh)?
                    }
                    _ => {
                        read_custom_value(src, prop)?;
                    }
                },
                _ => {
                    read_custom_value(src, prop)?;
                }
            }
        }
    }

    Ok(())
}

fn decode_binary<S: ScalarSource, I: Importer>(
    src: &mut S,
    schema: &Schema,
    effective: Options,
    imp: &mut I,
) -> Result<(), PlyError> {
    for _ in 0..schema.vertex_count {
        let mut point = Vec3f::zero();
        let mut normal = Vec3f::zero();
        let mut uv = Vec2f::zero();
        let mut color = Rgba::new(0, 0, 0, 255);

        for prop in &schema.vertex_props {
            match prop.role {
                PropertyRole::XCoord => point.x = read_float_slot(src, prop.value_type)?,
                PropertyRole::YCoord => point.y = read_float_slot(src, prop.value_type)?,
                PropertyRole::ZCoord => point.z = read_float_slot(src, prop.value_type)?,
                PropertyRole::XNorm => normal.x = read_float_slot(src, prop.value_type)?,
                PropertyRole::YNorm => normal.y = read_float_slot(src, prop.value_type)?,
                PropertyRole::ZNorm => normal.z = read_float_slot(src, prop.value_type)?,
                PropertyRole::TexX => uv.x = read_float_slot(src, prop.value_type)?,
                PropertyRole::TexY => uv.y = read_float_slot(src, prop.value_type)?,
                PropertyRole::ColorRed => color.r = read_color_channel(src, prop.value_type)?,
                PropertyRole::ColorGreen => color.g = read_color_channel(src, prop.value_type)?,
                PropertyRole::ColorBlue => color.b = read_color_channel(src, prop.value_type)?,
                PropertyRole::ColorAlpha => color.a = read_color_channel(src, prop.value_type)?,
                _ => {
                    // demoted or unrecognized: its declared width is still
                    // consumed to keep the stream aligned
                    read_custom_value(src, prop)?;
                }
            }
        }

        let vh = imp.add_vertex_at(point);
        if effective.vertex_has_normal() {
            imp.set_normal(vh, normal);
        }
        if effective.vertex_has_texcoord() {
            imp.set_texcoord(vh, uv);
        }
        if effective.vertex_has_color() {
            imp.set_color(vh, color);
        }
    }

    for _ in 0..schema.face_count {
        let mut handles: Vec<VertexHandle> = Vec::new();
        let mut fh = None;

        for prop in &schema.face_props {
            match prop.role {
                PropertyRole::VertexIndices => {
                    let idx_ty = prop.list_index_type.unwrap_or(ValueType::Uchar);
                    let arity = read_integer_u32(src, idx_ty)? as usize;
                    handles.clear();
                    handles.reserve(arity);
                    for _ in 0..arity {
                        handles.push(VertexHandle(read_integer_u32(src, prop.value_type)?));
                    }
                    fh = imp.add_face(&handles);
                }
                PropertyRole::FaceTexcoords => {
                    // binary mode carries its own count: the total number of
                    // coordinates, i.e. twice the number of (u, v) pairs
                    let idx_ty = prop.list_index_type.unwrap_or(ValueType::Uchar);
                    let n_coords = read_integer_u32(src, idx_ty)? as usize;
                    let mut coords = Vec::with_capacity(n_coords / 2);
                    for _ in 0..n_coords / 2 {
                        let u = read_float_slot(src, prop.value_type)?;
                        let v = read_float_slot(src, prop.value_type)?;
                        coords.push(Vec2f::new(u, v));
                    }
                    if let (Some(fh), Some(anchor)) = (fh, handles.first().copied()) {
                        if effective.face_has_texcoord() {
                            imp.add_face_texcoords(fh, anchor, &coords);
                        }
                    }
                }
                _ => return Err(PlyError::UnsupportedBinaryFace(prop.name.clone())),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_tokens_span_lines_and_separators() {
        let text = "  -7\t   5  \r\n2   \t4\r\n   0   0   \r\n";
        let mut src = AsciiTokens::new(text.as_bytes());
        let expected = ["-7", "5", "2", "4", "0", "0"];
        for want in expected {
            assert_eq!(src.next_token().unwrap(), want);
        }
        assert!(matches!(src.next_token(), Err(PlyError::TruncatedStream)));
    }

    #[test]
    fn last_token_needs_no_trailing_newline() {
        let mut src = AsciiTokens::new("6.28318".as_bytes());
        assert_eq!(src.next_token().unwrap(), "6.28318");
    }

    #[test]
    fn scalars_parse_into_their_declared_width() {
        assert_eq!(parse_scalar("-7", ValueType::Int8).unwrap(), Scalar::I8(-7));
        assert_eq!(parse_scalar("300", ValueType::Uint16).unwrap(), Scalar::U16(300));
        assert_eq!(parse_scalar("0.5", ValueType::Float).unwrap(), Scalar::F32(0.5));
        assert_eq!(
            parse_scalar("0.25", ValueType::Double).unwrap(),
            Scalar::F64(0.25)
        );
        assert!(matches!(
            parse_scalar("banana", ValueType::Int32),
            Err(PlyError::BadValue(_))
        ));
    }

    #[test]
    fn float_slots_reject_integer_declarations() {
        let mut src = AsciiTokens::new("42".as_bytes());
        assert!(matches!(
            read_float_slot(&mut src, ValueType::Int32),
            Err(PlyError::DecodeTypeMismatch { .. })
        ));
    }

    #[test]
    fn integer_slots_reject_float_declarations() {
        let mut src = AsciiTokens::new("1.0".as_bytes());
        assert!(matches!(
            read_integer_u32(&mut src, ValueType::Float),
            Err(PlyError::DecodeTypeMismatch { .. })
        ));
    }

    #[test]
    fn double_declared_floats_narrow() {
        let mut src = AsciiTokens::new("2.5".as_bytes());
        assert_eq!(read_float_slot(&mut src, ValueType::Float64).unwrap(), 2.5);
    }

    #[test]
    fn float_colors_quantize_by_truncation() {
        let mut src = AsciiTokens::new("1.0 0.999 0.0".as_bytes());
        assert_eq!(read_color_channel(&mut src, ValueType::Float).unwrap(), 255);
        assert_eq!(read_color_channel(&mut src, ValueType::Float).unwrap(), 254);
        assert_eq!(read_color_channel(&mut src, ValueType::Float).unwrap(), 0);
    }

    #[test]
    fn integer_colors_clamp_to_channel_range() {
        let mut src = AsciiTokens::new("300 -5 200".as_bytes());
        assert_eq!(read_color_channel(&mut src, ValueType::Short).unwrap(), 255);
        assert_eq!(read_color_channel(&mut src, ValueType::Short).unwrap(), 0);
        assert_eq!(read_color_channel(&mut src, ValueType::Short).unwrap(), 200);
    }

    #[test]
    fn binary_scalars_respect_byte_order() {
        let bytes = [0x01u8, 0x02];
        let mut le = BinarySource::<LittleEndian, _>::new(&bytes[..]);
        assert_eq!(le.read_scalar(ValueType::Uint16).unwrap(), Scalar::U16(0x0201));
        let mut be = BinarySource::<BigEndian, _>::new(&bytes[..]);
        assert_eq!(be.read_scalar(ValueType::Uint16).unwrap(), Scalar::U16(0x0102));
    }

    #[test]
    fn binary_eof_is_reported_as_truncation() {
        let bytes = [0x01u8, 0x02];
        let mut src = BinarySource::<LittleEndian, _>::new(&bytes[..]);
        assert!(matches!(
            src.read_scalar(ValueType::Float32),
            Err(PlyError::TruncatedStream)
        ));
    }

    #[test]
    fn integer_widening_extends_sign() {
        let mut src = AsciiTokens::new("-1".as_bytes());
        assert_eq!(read_integer_i32(&mut src, ValueType::Char).unwrap(), -1);
        let mut src = AsciiTokens::new("255".as_bytes());
        assert_eq!(read_integer_u32(&mut src, ValueType::Uchar).unwrap(), 255);
    }
}
