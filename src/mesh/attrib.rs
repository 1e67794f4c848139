//! Typed values for named mesh attributes.
//!
//! File formats declare custom per-vertex and per-face properties in one of
//! eight numeric widths; values are carried through the import pipeline in
//! their declared width rather than widened eagerly, so a `uint16` property
//! read back out is still a `uint16`.

use fnv::FnvHashMap;
use num_traits::ToPrimitive;

/// A single numeric value in one of the eight widths a mesh file can declare.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
}

impl Scalar {
    /// Sign-extends any integer variant to 32 bits. Floats have no implicit
    /// integer reading and yield `None`.
    pub fn widen_i32(self) -> Option<i32> {
        match self {
            Scalar::I8(v) => Some(v as i32),
            Scalar::U8(v) => Some(v as i32),
            Scalar::I16(v) => Some(v as i32),
            Scalar::U16(v) => Some(v as i32),
            Scalar::I32(v) => Some(v),
            Scalar::U32(v) => Some(v as i32),
            Scalar::F32(_) | Scalar::F64(_) => None,
        }
    }

    /// Zero-extends any integer variant to 32 bits.
    pub fn widen_u32(self) -> Option<u32> {
        match self {
            Scalar::I8(v) => Some(v as u32),
            Scalar::U8(v) => Some(v as u32),
            Scalar::I16(v) => Some(v as u32),
            Scalar::U16(v) => Some(v as u32),
            Scalar::I32(v) => Some(v as u32),
            Scalar::U32(v) => Some(v),
            Scalar::F32(_) | Scalar::F64(_) => None,
        }
    }
}

impl ToPrimitive for Scalar {
    fn to_i64(&self) -> Option<i64> {
        match *self {
            Scalar::I8(v) => Some(v as i64),
            Scalar::U8(v) => Some(v as i64),
            Scalar::I16(v) => Some(v as i64),
            Scalar::U16(v) => Some(v as i64),
            Scalar::I32(v) => Some(v as i64),
            Scalar::U32(v) => Some(v as i64),
            Scalar::F32(v) => v.to_i64(),
            Scalar::F64(v) => v.to_i64(),
        }
    }

    fn to_u64(&self) -> Option<u64> {
        match *self {
            Scalar::I8(v) => v.to_u64(),
            Scalar::U8(v) => Some(v as u64),
            Scalar::I16(v) => v.to_u64(),
            Scalar::U16(v) => Some(v as u64),
            Scalar::I32(v) => v.to_u64(),
            Scalar::U32(v) => Some(v as u64),
            Scalar::F32(v) => v.to_u64(),
            Scalar::F64(v) => v.to_u64(),
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match *self {
            Scalar::I8(v) => Some(v as f64),
            Scalar::U8(v) => Some(v as f64),
            Scalar::I16(v) => Some(v as f64),
            Scalar::U16(v) => Some(v as f64),
            Scalar::I32(v) => Some(v as f64),
            Scalar::U32(v) => Some(v as f64),
            Scalar::F32(v) => Some(v as f64),
            Scalar::F64(v) => Some(v),
        }
    }
}

/// One stored attribute value: a scalar or a count-prefixed list of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl AttrValue {
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            AttrValue::Scalar(s) => Some(*s),
            AttrValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            AttrValue::Scalar(_) => None,
            AttrValue::List(items) => Some(items),
        }
    }

    /// Numeric view of a scalar value, converted across widths.
    pub fn as_f32(&self) -> Option<f32> {
        self.as_scalar()?.to_f32()
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_scalar()?.to_u32()
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_scalar()?.to_i32()
    }
}

#[derive(Debug)]
struct AttrColumn {
    name: String,
    values: Vec<Option<AttrValue>>,
}

/// Insertion-ordered named attribute columns for one element kind.
///
/// Columns are addressed by the index returned from [`AttrTable::ensure`];
/// rows are element indices. Rows an importer never wrote read back as `None`.
#[derive(Debug, Default)]
pub struct AttrTable {
    columns: Vec<AttrColumn>,
    by_name: FnvHashMap<String, usize>,
}

impl AttrTable {
    pub fn handle(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Finds the column called `name`, creating an empty one if absent.
    pub fn ensure(&mut self, name: &str) -> usize {
        if let Some(col) = self.by_name.get(name) {
            return *col;
        }
        let col = self.columns.len();
        self.columns.push(AttrColumn {
            name: name.to_owned(),
            values: Vec::new(),
        });
        self.by_name.insert(name.to_owned(), col);
        col
    }

    pub fn set(&mut self, col: usize, row: usize, value: AttrValue) {
        let column = &mut self.columns[col];
        if column.values.len() <= row {
            column.values.resize(row + 1, None);
        }
        column.values[row] = Some(value);
    }

    pub fn get(&self, col: usize, row: usize) -> Option<&AttrValue> {
        self.columns.get(col)?.values.get(row)?.as_ref()
    }

    pub fn name(&self, col: usize) -> &str {
        &self.columns[col].name
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
