use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::iter;
use std::mem;
use std::sync::Arc;

use arrow_array::{
    ArrayRef, BinaryArray, BooleanArray, Float32Array, Float64Array, Int8Array, Int16Array,
    Int32Array, Int64Array, StringArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
    new_null_array,
};
use arrow_schema::DataType;
use quiver_dtype::{DType, Nullability, PType};

/// A single literal value.
///
/// Floats compare and hash by their bit pattern, so every value equals itself.
#[derive(Debug, Clone)]
pub enum Scalar {
    /// The untyped null
    Null,
    /// A boolean
    Bool(bool),
    /// An `i8`
    I8(i8),
    /// An `i16`
    I16(i16),
    /// An `i32`
    I32(i32),
    /// An `i64`
    I64(i64),
    /// A `u8`
    U8(u8),
    /// A `u16`
    U16(u16),
    /// A `u32`
    U32(u32),
    /// A `u64`
    U64(u64),
    /// An `f32`
    F32(f32),
    /// An `f64`
    F64(f64),
    /// A UTF-8 string
    Utf8(Arc<str>),
    /// A byte string
    Binary(Arc<[u8]>),
}

impl Scalar {
    /// The type of the value.
    pub fn dtype(&self) -> DType {
        let nn = Nullability::NonNullable;
        match self {
            Self::Null => DType::Null,
            Self::Bool(_) => DType::Bool(nn),
            Self::I8(_) => DType::Primitive(PType::I8, nn),
            Self::I16(_) => DType::Primitive(PType::I16, nn),
            Self::I32(_) => DType::Primitive(PType::I32, nn),
            Self::I64(_) => DType::Primitive(PType::I64, nn),
            Self::U8(_) => DType::Primitive(PType::U8, nn),
            Self::U16(_) => DType::Primitive(PType::U16, nn),
            Self::U32(_) => DType::Primitive(PType::U32, nn),
            Self::U64(_) => DType::Primitive(PType::U64, nn),
            Self::F32(_) => DType::Primitive(PType::F32, nn),
            Self::F64(_) => DType::Primitive(PType::F64, nn),
            Self::Utf8(_) => DType::Utf8(nn),
            Self::Binary(_) => DType::Binary(nn),
        }
    }

    /// Returns true for [`Scalar::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Builds an Arrow array holding the value `len` times.
    pub fn to_array(&self, len: usize) -> ArrayRef {
        match self {
            Self::Null => new_null_array(&DataType::Null, len),
            Self::Bool(v) => Arc::new(BooleanArray::from(vec![*v; len])),
            Self::I8(v) => Arc::new(Int8Array::from_value(*v, len)),
            Self::I16(v) => Arc::new(Int16Array::from_value(*v, len)),
            Self::I32(v) => Arc::new(Int32Array::from_value(*v, len)),
            Self::I64(v) => Arc::new(Int64Array::from_value(*v, len)),
            Self::U8(v) => Arc::new(UInt8Array::from_value(*v, len)),
            Self::U16(v) => Arc::new(UInt16Array::from_value(*v, len)),
            Self::U32(v) => Arc::new(UInt32Array::from_value(*v, len)),
            Self::U64(v) => Arc::new(UInt64Array::from_value(*v, len)),
            Self::F32(v) => Arc::new(Float32Array::from_value(*v, len)),
            Self::F64(v) => Arc::new(Float64Array::from_value(*v, len)),
            Self::Utf8(v) => Arc::new(StringArray::from_iter_values(iter::repeat_n(
                v.as_ref(),
                len,
            ))),
            Self::Binary(v) => Arc::new(BinaryArray::from_iter_values(iter::repeat_n(
                v.as_ref(),
                len,
            ))),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::U8(a), Self::U8(b)) => a == b,
            (Self::U16(a), Self::U16(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::I8(v) => v.hash(state),
            Self::I16(v) => v.hash(state),
            Self::I32(v) => v.hash(state),
            Self::I64(v) => v.hash(state),
            Self::U8(v) => v.hash(state),
            Self::U16(v) => v.hash(state),
            Self::U32(v) => v.hash(state),
            Self::U64(v) => v.hash(state),
            Self::F32(v) => v.to_bits().hash(state),
            Self::F64(v) => v.to_bits().hash(state),
            Self::Utf8(v) => v.hash(state),
            Self::Binary(v) => v.hash(state),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}_i8"),
            Self::I16(v) => write!(f, "{v}_i16"),
            Self::I32(v) => write!(f, "{v}_i32"),
            Self::I64(v) => write!(f, "{v}_i64"),
            Self::U8(v) => write!(f, "{v}_u8"),
            Self::U16(v) => write!(f, "{v}_u16"),
            Self::U32(v) => write!(f, "{v}_u32"),
            Self::U64(v) => write!(f, "{v}_u64"),
            Self::F32(v) => write!(f, "{v}_f32"),
            Self::F64(v) => write!(f, "{v}_f64"),
            Self::Utf8(v) => write!(f, "\"{v}\""),
            Self::Binary(v) => write!(f, "{} bytes", v.len()),
        }
    }
}

macro_rules! scalar_from {
    ($T:ty, $variant:ident) => {
        impl From<$T> for Scalar {
            fn from(value: $T) -> Self {
                Scalar::$variant(value)
            }
        }
    };
}

scalar_from!(bool, Bool);
scalar_from!(i8, I8);
scalar_from!(i16, I16);
scalar_from!(i32, I32);
scalar_from!(i64, I64);
scalar_from!(u8, U8);
scalar_from!(u16, U16);
scalar_from!(u32, U32);
scalar_from!(u64, U64);
scalar_from!(f32, F32);
scalar_from!(f64, F64);

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Utf8(value.into())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Utf8(value.into())
    }
}

impl From<&[u8]> for Scalar {
    fn from(value: &[u8]) -> Self {
        Scalar::Binary(value.into())
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(value: Vec<u8>) -> Self {
        Scalar::Binary(value.into())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}
