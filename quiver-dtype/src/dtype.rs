use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;
use std::sync::Arc;

use itertools::Itertools;
use DType::*;

use crate::nullability::Nullability;
use crate::{ExtDType, PType, StructDType};

/// The name of a struct field. Names may contain dots.
pub type FieldName = Arc<str>;
/// The field names of a struct, in field order.
pub type FieldNames = Arc<[FieldName]>;

/// The logical types of the columns in a dataset.
///
/// A logical type may differ from the representation the column is stored with: extension types
/// wrap a storage type and carry their own identity on top of it.
#[derive(Debug, Clone, PartialOrd, PartialEq, Eq, Hash)]
pub enum DType {
    /// Every value is null.
    Null,
    /// Booleans.
    Bool(Nullability),
    /// Fixed-width integers and floats.
    Primitive(PType, Nullability),
    /// UTF-8 encoded strings.
    Utf8(Nullability),
    /// Arbitrary byte strings.
    Binary(Nullability),
    /// Named children, in field order.
    Struct(StructDType, Nullability),
    /// A variable-length list with a single element type.
    List(Arc<DType>, Nullability),
    /// A logical type layered over a storage type, which also decides its nullability.
    Extension(Arc<ExtDType>),
}

impl DType {
    /// Whether values of this type may be null. [`DType::Null`] always is.
    pub fn nullability(&self) -> Nullability {
        match self {
            Null => Nullability::Nullable,
            Bool(n) | Primitive(_, n) | Utf8(n) | Binary(n) | Struct(_, n) | List(_, n) => *n,
            Extension(ext) => ext.storage_dtype().nullability(),
        }
    }

    /// Shorthand for `self.nullability().is_nullable()`.
    pub fn is_nullable(&self) -> bool {
        self.nullability().is_nullable()
    }

    /// Returns `self` with its outermost nullability replaced. Children keep theirs.
    pub fn with_nullability(&self, nullability: Nullability) -> Self {
        match self {
            Null => Null,
            Bool(_) => Bool(nullability),
            Primitive(ptype, _) => Primitive(*ptype, nullability),
            Utf8(_) => Utf8(nullability),
            Binary(_) => Binary(nullability),
            Struct(st, _) => Struct(st.clone(), nullability),
            List(element, _) => List(element.clone(), nullability),
            Extension(ext) => Extension(Arc::new(ext.with_nullability(nullability))),
        }
    }

    /// Compares the two types as if both were nullable at the top level.
    pub fn eq_ignore_nullability(&self, other: &Self) -> bool {
        self.with_nullability(Nullability::Nullable)
            == other.with_nullability(Nullability::Nullable)
    }

    /// The children of a struct type.
    pub fn as_struct(&self) -> Option<&StructDType> {
        match self {
            Struct(st, _) => Some(st),
            _ => None,
        }
    }

    /// The element type of a list.
    pub fn as_list_element(&self) -> Option<&DType> {
        match self {
            List(element, _) => Some(element.as_ref()),
            _ => None,
        }
    }

    /// Visits every extension type nested anywhere inside `self`, outermost first.
    pub fn for_each_extension(&self, f: &mut impl FnMut(&ExtDType)) {
        match self {
            Struct(st, _) => st.dtypes().for_each(|dt| dt.for_each_extension(f)),
            List(element, _) => element.for_each_extension(f),
            Extension(ext) => {
                f(ext);
                ext.storage_dtype().for_each_extension(f);
            }
            Null | Bool(_) | Primitive(..) | Utf8(_) | Binary(_) => {}
        }
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Null => write!(f, "null"),
            Bool(n) => write!(f, "bool{}", n),
            Primitive(pt, n) => write!(f, "{}{}", pt, n),
            Utf8(n) => write!(f, "utf8{}", n),
            Binary(n) => write!(f, "binary{}", n),
            Struct(sdt, n) => write!(
                f,
                "{{{}}}{}",
                sdt.names()
                    .iter()
                    .zip(sdt.dtypes())
                    .map(|(n, dt)| format!("{}={}", n, dt))
                    .join(", "),
                n
            ),
            List(edt, n) => write!(f, "list({}){}", edt, n),
            Extension(ext) => write!(
                f,
                "ext({}, {}{}){}",
                ext.id(),
                ext.storage_dtype()
                    .with_nullability(Nullability::NonNullable),
                ext.metadata()
                    .map(|m| format!(", {}", m))
                    .unwrap_or_default(),
                ext.storage_dtype().nullability(),
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{DType, ExtDType, ExtID, Nullability, PType, StructDType};

    #[test]
    fn nullability() {
        assert!(!DType::Struct(StructDType::empty(), Nullability::NonNullable).is_nullable());

        assert!(DType::Null.is_nullable());

        let byte = DType::Primitive(PType::U8, Nullability::Nullable);
        let required = byte.with_nullability(Nullability::NonNullable);
        assert!(byte.is_nullable());
        assert!(!required.is_nullable());
        assert!(byte.eq_ignore_nullability(&required));
        assert_ne!(byte, required);
    }

    #[test]
    fn display_nested() {
        let dtype = DType::List(
            Arc::new(DType::Struct(
                StructDType::from_iter([
                    ("val", DType::from(PType::I64)),
                    ("label", DType::Utf8(Nullability::Nullable)),
                ]),
                Nullability::NonNullable,
            )),
            Nullability::Nullable,
        );
        assert_eq!(dtype.to_string(), "list({val=i64, label=utf8?})?");
    }

    #[test]
    fn extensions_are_visited_recursively() {
        let inner = ExtDType::new(ExtID::from("inner"), Arc::new(PType::I32.into()), None);
        let outer = ExtDType::new(
            ExtID::from("outer"),
            Arc::new(DType::List(
                Arc::new(DType::Extension(Arc::new(inner))),
                Nullability::NonNullable,
            )),
            None,
        );
        let dtype = DType::Struct(
            StructDType::from_iter([("c", DType::Extension(Arc::new(outer)))]),
            Nullability::NonNullable,
        );

        let mut seen = Vec::new();
        dtype.for_each_extension(&mut |ext| seen.push(ext.id().to_string()));
        assert_eq!(seen, vec!["outer".to_string(), "inner".to_string()]);
    }
}
