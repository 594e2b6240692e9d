//! Selectors for fields in (possibly nested) `StructDType`s
//!
//! A `Field` can either be a direct child field of a struct (selected by name or index), or a
//! positional marker stepping into the element of a list. A `FieldPath` is a sequence of such
//! selectors, with a dotted string form such as `objects[0].val`.

use core::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use quiver_error::{QuiverError, QuiverResult, quiver_bail, quiver_err};

use crate::FieldName;

/// A selector for a field in a struct, or for the element of a list
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// A field selector by name
    Name(FieldName),
    /// A field selector by position.
    ///
    /// Inside a struct this selects the child at that position. Inside a list it only marks the
    /// step into the element type, the position itself does not select any value.
    Index(usize),
}

impl Field {
    /// Returns true if this selector is a name
    pub fn is_named(&self) -> bool {
        matches!(self, Field::Name(_))
    }

    /// Returns the name of this selector, if it is one
    pub fn as_name(&self) -> Option<&FieldName> {
        match self {
            Field::Name(name) => Some(name),
            Field::Index(_) => None,
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Name(value.into())
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::Name(value.into())
    }
}

impl From<FieldName> for Field {
    fn from(value: FieldName) -> Self {
        Field::Name(value)
    }
}

impl From<usize> for Field {
    fn from(value: usize) -> Self {
        Field::Index(value)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Field::Name(name) => write!(f, "{name}"),
            Field::Index(idx) => write!(f, "[{idx}]"),
        }
    }
}

/// A path through a (possibly nested) struct, composed of a sequence of field selectors
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<Field>);

impl FieldPath {
    /// The selector for the root (i.e., the top-level struct itself)
    pub fn root() -> Self {
        Self(vec![])
    }

    /// Constructs a new `FieldPath` from a single field selector (i.e., a direct child field of the top-level struct)
    pub fn from_name<F: Into<Field>>(name: F) -> Self {
        Self(vec![name.into()])
    }

    /// Parses the dotted form of a path, e.g. `objects.val` or `objects[0].val`.
    ///
    /// Names are separated by `.`, positions are written in brackets. A name may not be empty.
    pub fn from_dot_path(dot_path: &str) -> QuiverResult<Self> {
        if dot_path.is_empty() {
            quiver_bail!("empty field path");
        }

        let mut fields = Vec::new();
        let mut rest = dot_path;
        let mut expect_name = !dot_path.starts_with('[');
        while !rest.is_empty() {
            if let Some(bracketed) = rest.strip_prefix('[') {
                if expect_name {
                    quiver_bail!("expected a name before '[' in field path {dot_path}");
                }
                let Some((digits, tail)) = bracketed.split_once(']') else {
                    quiver_bail!("unterminated position in field path {dot_path}");
                };
                let index = digits.parse::<usize>().map_err(|_| {
                    quiver_err!("invalid position [{digits}] in field path {dot_path}")
                })?;
                fields.push(Field::Index(index));
                rest = tail;
                expect_name = false;
            } else if let Some(tail) = rest.strip_prefix('.') {
                if expect_name {
                    quiver_bail!("empty name in field path {dot_path}");
                }
                rest = tail;
                expect_name = true;
            } else if expect_name {
                let end = rest.find(['.', '[']).unwrap_or(rest.len());
                let (name, tail) = rest.split_at(end);
                if name.is_empty() {
                    quiver_bail!("empty name in field path {dot_path}");
                }
                fields.push(Field::from(name));
                rest = tail;
                expect_name = false;
            } else {
                quiver_bail!("expected '.' or '[' in field path {dot_path}");
            }
        }
        if expect_name {
            quiver_bail!("field path {dot_path} ends with '.'");
        }

        Ok(Self(fields))
    }

    /// Returns the sequence of field selectors that make up this path
    pub fn path(&self) -> &[Field] {
        &self.0
    }

    /// Returns true if this path selects the root itself
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of selectors in this path
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if this path has no selectors
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a new field selector to the end of this path
    pub fn push<F: Into<Field>>(mut self, field: F) -> Self {
        self.0.push(field.into());
        self
    }

    /// Returns the path without its first selector, or `None` for the root
    pub fn step_into(&self) -> Option<Self> {
        self.0.split_first().map(|(_, rest)| Self(rest.to_vec()))
    }
}

impl FromIterator<Field> for FieldPath {
    fn from_iter<T: IntoIterator<Item = Field>>(iter: T) -> Self {
        FieldPath(iter.into_iter().collect())
    }
}

impl From<Field> for FieldPath {
    fn from(value: Field) -> Self {
        FieldPath(vec![value])
    }
}

impl From<Vec<Field>> for FieldPath {
    fn from(value: Vec<Field>) -> Self {
        FieldPath(value)
    }
}

impl FromStr for FieldPath {
    type Err = QuiverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dot_path(s)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (idx, field) in self.0.iter().enumerate() {
            match field {
                Field::Name(name) if idx > 0 => write!(f, ".{name}")?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_field_path() {
        let path = FieldPath::from_name("A").push("B").push("C");
        assert_eq!(path.to_string(), "A.B.C");

        let fields = vec!["A", "B", "C"]
            .into_iter()
            .map(Field::from)
            .collect_vec();
        assert_eq!(path.path(), &fields);

        let vec_path = FieldPath::from(fields);
        assert_eq!(vec_path.to_string(), "A.B.C");
        assert_eq!(path, vec_path);
        assert_eq!(path.step_into().unwrap().to_string(), "B.C");
    }

    #[rstest]
    #[case("objects.val", vec![Field::from("objects"), Field::from("val")])]
    #[case("objects[0].val", vec![Field::from("objects"), Field::Index(0), Field::from("val")])]
    #[case("[1]", vec![Field::Index(1)])]
    #[case("[1][2].x", vec![Field::Index(1), Field::Index(2), Field::from("x")])]
    #[case("pk", vec![Field::from("pk")])]
    fn parse_dot_path(#[case] dot_path: &str, #[case] expected: Vec<Field>) {
        let path = FieldPath::from_dot_path(dot_path).unwrap();
        assert_eq!(path.path(), expected.as_slice());
        assert_eq!(path.to_string(), dot_path);
    }

    #[rstest]
    #[case("")]
    #[case("a.")]
    #[case("a..b")]
    #[case(".a")]
    #[case("a[x]")]
    #[case("a[1")]
    #[case("a[1]b")]
    #[case("a.[0]")]
    #[case("a[0].[1]")]
    fn reject_malformed_dot_path(#[case] dot_path: &str) {
        assert!(dot_path.parse::<FieldPath>().is_err());
    }
}
