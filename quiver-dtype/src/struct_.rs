use std::sync::Arc;

use quiver_error::{QuiverError, QuiverResult, quiver_bail, quiver_panic};

use crate::{DType, Field, FieldName, FieldNames};

/// The fields of a struct type: names and types, in field order.
///
/// Names are usually unique, but providers backed by Arrow may repeat them.
#[derive(Debug, Clone, PartialOrd, PartialEq, Eq, Hash)]
pub struct StructDType {
    names: FieldNames,
    dtypes: Arc<[DType]>,
}

/// A field of a [`StructDType`] looked up by [`StructDType::field_info`].
#[derive(Debug)]
pub struct FieldInfo<'a> {
    /// Position of the field among its siblings.
    pub index: usize,
    /// Name of the field.
    pub name: &'a FieldName,
    /// Type of the field.
    pub dtype: &'a DType,
}

impl StructDType {
    /// Panics if `names` and `dtypes` differ in length.
    pub fn new(names: FieldNames, dtypes: Vec<DType>) -> Self {
        if names.len() != dtypes.len() {
            quiver_panic!(
                "length mismatch between names ({}) and dtypes ({})",
                names.len(),
                dtypes.len()
            );
        }

        Self {
            names,
            dtypes: dtypes.into(),
        }
    }

    /// A struct without fields.
    pub fn empty() -> Self {
        Self::new(Arc::from([]), Vec::new())
    }

    /// The field names, in field order.
    pub fn names(&self) -> &FieldNames {
        &self.names
    }

    /// The number of fields.
    pub fn nfields(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the struct has no fields.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Find the index of a field by name.
    ///
    /// If several fields share the name, the first one is returned; use
    /// [`StructDType::resolve`](crate::StructDType::resolve) where duplicates must be reported.
    pub fn find_name(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.as_ref() == name)
    }

    /// Looks up a direct child by name or position.
    pub fn field_info(&self, field: &Field) -> QuiverResult<FieldInfo<'_>> {
        let index = match field {
            Field::Name(name) => self
                .find_name(name)
                .ok_or_else(|| QuiverError::field_not_found(field))?,
            Field::Index(index) => *index,
        };
        if index >= self.names.len() {
            quiver_bail!("field index out of bounds: {index}")
        }
        Ok(FieldInfo {
            index,
            name: &self.names[index],
            dtype: &self.dtypes[index],
        })
    }

    /// The type of the field at `index`.
    pub fn field_dtype(&self, index: usize) -> Option<&DType> {
        self.dtypes.get(index)
    }

    /// The field types, in field order.
    pub fn dtypes(&self) -> impl ExactSizeIterator<Item = &DType> + '_ {
        self.dtypes.iter()
    }

    /// Returns an ordered iterator over `(name, dtype)` pairs.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = (&FieldName, &DType)> + '_ {
        self.names.iter().zip(self.dtypes.iter())
    }
}

impl<T, V> FromIterator<(T, V)> for StructDType
where
    T: Into<FieldName>,
    V: Into<DType>,
{
    fn from_iter<I: IntoIterator<Item = (T, V)>>(iter: I) -> Self {
        let (names, dtypes): (Vec<FieldName>, Vec<DType>) = iter
            .into_iter()
            .map(|(name, dtype)| (name.into(), dtype.into()))
            .unzip();
        StructDType::new(names.into(), dtypes)
    }
}
