//! Convert between Quiver [`DType`]s and Arrow schemas.
//!
//! Extension types are represented the way Arrow does it: the field carries the storage type and
//! names the logical type in its metadata, under [`EXTENSION_NAME_KEY`] and
//! [`EXTENSION_METADATA_KEY`].

use std::collections::HashMap;
use std::sync::Arc;

use arrow_schema::{DataType, Field, FieldRef, Fields, Schema, SchemaRef};
use quiver_error::{QuiverResult, quiver_bail};

use crate::{DType, ExtDType, ExtID, ExtMetadata, ExtensionBindings, Nullability, PType, StructDType};

/// Field metadata key holding the name of an extension type.
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";
/// Field metadata key holding the serialized parameters of an extension type.
pub const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";

/// Name of the element field of Arrow list types.
const LIST_ITEM: &str = "item";

/// Fallible conversion from an Arrow type.
pub trait TryFromArrowType<T>: Sized {
    /// Convert the Arrow type into a Quiver type.
    fn try_from_arrow(value: T) -> QuiverResult<Self>;
}

impl TryFromArrowType<&Schema> for StructDType {
    fn try_from_arrow(value: &Schema) -> QuiverResult<Self> {
        fields_from_arrow(value.fields())
    }
}

impl TryFromArrowType<SchemaRef> for StructDType {
    fn try_from_arrow(value: SchemaRef) -> QuiverResult<Self> {
        Self::try_from_arrow(value.as_ref())
    }
}

impl TryFromArrowType<&Schema> for DType {
    fn try_from_arrow(value: &Schema) -> QuiverResult<Self> {
        Ok(DType::Struct(
            StructDType::try_from_arrow(value)?,
            Nullability::NonNullable,
        ))
    }
}

impl TryFromArrowType<&Field> for DType {
    fn try_from_arrow(field: &Field) -> QuiverResult<Self> {
        let nullability = Nullability::from(field.is_nullable());
        let storage = match field.data_type() {
            DataType::Null => DType::Null,
            DataType::Boolean => DType::Bool(nullability),
            DataType::UInt8 => DType::Primitive(PType::U8, nullability),
            DataType::UInt16 => DType::Primitive(PType::U16, nullability),
            DataType::UInt32 => DType::Primitive(PType::U32, nullability),
            DataType::UInt64 => DType::Primitive(PType::U64, nullability),
            DataType::Int8 => DType::Primitive(PType::I8, nullability),
            DataType::Int16 => DType::Primitive(PType::I16, nullability),
            DataType::Int32 => DType::Primitive(PType::I32, nullability),
            DataType::Int64 => DType::Primitive(PType::I64, nullability),
            DataType::Float32 => DType::Primitive(PType::F32, nullability),
            DataType::Float64 => DType::Primitive(PType::F64, nullability),
            DataType::Utf8 => DType::Utf8(nullability),
            DataType::Binary => DType::Binary(nullability),
            DataType::Struct(fields) => DType::Struct(fields_from_arrow(fields)?, nullability),
            DataType::List(element) => {
                DType::List(Arc::new(DType::try_from_arrow(element.as_ref())?), nullability)
            }
            other => quiver_bail!("unsupported arrow type {other} for field {}", field.name()),
        };

        let Some(id) = field.metadata().get(EXTENSION_NAME_KEY) else {
            return Ok(storage);
        };
        let metadata = field
            .metadata()
            .get(EXTENSION_METADATA_KEY)
            .map(|m| ExtMetadata::from(m.as_str()));
        Ok(DType::Extension(Arc::new(ExtDType::new(
            ExtID::from(id.as_str()),
            Arc::new(storage),
            metadata,
        ))))
    }
}

fn fields_from_arrow(fields: &Fields) -> QuiverResult<StructDType> {
    let mut names = Vec::with_capacity(fields.len());
    let mut dtypes = Vec::with_capacity(fields.len());
    for field in fields.iter() {
        names.push(field.name().as_str().into());
        dtypes.push(DType::try_from_arrow(field.as_ref())?);
    }
    Ok(StructDType::new(names.into(), dtypes))
}

impl DType {
    /// Returns the Arrow type values of `self` are stored as.
    ///
    /// Extension types nested inside `self` are tagged on the fields that carry them.
    pub fn to_arrow_dtype(&self) -> DataType {
        data_type_with(self, &|_| true)
    }

    /// Returns an Arrow field named `name` holding values of `self`, tagging every extension type.
    pub fn to_arrow_field(&self, name: &str) -> Field {
        field_with(name, self, &|_| true)
    }
}

impl StructDType {
    /// Converts `self` into an Arrow schema, tagging every extension type.
    pub fn to_arrow_schema(&self) -> Schema {
        schema_with(self, &|_| true)
    }

    /// Converts `self` into the Arrow schema of its storage, without any extension tags.
    pub fn to_storage_arrow_schema(&self) -> Schema {
        schema_with(self, &|_| false)
    }
}

impl ExtensionBindings {
    /// Converts `schema` into the Arrow schema a scan emits: bound extension types are tagged,
    /// unbound ones are emitted as their bare storage.
    pub fn output_schema(&self, schema: &StructDType) -> Schema {
        schema_with(schema, &|ext| self.is_bound(ext))
    }
}

fn schema_with(schema: &StructDType, tag: &dyn Fn(&ExtDType) -> bool) -> Schema {
    Schema::new(fields_with(schema, tag))
}

fn fields_with(schema: &StructDType, tag: &dyn Fn(&ExtDType) -> bool) -> Fields {
    schema
        .fields()
        .map(|(name, dtype)| FieldRef::new(field_with(name, dtype, tag)))
        .collect()
}

fn field_with(name: &str, dtype: &DType, tag: &dyn Fn(&ExtDType) -> bool) -> Field {
    let field = Field::new(name, data_type_with(dtype, tag), dtype.is_nullable());
    match dtype {
        DType::Extension(ext) if tag(ext) => {
            let mut metadata = HashMap::from([(
                EXTENSION_NAME_KEY.to_string(),
                ext.id().as_ref().to_string(),
            )]);
            if let Some(ext_metadata) = ext.metadata() {
                metadata.insert(
                    EXTENSION_METADATA_KEY.to_string(),
                    ext_metadata.as_ref().to_string(),
                );
            }
            field.with_metadata(metadata)
        }
        _ => field,
    }
}

fn data_type_with(dtype: &DType, tag: &dyn Fn(&ExtDType) -> bool) -> DataType {
    match dtype {
        DType::Null => DataType::Null,
        DType::Bool(_) => DataType::Boolean,
        DType::Primitive(ptype, _) => match ptype {
            PType::U8 => DataType::UInt8,
            PType::U16 => DataType::UInt16,
            PType::U32 => DataType::UInt32,
            PType::U64 => DataType::UInt64,
            PType::I8 => DataType::Int8,
            PType::I16 => DataType::Int16,
            PType::I32 => DataType::Int32,
            PType::I64 => DataType::Int64,
            PType::F32 => DataType::Float32,
            PType::F64 => DataType::Float64,
        },
        DType::Utf8(_) => DataType::Utf8,
        DType::Binary(_) => DataType::Binary,
        DType::Struct(st, _) => DataType::Struct(fields_with(st, tag)),
        DType::List(element, _) => {
            DataType::List(FieldRef::new(field_with(LIST_ITEM, element, tag)))
        }
        DType::Extension(ext) => data_type_with(ext.storage_dtype(), tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtensionRegistry;

    fn parametric() -> Arc<ExtDType> {
        Arc::new(ExtDType::new(
            ExtID::from("parametric"),
            Arc::new(DType::Primitive(PType::I32, Nullability::Nullable)),
            Some(ExtMetadata::from("1")),
        ))
    }

    fn schema() -> StructDType {
        StructDType::from_iter([
            ("pk", DType::Primitive(PType::I32, Nullability::Nullable)),
            (
                "objects",
                DType::List(
                    Arc::new(DType::Struct(
                        StructDType::from_iter([
                            ("val", DType::from(PType::I64)),
                            ("label", DType::Utf8(Nullability::Nullable)),
                        ]),
                        Nullability::NonNullable,
                    )),
                    Nullability::Nullable,
                ),
            ),
            ("c2", DType::Extension(parametric())),
        ])
    }

    #[test]
    fn schema_survives_arrow() {
        let arrow = schema().to_arrow_schema();
        assert_eq!(arrow.field(0).data_type(), &DataType::Int32);
        assert_eq!(
            arrow.field(2).metadata().get(EXTENSION_NAME_KEY).map(String::as_str),
            Some("parametric")
        );
        assert_eq!(StructDType::try_from_arrow(&arrow).unwrap(), schema());
    }

    #[test]
    fn storage_schema_has_no_tags() {
        let arrow = schema().to_storage_arrow_schema();
        assert!(arrow.field(2).metadata().is_empty());
        assert_eq!(arrow.field(2).data_type(), &DataType::Int32);
        assert!(arrow.field(2).is_nullable());
    }

    #[test]
    fn output_schema_tags_only_bound_types() {
        let registry = ExtensionRegistry::new();
        let unbound = registry.schema_bindings(&schema()).unwrap();
        assert!(unbound.output_schema(&schema()).field(2).metadata().is_empty());

        registry.register(parametric()).unwrap();
        let bound = registry.schema_bindings(&schema()).unwrap();
        let output = bound.output_schema(&schema());
        assert_eq!(
            output.field(2).metadata().get(EXTENSION_METADATA_KEY).map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn rejects_unsupported_types() {
        let arrow = Schema::new(vec![Field::new("big", DataType::LargeUtf8, false)]);
        assert!(StructDType::try_from_arrow(&arrow).is_err());
    }
}
