use std::any::Any;
use std::fmt::Display;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, RecordBatch, make_array};
use arrow_buffer::NullBuffer;
use arrow_schema::Fields;
use itertools::Itertools;
use quiver_dtype::{DType, Field, FieldPath, StructDType};
use quiver_error::{QuiverError, QuiverResult, quiver_bail, quiver_err};

use crate::{ColumnarValue, ExprRef, QuiverExpr};

/// A reference to a (possibly nested) column of the batch.
///
/// A bound column also carries the child positions its path resolved to and is evaluated by
/// position, so duplicate or dotted names cannot change which column it reads.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Column {
    path: FieldPath,
    indices: Option<Arc<[usize]>>,
}

impl Column {
    /// Creates a new column reference.
    pub fn new_expr(path: impl Into<FieldPath>) -> ExprRef {
        Arc::new(Self {
            path: path.into(),
            indices: None,
        })
    }

    /// Creates a reference to the column at `indices`, displayed as `path`.
    pub fn new_bound_expr(path: FieldPath, indices: &[usize]) -> ExprRef {
        Arc::new(Self {
            path,
            indices: Some(indices.into()),
        })
    }

    /// The path of the referenced column.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// The child positions of the referenced column, if it was bound.
    pub fn indices(&self) -> Option<&[usize]> {
        self.indices.as_deref()
    }

    fn selectors(&self) -> Vec<Field> {
        match &self.indices {
            Some(indices) => indices.iter().copied().map(Field::Index).collect(),
            None => self.path.path().to_vec(),
        }
    }
}

/// References the top-level column `field`.
pub fn col(field: impl Into<Field>) -> ExprRef {
    Column::new_expr(field.into())
}

/// References the column at `path`.
pub fn col_path(path: impl Into<FieldPath>) -> ExprRef {
    Column::new_expr(path)
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl QuiverExpr for Column {
    fn as_any(&self) -> &dyn Any {
        self
    }

    /// Walks the batch down to the referenced column. A null struct makes every value below it
    /// null. Values below a list cannot be evaluated row by row and are rejected.
    fn evaluate(&self, batch: &RecordBatch) -> QuiverResult<ColumnarValue> {
        let selectors = self.selectors();
        let mut selectors = selectors.iter();
        let Some(first) = selectors.next() else {
            quiver_bail!("cannot evaluate a column reference with an empty path");
        };

        let mut array = self.child(batch.schema_ref().fields(), batch.columns(), first)?;
        for selector in selectors {
            let parent = array.as_struct_opt().ok_or_else(|| {
                quiver_err!(
                    "cannot evaluate {} through a value of type {}",
                    self.path,
                    array.data_type()
                )
            })?;
            let child = self.child(parent.fields(), parent.columns(), selector)?;
            array = with_parent_nulls(child, parent.nulls())?;
        }
        Ok(ColumnarValue::Array(array))
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![]
    }

    fn replacing_children(self: Arc<Self>, children: Vec<ExprRef>) -> ExprRef {
        debug_assert_eq!(children.len(), 0);
        self
    }

    fn return_dtype(&self, scope: &StructDType) -> QuiverResult<DType> {
        match &self.indices {
            Some(indices) => Ok(scope.field_at(indices)?.clone()),
            None => Ok(scope.resolve(&self.path)?.dtype().clone()),
        }
    }
}

impl Column {
    fn child(&self, fields: &Fields, columns: &[ArrayRef], selector: &Field) -> QuiverResult<ArrayRef> {
        let index = match selector {
            Field::Name(name) => {
                let positions = fields
                    .iter()
                    .positions(|f| f.name() == name.as_ref())
                    .collect_vec();
                match positions.as_slice() {
                    [] => None,
                    [index] => Some(*index),
                    _ => {
                        return Err(QuiverError::AmbiguousField {
                            path: self.path.to_string().into(),
                            matches: positions
                                .iter()
                                .map(|index| format!("\"{name}\"@{index}"))
                                .collect(),
                        });
                    }
                }
            }
            Field::Index(index) => Some(*index),
        };
        index
            .and_then(|index| columns.get(index))
            .cloned()
            .ok_or_else(|| QuiverError::field_not_found(&self.path))
    }
}

fn with_parent_nulls(child: ArrayRef, parent_nulls: Option<&NullBuffer>) -> QuiverResult<ArrayRef> {
    let Some(parent_nulls) = parent_nulls else {
        return Ok(child);
    };
    let nulls = NullBuffer::union(Some(parent_nulls), child.nulls());
    let data = child.to_data().into_builder().nulls(nulls).build()?;
    Ok(make_array(data))
}
