use std::any::Any;
use std::fmt::Display;
use std::sync::Arc;

use arrow_arith::boolean;
use arrow_array::RecordBatch;
use quiver_dtype::{DType, Nullability, StructDType};
use quiver_error::QuiverResult;

use crate::{ColumnarValue, ExprRef, QuiverExpr};

/// Tests every value of the child for null.
#[derive(Debug, Eq, Hash)]
#[allow(clippy::derived_hash_with_manual_eq)]
pub struct IsNull {
    child: ExprRef,
}

impl IsNull {
    /// Creates a new null test.
    pub fn new_expr(child: ExprRef) -> ExprRef {
        Arc::new(Self { child })
    }
}

impl PartialEq for IsNull {
    fn eq(&self, other: &Self) -> bool {
        self.child.eq(&other.child)
    }
}

impl Display for IsNull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "is_null({})", self.child)
    }
}

impl QuiverExpr for IsNull {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn evaluate(&self, batch: &RecordBatch) -> QuiverResult<ColumnarValue> {
        let child = self.child.evaluate(batch)?.into_array(batch.num_rows())?;
        Ok(ColumnarValue::Array(Arc::new(boolean::is_null(
            child.as_ref(),
        )?)))
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.child]
    }

    fn replacing_children(self: Arc<Self>, children: Vec<ExprRef>) -> ExprRef {
        assert_eq!(children.len(), 1);
        Self::new_expr(children[0].clone())
    }

    fn return_dtype(&self, _scope: &StructDType) -> QuiverResult<DType> {
        Ok(DType::Bool(Nullability::NonNullable))
    }
}

/// Tests `child` for null values.
pub fn is_null(child: ExprRef) -> ExprRef {
    IsNull::new_expr(child)
}
