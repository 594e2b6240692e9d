use std::any::Any;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use arrow_arith::boolean;
use arrow_array::RecordBatch;
use quiver_dtype::{DType, StructDType};
use quiver_error::QuiverResult;

use crate::binary::as_boolean;
use crate::{ColumnarValue, ExprRef, QuiverExpr};

/// Boolean negation. Nulls stay null.
#[derive(Debug, Eq, Hash)]
#[allow(clippy::derived_hash_with_manual_eq)]
pub struct Not {
    child: ExprRef,
}

impl Not {
    /// Creates a new negation.
    pub fn new_expr(child: ExprRef) -> ExprRef {
        Arc::new(Self { child })
    }

    /// The negated expression.
    pub fn child(&self) -> &ExprRef {
        &self.child
    }
}

impl Display for Not {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!")?;
        self.child.fmt(f)
    }
}

impl QuiverExpr for Not {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn evaluate(&self, batch: &RecordBatch) -> QuiverResult<ColumnarValue> {
        let child = self.child.evaluate(batch)?.into_array(batch.num_rows())?;
        Ok(ColumnarValue::Array(Arc::new(boolean::not(as_boolean(
            &child,
        )?)?)))
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.child]
    }

    fn replacing_children(self: Arc<Self>, mut children: Vec<ExprRef>) -> ExprRef {
        assert_eq!(children.len(), 1);
        Self::new_expr(children.remove(0))
    }

    fn return_dtype(&self, scope: &StructDType) -> QuiverResult<DType> {
        self.child.return_dtype(scope)
    }
}

impl PartialEq for Not {
    fn eq(&self, other: &Not) -> bool {
        other.child.eq(&self.child)
    }
}

/// Negates a boolean expression.
pub fn not(operand: ExprRef) -> ExprRef {
    Not::new_expr(operand)
}

#[cfg(test)]
mod tests {
    use arrow_array::cast::AsArray;
    use quiver_dtype::Nullability;

    use crate::{col, gt, lit, not, test_harness};

    #[test]
    fn invert_booleans() {
        let batch = test_harness::batch();
        let result = not(gt(col("score"), lit(15_i64)))
            .evaluate(&batch)
            .unwrap()
            .into_array(batch.num_rows())
            .unwrap();
        assert_eq!(
            result.as_boolean().iter().collect::<Vec<_>>(),
            vec![Some(true), None, Some(false), Some(false)]
        );
    }

    #[test]
    fn dtype() {
        let scope = test_harness::schema();
        assert_eq!(
            not(gt(col("id"), lit(1))).return_dtype(&scope).unwrap(),
            quiver_dtype::DType::Bool(Nullability::NonNullable)
        );
    }
}
