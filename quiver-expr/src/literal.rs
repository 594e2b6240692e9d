use std::any::Any;
use std::fmt::Display;
use std::sync::Arc;

use arrow_array::{RecordBatch, Scalar as ArrowScalar};
use quiver_dtype::{DType, StructDType};
use quiver_error::QuiverResult;

use crate::{ColumnarValue, ExprRef, QuiverExpr, Scalar};

/// A constant value.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Literal {
    value: Scalar,
}

impl Literal {
    /// Creates a new literal expression.
    pub fn new_expr(value: impl Into<Scalar>) -> ExprRef {
        Arc::new(Self {
            value: value.into(),
        })
    }

    /// The constant value.
    pub fn value(&self) -> &Scalar {
        &self.value
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl QuiverExpr for Literal {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn evaluate(&self, _batch: &RecordBatch) -> QuiverResult<ColumnarValue> {
        Ok(ColumnarValue::Scalar(ArrowScalar::new(
            self.value.to_array(1),
        )))
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![]
    }

    fn replacing_children(self: Arc<Self>, children: Vec<ExprRef>) -> ExprRef {
        debug_assert_eq!(children.len(), 0);
        self
    }

    fn return_dtype(&self, _scope: &StructDType) -> QuiverResult<DType> {
        Ok(self.value.dtype())
    }
}

/// Create a new `Literal` expression from a type that coerces to `Scalar`.
///
/// ## Example usage
///
/// ```
/// use quiver_expr::{lit, Literal, Scalar};
///
/// let number = lit(34i32);
///
/// let literal = number.as_any()
///     .downcast_ref::<Literal>()
///     .unwrap();
/// assert_eq!(literal.value(), &Scalar::I32(34));
/// ```
pub fn lit(value: impl Into<Scalar>) -> ExprRef {
    Literal::new_expr(value)
}
