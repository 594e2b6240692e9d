//! Row filter expressions over Arrow record batches.
//!
//! An expression tree is built from [`col`], [`lit`] and the operator helpers, bound against a
//! schema with [`transform::bind`] and evaluated batch by batch.

use std::any::Any;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use arrow_array::RecordBatch;
use dyn_hash::DynHash;
use quiver_dtype::{DType, StructDType};
use quiver_error::QuiverResult;

mod binary;
mod column;
mod datum;
mod is_null;
mod literal;
mod not;
mod operators;
mod scalar;
pub mod transform;
pub mod traversal;

pub use binary::*;
pub use column::*;
pub use datum::*;
pub use is_null::*;
pub use literal::*;
pub use not::*;
pub use operators::*;
pub use scalar::*;

/// A shared reference to an expression.
pub type ExprRef = Arc<dyn QuiverExpr>;

/// Represents a logical operation over the rows of a [`RecordBatch`].
pub trait QuiverExpr: Debug + Send + Sync + DynEq + DynHash + Display {
    /// Convert expression reference to reference of [`Any`] type
    fn as_any(&self) -> &dyn Any;

    /// Compute the result of the expression for every row of `batch`.
    fn evaluate(&self, batch: &RecordBatch) -> QuiverResult<ColumnarValue>;

    /// The direct sub-expressions of this expression.
    fn children(&self) -> Vec<&ExprRef>;

    /// Rebuilds this expression over new children, in the order of [`QuiverExpr::children`].
    fn replacing_children(self: Arc<Self>, children: Vec<ExprRef>) -> ExprRef;

    /// Compute the type of the values returned by [`QuiverExpr::evaluate`] over batches of
    /// `scope`.
    fn return_dtype(&self, scope: &StructDType) -> QuiverResult<DType>;
}

/// [`QuiverExpr`] can't be constrained by [`Eq`] directly because it must remain object safe.
/// A blanket implementation is provided for all [`Eq`] types.
pub trait DynEq {
    /// Compares `self` against a type-erased value.
    fn dyn_eq(&self, other: &dyn Any) -> bool;
}

impl<T: Eq + Any> DynEq for T {
    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<Self>() == Some(self)
    }
}

impl PartialEq for dyn QuiverExpr {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other.as_any())
    }
}

impl Eq for dyn QuiverExpr {}

dyn_hash::hash_trait_object!(QuiverExpr);


#[cfg(test)]
mod tests {
    use quiver_dtype::{Field, FieldPath};

    use super::*;

    #[test]
    fn expr_display() {
        let col1 = col("col1");
        let col2 = col("col2");
        assert_eq!(and(col1.clone(), col2.clone()).to_string(), "(col1 and col2)");
        assert_eq!(or(col1.clone(), col2.clone()).to_string(), "(col1 or col2)");
        assert_eq!(eq(col1.clone(), col2.clone()).to_string(), "(col1 = col2)");
        assert_eq!(not_eq(col1.clone(), col2.clone()).to_string(), "(col1 != col2)");
        assert_eq!(gt_eq(col1.clone(), lit(3_u8)).to_string(), "(col1 >= 3_u8)");
        assert_eq!(not(col1.clone()).to_string(), "!col1");
        assert_eq!(is_null(col1).to_string(), "is_null(col1)");
        assert_eq!(
            lt(
                col_path(FieldPath::from_iter([
                    Field::from("objects"),
                    Field::Index(0),
                    Field::from("val"),
                ])),
                lit("x"),
            )
            .to_string(),
            "(objects[0].val < \"x\")"
        );
    }
}
