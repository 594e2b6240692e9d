use std::any::Any;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use arrow_arith::boolean::{and_kleene, or_kleene};
use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, BooleanArray, RecordBatch};
use arrow_ord::cmp;
use quiver_dtype::{DType, StructDType};
use quiver_error::{QuiverResult, quiver_bail, quiver_err};

use crate::datum::coerce;
use crate::{ColumnarValue, ExprRef, Operator, QuiverExpr};

/// A binary operation over two sub-expressions.
#[derive(Debug, Clone, Eq, Hash)]
#[allow(clippy::derived_hash_with_manual_eq)]
pub struct BinaryExpr {
    lhs: ExprRef,
    operator: Operator,
    rhs: ExprRef,
}

impl BinaryExpr {
    /// Creates a new binary expression.
    pub fn new_expr(lhs: ExprRef, operator: Operator, rhs: ExprRef) -> ExprRef {
        Arc::new(Self { lhs, operator, rhs })
    }

    /// The left-hand operand.
    pub fn lhs(&self) -> &ExprRef {
        &self.lhs
    }

    /// The right-hand operand.
    pub fn rhs(&self) -> &ExprRef {
        &self.rhs
    }

    /// The operator.
    pub fn op(&self) -> Operator {
        self.operator
    }
}

impl Display for BinaryExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.lhs, self.operator, self.rhs)
    }
}

impl QuiverExpr for BinaryExpr {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn evaluate(&self, batch: &RecordBatch) -> QuiverResult<ColumnarValue> {
        let num_rows = batch.num_rows();
        let mut lhs = self.lhs.evaluate(batch)?;
        let rhs = self.rhs.evaluate(batch)?;
        if lhs.is_scalar() && rhs.is_scalar() {
            lhs = ColumnarValue::Array(lhs.into_array(num_rows)?);
        }

        let result = if self.operator.is_comparison() {
            let (lhs, rhs) = coerce(lhs, rhs)?;
            match self.operator {
                Operator::Eq => cmp::eq(&lhs, &rhs)?,
                Operator::NotEq => cmp::neq(&lhs, &rhs)?,
                Operator::Gt => cmp::gt(&lhs, &rhs)?,
                Operator::Gte => cmp::gt_eq(&lhs, &rhs)?,
                Operator::Lt => cmp::lt(&lhs, &rhs)?,
                Operator::Lte => cmp::lt_eq(&lhs, &rhs)?,
                Operator::And | Operator::Or => unreachable!("not a comparison"),
            }
        } else {
            let lhs = lhs.into_array(num_rows)?;
            let rhs = rhs.into_array(num_rows)?;
            let (lhs, rhs) = (as_boolean(&lhs)?, as_boolean(&rhs)?);
            match self.operator {
                Operator::And => and_kleene(lhs, rhs)?,
                _ => or_kleene(lhs, rhs)?,
            }
        };
        Ok(ColumnarValue::Array(Arc::new(result)))
    }

    fn children(&self) -> Vec<&ExprRef> {
        vec![&self.lhs, &self.rhs]
    }

    fn replacing_children(self: Arc<Self>, children: Vec<ExprRef>) -> ExprRef {
        assert_eq!(children.len(), 2);
        BinaryExpr::new_expr(children[0].clone(), self.operator, children[1].clone())
    }

    fn return_dtype(&self, scope: &StructDType) -> QuiverResult<DType> {
        let lhs = self.lhs.return_dtype(scope)?;
        let rhs = self.rhs.return_dtype(scope)?;
        for operand in [&lhs, &rhs] {
            if let DType::Extension(ext) = operand {
                quiver_bail!(
                    "cannot apply {} to values of extension type {}",
                    self.operator,
                    ext.id()
                );
            }
            if !self.operator.is_comparison() && !matches!(operand, DType::Bool(_) | DType::Null) {
                quiver_bail!(MismatchedTypes: "bool", operand);
            }
        }
        Ok(DType::Bool(lhs.nullability() | rhs.nullability()))
    }
}

impl PartialEq for BinaryExpr {
    fn eq(&self, other: &BinaryExpr) -> bool {
        other.operator == self.operator && other.lhs.eq(&self.lhs) && other.rhs.eq(&self.rhs)
    }
}

pub(crate) fn as_boolean(array: &ArrayRef) -> QuiverResult<&BooleanArray> {
    array
        .as_boolean_opt()
        .ok_or_else(|| quiver_err!(MismatchedTypes: "bool", array.data_type()))
}

/// `lhs = rhs`
pub fn eq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    BinaryExpr::new_expr(lhs, Operator::Eq, rhs)
}

/// `lhs != rhs`
pub fn not_eq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    BinaryExpr::new_expr(lhs, Operator::NotEq, rhs)
}

/// `lhs >= rhs`
pub fn gt_eq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    BinaryExpr::new_expr(lhs, Operator::Gte, rhs)
}

/// `lhs > rhs`
pub fn gt(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    BinaryExpr::new_expr(lhs, Operator::Gt, rhs)
}

/// `lhs <= rhs`
pub fn lt_eq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    BinaryExpr::new_expr(lhs, Operator::Lte, rhs)
}

/// `lhs < rhs`
pub fn lt(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    BinaryExpr::new_expr(lhs, Operator::Lt, rhs)
}

/// Kleene disjunction, a null operand only matters when the other side is false.
pub fn or(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    BinaryExpr::new_expr(lhs, Operator::Or, rhs)
}

/// Kleene conjunction, a null operand only matters when the other side is true.
pub fn and(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    BinaryExpr::new_expr(lhs, Operator::And, rhs)
}
