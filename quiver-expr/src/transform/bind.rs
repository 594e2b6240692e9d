//! Binding an expression to the schema it will be evaluated against.

use itertools::Itertools;
use quiver_dtype::{DType, Field, FieldPath, ResolvedField, StructDType};
use quiver_error::{QuiverResult, quiver_err};

use crate::traversal::{MutNodeVisitor, Node, TransformResult};
use crate::{Column, ExprRef};

/// An expression whose column references were all resolved against a schema.
#[derive(Debug, Clone)]
pub struct BoundExpr {
    expr: ExprRef,
    references: Vec<ResolvedField>,
}

impl BoundExpr {
    /// The expression, with every column bound to the position it resolved to.
    pub fn expr(&self) -> &ExprRef {
        &self.expr
    }

    /// The distinct fields the expression reads, in order of first reference.
    pub fn references(&self) -> &[ResolvedField] {
        &self.references
    }

    /// Returns true if any referenced field lies below a list.
    pub fn crosses_list(&self) -> bool {
        self.references.iter().any(ResolvedField::crosses_list)
    }

    /// Checks that the expression yields booleans over batches of `scope`.
    ///
    /// `scope` must have the field positions of the schema the columns were resolved against,
    /// it may differ from it in the types of those fields.
    pub fn check_predicate(&self, scope: &StructDType) -> QuiverResult<()> {
        let dtype = self.expr.return_dtype(scope)?;
        if !matches!(dtype, DType::Bool(_) | DType::Null) {
            return Err(quiver_err!(MismatchedTypes: "bool", dtype)
                .with_context(format!("filter {} is not a predicate", self.expr)));
        }
        Ok(())
    }
}

/// Resolves every column reference of `expr` against `scope` and checks that the expression is a
/// predicate over it.
pub fn bind(expr: ExprRef, scope: &StructDType) -> QuiverResult<BoundExpr> {
    let bound = resolve_columns(expr, scope)?;
    bound.check_predicate(scope)?;
    Ok(bound)
}

/// Resolves every column reference of `expr` against `scope` without looking at types.
///
/// Each column is rewritten to a bound column that reads the resolved position and displays the
/// canonical path, see [`ResolvedField::path`]. A column that is already bound is resolved by its
/// position. The first reference that fails to resolve fails the whole binding.
pub fn resolve_columns(expr: ExprRef, scope: &StructDType) -> QuiverResult<BoundExpr> {
    let mut visitor = BindColumns {
        scope,
        references: Vec::new(),
    };
    let expr = expr.transform(&mut visitor)?.result;
    let references = visitor
        .references
        .into_iter()
        .unique_by(|field| field.indices().to_vec())
        .collect();
    Ok(BoundExpr { expr, references })
}

struct BindColumns<'a> {
    scope: &'a StructDType,
    references: Vec<ResolvedField>,
}

impl MutNodeVisitor for BindColumns<'_> {
    type NodeTy = ExprRef;

    fn visit_up(&mut self, node: ExprRef) -> QuiverResult<TransformResult<ExprRef>> {
        let Some(column) = node.as_any().downcast_ref::<Column>() else {
            return Ok(TransformResult::no(node));
        };

        let resolved = match column.indices() {
            Some(indices) => self
                .scope
                .resolve(&indices.iter().copied().map(Field::Index).collect::<FieldPath>())?,
            None => self.scope.resolve(column.path())?,
        };
        let result = if column.indices() == Some(resolved.indices())
            && column.path() == resolved.path()
        {
            TransformResult::no(node)
        } else {
            TransformResult::yes(Column::new_bound_expr(
                resolved.path().clone(),
                resolved.indices(),
            ))
        };
        self.references.push(resolved);
        Ok(result)
    }
}
