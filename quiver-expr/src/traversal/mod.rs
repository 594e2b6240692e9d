//! Bottom-up rewrites of expression trees.

use quiver_error::QuiverResult;

use crate::ExprRef;

/// The outcome of rewriting a node.
#[derive(Debug, Clone)]
pub struct TransformResult<T> {
    /// The rewritten node.
    pub result: T,
    /// Whether the node or any of its children was replaced.
    pub changed: bool,
}

impl<T> TransformResult<T> {
    /// The node was replaced by `result`.
    pub fn yes(result: T) -> Self {
        Self {
            result,
            changed: true,
        }
    }

    /// The node was kept as is.
    pub fn no(result: T) -> Self {
        Self {
            result,
            changed: false,
        }
    }
}

/// Rewrites the nodes of a tree bottom-up.
pub trait MutNodeVisitor {
    /// The type of the rewritten nodes.
    type NodeTy: Node;

    /// Called with `node` after its children were rewritten.
    fn visit_up(&mut self, node: Self::NodeTy) -> QuiverResult<TransformResult<Self::NodeTy>>;
}

/// A tree that visitors can rewrite.
pub trait Node: Sized {
    /// Rewrites the tree with `visitor`, children before their parent and left to right.
    fn transform<V: MutNodeVisitor<NodeTy = Self>>(
        self,
        visitor: &mut V,
    ) -> QuiverResult<TransformResult<Self>>;
}

impl Node for ExprRef {
    fn transform<V: MutNodeVisitor<NodeTy = Self>>(
        self,
        visitor: &mut V,
    ) -> QuiverResult<TransformResult<Self>> {
        let mut changed = false;
        let children = self
            .children()
            .into_iter()
            .map(|child| {
                let rewritten = child.clone().transform(visitor)?;
                changed |= rewritten.changed;
                Ok(rewritten.result)
            })
            .collect::<QuiverResult<Vec<_>>>()?;

        let node = if changed {
            self.replacing_children(children)
        } else {
            self
        };

        let mut up = visitor.visit_up(node)?;
        up.changed |= changed;
        Ok(up)
    }
}
