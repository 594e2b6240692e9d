//! A projection mask is the tree of fields a scan materializes out of a schema.

use std::collections::BTreeMap;
use std::sync::Arc;

use quiver_error::{QuiverError, QuiverResult, quiver_bail, quiver_err};

use crate::{DType, Field, FieldPath, ResolvedField, StructDType};

/// The set of fields selected from a struct, addressed by child position.
///
/// Children are kept in position order, so applying a mask always reproduces the relative field
/// order of the schema it was built from, however the paths were supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionMask {
    /// The whole subtree is selected.
    All,
    /// Only the listed children are selected, each with its own mask. A list selects its element
    /// as child `0`.
    Select(BTreeMap<usize, ProjectionMask>),
}

static ALL: ProjectionMask = ProjectionMask::All;

impl Default for ProjectionMask {
    fn default() -> Self {
        Self::none()
    }
}

impl ProjectionMask {
    /// A mask selecting nothing.
    pub fn none() -> Self {
        Self::Select(BTreeMap::new())
    }

    /// Resolves every path against `schema` and selects the union of the resolved fields.
    ///
    /// An empty set of paths is rejected with [`QuiverError::EmptyProjection`]; the identity
    /// projection is [`ProjectionMask::All`]. The first path that fails to resolve aborts the
    /// whole projection.
    pub fn try_new(schema: &StructDType, paths: &[FieldPath]) -> QuiverResult<Self> {
        if paths.is_empty() {
            return Err(QuiverError::EmptyProjection);
        }

        let mut mask = Self::none();
        for path in paths {
            mask.insert(schema.resolve(path)?.indices());
        }
        Ok(mask)
    }

    /// Selects exactly the given resolved fields.
    pub fn from_resolved<'a>(fields: impl IntoIterator<Item = &'a ResolvedField>) -> Self {
        let mut mask = Self::none();
        for field in fields {
            mask.insert(field.indices());
        }
        mask
    }

    /// Adds the subtree at `indices` to the selection.
    pub fn insert(&mut self, indices: &[usize]) {
        let Some((first, rest)) = indices.split_first() else {
            *self = Self::All;
            return;
        };
        if let Self::Select(children) = self {
            children.entry(*first).or_insert_with(Self::none).insert(rest);
        }
    }

    /// Extends this selection with everything `other` selects.
    pub fn union(&mut self, other: &Self) {
        match other {
            Self::All => *self = Self::All,
            Self::Select(other_children) => {
                if let Self::Select(children) = self {
                    for (index, mask) in other_children {
                        children.entry(*index).or_insert_with(Self::none).union(mask);
                    }
                }
            }
        }
    }

    /// Returns true if the whole subtree is selected.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Select(children) if children.is_empty())
    }

    /// Returns the mask of the child at `index`, or `None` if that child is not selected.
    pub fn child(&self, index: usize) -> Option<&ProjectionMask> {
        match self {
            Self::All => Some(&ALL),
            Self::Select(children) => children.get(&index),
        }
    }

    /// Returns the positions of the selected children of a struct with `nfields` fields.
    pub fn selected(&self, nfields: usize) -> Vec<usize> {
        match self {
            Self::All => (0..nfields).collect(),
            Self::Select(children) => children.keys().copied().collect(),
        }
    }

    /// Prunes `schema` down to the selected fields.
    pub fn apply(&self, schema: &StructDType) -> QuiverResult<StructDType> {
        let Self::Select(children) = self else {
            return Ok(schema.clone());
        };

        let mut names = Vec::with_capacity(children.len());
        let mut dtypes = Vec::with_capacity(children.len());
        for (index, mask) in children {
            let info = schema.field_info(&Field::Index(*index))?;
            names.push(info.name.clone());
            dtypes.push(mask.apply_dtype(info.dtype)?);
        }
        Ok(StructDType::new(names.into(), dtypes))
    }

    /// Prunes `dtype` down to the selected fields, keeping every struct and list wrapper on the
    /// way to a selected field.
    pub fn apply_dtype(&self, dtype: &DType) -> QuiverResult<DType> {
        match (self, dtype) {
            (Self::All, _) => Ok(dtype.clone()),
            (Self::Select(_), DType::Struct(st, nullability)) => {
                Ok(DType::Struct(self.apply(st)?, *nullability))
            }
            (Self::Select(children), DType::List(element, nullability)) => {
                let element_mask = children.get(&0).ok_or_else(|| {
                    quiver_err!(InvalidState: "a list projection must select its element")
                })?;
                Ok(DType::List(
                    Arc::new(element_mask.apply_dtype(element)?),
                    *nullability,
                ))
            }
            (Self::Select(_), other) => {
                quiver_bail!(InvalidState: "cannot select children of {other}")
            }
        }
    }
}

impl StructDType {
    /// Builds the minimal schema containing the fields named by `paths`, see
    /// [`ProjectionMask::try_new`].
    pub fn project_paths(&self, paths: &[FieldPath]) -> QuiverResult<StructDType> {
        ProjectionMask::try_new(self, paths)?.apply(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiver_error::QuiverError;
    use rstest::rstest;

    use super::*;
    use crate::{Nullability, PType};

    fn objects(children: StructDType) -> DType {
        DType::List(
            Arc::new(DType::Struct(children, Nullability::NonNullable)),
            Nullability::NonNullable,
        )
    }

    fn nested_schema() -> StructDType {
        StructDType::from_iter([
            ("pk", DType::from(PType::I32)),
            (
                "objects",
                objects(StructDType::from_iter([
                    ("val", DType::from(PType::I64)),
                    ("id", DType::from(PType::I32)),
                    ("label", DType::Utf8(Nullability::NonNullable)),
                ])),
            ),
            (
                "meta",
                DType::Struct(
                    StructDType::from_iter([
                        ("a", DType::from(PType::U8)),
                        ("b", DType::from(PType::U16)),
                        ("c", DType::from(PType::U32)),
                    ]),
                    Nullability::Nullable,
                ),
            ),
        ])
    }

    fn paths(dot_paths: &[&str]) -> Vec<FieldPath> {
        dot_paths
            .iter()
            .map(|p| FieldPath::from_dot_path(p).unwrap())
            .collect()
    }

    #[test]
    fn keeps_list_wrapper_around_requested_leaf() {
        let projected = nested_schema()
            .project_paths(&paths(&["objects.val"]))
            .unwrap();
        let expected = StructDType::from_iter([(
            "objects",
            objects(StructDType::from_iter([("val", DType::from(PType::I64))])),
        )]);
        assert_eq!(projected, expected);
    }

    #[rstest]
    #[case(&["meta.c", "pk", "meta.a"])]
    #[case(&["meta.a", "meta.c", "pk"])]
    #[case(&["pk", "meta.a", "meta.c", "meta.a"])]
    fn preserves_schema_order(#[case] dot_paths: &[&str]) {
        let projected = nested_schema().project_paths(&paths(dot_paths)).unwrap();
        let expected = StructDType::from_iter([
            ("pk", DType::from(PType::I32)),
            (
                "meta",
                DType::Struct(
                    StructDType::from_iter([
                        ("a", DType::from(PType::U8)),
                        ("c", DType::from(PType::U32)),
                    ]),
                    Nullability::Nullable,
                ),
            ),
        ]);
        assert_eq!(projected, expected);
    }

    #[rstest]
    #[case(&["objects.val"])]
    #[case(&["objects[0].label", "pk"])]
    #[case(&["meta", "objects.id"])]
    #[case(&["meta.b", "objects"])]
    fn projection_is_idempotent(#[case] dot_paths: &[&str]) {
        let paths = paths(dot_paths);
        let once = nested_schema().project_paths(&paths).unwrap();
        let twice = once.project_paths(&paths).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn requesting_a_wrapper_keeps_its_subtree() {
        let schema = nested_schema();
        let projected = schema
            .project_paths(&paths(&["meta", "meta.a"]))
            .unwrap();
        assert_eq!(projected.names().as_ref(), &["meta".into()]);
        assert_eq!(projected.field_dtype(0), schema.field_dtype(2));
    }

    #[test]
    fn failing_path_aborts_projection() {
        let err = nested_schema()
            .project_paths(&paths(&["pk", "objects.nope"]))
            .unwrap_err();
        assert!(matches!(err, QuiverError::FieldNotFound { .. }));
    }

    #[test]
    fn empty_projection_is_an_error() {
        assert!(matches!(
            nested_schema().project_paths(&[]),
            Err(QuiverError::EmptyProjection)
        ));
    }

    #[test]
    fn union_of_masks() {
        let schema = nested_schema();
        let mut mask = ProjectionMask::try_new(&schema, &paths(&["meta.a"])).unwrap();
        mask.union(&ProjectionMask::try_new(&schema, &paths(&["objects.id", "meta.b"])).unwrap());
        assert_eq!(mask.selected(schema.nfields()), vec![1, 2]);
        assert_eq!(mask.child(2).unwrap().selected(3), vec![0, 1]);

        mask.union(&ProjectionMask::All);
        assert!(mask.is_all());
        assert_eq!(mask.apply(&schema).unwrap(), schema);
    }
}
