//! Resolution of [`FieldPath`]s against a [`StructDType`].
//!
//! Struct children are matched by name (or by position for [`Field::Index`]), lists are walked
//! through their single element type. A struct child whose own name contains dots may match
//! several consecutive name segments, so a dotted path can have more than one structurally
//! distinct match: all of them are collected and anything other than exactly one is an error.

use itertools::Itertools;
use quiver_error::{QuiverError, QuiverResult, quiver_bail, quiver_err};

use crate::{DType, Field, FieldName, FieldPath, StructDType};

/// The unique field a [`FieldPath`] resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedField {
    indices: Vec<usize>,
    path: FieldPath,
    name: FieldName,
    dtype: DType,
}

impl ResolvedField {
    /// Child positions from the root down to the field.
    ///
    /// Every struct on the way contributes the position of the child that was taken, every list
    /// contributes `0` for its element.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The canonical path of the field: one name per struct step and `[0]` per list step.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// The name of the innermost struct child on the path.
    pub fn name(&self) -> &FieldName {
        &self.name
    }

    /// The type of the resolved field.
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Returns true if the path steps through a list element on its way to the field.
    pub fn crosses_list(&self) -> bool {
        self.path
            .path()
            .iter()
            .any(|field| matches!(field, Field::Index(_)))
    }
}

#[derive(Default)]
struct Trail {
    indices: Vec<usize>,
    fields: Vec<Field>,
    names: Vec<FieldName>,
}

impl Trail {
    fn enter_child(&mut self, index: usize, name: &FieldName) {
        self.indices.push(index);
        self.fields.push(Field::Name(name.clone()));
        self.names.push(name.clone());
    }

    fn enter_element(&mut self) {
        self.indices.push(0);
        self.fields.push(Field::Index(0));
    }

    fn leave_child(&mut self) {
        self.indices.pop();
        self.fields.pop();
        self.names.pop();
    }

    fn leave_element(&mut self) {
        self.indices.pop();
        self.fields.pop();
    }

    fn finish(&self, dtype: &DType) -> Option<ResolvedField> {
        let name = self.names.last()?.clone();
        Some(ResolvedField {
            indices: self.indices.clone(),
            path: self.fields.iter().cloned().collect(),
            name,
            dtype: dtype.clone(),
        })
    }
}

impl StructDType {
    /// Resolves `path` to the unique field it addresses.
    ///
    /// Fails with [`QuiverError::FieldNotFound`] if nothing matches and with
    /// [`QuiverError::AmbiguousField`] if more than one field does.
    pub fn resolve(&self, path: &FieldPath) -> QuiverResult<ResolvedField> {
        if path.is_root() {
            quiver_bail!("cannot resolve an empty field path");
        }

        let mut matches = Vec::new();
        walk_struct(self, path.path(), &mut Trail::default(), &mut matches);
        let mut matches = matches.into_iter().unique_by(|m| m.indices.clone());

        match (matches.next(), matches.next()) {
            (None, _) => Err(QuiverError::field_not_found(path)),
            (Some(resolved), None) => Ok(resolved),
            (Some(first), Some(second)) => Err(QuiverError::AmbiguousField {
                path: path.to_string().into(),
                matches: [first, second]
                    .into_iter()
                    .chain(matches)
                    .map(|m| describe_match(self, &m.indices))
                    .collect(),
            }),
        }
    }

    /// Parses `dot_path` and resolves it, see [`StructDType::resolve`].
    pub fn resolve_dot_path(&self, dot_path: &str) -> QuiverResult<ResolvedField> {
        self.resolve(&FieldPath::from_dot_path(dot_path)?)
    }

    /// Returns the type of the field at `indices`, as produced by [`ResolvedField::indices`].
    ///
    /// A list step consumes one index whatever its value.
    pub fn field_at(&self, indices: &[usize]) -> QuiverResult<&DType> {
        let Some((&first, rest)) = indices.split_first() else {
            quiver_bail!("cannot look up a field at an empty position");
        };
        let mut dtype = self
            .field_dtype(first)
            .ok_or_else(|| quiver_err!("field index out of bounds: {first}"))?;
        for &index in rest {
            dtype = match dtype {
                DType::Struct(st, _) => st
                    .field_dtype(index)
                    .ok_or_else(|| quiver_err!("field index out of bounds: {index}"))?,
                DType::List(element, _) => element.as_ref(),
                other => quiver_bail!("cannot select child {index} of {other}"),
            };
        }
        Ok(dtype)
    }
}

fn walk(dtype: &DType, segments: &[Field], trail: &mut Trail, matches: &mut Vec<ResolvedField>) {
    if segments.is_empty() {
        matches.extend(trail.finish(dtype));
        return;
    }

    match dtype {
        DType::Struct(st, _) => walk_struct(st, segments, trail, matches),
        DType::List(element, _) => {
            // A position only marks the step into the element, a name applies to the element.
            let rest = match &segments[0] {
                Field::Index(_) => &segments[1..],
                Field::Name(_) => segments,
            };
            trail.enter_element();
            walk(element, rest, trail, matches);
            trail.leave_element();
        }
        // Extension types are opaque to resolution, as are all primitive leaves.
        _ => {}
    }
}

fn walk_struct(
    st: &StructDType,
    segments: &[Field],
    trail: &mut Trail,
    matches: &mut Vec<ResolvedField>,
) {
    match &segments[0] {
        Field::Index(index) => {
            if let Some(child) = st.field_dtype(*index) {
                trail.enter_child(*index, &st.names()[*index]);
                walk(child, &segments[1..], trail, matches);
                trail.leave_child();
            }
        }
        Field::Name(_) => {
            let leading_names = segments
                .iter()
                .take_while(|field| field.is_named())
                .count();
            for (index, (name, child)) in st.fields().enumerate() {
                for consumed in 1..=leading_names {
                    if name_matches(name, &segments[..consumed]) {
                        trail.enter_child(index, name);
                        walk(child, &segments[consumed..], trail, matches);
                        trail.leave_child();
                    }
                }
            }
        }
    }
}

/// Returns true if `name` equals the given name segments joined with dots.
fn name_matches(name: &str, segments: &[Field]) -> bool {
    let mut remaining = name;
    for (i, segment) in segments.iter().enumerate() {
        let Some(part) = segment.as_name() else {
            return false;
        };
        if i > 0 {
            let Some(tail) = remaining.strip_prefix('.') else {
                return false;
            };
            remaining = tail;
        }
        let Some(tail) = remaining.strip_prefix(&**part) else {
            return false;
        };
        remaining = tail;
    }
    remaining.is_empty()
}

/// Renders a match so that candidates which print identically as dot paths can be told apart.
fn describe_match(root: &StructDType, indices: &[usize]) -> String {
    let mut parts = Vec::with_capacity(indices.len());
    let mut current = root;
    let mut element: Option<&DType> = None;
    for &index in indices {
        // The step into a list element consumes its own position.
        if let Some(list_element) = element.take() {
            parts.push("[]".to_string());
            match list_element {
                DType::Struct(st, _) => current = st,
                DType::List(inner, _) => element = Some(inner.as_ref()),
                _ => {}
            }
            continue;
        }
        let name = &current.names()[index];
        parts.push(format!("\"{name}\"@{index}"));
        match current.field_dtype(index) {
            Some(DType::Struct(st, _)) => current = st,
            Some(DType::List(inner, _)) => element = Some(inner.as_ref()),
            _ => {}
        }
    }
    parts.join("/")
}
