//! Registration of extension types.
//!
//! An [`ExtensionRegistry`] records which extension types the caller knows how to read: columns
//! of a registered type are read as their storage type and tagged with their logical type again
//! on output. Scans do not consult the registry directly but take an [`ExtensionBindings`]
//! snapshot of it when they are planned, so later registrations never affect a running scan.

use std::sync::Arc;

use hashbrown::HashMap;
use log::{debug, trace};
use parking_lot::RwLock;
use quiver_error::{QuiverError, QuiverResult};

use crate::{DType, ExtDType, ExtID, StructDType};

/// A set of known extension types, keyed by their [`ExtID`].
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    types: RwLock<HashMap<ExtID, Arc<ExtDType>>>,
}

impl ExtensionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension type.
    ///
    /// Registering a type that is already known is a no-op. Registering a different type under an
    /// id that is already taken fails with [`QuiverError::ExtensionTypeConflict`].
    pub fn register(&self, ext_dtype: Arc<ExtDType>) -> QuiverResult<()> {
        let mut types = self.types.write();
        if let Some(existing) = types.get(ext_dtype.id()) {
            if existing.eq_ignore_nullability(&ext_dtype) {
                trace!("extension type {} is already registered", ext_dtype.id());
                return Ok(());
            }
            return Err(conflict(existing, &ext_dtype));
        }

        debug!("registering extension type {ext_dtype}");
        types.insert(ext_dtype.id().clone(), ext_dtype);
        Ok(())
    }

    /// Removes the registration for `id`, returning it if there was one.
    pub fn unregister(&self, id: &ExtID) -> Option<Arc<ExtDType>> {
        self.types.write().remove(id)
    }

    /// Returns the extension type registered under `id`.
    pub fn lookup(&self, id: &ExtID) -> Option<Arc<ExtDType>> {
        self.types.read().get(id).cloned()
    }

    /// Returns true if exactly this extension type is registered.
    pub fn is_registered(&self, ext_dtype: &ExtDType) -> bool {
        self.types
            .read()
            .get(ext_dtype.id())
            .is_some_and(|existing| existing.eq_ignore_nullability(ext_dtype))
    }

    /// The number of registered extension types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Returns true if no extension type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Returns the type `dtype` is read as: every registered extension type inside it is replaced
    /// by its storage type, anything else is returned unchanged.
    pub fn storage_dtype(&self, dtype: &DType) -> QuiverResult<DType> {
        Ok(self.bindings(dtype)?.storage_dtype(dtype))
    }

    /// Takes a snapshot of the registrations used by `dtype`.
    ///
    /// Fails with [`QuiverError::ExtensionTypeConflict`] if `dtype` declares an extension type
    /// whose id is registered for a different type.
    pub fn bindings(&self, dtype: &DType) -> QuiverResult<ExtensionBindings> {
        let types = self.types.read();
        let mut bound = HashMap::new();
        let mut conflicting = None;
        dtype.for_each_extension(&mut |ext| {
            if conflicting.is_some() {
                return;
            }
            match types.get(ext.id()) {
                Some(registered) if registered.eq_ignore_nullability(ext) => {
                    bound.insert(ext.id().clone(), registered.clone());
                }
                Some(registered) => conflicting = Some(conflict(registered, ext)),
                None => trace!("extension type {} is not registered", ext.id()),
            }
        });

        match conflicting {
            Some(err) => Err(err),
            None => Ok(ExtensionBindings(Arc::new(bound))),
        }
    }

    /// Takes a snapshot of the registrations used by the fields of `schema`.
    pub fn schema_bindings(&self, schema: &StructDType) -> QuiverResult<ExtensionBindings> {
        self.bindings(&DType::Struct(schema.clone(), Default::default()))
    }
}

fn conflict(existing: &ExtDType, proposed: &ExtDType) -> QuiverError {
    QuiverError::ExtensionTypeConflict {
        id: existing.id().to_string().into(),
        existing: existing.to_string().into(),
        proposed: proposed.to_string().into(),
    }
}

/// An immutable snapshot of the extension types a scan knows about.
#[derive(Debug, Clone, Default)]
pub struct ExtensionBindings(Arc<HashMap<ExtID, Arc<ExtDType>>>);

impl ExtensionBindings {
    /// Returns the bound extension type for `id`.
    pub fn get(&self, id: &ExtID) -> Option<&Arc<ExtDType>> {
        self.0.get(id)
    }

    /// Returns true if `ext_dtype` is bound.
    pub fn is_bound(&self, ext_dtype: &ExtDType) -> bool {
        self.0
            .get(ext_dtype.id())
            .is_some_and(|bound| bound.eq_ignore_nullability(ext_dtype))
    }

    /// The number of bound extension types.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no extension type is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the bound extension types in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ExtDType>> + '_ {
        self.0.values()
    }

    /// Replaces every bound extension type inside `dtype` with its storage type.
    ///
    /// Extension types that are not bound pass through unchanged.
    pub fn storage_dtype(&self, dtype: &DType) -> DType {
        match dtype {
            DType::Struct(st, nullability) => DType::Struct(self.storage_schema(st), *nullability),
            DType::List(element, nullability) => {
                DType::List(Arc::new(self.storage_dtype(element)), *nullability)
            }
            DType::Extension(ext) if self.is_bound(ext) => self.storage_dtype(ext.storage_dtype()),
            _ => dtype.clone(),
        }
    }

    /// Applies [`ExtensionBindings::storage_dtype`] to every field of `schema`.
    pub fn storage_schema(&self, schema: &StructDType) -> StructDType {
        schema
            .fields()
            .map(|(name, child)| (name.clone(), self.storage_dtype(child)))
            .collect()
    }

    /// Returns every extension type inside `dtype` that is not bound, outermost first.
    pub fn unbound(&self, dtype: &DType) -> Vec<ExtDType> {
        let mut unbound = Vec::new();
        dtype.for_each_extension(&mut |ext| {
            if !self.is_bound(ext) {
                unbound.push(ext.clone());
            }
        });
        unbound
    }
}
