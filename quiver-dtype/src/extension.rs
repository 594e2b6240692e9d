use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::{DType, Nullability};

/// A unique identifier for an extension type
#[derive(Debug, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct ExtID(Arc<str>);

impl ExtID {
    /// Constructs a new `ExtID` from a string
    pub fn new(value: Arc<str>) -> Self {
        Self(value)
    }
}

impl Display for ExtID {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ExtID {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl From<&str> for ExtID {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

/// Opaque, serialized parameters of an extension type.
#[derive(Debug, Clone, PartialOrd, PartialEq, Eq, Hash)]
pub struct ExtMetadata(Arc<str>);

impl ExtMetadata {
    /// Constructs a new `ExtMetadata` from its serialized form
    pub fn new(value: Arc<str>) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ExtMetadata {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl From<&str> for ExtMetadata {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl Display for ExtMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A type descriptor for an extension type: a logical identity layered over a storage type.
#[derive(Debug, Clone, PartialOrd, PartialEq, Eq, Hash)]
pub struct ExtDType {
    id: ExtID,
    storage_dtype: Arc<DType>,
    metadata: Option<ExtMetadata>,
}

impl ExtDType {
    /// Creates a new `ExtDType`.
    pub fn new(id: ExtID, storage_dtype: Arc<DType>, metadata: Option<ExtMetadata>) -> Self {
        Self {
            id,
            storage_dtype,
            metadata,
        }
    }

    /// Returns the `ExtID` for this extension type
    #[inline]
    pub fn id(&self) -> &ExtID {
        &self.id
    }

    /// Returns the `DType` values of this extension type are stored as
    #[inline]
    pub fn storage_dtype(&self) -> &DType {
        self.storage_dtype.as_ref()
    }

    /// Returns the `ExtMetadata` for this extension type, if it exists
    #[inline]
    pub fn metadata(&self) -> Option<&ExtMetadata> {
        self.metadata.as_ref()
    }

    /// Returns a copy of `self` whose storage has the given nullability
    pub fn with_nullability(&self, nullability: Nullability) -> Self {
        Self::new(
            self.id.clone(),
            Arc::new(self.storage_dtype.with_nullability(nullability)),
            self.metadata.clone(),
        )
    }

    /// Returns true if both types describe the same logical type, ignoring storage nullability.
    ///
    /// Registrations are keyed on this: a nullable and a non-nullable column of the same extension
    /// type share one binding.
    pub fn eq_ignore_nullability(&self, other: &Self) -> bool {
        self.id == other.id
            && self.metadata == other.metadata
            && self
                .storage_dtype
                .eq_ignore_nullability(other.storage_dtype.as_ref())
    }
}

impl Display for ExtDType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DType::Extension(Arc::new(self.clone())))
    }
}
