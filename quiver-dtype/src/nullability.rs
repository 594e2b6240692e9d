use std::fmt::{Display, Formatter};
use std::ops::BitOr;

/// Whether values of a [`DType`](crate::DType) may be null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Nullability {
    /// Values are never null.
    #[default]
    NonNullable,
    /// Values may be null.
    Nullable,
}

impl Nullability {
    /// Returns true for [`Nullability::Nullable`].
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable)
    }
}

/// A value nested under a nullable parent is itself nullable.
impl BitOr for Nullability {
    type Output = Nullability;

    fn bitor(self, rhs: Self) -> Self::Output {
        (self.is_nullable() || rhs.is_nullable()).into()
    }
}

impl From<bool> for Nullability {
    fn from(value: bool) -> Self {
        if value {
            Self::Nullable
        } else {
            Self::NonNullable
        }
    }
}

impl From<Nullability> for bool {
    fn from(value: Nullability) -> Self {
        value.is_nullable()
    }
}

impl Display for Nullability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonNullable => write!(f, ""),
            Self::Nullable => write!(f, "?"),
        }
    }
}
