#![deny(missing_docs)]
#![feature(error_generic_member_access)]

//! This crate defines error & result types for Quiver.
//! It also contains a variety of useful macros for error handling.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{env, fmt, io};

use arrow_schema::ArrowError;

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

#[allow(clippy::fallible_impl_from)]
impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    #[allow(clippy::panic)]
    fn from(msg: T) -> Self {
        if env::var("QUIVER_PANIC_ON_ERR").as_deref().unwrap_or("") == "1" {
            panic!("{}\nBacktrace:\n{}", msg.into(), Backtrace::capture());
        } else {
            Self(msg.into())
        }
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The top-level error type for Quiver.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum QuiverError {
    /// No field of the schema matches the given path.
    #[error("field not found: {path}")]
    FieldNotFound {
        /// The path as the caller wrote it.
        path: ErrString,
    },
    /// More than one structurally distinct field matches the given path.
    #[error("ambiguous field reference {path}, candidates: {}", .matches.join(", "))]
    AmbiguousField {
        /// The path as the caller wrote it.
        path: ErrString,
        /// Every distinct schema path that matched.
        matches: Vec<String>,
    },
    /// A projection was explicitly requested over zero fields.
    #[error("projection must name at least one field")]
    EmptyProjection,
    /// A row limit or offset was negative.
    #[error("invalid limit or offset {0}, must be non-negative")]
    InvalidLimit(i64),
    /// A batch size was not positive.
    #[error("invalid batch size {0}, must be positive")]
    InvalidBatchSize(i64),
    /// A different extension type is already registered under the same id.
    #[error("extension type {id} is already registered as {existing}, cannot register {proposed}")]
    ExtensionTypeConflict {
        /// The extension id both registrations share.
        id: ErrString,
        /// The binding that is already registered.
        existing: ErrString,
        /// The binding that was rejected.
        proposed: ErrString,
    },
    /// A failure raised by the execution substrate while producing batches.
    #[error("underlying read failed: {0}")]
    UnderlyingRead(Box<QuiverError>),
    /// An invalid argument was provided.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, Backtrace),
    /// The system has reached an invalid state.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidState(ErrString, Backtrace),
    /// Types were expected to match but did not.
    #[error("expected type: {0} but instead got {1}\nBacktrace:\n{2}")]
    MismatchedTypes(ErrString, ErrString, Backtrace),
    /// A wrapper for other errors, carrying additional context.
    #[error("{0}: {1}")]
    Context(ErrString, Box<QuiverError>),
    /// A wrapper for errors from the Arrow library.
    #[error(transparent)]
    ArrowError(#[from] ArrowError),
    /// A wrapper for IO errors.
    #[error(transparent)]
    IOError(#[from] io::Error),
}

impl QuiverError {
    /// Builds a [`QuiverError::FieldNotFound`] for the given path.
    pub fn field_not_found(path: impl Display) -> Self {
        Self::FieldNotFound {
            path: path.to_string().into(),
        }
    }

    /// Wraps a failure coming out of the execution substrate.
    ///
    /// Errors that are already marked as read failures are returned unchanged.
    pub fn underlying_read(self) -> Self {
        match self {
            err @ Self::UnderlyingRead(_) => err,
            err => Self::UnderlyingRead(Box::new(err)),
        }
    }

    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        Self::Context(msg.into(), Box::new(self))
    }

    /// Returns the innermost error, skipping any [`QuiverError::Context`] wrappers.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Context(_, inner) => inner.root_cause(),
            err => err,
        }
    }
}

impl Debug for QuiverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<QuiverError> for ArrowError {
    fn from(value: QuiverError) -> Self {
        match value {
            QuiverError::ArrowError(err) => err,
            err => ArrowError::ExternalError(Box::new(err)),
        }
    }
}

/// A type alias for Results that return QuiverErrors as their error type.
pub type QuiverResult<T> = Result<T, QuiverError>;

/// A convenient macro for creating a QuiverError.
#[macro_export]
macro_rules! quiver_err {
    (Context: $msg:literal, $err:expr) => {{
        $crate::__private::must_use(
            $crate::QuiverError::Context($msg.into(), Box::new($err))
        )
    }};
    (MismatchedTypes: $expected:expr, $actual:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::QuiverError::MismatchedTypes(
                $expected.to_string().into(),
                $actual.to_string().into(),
                Backtrace::capture(),
            )
        )
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::QuiverError::$variant(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::quiver_err!(InvalidArgument: $fmt, $($arg),*)
    };
}

/// A convenient macro for returning a QuiverError.
#[macro_export]
macro_rules! quiver_bail {
    ($($tt:tt)+) => {
        return Err($crate::quiver_err!($($tt)+))
    };
}

/// A convenient macro for panicking with a QuiverError in the presence of a programmer error
/// (e.g., an invariant has been violated).
#[macro_export]
macro_rules! quiver_panic {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::quiver_panic!($crate::quiver_err!($variant: $fmt, $($arg),*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::quiver_panic!($crate::quiver_err!($fmt, $($arg),*))
    };
    ($err:expr) => {{
        #[allow(clippy::panic)]
        {
            let err: $crate::QuiverError = $err;
            panic!("{}", err)
        }
    }};
}

#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    #[inline]
    #[cold]
    #[must_use]
    pub const fn must_use(error: crate::QuiverError) -> crate::QuiverError {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_field_lists_candidates() {
        let err = QuiverError::AmbiguousField {
            path: "a.b".into(),
            matches: vec!["$a.$b".to_string(), "$a.b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous field reference a.b, candidates: $a.$b, $a.b"
        );
    }

    #[test]
    fn underlying_read_is_not_double_wrapped() {
        let err = quiver_err!("disk on fire").underlying_read().underlying_read();
        let QuiverError::UnderlyingRead(inner) = err else {
            panic!("expected a read failure");
        };
        assert!(matches!(*inner, QuiverError::InvalidArgument(..)));
    }

    #[test]
    fn root_cause_skips_context() {
        let err = QuiverError::EmptyProjection
            .with_context("building scan")
            .with_context("outer");
        assert!(matches!(err.root_cause(), QuiverError::EmptyProjection));
    }

    #[test]
    fn converts_into_arrow_error() {
        let err: ArrowError = QuiverError::InvalidBatchSize(0).into();
        assert!(matches!(err, ArrowError::ExternalError(_)));
    }
}
