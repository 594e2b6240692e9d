#![deny(missing_docs)]

//! A type system for Quiver
//!
//! This crate contains the logical type system of a dataset: the definition of data types,
//! paths addressing nested fields, resolution of those paths against a schema, projection of a
//! schema down to the fields a scan reads, and the registry of extension types.

pub use dtype::*;
pub use extension::*;
pub use field::*;
pub use nullability::*;
pub use projection::*;
pub use ptype::*;
pub use registry::*;
pub use resolve::*;
pub use struct_::*;

#[cfg(feature = "arrow")]
pub mod arrow;
mod dtype;
mod extension;
mod field;
mod nullability;
mod projection;
mod ptype;
mod registry;
mod resolve;
mod struct_;
