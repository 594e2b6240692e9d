//! A collection of transformations that can be applied to a [`crate::ExprRef`].
pub mod bind;
