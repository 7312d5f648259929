//! Format-agnostic tree of named objects and typed properties.
//!
//! This is the transient shape both the decoder produces and the encoder
//! consumes. Semantic meaning is layered on top by [`crate::asset`] and
//! [`crate::anim`].

mod node;
mod property;

pub use node::*;
pub use property::*;
