//! Utility types shared by every layer of the codec.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam, plus flat-array helpers

mod error;
mod math;

pub use error::*;
pub use math::*;
