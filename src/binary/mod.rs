//! Binary tagged-tree codec.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Magic: "@@b@"    |  4 bytes
//! +------------------+
//! | root properties  |  '!' tokens
//! +------------------+
//! | objects          |  '['*depth name '\0', each followed by its '!' tokens
//! +------------------+
//! ```
//!
//! There is no length field or footer: the stream ends at end-of-buffer.

mod format;
mod read_util;
mod reader;
mod write_util;
mod writer;

pub use format::*;
pub use read_util::*;
pub use reader::*;
pub use write_util::*;
pub use writer::*;
