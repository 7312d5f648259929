//! Binary format constants.

/// Magic bytes at the start of a binary asset file.
pub const BINARY_MAGIC: &[u8; 4] = b"@@b@";

/// Magic bytes of the text-encoded variant. Recognised, never decoded.
pub const TEXT_MAGIC: &[u8; 4] = b"@@t@";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Leading byte of a property token.
pub const PROPERTY_TOKEN: u8 = b'!';

/// Leading byte of an object token. Repeated once per depth level.
pub const OBJECT_TOKEN: u8 = b'[';

/// Type tag of a 32-bit signed integer array.
pub const TYPE_INT: u8 = b'i';

/// Type tag of a 32-bit float array.
pub const TYPE_FLOAT: u8 = b'f';

/// Type tag of a single length-prefixed string.
pub const TYPE_STRING: u8 = b's';

/// Width of every numeric value and count field.
pub const VALUE_SIZE: usize = 4;

/// Property names carry a one-byte length prefix.
pub const MAX_PROPERTY_NAME_LEN: usize = u8::MAX as usize;

/// Object names written by the asset exporter must stay below this length.
pub const MAX_OBJECT_NAME_LEN: usize = 64;

/// Check whether a header is the binary encoding.
#[inline]
pub fn is_binary_header(header: &[u8]) -> bool {
    header.len() >= HEADER_SIZE && &header[..HEADER_SIZE] == BINARY_MAGIC
}
