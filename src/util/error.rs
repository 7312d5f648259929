//! Error types for the mesh/anim codec.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for codec operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Header is not the binary `@@b@` magic
    #[error("{}", unsupported_message(.found))]
    UnsupportedFormat { found: [u8; 4] },

    /// Buffer ends in the middle of a token
    #[error("Unexpected end of input at byte {offset} while reading {context}")]
    TruncatedInput { offset: usize, context: &'static str },

    /// Illegal token byte, bad type tag or impossible depth jump
    #[error("Corrupt stream at byte {offset}: {reason}")]
    CorruptStream { offset: usize, reason: String },

    /// Tree does not match the asset schema (strict mode only)
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Object model cannot be written without producing an inconsistent file
    #[error("Cannot encode: {0}")]
    EncodeConstraintViolation(String),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn unsupported_message(found: &[u8; 4]) -> String {
    if found == crate::binary::TEXT_MAGIC {
        "Unsupported format: text-encoded asset (@@t@) is not supported".to_string()
    } else {
        format!("Unsupported format: unknown header {:?}", String::from_utf8_lossy(found))
    }
}

impl Error {
    /// Create a corrupt-stream error at the given offset.
    pub fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        Self::CorruptStream { offset, reason: reason.into() }
    }

    /// Create an encode constraint error.
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::EncodeConstraintViolation(msg.into())
    }

    /// Byte offset the error was raised at, when it comes from the decoder.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::TruncatedInput { offset, .. } | Self::CorruptStream { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
