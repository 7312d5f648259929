//! Tagged-tree decoder.
//!
//! The stream is a flat sequence of tokens after the 4-byte header:
//!
//! ```text
//! '!' <u8 name_len> <name> <type 'i'|'f'|'s'> <i32 count> <values...>
//! '['{depth} <name> '\0'
//! ```
//!
//! Object depth is the number of leading `[` bytes. There are no close
//! tokens; an object attaches to the node most recently opened one level up.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use super::format::*;
use super::read_util::ByteReader;
use crate::tree::{NodeId, Property, PropertyValue, Tree};
use crate::util::{Error, Result};

/// Options for reading asset files.
#[derive(Clone, Copy, Debug)]
pub struct ReadOptions {
    /// Memory-map the file instead of reading it into a buffer.
    pub use_mmap: bool,
    /// Treat the first schema diagnostic as a hard error.
    pub strict: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { use_mmap: true, strict: false }
    }
}

impl ReadOptions {
    pub fn strict() -> Self {
        Self { strict: true, ..Self::default() }
    }
}

/// Decode a complete byte buffer into a tree.
///
/// No partial tree is ever returned: any primitive or token error aborts.
pub fn decode(buf: &[u8]) -> Result<Tree> {
    let header = buf
        .get(..HEADER_SIZE)
        .ok_or(Error::TruncatedInput { offset: buf.len(), context: "file header" })?;
    if header != BINARY_MAGIC {
        let mut found = [0u8; HEADER_SIZE];
        found.copy_from_slice(header);
        return Err(Error::UnsupportedFormat { found });
    }

    let mut reader = ByteReader::at(buf, HEADER_SIZE);
    let mut tree = Tree::new();
    // open[d] is the node most recently opened at depth d.
    let mut open: SmallVec<[NodeId; 8]> = smallvec![tree.root()];

    while let Some(token) = reader.peek() {
        match token {
            PROPERTY_TOKEN => {
                let property = read_property(&mut reader)?;
                let owner = open[open.len() - 1];
                trace!(name = %property.name, owner = tree.node(owner).name(), "property");
                tree.push_property(owner, property.name, property.value);
            }
            OBJECT_TOKEN => {
                let start = reader.pos();
                let (name, depth) = read_object(&mut reader)?;
                if depth > open.len() {
                    return Err(Error::corrupt(
                        start,
                        format!(
                            "object '{}' declares depth {} but the deepest open depth is {}",
                            name,
                            depth,
                            open.len() - 1
                        ),
                    ));
                }
                open.truncate(depth);
                let id = tree.add_child(open[depth - 1], name);
                trace!(name = tree.node(id).name(), depth, "object");
                open.push(id);
            }
            other => {
                return Err(Error::corrupt(
                    reader.pos(),
                    format!("unexpected token byte 0x{:02x}", other),
                ));
            }
        }
    }

    debug!(bytes = buf.len(), nodes = tree.len(), "decoded tree");
    Ok(tree)
}

/// Read one `!` property token.
fn read_property(reader: &mut ByteReader<'_>) -> Result<Property> {
    reader.read_u8("property token")?;
    let name_len = reader.read_u8("property name length")? as usize;
    let name = reader.read_string(name_len, "property name")?;

    let tag_pos = reader.pos();
    let value = match reader.read_u8("property type")? {
        TYPE_INT => {
            let count = reader.read_count("int count")?;
            PropertyValue::Int(reader.read_i32s(count, "int values")?)
        }
        TYPE_FLOAT => {
            let count = reader.read_count("float count")?;
            PropertyValue::Float(reader.read_f32s(count, "float values")?)
        }
        TYPE_STRING => {
            let count_pos = reader.pos();
            let count = reader.read_count("string count")?;
            if count != 1 {
                return Err(Error::corrupt(
                    count_pos,
                    format!("string property '{}' has count {}; only single strings are supported", name, count),
                ));
            }
            let len = reader.read_count("string length")?;
            PropertyValue::Str(reader.read_string(len, "string value")?)
        }
        other => {
            return Err(Error::corrupt(
                tag_pos,
                format!("unknown type tag 0x{:02x} on property '{}'", other, name),
            ));
        }
    };

    Ok(Property { name, value })
}

/// Read one `[` object token, returning its name and depth.
fn read_object(reader: &mut ByteReader<'_>) -> Result<(String, usize)> {
    let mut depth = 0;
    while reader.peek() == Some(OBJECT_TOKEN) {
        reader.read_u8("object depth")?;
        depth += 1;
    }
    let name = reader.read_cstring("object name")?;
    Ok((name, depth))
}

/// A decoded asset file.
///
/// The source bytes are only held while decoding; the tree owns all its data.
#[derive(Debug)]
pub struct IArchive {
    path: PathBuf,
    size: u64,
    options: ReadOptions,
    tree: Tree,
}

impl IArchive {
    /// Open and decode a file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, ReadOptions::default())
    }

    /// Open and decode a file with explicit options.
    pub fn open_opts(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let size = file.metadata()?.len();

        let tree = if options.use_mmap && size > 0 {
            // Safety: the file is opened read-only and the map is dropped
            // before this function returns.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            decode(&mmap)?
        } else {
            let mut buf = Vec::with_capacity(size as usize);
            file.read_to_end(&mut buf)?;
            decode(&buf)?
        };

        debug!(path = %path.display(), size, "opened archive");
        Ok(Self { path: path.to_path_buf(), size, options, tree })
    }

    /// Decode an in-memory buffer. `path` is kept for diagnostics only.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8], options: ReadOptions) -> Result<Self> {
        let tree = decode(bytes)?;
        Ok(Self { path: path.into(), size: bytes.len() as u64, options, tree })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the source in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn options(&self) -> ReadOptions {
        self.options
    }

    #[inline]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }
}
