//! Tagged-tree encoder.
//!
//! Mirror image of [`super::decode`]: header, then a pre-order walk emitting
//! each node's depth as repeated `[`, its NUL-terminated name, its properties
//! in insertion order, then its children.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::format::*;
use super::write_util::ByteWriter;
use crate::tree::{Property, PropertyValue, Tree};
use crate::util::{Error, Result};

/// Encode a tree into the binary format.
///
/// The root's name is never written; its properties follow the header directly.
pub fn encode(tree: &Tree) -> Result<Vec<u8>> {
    let mut w = ByteWriter::with_capacity(4096);
    w.write_bytes(BINARY_MAGIC);

    for id in tree.preorder() {
        let node = tree.node(id);
        if id != tree.root() {
            write_object(&mut w, node.name(), node.depth())?;
        }
        for property in node.properties() {
            write_property(&mut w, property)?;
        }
    }

    debug!(bytes = w.pos(), nodes = tree.len(), "encoded tree");
    Ok(w.into_inner())
}

fn write_object(w: &mut ByteWriter, name: &str, depth: usize) -> Result<()> {
    if name.contains('\0') {
        return Err(Error::constraint(format!("object name contains NUL: {:?}", name)));
    }
    for _ in 0..depth {
        w.write_u8(OBJECT_TOKEN);
    }
    w.write_latin1(name, "object name")?;
    w.write_u8(0);
    Ok(())
}

fn write_property(w: &mut ByteWriter, property: &Property) -> Result<()> {
    let name = &property.name;
    if name.contains('\0') {
        return Err(Error::constraint(format!("property name contains NUL: {:?}", name)));
    }

    w.write_u8(PROPERTY_TOKEN);
    let start = w.pos();
    w.write_u8(0);
    w.write_latin1(name, "property name")?;
    // Latin-1 is one byte per char, which may differ from the UTF-8 length.
    let name_len = w.pos() - start - 1;
    if name_len > MAX_PROPERTY_NAME_LEN {
        return Err(Error::constraint(format!("property name too long: {:?}", name)));
    }
    w.patch_u8(start, name_len as u8);

    w.write_u8(property.value.type_tag());
    match &property.value {
        PropertyValue::Int(values) => {
            w.write_count(values.len(), "int count")?;
            w.write_i32s(values)?;
        }
        PropertyValue::Float(values) => {
            w.write_count(values.len(), "float count")?;
            w.write_f32s(values)?;
        }
        PropertyValue::Str(s) => {
            w.write_count(1, "string count")?;
            // Declared length includes the terminator.
            w.write_count(s.chars().count() + 1, "string length")?;
            w.write_latin1(s, "string value")?;
            w.write_u8(0);
        }
    }
    Ok(())
}

/// Output archive writing an encoded tree to disk.
pub struct OArchive {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OArchive {
    /// Create (or truncate) the output file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        Ok(Self { path: path.to_path_buf(), writer: BufWriter::new(file) })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode and write the tree, consuming the archive.
    ///
    /// Encoding happens fully in memory first, so a constraint violation
    /// leaves the file empty rather than half-written.
    pub fn write_tree(mut self, tree: &Tree) -> Result<u64> {
        let bytes = encode(tree)?;
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "wrote archive");
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::decode;

    #[test]
    fn test_encode_root_property() -> Result<()> {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.push_property(root, "ix", vec![0i32, 1]);

        let bytes = encode(&tree)?;
        let mut expected = b"@@b@!\x02ixi".to_vec();
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(&0i32.to_le_bytes());
        expected.extend_from_slice(&1i32.to_le_bytes());
        assert_eq!(bytes, expected);
        Ok(())
    }

    #[test]
    fn test_encode_objects_and_string() -> Result<()> {
        let mut tree = Tree::new();
        let root = tree.root();
        let mesh = tree.add_child(root, "mesh");
        let material = tree.add_child(mesh, "material");
        tree.push_property(material, "shader", "PdxMeshStandard");

        let bytes = encode(&tree)?;
        assert!(bytes.starts_with(b"@@b@[mesh\0[[material\0!\x06shaders"));
        // count = 1, length = 16 (15 chars + NUL)
        let tail = &bytes[bytes.len() - 24..];
        assert_eq!(&tail[..4], &1i32.to_le_bytes());
        assert_eq!(&tail[4..8], &16i32.to_le_bytes());
        assert_eq!(&tail[8..], b"PdxMeshStandard\0");

        assert_eq!(decode(&bytes)?, tree);
        Ok(())
    }

    #[test]
    fn test_encode_rejects_bad_names() {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.push_property(root, "x".repeat(300), vec![1i32]);
        assert!(matches!(encode(&tree), Err(Error::EncodeConstraintViolation(_))));

        let mut tree = Tree::new();
        let root = tree.root();
        tree.add_child(root, "bad\0name");
        assert!(matches!(encode(&tree), Err(Error::EncodeConstraintViolation(_))));

        let mut tree = Tree::new();
        let root = tree.root();
        tree.add_child(root, "\u{4e2d}");
        assert!(matches!(encode(&tree), Err(Error::EncodeConstraintViolation(_))));
    }

    #[test]
    fn test_latin1_name_length() -> Result<()> {
        let mut tree = Tree::new();
        let root = tree.root();
        // Two chars, four UTF-8 bytes, two Latin-1 bytes.
        tree.push_property(root, "\u{e9}\u{e8}", vec![1.0f32]);
        let bytes = encode(&tree)?;
        assert_eq!(bytes[5], 2);
        assert_eq!(decode(&bytes)?, tree);
        Ok(())
    }
}
