//! Asset object model for `.mesh` files.
//!
//! ## Tree Layout
//!
//! ```text
//! File                      pdxasset
//! ├── object                lodperc | loddist
//! │   └── <shape>           lod
//! │       ├── mesh          p n ta u0..u3 tri boundingsphere
//! │       │   ├── aabb      min max
//! │       │   ├── material  shader diff n spec
//! │       │   └── skin      bones ix w
//! │       └── skeleton
//! │           └── <bone>    ix pa tx
//! └── locator
//!     └── <locator>         p q pa tx
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use pdx_mesh::asset::Asset;
//!
//! let decoded = Asset::open("unit.mesh")?;
//! for warning in &decoded.warnings {
//!     eprintln!("{}", warning);
//! }
//! for mesh in &decoded.value.meshes {
//!     println!("{} lod={:?} verts={}", mesh.name, mesh.lod, mesh.vertex_count());
//! }
//! ```

mod builder;
pub mod classify;
mod diagnostic;
mod export;
mod locator;
mod mesh;
mod skeleton;

pub use classify::{classify, classify_tree, NodeRole};
pub use diagnostic::{Decoded, Diagnostic};
pub(crate) use diagnostic::Diagnostics;
pub use locator::Locator;
pub use mesh::*;
pub use skeleton::*;

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::binary::{decode, encode, IArchive, OArchive, ReadOptions};
use crate::tree::Tree;
use crate::util::{slice_bits_eq, Result};

/// Root `pdxasset` value written when none is set.
pub const DEFAULT_VERSION: [i32; 2] = [1, 0];

/// Object-level LOD switching thresholds.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LodSwitches {
    /// Screen-size percentages (`lodperc`).
    Percent(Vec<f32>),
    /// Camera distances (`loddist`).
    Distance(Vec<f32>),
}

impl PartialEq for LodSwitches {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Percent(a), Self::Percent(b)) | (Self::Distance(a), Self::Distance(b)) => slice_bits_eq(a, b),
            _ => false,
        }
    }
}

/// A decoded `.mesh` file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Asset {
    /// Where the asset came from, for diagnostics. Empty for in-memory data.
    pub source: String,
    pub version: Vec<i32>,
    pub lod_switches: Option<LodSwitches>,
    pub meshes: Vec<Mesh>,
    /// Skeletons per shape, including shapes with no mesh.
    pub skeletons: Vec<Skeleton>,
    pub locators: Vec<Locator>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            source: String::new(),
            version: DEFAULT_VERSION.to_vec(),
            lod_switches: None,
            meshes: Vec::new(),
            skeletons: Vec::new(),
            locators: Vec::new(),
        }
    }
}

impl Asset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the object model from a decoded tree.
    ///
    /// With `strict` set, the first schema diagnostic is returned as
    /// [`Error::SchemaViolation`](crate::util::Error::SchemaViolation).
    pub fn from_tree(tree: &Tree, source: &str, strict: bool) -> Result<Decoded<Self>> {
        builder::build(tree, source, strict)
    }

    /// Decode bytes and build the object model leniently.
    pub fn from_bytes(bytes: &[u8]) -> Result<Decoded<Self>> {
        Self::from_tree(&decode(bytes)?, "", false)
    }

    pub fn from_archive(archive: &IArchive) -> Result<Decoded<Self>> {
        let source = archive.path().display().to_string();
        Self::from_tree(archive.tree(), &source, archive.options().strict)
    }

    /// Open a `.mesh` file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Decoded<Self>> {
        Self::open_opts(path, ReadOptions::default())
    }

    pub fn open_opts(path: impl AsRef<Path>, options: ReadOptions) -> Result<Decoded<Self>> {
        Self::from_archive(&IArchive::open_opts(path, options)?)
    }

    /// Convert back to a generic tree, validating engine constraints.
    pub fn to_tree(&self) -> Result<Tree> {
        export::export(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(&self.to_tree()?)
    }

    /// Write the asset to a file, returning the byte count.
    ///
    /// Nothing is created when validation fails.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<u64> {
        let tree = self.to_tree()?;
        OArchive::create(path)?.write_tree(&tree)
    }

    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.name == name)
    }

    pub fn locator(&self, name: &str) -> Option<&Locator> {
        self.locators.iter().find(|l| l.name == name)
    }

    pub fn skeleton(&self, name: &str) -> Option<&Skeleton> {
        self.skeletons.iter().find(|s| s.name == name)
    }

    /// Distinct LOD levels used by the meshes, ascending.
    pub fn lod_levels(&self) -> Vec<u32> {
        let mut levels: Vec<u32> = self.meshes.iter().filter_map(|m| m.lod).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    pub fn face_count(&self) -> usize {
        self.meshes.iter().map(Mesh::face_count).sum()
    }
}

fn lod_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^.*_?LOD_?(?P<level>\d)").ok())
        .as_ref()
}

/// LOD level encoded in a shape name, e.g. `body_lod1` or `HeadLOD_2`.
pub fn lod_from_name(name: &str) -> Option<u32> {
    lod_pattern()?
        .captures(name)
        .and_then(|c| c.name("level"))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{Error, Vec3};

    #[test]
    fn test_lod_from_name() {
        assert_eq!(lod_from_name("body_lod1"), Some(1));
        assert_eq!(lod_from_name("HeadLOD_2"), Some(2));
        assert_eq!(lod_from_name("hull_LOD0Shape"), Some(0));
        assert_eq!(lod_from_name("body"), None);
        assert_eq!(lod_from_name("lod_x"), None);
    }

    fn shape_tree() -> Tree {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.push_property(root, "pdxasset", vec![1i32, 0]);
        let object = tree.add_child(root, "object");
        let shape = tree.add_child(object, "body_lod1");
        let mesh = tree.add_child(shape, "mesh");
        tree.push_property(mesh, "p", vec![0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        tree.push_property(mesh, "tri", vec![0i32, 1, 2]);
        tree.push_property(mesh, "custom", vec![7i32]);
        let material = tree.add_child(mesh, "material");
        tree.push_property(material, "shader", "PdxMeshStandard");
        tree.push_property(material, "diff", "body_diffuse.dds");
        tree
    }

    #[test]
    fn test_from_tree() -> Result<()> {
        let decoded = Asset::from_tree(&shape_tree(), "body.mesh", false)?;
        assert!(decoded.is_clean());
        let asset = decoded.value;
        assert_eq!(asset.version, vec![1, 0]);
        let mesh = asset.mesh("body_lod1").unwrap();
        assert_eq!(mesh.lod, Some(1));
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.positions.as_ref().unwrap()[1], Vec3::X);
        assert_eq!(mesh.material.as_ref().unwrap().diffuse(), Some("body_diffuse.dds"));
        assert_eq!(mesh.extra.len(), 1);
        Ok(())
    }

    #[test]
    fn test_wrong_type_is_diagnosed() -> Result<()> {
        let mut tree = shape_tree();
        let mesh = tree.preorder()[3];
        tree.push_property(mesh, "n", vec![1i32, 2, 3]);

        let decoded = Asset::from_tree(&tree, "", false)?;
        assert_eq!(decoded.warnings.len(), 1);
        assert_eq!(decoded.warnings[0].property.as_deref(), Some("n"));
        assert!(decoded.value.meshes[0].normals.is_none());

        let strict = Asset::from_tree(&tree, "", true);
        assert!(matches!(strict, Err(Error::SchemaViolation(_))));
        Ok(())
    }

    #[test]
    fn test_export_roundtrip() -> Result<()> {
        let asset = Asset::from_tree(&shape_tree(), "", false)?.value;
        let bytes = asset.to_bytes()?;
        let again = Asset::from_bytes(&bytes)?;
        assert!(again.is_clean());
        let mut expected = asset.clone();
        // The exporter fills in a missing bounding box.
        expected.meshes[0].aabb = expected.meshes[0].compute_aabb();
        assert_eq!(again.value, expected);
        Ok(())
    }

    #[test]
    fn test_export_rejects_long_names() {
        let mut asset = Asset::new();
        asset.meshes.push(Mesh::new("x".repeat(64)));
        assert!(matches!(asset.to_tree(), Err(Error::EncodeConstraintViolation(_))));

        let mut asset = Asset::new();
        asset.locators.push(Locator::new("", Vec3::ZERO, crate::util::Quat::IDENTITY));
        assert!(matches!(asset.to_tree(), Err(Error::EncodeConstraintViolation(_))));
    }
}
