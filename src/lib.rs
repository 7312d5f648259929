//! # pdx-mesh
//!
//! Rust implementation of the Clausewitz binary asset format used for
//! `.mesh` and `.anim` files (`@@b@` header).
//!
//! ## Modules
//!
//! - [`util`] - Errors and math types
//! - [`binary`] - Tagged-tree codec (byte stream <-> generic tree)
//! - [`tree`] - Generic arena tree of named objects and typed properties
//! - [`asset`] - Mesh asset object model (meshes, skins, skeletons, locators)
//! - [`anim`] - Animation track object model
//! - [`text`] - Plain-text and JSON projections
//!
//! ## Example
//!
//! ```ignore
//! use pdx_mesh::{read_file, AssetFile, ReadOptions};
//!
//! match read_file("unit.mesh", ReadOptions::default())?.value {
//!     AssetFile::Mesh(asset) => println!("{}", asset),
//!     AssetFile::Animation(track) => println!("{}", track),
//! }
//! ```

pub mod util;
pub mod binary;
pub mod tree;
pub mod asset;
pub mod anim;
pub mod text;

use std::path::Path;

use serde::Serialize;

// Re-export commonly used types
pub use util::{Error, Result};
pub use binary::{decode, encode, IArchive, OArchive, ReadOptions};
pub use tree::{NodeId, Property, PropertyValue, Tree};
pub use asset::{Asset, Decoded, Diagnostic};
pub use anim::AnimationTrack;

/// A decoded file of either kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetFile {
    Mesh(Asset),
    Animation(AnimationTrack),
}

impl AssetFile {
    /// Build the matching object model for a decoded tree.
    pub fn from_tree(tree: &Tree, source: &str, strict: bool) -> Result<Decoded<Self>> {
        if anim::is_animation_tree(tree) {
            Ok(AnimationTrack::from_tree(tree, source, strict)?.map(AssetFile::Animation))
        } else {
            Ok(Asset::from_tree(tree, source, strict)?.map(AssetFile::Mesh))
        }
    }

    pub fn from_archive(archive: &IArchive) -> Result<Decoded<Self>> {
        let source = archive.path().display().to_string();
        Self::from_tree(archive.tree(), &source, archive.options().strict)
    }

    pub fn to_tree(&self) -> Result<Tree> {
        match self {
            AssetFile::Mesh(asset) => asset.to_tree(),
            AssetFile::Animation(track) => track.to_tree(),
        }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<u64> {
        let tree = self.to_tree()?;
        OArchive::create(path)?.write_tree(&tree)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AssetFile::Mesh(_) => "mesh",
            AssetFile::Animation(_) => "animation",
        }
    }
}

/// Open a file and build its object model, detecting mesh vs animation
/// from the tree layout rather than the extension.
pub fn read_file(path: impl AsRef<Path>, options: ReadOptions) -> Result<Decoded<AssetFile>> {
    AssetFile::from_archive(&IArchive::open_opts(path, options)?)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result, Aabb, Mat4, Quat, Vec2, Vec3, Vec4};
    pub use crate::binary::{decode, encode, IArchive, OArchive, ReadOptions};
    pub use crate::tree::{NodeId, Node, Property, PropertyValue, Tree};
    pub use crate::asset::{Asset, Bone, Decoded, Diagnostic, Locator, Material, Mesh, Skeleton, Skin};
    pub use crate::anim::{AnimBone, AnimationTrack, Channels, Scale};
    pub use crate::{read_file, AssetFile};
}
