//! Animation variant (`.anim` files).
//!
//! ## Tree Layout
//!
//! ```text
//! File                 pdxasset
//! ├── info             fps sa(frame count) j(bone count)
//! │   └── <bone>       sa("tqs" subset) t q s
//! └── samples          t q s
//! ```
//!
//! `samples` holds one flat array per channel, packed frame-major then
//! bone-major in `info` child order. Only bones whose `sa` names a channel
//! contribute to that channel's array. Strides are 3 for `t`, 4 for `q`, and
//! 1 or 3 for `s` depending on whether the bone's initial scale is uniform.

mod builder;
mod export;

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::asset::{Decoded, DEFAULT_VERSION};
use crate::binary::{decode, encode, IArchive, OArchive, ReadOptions};
use crate::tree::Tree;
use crate::util::{bits_eq, flatten, quat_from_xyzw, quat_to_xyzw, slice_bits_eq, unflatten, Quat, Result, Vec3};

pub const INFO: &str = "info";
pub const SAMPLES: &str = "samples";

/// Playback rate used when a file omits `fps`.
pub const DEFAULT_FPS: f32 = 15.0;

pub const TRANSLATION_STRIDE: usize = 3;
pub const ROTATION_STRIDE: usize = 4;

/// Which transform channels of a bone carry samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Channels {
    pub translation: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl Channels {
    pub const NONE: Self = Self { translation: false, rotation: false, scale: false };
    pub const ALL: Self = Self { translation: true, rotation: true, scale: true };

    /// Parse a `sa` channel string such as `"tq"`.
    ///
    /// Returns the channels and any letters that are not `t`, `q` or `s`.
    pub fn parse(s: &str) -> (Self, String) {
        let mut channels = Self::NONE;
        let mut unknown = String::new();
        for c in s.chars() {
            match c {
                't' => channels.translation = true,
                'q' => channels.rotation = true,
                's' => channels.scale = true,
                other => unknown.push(other),
            }
        }
        (channels, unknown)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.translation {
            f.write_str("t")?;
        }
        if self.rotation {
            f.write_str("q")?;
        }
        if self.scale {
            f.write_str("s")?;
        }
        Ok(())
    }
}

/// Initial scale of a bone; its kind fixes the stride of scale samples.
#[derive(Clone, Copy, Debug, Serialize)]
pub enum Scale {
    Uniform(f32),
    NonUniform(Vec3),
}

impl PartialEq for Scale {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scale::Uniform(a), Scale::Uniform(b)) => bits_eq(a, b),
            (Scale::NonUniform(a), Scale::NonUniform(b)) => bits_eq(a, b),
            _ => false,
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Uniform(1.0)
    }
}

impl Scale {
    /// Floats per scale sample.
    pub fn stride(&self) -> usize {
        match self {
            Scale::Uniform(_) => 1,
            Scale::NonUniform(_) => 3,
        }
    }

    pub fn to_vec3(&self) -> Vec3 {
        match self {
            Scale::Uniform(s) => Vec3::splat(*s),
            Scale::NonUniform(v) => *v,
        }
    }

    fn from_slice(values: &[f32]) -> Option<Self> {
        match values {
            [s] => Some(Scale::Uniform(*s)),
            [x, y, z] => Some(Scale::NonUniform(Vec3::new(*x, *y, *z))),
            _ => None,
        }
    }

    fn to_vec(self) -> Vec<f32> {
        match self {
            Scale::Uniform(s) => vec![s],
            Scale::NonUniform(v) => v.to_array().to_vec(),
        }
    }
}

/// One animated bone: initial pose plus flat per-channel sample buffers.
#[derive(Clone, Debug, Serialize)]
pub struct AnimBone {
    pub name: String,
    pub channels: Channels,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Scale,
    /// `3 * frame_count` floats when translation is sampled, else empty.
    pub translation_samples: Vec<f32>,
    /// `4 * frame_count` floats (xyzw) when rotation is sampled, else empty.
    pub rotation_samples: Vec<f32>,
    /// `scale.stride() * frame_count` floats when scale is sampled, else empty.
    pub scale_samples: Vec<f32>,
}

impl PartialEq for AnimBone {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.channels == other.channels
            && bits_eq(&self.translation, &other.translation)
            && bits_eq(&self.rotation, &other.rotation)
            && self.scale == other.scale
            && slice_bits_eq(&self.translation_samples, &other.translation_samples)
            && slice_bits_eq(&self.rotation_samples, &other.rotation_samples)
            && slice_bits_eq(&self.scale_samples, &other.scale_samples)
    }
}

impl AnimBone {
    pub fn new(name: impl Into<String>, translation: Vec3, rotation: Quat, scale: Scale) -> Self {
        Self {
            name: name.into(),
            channels: Channels::NONE,
            translation,
            rotation,
            scale,
            translation_samples: Vec::new(),
            rotation_samples: Vec::new(),
            scale_samples: Vec::new(),
        }
    }

    pub fn set_translation_samples(&mut self, samples: &[Vec3]) {
        self.channels.translation = true;
        self.translation_samples = flatten(samples);
    }

    pub fn set_rotation_samples(&mut self, samples: &[Quat]) {
        self.channels.rotation = true;
        self.rotation_samples = samples.iter().flat_map(|q| quat_to_xyzw(*q)).collect();
    }

    /// Set flat scale samples; their stride must match the initial scale.
    pub fn set_scale_samples(&mut self, samples: &[f32]) {
        self.channels.scale = true;
        self.scale_samples = samples.to_vec();
    }

    pub fn translation_at(&self, frame: usize) -> Option<Vec3> {
        let s = TRANSLATION_STRIDE;
        self.translation_samples
            .get(frame * s..(frame + 1) * s)
            .map(Vec3::from_slice)
    }

    pub fn rotation_at(&self, frame: usize) -> Option<Quat> {
        let s = ROTATION_STRIDE;
        self.rotation_samples
            .get(frame * s..(frame + 1) * s)
            .and_then(quat_from_xyzw)
    }

    pub fn scale_at(&self, frame: usize) -> Option<Vec3> {
        let s = self.scale.stride();
        self.scale_samples
            .get(frame * s..(frame + 1) * s)
            .and_then(Scale::from_slice)
            .map(|scale| scale.to_vec3())
    }

    /// Translation samples as vectors.
    pub fn translations(&self) -> Vec<Vec3> {
        unflatten(&self.translation_samples).unwrap_or_default()
    }
}

/// A decoded `.anim` file.
#[derive(Clone, Debug, Serialize)]
pub struct AnimationTrack {
    pub source: String,
    pub version: Vec<i32>,
    pub fps: f32,
    pub frame_count: usize,
    pub bones: Vec<AnimBone>,
}

impl PartialEq for AnimationTrack {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.version == other.version
            && bits_eq(&self.fps, &other.fps)
            && self.frame_count == other.frame_count
            && self.bones == other.bones
    }
}

impl Default for AnimationTrack {
    fn default() -> Self {
        Self {
            source: String::new(),
            version: DEFAULT_VERSION.to_vec(),
            fps: DEFAULT_FPS,
            frame_count: 0,
            bones: Vec::new(),
        }
    }
}

impl AnimationTrack {
    pub fn new(fps: f32, frame_count: usize) -> Self {
        Self { fps, frame_count, ..Self::default() }
    }

    /// Build the track from a decoded tree.
    ///
    /// Sample buffers whose length disagrees with the declared channels are
    /// a hard [`SchemaViolation`](crate::util::Error::SchemaViolation): the
    /// packing has no per-bone lengths to resynchronise on.
    pub fn from_tree(tree: &Tree, source: &str, strict: bool) -> Result<Decoded<Self>> {
        builder::build(tree, source, strict)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Decoded<Self>> {
        Self::from_tree(&decode(bytes)?, "", false)
    }

    pub fn from_archive(archive: &IArchive) -> Result<Decoded<Self>> {
        let source = archive.path().display().to_string();
        Self::from_tree(archive.tree(), &source, archive.options().strict)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Decoded<Self>> {
        Self::from_archive(&IArchive::open_opts(path, ReadOptions::default())?)
    }

    pub fn to_tree(&self) -> Result<Tree> {
        export::export(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(&self.to_tree()?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<u64> {
        let tree = self.to_tree()?;
        OArchive::create(path)?.write_tree(&tree)
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        if self.fps > 0.0 {
            self.frame_count as f32 / self.fps
        } else {
            0.0
        }
    }

    pub fn bone(&self, name: &str) -> Option<&AnimBone> {
        self.bones.iter().find(|b| b.name == name)
    }
}

/// Check whether a tree has the animation layout.
pub fn is_animation_tree(tree: &Tree) -> bool {
    let root = tree.root();
    tree.find_child(root, INFO).is_some() || tree.find_child(root, SAMPLES).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels() {
        let (c, unknown) = Channels::parse("tqs");
        assert_eq!(c, Channels::ALL);
        assert!(unknown.is_empty());
        assert_eq!(c.to_string(), "tqs");

        let (c, unknown) = Channels::parse("qx");
        assert!(c.rotation && !c.translation && !c.scale);
        assert_eq!(unknown, "x");
        assert_eq!(c.to_string(), "q");
        assert!(Channels::parse("").0.is_empty());
    }

    #[test]
    fn test_sample_access() {
        let mut bone = AnimBone::new("Root", Vec3::ZERO, Quat::IDENTITY, Scale::NonUniform(Vec3::ONE));
        bone.set_translation_samples(&[Vec3::X, Vec3::Y]);
        bone.set_rotation_samples(&[Quat::IDENTITY, Quat::IDENTITY]);
        bone.set_scale_samples(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(bone.channels, Channels::ALL);
        assert_eq!(bone.translation_at(1), Some(Vec3::Y));
        assert_eq!(bone.translation_at(2), None);
        assert_eq!(bone.rotation_at(0), Some(Quat::IDENTITY));
        assert_eq!(bone.scale_at(1), Some(Vec3::new(4.0, 5.0, 6.0)));
        assert_eq!(bone.translations(), vec![Vec3::X, Vec3::Y]);
    }

    #[test]
    fn test_duration() {
        assert_eq!(AnimationTrack::new(30.0, 60).duration(), 2.0);
        assert_eq!(AnimationTrack::new(0.0, 60).duration(), 0.0);
    }
}
