//! Animation track to generic tree.

use tracing::debug;

use super::{AnimBone, AnimationTrack, INFO, ROTATION_STRIDE, SAMPLES, TRANSLATION_STRIDE};
use crate::asset::DEFAULT_VERSION;
use crate::binary::MAX_OBJECT_NAME_LEN;
use crate::tree::Tree;
use crate::util::{quat_to_xyzw, Error, Result};

pub(crate) fn export(track: &AnimationTrack) -> Result<Tree> {
    for bone in &track.bones {
        validate_bone(bone, track.frame_count)?;
    }
    let frames = i32::try_from(track.frame_count)
        .map_err(|_| Error::constraint(format!("frame count {} too large", track.frame_count)))?;
    let joints = i32::try_from(track.bones.len())
        .map_err(|_| Error::constraint(format!("bone count {} too large", track.bones.len())))?;

    let mut tree = Tree::new();
    let root = tree.root();
    let version = if track.version.is_empty() { DEFAULT_VERSION.to_vec() } else { track.version.clone() };
    tree.push_property(root, "pdxasset", version);

    let info = tree.add_child(root, INFO);
    tree.push_property(info, "fps", vec![track.fps]);
    tree.push_property(info, "sa", vec![frames]);
    tree.push_property(info, "j", vec![joints]);
    for bone in &track.bones {
        let id = tree.add_child(info, bone.name.as_str());
        tree.push_property(id, "sa", bone.channels.to_string());
        tree.push_property(id, "t", bone.translation.to_array().to_vec());
        tree.push_property(id, "q", quat_to_xyzw(bone.rotation).to_vec());
        tree.push_property(id, "s", bone.scale.to_vec());
    }

    let (t, q, s) = pack_samples(track);
    let samples = tree.add_child(root, SAMPLES);
    if !t.is_empty() {
        tree.push_property(samples, "t", t);
    }
    if !q.is_empty() {
        tree.push_property(samples, "q", q);
    }
    if !s.is_empty() {
        tree.push_property(samples, "s", s);
    }

    debug!(bones = track.bones.len(), frames = track.frame_count, "exported animation");
    Ok(tree)
}

fn validate_bone(bone: &AnimBone, frames: usize) -> Result<()> {
    if bone.name.is_empty() || bone.name.contains('\0') || bone.name.chars().count() >= MAX_OBJECT_NAME_LEN {
        return Err(Error::constraint(format!("invalid animated bone name {:?}", bone.name)));
    }
    let checks = [
        ("t", bone.channels.translation, bone.translation_samples.len(), TRANSLATION_STRIDE),
        ("q", bone.channels.rotation, bone.rotation_samples.len(), ROTATION_STRIDE),
        ("s", bone.channels.scale, bone.scale_samples.len(), bone.scale.stride()),
    ];
    for (channel, sampled, len, stride) in checks {
        let expected = if sampled { frames * stride } else { 0 };
        if len != expected {
            return Err(Error::constraint(format!(
                "bone {:?} channel {}: expected {} samples, has {}",
                bone.name, channel, expected, len
            )));
        }
    }
    Ok(())
}

/// Interleave per-bone buffers frame-major, bone-major.
fn pack_samples(track: &AnimationTrack) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let (mut t, mut q, mut s) = (Vec::new(), Vec::new(), Vec::new());
    for frame in 0..track.frame_count {
        for bone in &track.bones {
            if bone.channels.translation {
                let n = TRANSLATION_STRIDE;
                t.extend_from_slice(&bone.translation_samples[frame * n..(frame + 1) * n]);
            }
            if bone.channels.rotation {
                let n = ROTATION_STRIDE;
                q.extend_from_slice(&bone.rotation_samples[frame * n..(frame + 1) * n]);
            }
            if bone.channels.scale {
                let n = bone.scale.stride();
                s.extend_from_slice(&bone.scale_samples[frame * n..(frame + 1) * n]);
            }
        }
    }
    (t, q, s)
}
