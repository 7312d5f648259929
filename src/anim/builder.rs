//! Generic tree to animation track.

use tracing::debug;

use super::{AnimBone, AnimationTrack, Channels, Scale, INFO, ROTATION_STRIDE, SAMPLES, TRANSLATION_STRIDE};
use crate::asset::{Decoded, Diagnostics};
use crate::tree::{NodeId, Tree};
use crate::util::{quat_from_xyzw, Error, Quat, Result, Vec3};

pub(crate) fn build(tree: &Tree, source: &str, strict: bool) -> Result<Decoded<AnimationTrack>> {
    let mut diag = Diagnostics::new(strict);
    let mut track = AnimationTrack { source: source.to_string(), ..AnimationTrack::default() };
    let root = tree.root();

    for prop in tree.node(root).properties() {
        match (prop.name.as_str(), prop.value.as_ints()) {
            ("pdxasset", Some(v)) => track.version = v.to_vec(),
            _ => diag.report(tree.path(root), Some(&prop.name), "unexpected property on file root")?,
        }
    }

    let info = tree
        .find_child(root, INFO)
        .ok_or_else(|| Error::SchemaViolation(format!("{}: animation has no info node", source)))?;
    read_info(tree, info, &mut track, &mut diag)?;
    for bone in tree.node(info).children() {
        track.bones.push(read_bone(tree, *bone, &mut diag)?);
    }

    match tree.find_child(root, SAMPLES) {
        Some(samples) => unpack_samples(tree, samples, &mut track, &mut diag)?,
        None if track.bones.iter().any(|b| !b.channels.is_empty()) => {
            return Err(Error::SchemaViolation(format!("{}: sampled bones but no samples node", source)));
        }
        None => {}
    }

    for child in tree.node(root).children() {
        let name = tree.node(*child).name();
        if name != INFO && name != SAMPLES {
            diag.report(tree.path(*child), None, "unexpected node in animation")?;
        }
    }

    debug!(source, bones = track.bones.len(), frames = track.frame_count, fps = track.fps, "built animation");
    Ok(diag.finish(track))
}

fn read_info(tree: &Tree, info: NodeId, track: &mut AnimationTrack, diag: &mut Diagnostics) -> Result<()> {
    let node = tree.node(info);
    let path = tree.path(info);

    match node.property("fps").and_then(|v| v.first_float()) {
        Some(fps) => track.fps = fps,
        None => diag.report(path.as_str(), Some("fps"), format!("missing sample rate, using {}", track.fps))?,
    }

    track.frame_count = node
        .property("sa")
        .and_then(|v| v.first_int())
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::SchemaViolation(format!("{} [sa]: missing or negative frame count", path)))?;

    let declared = node.property("j").and_then(|v| v.first_int());
    let actual = node.children().len();
    if declared.is_some_and(|j| usize::try_from(j).ok() != Some(actual)) {
        diag.report(path.as_str(), Some("j"), format!("declares {:?} bones, found {}", declared, actual))?;
    }

    for prop in node.properties() {
        if !matches!(prop.name.as_str(), "fps" | "sa" | "j") {
            diag.report(path.as_str(), Some(&prop.name), "unexpected property on info")?;
        }
    }
    Ok(())
}

fn read_bone(tree: &Tree, id: NodeId, diag: &mut Diagnostics) -> Result<AnimBone> {
    let node = tree.node(id);
    let path = tree.path(id);
    let mut bone = AnimBone::new(node.name(), Vec3::ZERO, Quat::IDENTITY, Scale::default());

    for prop in node.properties() {
        let name = prop.name.as_str();
        match name {
            "sa" => match prop.value.as_str() {
                Some(s) => {
                    let (channels, unknown) = Channels::parse(s);
                    bone.channels = channels;
                    if !unknown.is_empty() {
                        diag.report(path.as_str(), Some(name), format!("ignoring unknown channels {:?}", unknown))?;
                    }
                }
                None => diag.report(path.as_str(), Some(name), "channel list must be a string")?,
            },
            "t" => match prop.value.as_floats() {
                Some([x, y, z]) => bone.translation = Vec3::new(*x, *y, *z),
                _ => diag.report(path.as_str(), Some(name), "expected 3 floats")?,
            },
            "q" => match prop.value.as_floats().and_then(quat_from_xyzw) {
                Some(q) => bone.rotation = q,
                None => diag.report(path.as_str(), Some(name), "expected 4 floats")?,
            },
            "s" => match prop.value.as_floats().and_then(Scale::from_slice) {
                Some(s) => bone.scale = s,
                None => diag.report(path.as_str(), Some(name), "expected 1 or 3 floats")?,
            },
            _ => diag.report(path.as_str(), Some(name), "unexpected property on animated bone")?,
        }
    }
    Ok(bone)
}

fn sample_channel<'t>(tree: &'t Tree, id: NodeId, name: &str) -> Result<&'t [f32]> {
    match tree.node(id).property(name) {
        None => Ok(Default::default()),
        Some(v) => v
            .as_floats()
            .ok_or_else(|| Error::SchemaViolation(format!("{} [{}]: samples must be floats", tree.path(id), name))),
    }
}

/// Walk the flat sample arrays frame by frame, bone by bone.
fn unpack_samples(tree: &Tree, id: NodeId, track: &mut AnimationTrack, diag: &mut Diagnostics) -> Result<()> {
    let node = tree.node(id);
    let path = tree.path(id);
    let t = sample_channel(tree, id, "t")?;
    let q = sample_channel(tree, id, "q")?;
    let s = sample_channel(tree, id, "s")?;

    let frames = track.frame_count;
    let per_frame = |stride: fn(&AnimBone) -> usize| -> usize { track.bones.iter().map(stride).sum() };
    let t_stride = per_frame(|b| if b.channels.translation { TRANSLATION_STRIDE } else { 0 });
    let q_stride = per_frame(|b| if b.channels.rotation { ROTATION_STRIDE } else { 0 });
    let s_stride = per_frame(|b| if b.channels.scale { b.scale.stride() } else { 0 });

    for (name, data, stride) in [("t", t, t_stride), ("q", q, q_stride), ("s", s, s_stride)] {
        if frames.checked_mul(stride) != Some(data.len()) {
            let expected = frames.saturating_mul(stride);
            return Err(Error::SchemaViolation(format!(
                "{} [{}]: expected {} floats for {} frames, found {}",
                path,
                name,
                expected,
                frames,
                data.len()
            )));
        }
    }

    // Only animated bones consume samples; with none, no frame carries data.
    let mut animated: Vec<&mut AnimBone> = track.bones.iter_mut().filter(|b| !b.channels.is_empty()).collect();
    let frames = if animated.is_empty() { 0 } else { frames };

    let (mut ti, mut qi, mut si) = (0, 0, 0);
    for _ in 0..frames {
        for bone in animated.iter_mut() {
            if bone.channels.translation {
                bone.translation_samples.extend_from_slice(&t[ti..ti + TRANSLATION_STRIDE]);
                ti += TRANSLATION_STRIDE;
            }
            if bone.channels.rotation {
                bone.rotation_samples.extend_from_slice(&q[qi..qi + ROTATION_STRIDE]);
                qi += ROTATION_STRIDE;
            }
            if bone.channels.scale {
                let stride = bone.scale.stride();
                bone.scale_samples.extend_from_slice(&s[si..si + stride]);
                si += stride;
            }
        }
    }

    for prop in node.properties() {
        if !matches!(prop.name.as_str(), "t" | "q" | "s") {
            diag.report(path.as_str(), Some(&prop.name), "unexpected property on samples")?;
        }
    }
    Ok(())
}
