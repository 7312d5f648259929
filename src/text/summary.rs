//! Human-readable summaries of the object models.

use std::fmt;

use crate::anim::AnimationTrack;
use crate::asset::{Asset, LodSwitches};

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "asset {:?} version {:?}", self.source, self.version)?;
        match &self.lod_switches {
            Some(LodSwitches::Percent(v)) => writeln!(f, "  lod switches (percent): {:?}", v)?,
            Some(LodSwitches::Distance(v)) => writeln!(f, "  lod switches (distance): {:?}", v)?,
            None => {}
        }
        for mesh in &self.meshes {
            write!(
                f,
                "  mesh {}[{}]: {} verts, {} tris, {} uv",
                mesh.name,
                mesh.material_index,
                mesh.vertex_count(),
                mesh.face_count(),
                mesh.uv_channel_count()
            )?;
            if let Some(lod) = mesh.lod {
                write!(f, ", lod {}", lod)?;
            }
            if let Some(material) = &mesh.material {
                write!(f, ", shader {}", material.shader)?;
            }
            if let Some(skin) = &mesh.skin {
                write!(f, ", skin x{}", skin.influence_count)?;
            }
            if !mesh.bones.is_empty() {
                write!(f, ", {} bones", mesh.bones.len())?;
            }
            writeln!(f)?;
        }
        for skeleton in &self.skeletons {
            writeln!(f, "  skeleton {}: {} bones", skeleton.name, skeleton.len())?;
        }
        for locator in &self.locators {
            write!(f, "  locator {} at {:?}", locator.name, locator.position.to_array())?;
            if let Some(parent) = &locator.parent {
                write!(f, " on {}", parent)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for AnimationTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "animation {:?}: {} frames at {} fps, {} bones",
            self.source,
            self.frame_count,
            self.fps,
            self.bones.len()
        )?;
        for bone in &self.bones {
            writeln!(f, "  {} [{}]", bone.name, bone.channels)?;
        }
        Ok(())
    }
}
