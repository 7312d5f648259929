//! Bones and skeleton frames.

use serde::Serialize;

use crate::util::{bits_eq, Mat4, Vec4};

/// Identity inverse bind transform in the file's 12-float layout.
pub const IDENTITY_AFFINE: [f32; 12] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];

/// A joint of a skeleton.
#[derive(Clone, Debug, Serialize)]
pub struct Bone {
    pub name: String,
    /// Position in the skeleton; skin indices address bones by this value.
    pub index: usize,
    /// Parent bone index, `None` for a root.
    pub parent: Option<usize>,
    /// Inverse bind transform as four xyz columns: three axes, then translation.
    pub inverse_world: [f32; 12],
}

impl PartialEq for Bone {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.index == other.index
            && self.parent == other.parent
            && bits_eq(&self.inverse_world, &other.inverse_world)
    }
}

impl Bone {
    pub fn new(name: impl Into<String>, index: usize, parent: Option<usize>, inverse_world: Mat4) -> Self {
        Self {
            name: name.into(),
            index,
            parent,
            inverse_world: affine_to_array(inverse_world),
        }
    }

    /// Inverse bind transform as a 4x4 matrix.
    pub fn inverse_world_matrix(&self) -> Mat4 {
        let t = &self.inverse_world;
        Mat4::from_cols(
            Vec4::new(t[0], t[1], t[2], 0.0),
            Vec4::new(t[3], t[4], t[5], 0.0),
            Vec4::new(t[6], t[7], t[8], 0.0),
            Vec4::new(t[9], t[10], t[11], 1.0),
        )
    }

    /// Bind transform, the inverse of [`Self::inverse_world_matrix`].
    pub fn world_matrix(&self) -> Mat4 {
        self.inverse_world_matrix().inverse()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Drop the projective row of an affine matrix.
fn affine_to_array(m: Mat4) -> [f32; 12] {
    let c = m.to_cols_array();
    [c[0], c[1], c[2], c[4], c[5], c[6], c[8], c[9], c[10], c[12], c[13], c[14]]
}

/// Skeleton owned by a shape node.
///
/// Kept separately from meshes so that shapes holding only a skeleton
/// (the `skel_frame` convention) survive a decode/encode cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Skeleton {
    /// Name of the owning shape.
    pub name: String,
    pub bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), bones: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Root bones, those without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(|b| b.is_root())
    }

    /// Children of the bone at `index`.
    pub fn children(&self, index: usize) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(move |b| b.parent == Some(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec3;

    #[test]
    fn test_inverse_world_layout() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let bone = Bone::new("Root", 0, None, m);
        assert_eq!(bone.inverse_world, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 3.0]);
        assert_eq!(bone.inverse_world_matrix(), m);
        assert_eq!(Bone::new("Root", 0, None, Mat4::IDENTITY).inverse_world, IDENTITY_AFFINE);
        let world = bone.world_matrix();
        assert!(world.abs_diff_eq(Mat4::from_translation(Vec3::new(-1.0, -2.0, -3.0)), 1e-6));
    }

    #[test]
    fn test_hierarchy() {
        let mut skel = Skeleton::new("skel_frame");
        skel.bones.push(Bone::new("Root", 0, None, Mat4::IDENTITY));
        skel.bones.push(Bone::new("Spine", 1, Some(0), Mat4::IDENTITY));
        skel.bones.push(Bone::new("Head", 2, Some(1), Mat4::IDENTITY));
        assert_eq!(skel.roots().count(), 1);
        assert_eq!(skel.children(1).map(|b| b.name.as_str()).collect::<Vec<_>>(), ["Head"]);
        assert_eq!(skel.find("Spine").map(|b| b.index), Some(1));
    }
}
