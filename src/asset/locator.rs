//! Named attachment points.

use serde::Serialize;

use crate::tree::Property;
use crate::util::{bits_eq, option_bits_eq, Mat4, Quat, Vec3};

/// A named, positioned reference point, optionally parented to a bone.
#[derive(Clone, Debug, Serialize)]
pub struct Locator {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    /// Name of the bone the locator follows.
    pub parent: Option<String>,
    /// Explicit transform, present when the locator carries non-uniform scale.
    pub transform: Option<Mat4>,
    pub extra: Vec<Property>,
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && bits_eq(&self.position, &other.position)
            && bits_eq(&self.rotation, &other.rotation)
            && self.parent == other.parent
            && option_bits_eq(&self.transform, &other.transform)
            && self.extra == other.extra
    }
}

impl Locator {
    pub fn new(name: impl Into<String>, position: Vec3, rotation: Quat) -> Self {
        Self {
            name: name.into(),
            position,
            rotation,
            parent: None,
            transform: None,
            extra: Vec::new(),
        }
    }

    pub fn with_parent(mut self, bone: impl Into<String>) -> Self {
        self.parent = Some(bone.into());
        self
    }

    /// Local transform: the explicit override if present, else position and rotation.
    pub fn local_matrix(&self) -> Mat4 {
        self.transform
            .unwrap_or_else(|| Mat4::from_rotation_translation(self.rotation, self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_matrix() {
        let loc = Locator::new("attach_hand", Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY).with_parent("Hand_R");
        assert_eq!(loc.local_matrix(), Mat4::from_translation(Vec3::Y));
        assert_eq!(loc.parent.as_deref(), Some("Hand_R"));

        let scaled = Locator {
            transform: Some(Mat4::from_scale(Vec3::new(1.0, 2.0, 1.0))),
            ..loc
        };
        assert_eq!(scaled.local_matrix().col(1).y, 2.0);
    }
}
