//! Mesh, material and skin entities.

use std::collections::BTreeMap;

use serde::Serialize;

use super::skeleton::Bone;
use crate::tree::Property;
use crate::util::{option_bits_eq, option_slice_bits_eq, slice_bits_eq, Aabb, Vec2, Vec3, Vec4};

/// Maximum bone influences per vertex the engine accepts.
pub const MAX_SKIN_INFLUENCES: usize = 4;

/// Number of UV channels a mesh may carry (`u0`..`u3`).
pub const UV_CHANNELS: usize = 4;

/// Texture slot names used by the standard shaders.
pub const SLOT_DIFFUSE: &str = "diff";
pub const SLOT_NORMAL: &str = "n";
pub const SLOT_SPECULAR: &str = "spec";

/// Tolerance applied to per-vertex weight sums.
pub const WEIGHT_EPSILON: f32 = 1e-3;

/// One drawable piece of geometry with its material.
///
/// A shape node holding several `mesh` children is a multi-material object;
/// each child becomes its own `Mesh` sharing the shape name and LOD, numbered
/// by `material_index`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Mesh {
    /// Name of the enclosing shape node.
    pub name: String,
    pub material_index: usize,
    pub lod: Option<u32>,
    pub positions: Option<Vec<Vec3>>,
    pub normals: Option<Vec<Vec3>>,
    /// Tangent xyz plus bitangent sign in `w`.
    pub tangents: Option<Vec<Vec4>>,
    pub uvs: [Option<Vec<Vec2>>; UV_CHANNELS],
    /// Flat triangle list, three indices per face.
    pub triangles: Vec<u32>,
    pub aabb: Option<Aabb>,
    /// Centre xyz and radius.
    pub bounding_sphere: Option<[f32; 4]>,
    pub material: Option<Material>,
    pub skin: Option<Skin>,
    /// Skeleton of the enclosing shape, ordered by bone index.
    pub bones: Vec<Bone>,
    /// Unrecognised mesh properties, kept verbatim.
    pub extra: Vec<Property>,
}

// Float data compares by bit pattern, as in the tree.
impl PartialEq for Mesh {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.material_index == other.material_index
            && self.lod == other.lod
            && option_slice_bits_eq(&self.positions, &other.positions)
            && option_slice_bits_eq(&self.normals, &other.normals)
            && option_slice_bits_eq(&self.tangents, &other.tangents)
            && self.uvs.iter().zip(&other.uvs).all(|(a, b)| option_slice_bits_eq(a, b))
            && self.triangles == other.triangles
            && option_bits_eq(&self.aabb, &other.aabb)
            && option_bits_eq(&self.bounding_sphere, &other.bounding_sphere)
            && self.material == other.material
            && self.skin == other.skin
            && self.bones == other.bones
            && self.extra == other.extra
    }
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Vertex count, taken from positions.
    pub fn vertex_count(&self) -> usize {
        self.positions.as_ref().map_or(0, Vec::len)
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Triangles as index triples.
    pub fn faces(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.triangles.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    /// Bounds of the positions, ignoring any stored box.
    pub fn compute_aabb(&self) -> Option<Aabb> {
        self.positions.as_deref().and_then(Aabb::from_points)
    }

    pub fn uv_channel_count(&self) -> usize {
        self.uvs.iter().filter(|uv| uv.is_some()).count()
    }

    pub fn is_skinned(&self) -> bool {
        self.skin.is_some()
    }
}

/// Shader plus texture slots.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Material {
    pub shader: String,
    /// Slot name to texture path, e.g. `diff` -> `body_diffuse.dds`.
    pub textures: BTreeMap<String, String>,
}

impl Material {
    pub fn new(shader: impl Into<String>) -> Self {
        Self { shader: shader.into(), textures: BTreeMap::new() }
    }

    pub fn with_texture(mut self, slot: impl Into<String>, path: impl Into<String>) -> Self {
        self.textures.insert(slot.into(), path.into());
        self
    }

    pub fn diffuse(&self) -> Option<&str> {
        self.textures.get(SLOT_DIFFUSE).map(String::as_str)
    }

    pub fn normal(&self) -> Option<&str> {
        self.textures.get(SLOT_NORMAL).map(String::as_str)
    }

    pub fn specular(&self) -> Option<&str> {
        self.textures.get(SLOT_SPECULAR).map(String::as_str)
    }
}

/// Per-vertex bone influences.
///
/// Both arrays hold `influence_count` entries per vertex; unused entries are
/// padded with index `-1` and weight `0.0`. Indices address the mesh's bone
/// list by position.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Skin {
    pub influence_count: usize,
    pub bone_indices: Vec<i32>,
    pub weights: Vec<f32>,
}

impl PartialEq for Skin {
    fn eq(&self, other: &Self) -> bool {
        self.influence_count == other.influence_count
            && self.bone_indices == other.bone_indices
            && slice_bits_eq(&self.weights, &other.weights)
    }
}

impl Skin {
    /// Build a padded skin from sparse per-vertex `(bone, weight)` lists.
    ///
    /// Zero weights are dropped. Vertices with more than
    /// [`MAX_SKIN_INFLUENCES`] entries keep the heaviest ones, renormalised.
    pub fn from_vertex_weights(vertices: &[Vec<(u32, f32)>]) -> Self {
        let influence_count = MAX_SKIN_INFLUENCES;
        let mut bone_indices = Vec::with_capacity(vertices.len() * influence_count);
        let mut weights = Vec::with_capacity(vertices.len() * influence_count);

        for influences in vertices {
            let mut kept: Vec<(u32, f32)> = influences.iter().copied().filter(|(_, w)| *w != 0.0).collect();
            if kept.len() > influence_count {
                kept.sort_by(|a, b| b.1.total_cmp(&a.1));
                kept.truncate(influence_count);
                let total: f32 = kept.iter().map(|(_, w)| w).sum();
                if total > 0.0 {
                    kept.iter_mut().for_each(|(_, w)| *w /= total);
                }
            }
            for (bone, weight) in &kept {
                bone_indices.push(*bone as i32);
                weights.push(*weight);
            }
            for _ in kept.len()..influence_count {
                bone_indices.push(-1);
                weights.push(0.0);
            }
        }

        Self { influence_count, bone_indices, weights }
    }

    /// Vertices covered, or 0 if the influence count is unset.
    pub fn vertex_count(&self) -> usize {
        match self.influence_count {
            0 => 0,
            n => self.bone_indices.len() / n,
        }
    }

    /// Non-sentinel `(bone, weight)` pairs of one vertex.
    pub fn influences(&self, vertex: usize) -> impl Iterator<Item = (u32, f32)> + '_ {
        let n = self.influence_count;
        let range = vertex * n..(vertex + 1) * n;
        let ix = self.bone_indices.get(range.clone()).unwrap_or(&[]);
        let w = self.weights.get(range).unwrap_or(&[]);
        ix.iter()
            .zip(w)
            .filter(|(i, _)| **i >= 0)
            .map(|(i, w)| (*i as u32, *w))
    }

    /// Sum of the live weights of one vertex.
    pub fn weight_sum(&self, vertex: usize) -> f32 {
        self.influences(vertex).map(|(_, w)| w).sum()
    }

    /// Largest bone index referenced, if any.
    pub fn max_bone_index(&self) -> Option<i32> {
        self.bone_indices.iter().copied().filter(|i| *i >= 0).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skin_influences() {
        let skin = Skin {
            influence_count: 4,
            bone_indices: vec![0, 1, -1, -1, 2, -1, -1, -1],
            weights: vec![0.75, 0.25, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        };
        assert_eq!(skin.vertex_count(), 2);
        assert_eq!(skin.influences(0).collect::<Vec<_>>(), vec![(0, 0.75), (1, 0.25)]);
        assert_eq!(skin.influences(1).collect::<Vec<_>>(), vec![(2, 1.0)]);
        assert_eq!(skin.influences(5).count(), 0);
        assert_eq!(skin.max_bone_index(), Some(2));
    }

    #[test]
    fn test_skin_from_vertex_weights_pads() {
        let skin = Skin::from_vertex_weights(&[vec![(3, 1.0)], vec![(0, 0.5), (1, 0.0), (2, 0.5)]]);
        assert_eq!(skin.influence_count, 4);
        assert_eq!(skin.bone_indices, vec![3, -1, -1, -1, 0, 2, -1, -1]);
        assert_eq!(skin.weights, vec![1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_skin_from_vertex_weights_prunes() {
        let skin = Skin::from_vertex_weights(&[vec![(0, 0.1), (1, 0.2), (2, 0.2), (3, 0.2), (4, 0.3)]]);
        assert_eq!(skin.vertex_count(), 1);
        assert!(!skin.bone_indices.contains(&0));
        assert!((skin.weight_sum(0) - 1.0).abs() < WEIGHT_EPSILON);
    }

    #[test]
    fn test_material_slots() {
        let mat = Material::new("PdxMeshStandard")
            .with_texture(SLOT_DIFFUSE, "body_diffuse.dds")
            .with_texture(SLOT_NORMAL, "body_normal.dds");
        assert_eq!(mat.diffuse(), Some("body_diffuse.dds"));
        assert_eq!(mat.normal(), Some("body_normal.dds"));
        assert_eq!(mat.specular(), None);
    }

    #[test]
    fn test_mesh_faces() {
        let mut mesh = Mesh::new("shape");
        mesh.positions = Some(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        mesh.triangles = vec![0, 1, 2];
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces().collect::<Vec<_>>(), vec![[0, 1, 2]]);
        let bb = mesh.compute_aabb().unwrap();
        assert_eq!(bb.max, Vec3::new(1.0, 1.0, 0.0));
    }
}
