//! Generic tree to asset object model.
//!
//! The tree is classified once, then walked in pre-order. Payload that does
//! not fit its node is reported through [`Diagnostics`] and dropped; the rest
//! of the asset is still built.

use std::collections::HashMap;

use bytemuck::Pod;
use tracing::debug;

use super::classify::{classify_tree, role_of, NodeRole, SKIN};
use super::diagnostic::{Decoded, Diagnostics};
use super::locator::Locator;
use super::mesh::{Material, Mesh, Skin, MAX_SKIN_INFLUENCES, WEIGHT_EPSILON};
use super::skeleton::{Bone, Skeleton, IDENTITY_AFFINE};
use super::{lod_from_name, Asset, LodSwitches};
use crate::tree::{NodeId, Property, Tree};
use crate::util::{quat_from_xyzw, unflatten, Aabb, Mat4, Quat, Vec3, Result};

pub(crate) fn build(tree: &Tree, source: &str, strict: bool) -> Result<Decoded<Asset>> {
    let mut builder = Builder {
        tree,
        roles: classify_tree(tree),
        diag: Diagnostics::new(strict),
        asset: Asset { source: source.to_string(), ..Asset::default() },
        mesh_of: HashMap::new(),
        mesh_shape: Vec::new(),
        shape_lod: HashMap::new(),
        skeletons: Vec::new(),
    };

    for id in tree.preorder() {
        match role_of(&builder.roles, id) {
            NodeRole::Root => builder.root(id)?,
            NodeRole::Group => builder.group(id)?,
            NodeRole::Mesh => builder.mesh(id)?,
            NodeRole::Material => builder.material(id)?,
            NodeRole::Skin => builder.skin(id)?,
            NodeRole::BoundingBox => builder.bounding_box(id)?,
            NodeRole::Bone => builder.bone(id)?,
            NodeRole::Locator => builder.locator(id)?,
        }
    }
    builder.attach_skeletons()?;
    builder.validate_skins()?;

    let Builder { asset, diag, .. } = builder;
    debug!(
        source,
        meshes = asset.meshes.len(),
        skeletons = asset.skeletons.len(),
        locators = asset.locators.len(),
        "built asset"
    );
    Ok(diag.finish(asset))
}

struct Builder<'t> {
    tree: &'t Tree,
    roles: Vec<NodeRole>,
    diag: Diagnostics,
    asset: Asset,
    /// Mesh node to index into `asset.meshes`.
    mesh_of: HashMap<NodeId, usize>,
    /// Owning shape node of each mesh, parallel to `asset.meshes`.
    mesh_shape: Vec<NodeId>,
    shape_lod: HashMap<NodeId, u32>,
    /// Bones keyed by the node two levels above them, in first-seen order.
    skeletons: Vec<(NodeId, Vec<Bone>)>,
}

impl<'t> Builder<'t> {
    fn report(&mut self, id: NodeId, property: Option<&str>, message: impl Into<String>) -> Result<()> {
        let path = self.tree.path(id);
        self.diag.report(path, property, message)
    }

    fn unexpected(&mut self, id: NodeId, prop: &Property, what: &str) -> Result<()> {
        self.report(id, Some(&prop.name), format!("unexpected {} property on {}", prop.value.type_name(), what))
    }

    fn floats(&mut self, id: NodeId, prop: &'t Property) -> Result<Option<&'t [f32]>> {
        match prop.value.as_floats() {
            Some(v) => Ok(Some(v)),
            None => {
                self.report(id, Some(&prop.name), format!("expected float, found {}", prop.value.type_name()))?;
                Ok(None)
            }
        }
    }

    fn ints(&mut self, id: NodeId, prop: &'t Property) -> Result<Option<&'t [i32]>> {
        match prop.value.as_ints() {
            Some(v) => Ok(Some(v)),
            None => {
                self.report(id, Some(&prop.name), format!("expected int, found {}", prop.value.type_name()))?;
                Ok(None)
            }
        }
    }

    fn string(&mut self, id: NodeId, prop: &'t Property) -> Result<Option<&'t str>> {
        match prop.value.as_str() {
            Some(v) => Ok(Some(v)),
            None => {
                self.report(id, Some(&prop.name), format!("expected str, found {}", prop.value.type_name()))?;
                Ok(None)
            }
        }
    }

    fn fixed<const N: usize>(&mut self, id: NodeId, prop: &'t Property) -> Result<Option<[f32; N]>> {
        let Some(values) = self.floats(id, prop)? else {
            return Ok(None);
        };
        match <[f32; N]>::try_from(values) {
            Ok(arr) => Ok(Some(arr)),
            Err(_) => {
                self.report(id, Some(&prop.name), format!("expected {} floats, found {}", N, values.len()))?;
                Ok(None)
            }
        }
    }

    fn vectors<T: Pod>(&mut self, id: NodeId, prop: &'t Property) -> Result<Option<Vec<T>>> {
        let Some(values) = self.floats(id, prop)? else {
            return Ok(None);
        };
        match unflatten::<T>(values) {
            Some(v) => Ok(Some(v)),
            None => {
                let width = std::mem::size_of::<T>() / std::mem::size_of::<f32>();
                self.report(id, Some(&prop.name), format!("{} floats is not a multiple of {}", values.len(), width))?;
                Ok(None)
            }
        }
    }

    fn root(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        for prop in tree.node(id).properties() {
            match prop.name.as_str() {
                "pdxasset" => {
                    if let Some(v) = self.ints(id, prop)? {
                        self.asset.version = v.to_vec();
                    }
                }
                _ => self.unexpected(id, prop, "file root")?,
            }
        }
        Ok(())
    }

    fn group(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        for prop in tree.node(id).properties() {
            match prop.name.as_str() {
                "lodperc" => {
                    if let Some(v) = self.floats(id, prop)? {
                        self.asset.lod_switches = Some(LodSwitches::Percent(v.to_vec()));
                    }
                }
                "loddist" => {
                    if let Some(v) = self.floats(id, prop)? {
                        self.asset.lod_switches = Some(LodSwitches::Distance(v.to_vec()));
                    }
                }
                "lod" => {
                    if let Some(v) = self.ints(id, prop)? {
                        match v.first().and_then(|l| u32::try_from(*l).ok()) {
                            Some(level) => {
                                self.shape_lod.insert(id, level);
                            }
                            None => self.report(id, Some("lod"), "expected one non-negative level")?,
                        }
                    }
                }
                _ => self.unexpected(id, prop, "grouping node")?,
            }
        }
        Ok(())
    }

    fn mesh(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        let Some(shape) = tree.node(id).parent() else {
            return Ok(());
        };
        let shape_name = tree.node(shape).name();
        let material_index = self.mesh_shape.iter().filter(|s| **s == shape).count();
        let mut mesh = Mesh::new(shape_name);
        mesh.material_index = material_index;
        mesh.lod = self.shape_lod.get(&shape).copied().or_else(|| lod_from_name(shape_name));

        for prop in tree.node(id).properties() {
            match prop.name.as_str() {
                "p" => mesh.positions = self.vectors(id, prop)?,
                "n" => mesh.normals = self.vectors(id, prop)?,
                "ta" => mesh.tangents = self.vectors(id, prop)?,
                "u0" => mesh.uvs[0] = self.vectors(id, prop)?,
                "u1" => mesh.uvs[1] = self.vectors(id, prop)?,
                "u2" => mesh.uvs[2] = self.vectors(id, prop)?,
                "u3" => mesh.uvs[3] = self.vectors(id, prop)?,
                "tri" => {
                    if let Some(v) = self.ints(id, prop)? {
                        match v.iter().map(|i| u32::try_from(*i)).collect::<std::result::Result<Vec<_>, _>>() {
                            Ok(tri) => mesh.triangles = tri,
                            Err(_) => self.report(id, Some("tri"), "negative triangle index")?,
                        }
                    }
                }
                "boundingsphere" => mesh.bounding_sphere = self.fixed::<4>(id, prop)?,
                _ => mesh.extra.push(prop.clone()),
            }
        }
        self.check_mesh_arrays(id, &mut mesh)?;

        self.mesh_of.insert(id, self.asset.meshes.len());
        self.mesh_shape.push(shape);
        self.asset.meshes.push(mesh);
        Ok(())
    }

    /// Per-vertex arrays must match the position count; faces must be whole
    /// and in range.
    fn check_mesh_arrays(&mut self, id: NodeId, mesh: &mut Mesh) -> Result<()> {
        let count = mesh.vertex_count();
        if mesh.normals.as_ref().is_some_and(|n| n.len() != count) {
            self.report(id, Some("n"), "normal count differs from vertex count")?;
            mesh.normals = None;
        }
        if mesh.tangents.as_ref().is_some_and(|t| t.len() != count) {
            self.report(id, Some("ta"), "tangent count differs from vertex count")?;
            mesh.tangents = None;
        }
        for (channel, uv) in mesh.uvs.iter_mut().enumerate() {
            if uv.as_ref().is_some_and(|u| u.len() != count) {
                self.report(id, Some(&format!("u{}", channel)), "uv count differs from vertex count")?;
                *uv = None;
            }
        }
        if mesh.triangles.len() % 3 != 0 {
            self.report(id, Some("tri"), format!("{} indices is not a whole number of triangles", mesh.triangles.len()))?;
            mesh.triangles.clear();
        } else if mesh.triangles.iter().any(|i| *i as usize >= count) {
            self.report(id, Some("tri"), format!("triangle index out of range for {} vertices", count))?;
            mesh.triangles.clear();
        }
        Ok(())
    }

    fn owning_mesh(&self, id: NodeId) -> Option<usize> {
        self.tree.node(id).parent().and_then(|p| self.mesh_of.get(&p).copied())
    }

    fn material(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        let Some(index) = self.owning_mesh(id) else {
            return Ok(());
        };
        if self.asset.meshes[index].material.is_some() {
            return self.report(id, None, "mesh already has a material");
        }

        let mut material = Material::default();
        let mut has_shader = false;
        for prop in tree.node(id).properties() {
            let Some(value) = self.string(id, prop)? else {
                continue;
            };
            if prop.name == "shader" {
                material.shader = value.to_string();
                has_shader = true;
            } else {
                material.textures.insert(prop.name.clone(), value.to_string());
            }
        }
        if !has_shader {
            self.report(id, Some("shader"), "material has no shader")?;
        }
        self.asset.meshes[index].material = Some(material);
        Ok(())
    }

    fn skin(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        let Some(index) = self.owning_mesh(id) else {
            return Ok(());
        };
        if self.asset.meshes[index].skin.is_some() {
            return self.report(id, None, "mesh already has a skin");
        }

        let mut influences = None;
        let mut bone_indices = Vec::new();
        let mut weights = Vec::new();
        for prop in tree.node(id).properties() {
            match prop.name.as_str() {
                "bones" => influences = self.ints(id, prop)?.and_then(|v| v.first().copied()),
                "ix" => bone_indices = self.ints(id, prop)?.map(<[i32]>::to_vec).unwrap_or_default(),
                "w" => weights = self.floats(id, prop)?.map(<[f32]>::to_vec).unwrap_or_default(),
                _ => self.unexpected(id, prop, "skin")?,
            }
        }

        let influence_count = match influences.and_then(|n| usize::try_from(n).ok()) {
            Some(n) if (1..=MAX_SKIN_INFLUENCES).contains(&n) => n,
            Some(0) => return self.report(id, Some("bones"), "skin declares zero influences per vertex"),
            Some(n) => {
                return self.report(id, Some("bones"), format!("{} influences exceeds the limit of {}", n, MAX_SKIN_INFLUENCES));
            }
            None => return self.report(id, Some("bones"), "missing or invalid influence count"),
        };
        if bone_indices.len() != weights.len() || bone_indices.len() % influence_count != 0 {
            return self.report(
                id,
                None,
                format!(
                    "{} indices and {} weights do not form whole vertices of {} influences",
                    bone_indices.len(),
                    weights.len(),
                    influence_count
                ),
            );
        }
        if bone_indices.iter().any(|i| *i < -1) {
            return self.report(id, Some("ix"), "bone index below -1");
        }

        self.asset.meshes[index].skin = Some(Skin { influence_count, bone_indices, weights });
        Ok(())
    }

    fn bounding_box(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        let Some(index) = self.owning_mesh(id) else {
            return Ok(());
        };
        let (mut min, mut max) = (None, None);
        for prop in tree.node(id).properties() {
            match prop.name.as_str() {
                "min" => min = self.fixed::<3>(id, prop)?.map(Vec3::from_array),
                "max" => max = self.fixed::<3>(id, prop)?.map(Vec3::from_array),
                _ => self.unexpected(id, prop, "bounding box")?,
            }
        }
        match (min, max) {
            (Some(min), Some(max)) => self.asset.meshes[index].aabb = Some(Aabb::new(min, max)),
            _ => self.report(id, None, "bounding box needs both min and max")?,
        }
        Ok(())
    }

    fn bone(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        let Some(owner) = tree.ancestor(id, 2) else {
            return Ok(());
        };

        let mut index = None;
        let mut parent = None;
        let mut inverse_world = None;
        for prop in tree.node(id).properties() {
            match prop.name.as_str() {
                "ix" => index = self.ints(id, prop)?.and_then(|v| v.first().copied()),
                "pa" => parent = self.ints(id, prop)?.and_then(|v| v.first().copied()),
                "tx" => inverse_world = self.fixed::<12>(id, prop)?,
                _ => self.unexpected(id, prop, "bone")?,
            }
        }

        let Some(index) = index.and_then(|i| usize::try_from(i).ok()) else {
            return self.report(id, Some("ix"), "bone has no valid index");
        };
        let parent = match parent {
            Some(p) if p >= 0 => Some(p as usize),
            Some(_) => {
                self.report(id, Some("pa"), "negative parent index")?;
                None
            }
            None => None,
        };
        let inverse_world = match inverse_world {
            Some(tx) => tx,
            None => {
                self.report(id, Some("tx"), "bone has no transform, using identity")?;
                IDENTITY_AFFINE
            }
        };

        let bone = Bone { name: tree.node(id).name().to_string(), index, parent, inverse_world };
        match self.skeletons.iter_mut().find(|(o, _)| *o == owner) {
            Some((_, bones)) => bones.push(bone),
            None => self.skeletons.push((owner, vec![bone])),
        }
        Ok(())
    }

    fn locator(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        let mut locator = Locator::new(tree.node(id).name(), Vec3::ZERO, Quat::IDENTITY);
        for prop in tree.node(id).properties() {
            match prop.name.as_str() {
                "p" => {
                    if let Some(p) = self.fixed::<3>(id, prop)? {
                        locator.position = Vec3::from_array(p);
                    }
                }
                "q" => {
                    if let Some(q) = self.fixed::<4>(id, prop)? {
                        locator.rotation = quat_from_xyzw(&q).unwrap_or(Quat::IDENTITY);
                    }
                }
                "pa" => locator.parent = self.string(id, prop)?.map(str::to_string),
                "tx" => locator.transform = self.fixed::<16>(id, prop)?.map(|m| Mat4::from_cols_array(&m)),
                _ => locator.extra.push(prop.clone()),
            }
        }
        self.asset.locators.push(locator);
        Ok(())
    }

    /// Order each skeleton by bone index and hand it to its owner.
    fn attach_skeletons(&mut self) -> Result<()> {
        let skeletons = std::mem::take(&mut self.skeletons);
        for (owner, mut bones) in skeletons {
            bones.sort_by_key(|b| b.index);
            if bones.iter().enumerate().any(|(i, b)| b.index != i) {
                self.report(owner, None, "bone indices are not contiguous from 0")?;
            }
            let count = bones.len();
            for bone in bones.iter_mut() {
                if bone.parent.is_some_and(|p| p >= count || p == bone.index) {
                    let message = format!("bone {:?} has invalid parent index", bone.name);
                    self.report(owner, Some("pa"), message)?;
                    bone.parent = None;
                }
            }

            if let Some(index) = self.mesh_of.get(&owner).copied() {
                self.asset.meshes[index].bones = bones;
                continue;
            }
            for (mesh, shape) in self.asset.meshes.iter_mut().zip(&self.mesh_shape) {
                if *shape == owner {
                    mesh.bones = bones.clone();
                }
            }
            self.asset.skeletons.push(Skeleton {
                name: self.tree.node(owner).name().to_string(),
                bones,
            });
        }
        Ok(())
    }

    /// Cross-check skins against vertices and skeletons once both are known.
    fn validate_skins(&mut self) -> Result<()> {
        let tree = self.tree;
        let mut mesh_nodes: Vec<(NodeId, usize)> = self.mesh_of.iter().map(|(id, i)| (*id, *i)).collect();
        mesh_nodes.sort_by_key(|(_, index)| *index);
        for (id, index) in mesh_nodes {
            let mesh = &self.asset.meshes[index];
            let Some(skin) = &mesh.skin else {
                continue;
            };
            let skin_node = tree.find_child(id, SKIN).unwrap_or(id);

            let problem = if mesh.positions.is_some() && skin.vertex_count() != mesh.vertex_count() {
                Some(format!(
                    "skin covers {} vertices, mesh has {}",
                    skin.vertex_count(),
                    mesh.vertex_count()
                ))
            } else if skin.max_bone_index().is_some_and(|i| i as usize >= mesh.bones.len()) {
                Some(format!("bone index out of range for a skeleton of {} bones", mesh.bones.len()))
            } else {
                (0..skin.vertex_count())
                    .find(|v| skin.weight_sum(*v) > 1.0 + WEIGHT_EPSILON)
                    .map(|v| format!("weights of vertex {} sum above 1", v))
            };

            if let Some(message) = problem {
                self.report(skin_node, None, message)?;
                self.asset.meshes[index].skin = None;
            }
        }
        Ok(())
    }
}
