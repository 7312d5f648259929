//! Asset object model to generic tree.
//!
//! Validates everything the engine relies on before building any node, so
//! a failing export never yields a partial tree.

use tracing::debug;

use super::classify::{AABB, LOCATOR, MATERIAL, MESH, OBJECT, SKELETON, SKIN};
use super::locator::Locator;
use super::mesh::{Mesh, MAX_SKIN_INFLUENCES, SLOT_DIFFUSE, SLOT_NORMAL, SLOT_SPECULAR};
use super::skeleton::Bone;
use super::{lod_from_name, Asset, LodSwitches, DEFAULT_VERSION};
use crate::binary::MAX_OBJECT_NAME_LEN;
use crate::tree::{NodeId, Tree};
use crate::util::{flatten, quat_to_xyzw, Error, Result};

pub(crate) fn export(asset: &Asset) -> Result<Tree> {
    let shapes = group_shapes(asset);
    for shape in &shapes {
        validate_shape(shape)?;
    }
    for locator in &asset.locators {
        validate_name("locator", &locator.name)?;
    }

    let mut tree = Tree::new();
    let root = tree.root();
    let version = if asset.version.is_empty() { DEFAULT_VERSION.to_vec() } else { asset.version.clone() };
    tree.push_property(root, "pdxasset", version);

    let object = tree.add_child(root, OBJECT);
    match &asset.lod_switches {
        Some(LodSwitches::Percent(v)) => tree.push_property(object, "lodperc", v.clone()),
        Some(LodSwitches::Distance(v)) => tree.push_property(object, "loddist", v.clone()),
        None => {}
    }
    for shape in &shapes {
        write_shape(&mut tree, object, shape)?;
    }

    let locators = tree.add_child(root, LOCATOR);
    for locator in &asset.locators {
        write_locator(&mut tree, locators, locator);
    }

    debug!(nodes = tree.len(), shapes = shapes.len(), "exported asset");
    Ok(tree)
}

/// Meshes and skeleton of one shape node.
struct Shape<'a> {
    name: &'a str,
    meshes: Vec<&'a Mesh>,
    bones: &'a [Bone],
}

/// Regroup meshes and skeletons by shape name, in first-seen order.
fn group_shapes(asset: &Asset) -> Vec<Shape<'_>> {
    let mut shapes: Vec<Shape<'_>> = Vec::new();
    for mesh in &asset.meshes {
        match shapes.iter_mut().find(|s| s.name == mesh.name) {
            Some(shape) => shape.meshes.push(mesh),
            None => shapes.push(Shape { name: &mesh.name, meshes: vec![mesh], bones: &[] }),
        }
    }
    for shape in shapes.iter_mut() {
        shape.meshes.sort_by_key(|m| m.material_index);
        shape.bones = shape.meshes.iter().map(|m| m.bones.as_slice()).find(|b| !b.is_empty()).unwrap_or(&[]);
    }
    for skeleton in &asset.skeletons {
        match shapes.iter_mut().find(|s| s.name == skeleton.name) {
            Some(shape) => shape.bones = &skeleton.bones,
            None => shapes.push(Shape { name: &skeleton.name, meshes: Vec::new(), bones: &skeleton.bones }),
        }
    }
    shapes
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::constraint(format!("{} name is empty", kind)));
    }
    if name.contains('\0') {
        return Err(Error::constraint(format!("{} name contains NUL: {:?}", kind, name)));
    }
    if name.chars().count() >= MAX_OBJECT_NAME_LEN {
        return Err(Error::constraint(format!(
            "{} name {:?} must be shorter than {} characters",
            kind, name, MAX_OBJECT_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_shape(shape: &Shape<'_>) -> Result<()> {
    validate_name("shape", shape.name)?;
    validate_bones(shape.name, shape.bones)?;
    for mesh in &shape.meshes {
        // Meshes sharing a shape node share its one skeleton.
        if !mesh.bones.is_empty() && mesh.bones.as_slice() != shape.bones {
            return Err(Error::constraint(format!(
                "meshes of shape {:?} carry different skeletons",
                shape.name
            )));
        }
        validate_mesh(mesh, shape.bones.len())?;
    }
    Ok(())
}

fn validate_bones(shape: &str, bones: &[Bone]) -> Result<()> {
    for (i, bone) in bones.iter().enumerate() {
        validate_name("bone", &bone.name)?;
        if bone.index != i {
            return Err(Error::constraint(format!(
                "bone {:?} of {:?} has index {}, expected {}",
                bone.name, shape, bone.index, i
            )));
        }
        if bone.parent.is_some_and(|p| p >= bones.len() || p == i) {
            return Err(Error::constraint(format!("bone {:?} of {:?} has an invalid parent", bone.name, shape)));
        }
    }
    Ok(())
}

fn validate_mesh(mesh: &Mesh, bone_count: usize) -> Result<()> {
    let count = mesh.vertex_count();
    let per_vertex = [
        ("n", mesh.normals.as_ref().map(Vec::len)),
        ("ta", mesh.tangents.as_ref().map(Vec::len)),
        ("u0", mesh.uvs[0].as_ref().map(Vec::len)),
        ("u1", mesh.uvs[1].as_ref().map(Vec::len)),
        ("u2", mesh.uvs[2].as_ref().map(Vec::len)),
        ("u3", mesh.uvs[3].as_ref().map(Vec::len)),
    ];
    for (prop, len) in per_vertex {
        if len.is_some_and(|l| l != count) {
            return Err(Error::constraint(format!("{:?}: {} count differs from {} vertices", mesh.name, prop, count)));
        }
    }
    if mesh.triangles.len() % 3 != 0 {
        return Err(Error::constraint(format!("{:?}: triangle list is not a multiple of 3", mesh.name)));
    }
    if mesh.triangles.iter().any(|i| *i as usize >= count) {
        return Err(Error::constraint(format!("{:?}: triangle index out of range", mesh.name)));
    }

    if let Some(material) = &mesh.material {
        if material.shader.is_empty() {
            return Err(Error::constraint(format!("{:?}: material has no shader", mesh.name)));
        }
    }

    if let Some(skin) = &mesh.skin {
        let n = skin.influence_count;
        if n == 0 || n > MAX_SKIN_INFLUENCES {
            return Err(Error::constraint(format!(
                "{:?}: skin influence count {} outside 1..={}",
                mesh.name, n, MAX_SKIN_INFLUENCES
            )));
        }
        if skin.bone_indices.len() != skin.weights.len() || skin.bone_indices.len() != n * count {
            return Err(Error::constraint(format!(
                "{:?}: skin needs {} indices and weights, has {} and {}",
                mesh.name,
                n * count,
                skin.bone_indices.len(),
                skin.weights.len()
            )));
        }
        if skin.bone_indices.iter().any(|i| *i < -1 || (*i >= 0 && *i as usize >= bone_count)) {
            return Err(Error::constraint(format!(
                "{:?}: skin references a bone outside a skeleton of {}",
                mesh.name, bone_count
            )));
        }
    }
    Ok(())
}

fn write_shape(tree: &mut Tree, object: NodeId, shape: &Shape<'_>) -> Result<()> {
    let node = tree.add_child(object, shape.name);
    // Only write an explicit level when the name does not already imply it.
    if let Some(lod) = shape.meshes.iter().find_map(|m| m.lod) {
        if lod_from_name(shape.name) != Some(lod) {
            let level = i32::try_from(lod).map_err(|_| Error::constraint(format!("lod {} too large", lod)))?;
            tree.push_property(node, "lod", vec![level]);
        }
    }

    for mesh in &shape.meshes {
        write_mesh(tree, node, mesh)?;
    }

    if !shape.bones.is_empty() {
        let skeleton = tree.add_child(node, SKELETON);
        for bone in shape.bones {
            let id = tree.add_child(skeleton, bone.name.as_str());
            tree.push_property(id, "ix", vec![bone.index as i32]);
            if let Some(parent) = bone.parent {
                tree.push_property(id, "pa", vec![parent as i32]);
            }
            tree.push_property(id, "tx", bone.inverse_world.to_vec());
        }
    }
    Ok(())
}

fn write_mesh(tree: &mut Tree, shape: NodeId, mesh: &Mesh) -> Result<()> {
    let node = tree.add_child(shape, MESH);
    if let Some(p) = &mesh.positions {
        tree.push_property(node, "p", flatten(p));
    }
    if let Some(n) = &mesh.normals {
        tree.push_property(node, "n", flatten(n));
    }
    if let Some(ta) = &mesh.tangents {
        tree.push_property(node, "ta", flatten(ta));
    }
    for (channel, uv) in mesh.uvs.iter().enumerate() {
        if let Some(uv) = uv {
            tree.push_property(node, format!("u{}", channel), flatten(uv));
        }
    }
    let tri = mesh
        .triangles
        .iter()
        .map(|i| i32::try_from(*i))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::constraint(format!("{:?}: triangle index too large", mesh.name)))?;
    tree.push_property(node, "tri", tri);
    if let Some(sphere) = mesh.bounding_sphere {
        tree.push_property(node, "boundingsphere", sphere.to_vec());
    }
    for prop in &mesh.extra {
        tree.push_property(node, prop.name.as_str(), prop.value.clone());
    }

    if let Some(aabb) = mesh.aabb.or_else(|| mesh.compute_aabb()) {
        let id = tree.add_child(node, AABB);
        tree.push_property(id, "min", aabb.min.to_array().to_vec());
        tree.push_property(id, "max", aabb.max.to_array().to_vec());
    }

    if let Some(material) = &mesh.material {
        let id = tree.add_child(node, MATERIAL);
        tree.push_property(id, "shader", material.shader.as_str());
        let standard = [SLOT_DIFFUSE, SLOT_NORMAL, SLOT_SPECULAR];
        for slot in standard {
            if let Some(path) = material.textures.get(slot) {
                tree.push_property(id, slot, path.as_str());
            }
        }
        for (slot, path) in material.textures.iter().filter(|(s, _)| !standard.contains(&s.as_str())) {
            tree.push_property(id, slot.as_str(), path.as_str());
        }
    }

    if let Some(skin) = &mesh.skin {
        let id = tree.add_child(node, SKIN);
        tree.push_property(id, "bones", vec![skin.influence_count as i32]);
        tree.push_property(id, "ix", skin.bone_indices.clone());
        tree.push_property(id, "w", skin.weights.clone());
    }
    Ok(())
}

fn write_locator(tree: &mut Tree, parent: NodeId, locator: &Locator) {
    let id = tree.add_child(parent, locator.name.as_str());
    tree.push_property(id, "p", locator.position.to_array().to_vec());
    tree.push_property(id, "q", quat_to_xyzw(locator.rotation).to_vec());
    if let Some(bone) = &locator.parent {
        tree.push_property(id, "pa", bone.as_str());
    }
    if let Some(tx) = locator.transform {
        tree.push_property(id, "tx", tx.to_cols_array().to_vec());
    }
    for prop in &locator.extra {
        tree.push_property(id, prop.name.as_str(), prop.value.clone());
    }
}
