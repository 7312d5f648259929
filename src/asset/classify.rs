//! Position-dependent node classification.
//!
//! The format gives nodes meaning through where they sit, not only what they
//! are called: any child of `skeleton` is a bone and any child of `locator` is
//! a locator, whatever its own name. The rule table below is evaluated top to
//! bottom; the first match wins.

use serde::Serialize;

use crate::tree::{NodeId, Tree};

pub const OBJECT: &str = "object";
pub const LOCATOR: &str = "locator";
pub const SKELETON: &str = "skeleton";
pub const MESH: &str = "mesh";
pub const MATERIAL: &str = "material";
pub const SKIN: &str = "skin";
pub const AABB: &str = "aabb";

/// Semantic role of a node in a mesh asset tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum NodeRole {
    Root,
    Mesh,
    Material,
    Skin,
    /// Transient `aabb` label whose `min`/`max` belong to the enclosing mesh.
    BoundingBox,
    Bone,
    Locator,
    /// Pure grouping or namespace label (`object`, shapes, `skeleton`, `locator`).
    Group,
}

/// How a rule matches a node or its parent.
#[derive(Clone, Copy, Debug)]
enum Match {
    Any,
    Name(&'static str),
    Role(NodeRole),
}

#[derive(Clone, Copy, Debug)]
struct RoleRule {
    own: Match,
    parent: Match,
    role: NodeRole,
}

const ROLE_RULES: &[RoleRule] = &[
    RoleRule { own: Match::Any, parent: Match::Name(SKELETON), role: NodeRole::Bone },
    RoleRule { own: Match::Any, parent: Match::Name(LOCATOR), role: NodeRole::Locator },
    RoleRule { own: Match::Name(MESH), parent: Match::Any, role: NodeRole::Mesh },
    RoleRule { own: Match::Name(MATERIAL), parent: Match::Role(NodeRole::Mesh), role: NodeRole::Material },
    RoleRule { own: Match::Name(SKIN), parent: Match::Role(NodeRole::Mesh), role: NodeRole::Skin },
    RoleRule { own: Match::Name(AABB), parent: Match::Role(NodeRole::Mesh), role: NodeRole::BoundingBox },
];

impl Match {
    fn matches(self, name: &str, role: NodeRole) -> bool {
        match self {
            Match::Any => true,
            Match::Name(n) => n == name,
            Match::Role(r) => r == role,
        }
    }
}

/// Classify a node from its own name and its parent's name and role.
pub fn classify(own_name: &str, parent: Option<(&str, NodeRole)>) -> NodeRole {
    let Some((parent_name, parent_role)) = parent else {
        return NodeRole::Root;
    };
    ROLE_RULES
        .iter()
        .find(|rule| {
            rule.own.matches(own_name, NodeRole::Group) && rule.parent.matches(parent_name, parent_role)
        })
        .map(|rule| rule.role)
        .unwrap_or(NodeRole::Group)
}

/// Roles for every node of a tree, indexed by [`NodeId::index`].
pub fn classify_tree(tree: &Tree) -> Vec<NodeRole> {
    let mut roles = vec![NodeRole::Group; tree.len()];
    // Pre-order guarantees a parent is classified before its children.
    for id in tree.preorder() {
        let node = tree.node(id);
        let parent = node.parent().map(|p| (tree.node(p).name(), roles[p.index()]));
        roles[id.index()] = classify(node.name(), parent);
    }
    roles
}

/// Role lookup helper for a classified tree.
#[inline]
pub fn role_of(roles: &[NodeRole], id: NodeId) -> NodeRole {
    roles[id.index()]
}
