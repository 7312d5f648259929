//! Arena-backed generic tree.
//!
//! Nodes are stored in a flat arena and addressed by [`NodeId`]. Parents own
//! their children through index lists, so ancestor lookups ("two levels up")
//! never need back-pointers into owned memory.

use super::{Property, PropertyValue};

/// Name given to the root node. The root name is never written to the stream.
pub const ROOT_NAME: &str = "File";

/// Index of a node inside its [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named element holding properties and child nodes.
#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    depth: usize,
    parent: Option<NodeId>,
    properties: Vec<Property>,
    children: Vec<NodeId>,
}

impl Node {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nesting depth; the root is depth 0.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Properties in stream order.
    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Children in stream order.
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// First property with the given name.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.name == name).map(|p| &p.value)
    }
}

/// Ordered tree of named objects and typed properties.
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: ROOT_NAME.to_string(),
                depth: 0,
                parent: None,
                properties: Vec::new(),
                children: Vec::new(),
            }],
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, including the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree is never empty; it always has a root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Borrow a node.
    ///
    /// Panics if `id` came from a different tree.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Append a child node and return its id.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(Node {
            name: name.into(),
            depth,
            parent: Some(parent),
            properties: Vec::new(),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append a property to a node.
    pub fn push_property(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.nodes[id.0].properties.push(Property::new(name, value));
    }

    /// Name of the parent node, if any.
    pub fn parent_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).parent.map(|p| self.node(p).name())
    }

    /// Walk `levels` parents up. `ancestor(id, 0) == Some(id)`.
    pub fn ancestor(&self, id: NodeId, levels: usize) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..levels {
            current = self.node(current).parent?;
        }
        Some(current)
    }

    /// First child with the given name.
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id).children.iter().copied().find(|c| self.node(*c).name == name)
    }

    /// All children with the given name.
    pub fn find_children<'a>(&'a self, id: NodeId, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.node(id).children.iter().copied().filter(move |c| self.node(*c).name == name)
    }

    /// Slash-separated path from the root, for diagnostics.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c);
            if node.parent.is_some() {
                parts.push(node.name.as_str());
            }
            current = node.parent;
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Depth-first, pre-order list of node ids (root first).
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    fn subtree_eq(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        let (na, nb) = (self.node(a), other.node(b));
        na.name == nb.name
            && na.depth == nb.depth
            && na.properties == nb.properties
            && na.children.len() == nb.children.len()
            && na
                .children
                .iter()
                .zip(&nb.children)
                .all(|(ca, cb)| self.subtree_eq(*ca, other, *cb))
    }
}

// Structural equality: arena layout is irrelevant, only names, depth,
// property order and child order count.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root(), other, other.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.push_property(root, "pdxasset", vec![1i32, 0]);
        let object = tree.add_child(root, "object");
        let shape = tree.add_child(object, "shape");
        let mesh = tree.add_child(shape, "mesh");
        tree.push_property(mesh, "tri", vec![0i32, 1, 2]);
        tree.add_child(mesh, "aabb");
        tree.add_child(root, "locator");
        tree
    }

    #[test]
    fn test_depth_and_paths() {
        let tree = sample();
        let mesh = tree.preorder()[3];
        assert_eq!(tree.node(mesh).name(), "mesh");
        assert_eq!(tree.node(mesh).depth(), 3);
        assert_eq!(tree.path(mesh), "/object/shape/mesh");
        assert_eq!(tree.parent_name(mesh), Some("shape"));
        let object = tree.ancestor(mesh, 2).unwrap();
        assert_eq!(tree.node(object).name(), "object");
        assert!(tree.ancestor(mesh, 4).is_none());
    }

    #[test]
    fn test_preorder() {
        let tree = sample();
        let names: Vec<_> = tree.preorder().into_iter().map(|id| tree.node(id).name().to_string()).collect();
        assert_eq!(names, ["File", "object", "shape", "mesh", "aabb", "locator"]);
    }

    #[test]
    fn test_structural_eq_ignores_arena_order() {
        let a = sample();

        // Same shape, different insertion order into the arena.
        let mut b = Tree::new();
        let root = b.root();
        b.push_property(root, "pdxasset", vec![1i32, 0]);
        let object = b.add_child(root, "object");
        b.add_child(root, "locator");
        let shape = b.add_child(object, "shape");
        let mesh = b.add_child(shape, "mesh");
        b.add_child(mesh, "aabb");
        b.push_property(mesh, "tri", vec![0i32, 1, 2]);
        assert_eq!(a, b);

        b.push_property(mesh, "extra", vec![1.0f32]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_find_children() {
        let mut tree = Tree::new();
        let root = tree.root();
        let shape = tree.add_child(root, "shape");
        tree.add_child(shape, "mesh");
        tree.add_child(shape, "skeleton");
        tree.add_child(shape, "mesh");
        assert_eq!(tree.find_children(shape, "mesh").count(), 2);
        assert!(tree.find_child(shape, "skeleton").is_some());
        assert!(tree.find_child(shape, "skin").is_none());
    }
}
