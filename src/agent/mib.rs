//! Arena-backed MIB tree.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. Children of a
//! node are kept sorted by OID, and no sibling is a prefix of another, so a
//! lookup descends by binary search at every level.

use std::sync::Arc;

use crate::error::{Error, MibErrorKind, Result};
use crate::handler::MibHandler;
use crate::oid::Oid;

/// Index of a node in a [`MibTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Role of a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Plain subtree.
    Group,
    /// A conceptual table.
    Table,
    /// A table row definition.
    Entry,
    /// An object with instances, served by a handler.
    Leaf,
}

/// One registered node.
pub struct MibNode {
    oid: Oid,
    kind: NodeKind,
    index_len: usize,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    handler: Option<Arc<dyn MibHandler>>,
}

impl MibNode {
    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Number of instance arcs that follow the node OID; 0 means any.
    pub fn index_len(&self) -> usize {
        self.index_len
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn handler(&self) -> Option<&Arc<dyn MibHandler>> {
        self.handler.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    fn accepts_instance(&self, oid: &Oid) -> bool {
        self.index_len == 0 || oid.len() == self.oid.len() + self.index_len
    }
}

impl std::fmt::Debug for MibNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MibNode")
            .field("oid", &self.oid)
            .field("kind", &self.kind)
            .field("index_len", &self.index_len)
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// The agent's registry of managed objects.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use snmp_stack::agent::{MibTree, NodeKind};
/// use snmp_stack::handler::ScalarHandler;
/// use snmp_stack::oid;
///
/// let mut mib = MibTree::new();
/// let system = mib.insert(oid!(1, 3, 6, 1, 2, 1, 1), NodeKind::Group, 0, None).unwrap();
/// mib.insert_under(
///     system,
///     oid!(1, 3, 6, 1, 2, 1, 1, 1),
///     NodeKind::Leaf,
///     1,
///     Some(Arc::new(ScalarHandler::new(oid!(1, 3, 6, 1, 2, 1, 1, 1), "my agent"))),
/// )
/// .unwrap();
///
/// assert!(mib.find_exact(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).is_some());
/// ```
#[derive(Debug)]
pub struct MibTree {
    nodes: Vec<MibNode>,
}

impl MibTree {
    /// Create a tree holding only the root group (empty OID).
    pub fn new() -> Self {
        Self {
            nodes: vec![MibNode {
                oid: Oid::empty(),
                kind: NodeKind::Group,
                index_len: 0,
                children: Vec::new(),
                parent: None,
                handler: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&MibNode> {
        self.nodes.get(id.0)
    }

    /// Number of registered nodes, excluding the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn at(&self, id: NodeId) -> &MibNode {
        &self.nodes[id.0]
    }

    /// Register a node directly below `parent`.
    ///
    /// `oid` must strictly extend the parent OID. A sibling that is a prefix
    /// of `oid` is an overlap. Siblings that `oid` covers are moved below the
    /// new node, which is an overlap for a Leaf.
    pub fn insert_under(
        &mut self,
        parent: NodeId,
        oid: Oid,
        kind: NodeKind,
        index_len: usize,
        handler: Option<Arc<dyn MibHandler>>,
    ) -> Result<NodeId> {
        let Some(parent_node) = self.nodes.get(parent.0) else {
            return Err(Error::mib(oid, MibErrorKind::UnknownNode));
        };
        if parent_node.is_leaf() {
            return Err(Error::mib(oid, MibErrorKind::ParentIsLeaf));
        }
        if !parent_node.oid.contains(&oid) || oid.len() <= parent_node.oid.len() {
            return Err(Error::mib(oid, MibErrorKind::NotUnderParent));
        }
        if (kind == NodeKind::Leaf) != handler.is_some() {
            return Err(Error::mib(oid, MibErrorKind::HandlerMismatch));
        }

        let siblings = &parent_node.children;
        let pos = siblings.partition_point(|&c| self.at(c).oid < oid);
        if let Some(&c) = siblings.get(pos)
            && self.at(c).oid == oid
        {
            return Err(Error::mib(oid, MibErrorKind::Duplicate));
        }
        if pos > 0 && self.at(siblings[pos - 1]).oid.contains(&oid) {
            return Err(Error::mib(oid, MibErrorKind::Overlap));
        }
        let covered_end = pos + siblings[pos..]
            .iter()
            .take_while(|&&c| oid.contains(&self.at(c).oid))
            .count();
        if covered_end > pos && kind == NodeKind::Leaf {
            return Err(Error::mib(oid, MibErrorKind::Overlap));
        }

        let id = NodeId(self.nodes.len());
        let covered: Vec<NodeId> = self.nodes[parent.0]
            .children
            .splice(pos..covered_end, [id])
            .collect();
        for &c in &covered {
            self.nodes[c.0].parent = Some(id);
        }
        self.nodes.push(MibNode {
            oid,
            kind,
            index_len,
            children: covered,
            parent: Some(parent),
            handler,
        });
        Ok(id)
    }

    /// Register a node below the deepest node that contains `oid`.
    pub fn insert(
        &mut self,
        oid: Oid,
        kind: NodeKind,
        index_len: usize,
        handler: Option<Arc<dyn MibHandler>>,
    ) -> Result<NodeId> {
        let parent = self.deepest_containing(&oid);
        if self.at(parent).oid == oid && parent != self.root() {
            return Err(Error::mib(oid, MibErrorKind::Duplicate));
        }
        self.insert_under(parent, oid, kind, index_len, handler)
    }

    /// Register a Leaf below the deepest containing node.
    pub fn leaf(
        &mut self,
        oid: Oid,
        index_len: usize,
        handler: Arc<dyn MibHandler>,
    ) -> Result<NodeId> {
        self.insert(oid, NodeKind::Leaf, index_len, Some(handler))
    }

    /// Child of `node` whose OID is a prefix of (or equal to) `oid`.
    fn child_containing(&self, node: NodeId, oid: &Oid) -> Option<NodeId> {
        let children = &self.at(node).children;
        let idx = children.partition_point(|&c| self.at(c).oid <= *oid);
        let candidate = *children.get(idx.checked_sub(1)?)?;
        self.at(candidate).oid.contains(oid).then_some(candidate)
    }

    /// Deepest registered node whose OID is a prefix of `oid` (the root if none).
    pub fn deepest_containing(&self, oid: &Oid) -> NodeId {
        let mut node = self.root();
        while let Some(child) = self.child_containing(node, oid) {
            node = child;
        }
        node
    }

    /// The Leaf that serves instance `oid`, if any.
    ///
    /// The longest registered prefix must be a Leaf and the instance suffix
    /// must have the leaf's index length.
    pub fn find_exact(&self, oid: &Oid) -> Option<NodeId> {
        let id = self.deepest_containing(oid);
        let node = self.at(id);
        (node.is_leaf() && node.accepts_instance(oid)).then_some(id)
    }

    /// First Leaf in `node`'s subtree, in OID order.
    pub fn first_leaf(&self, node: NodeId) -> Option<NodeId> {
        let n = self.node(node)?;
        if n.is_leaf() {
            return Some(node);
        }
        n.children.iter().find_map(|&c| self.first_leaf(c))
    }

    /// First Leaf that sorts after `node`'s whole subtree.
    pub fn find_next(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let parent = self.node(current)?.parent?;
            let siblings = &self.at(parent).children;
            let pos = siblings.partition_point(|&c| self.at(c).oid <= self.at(current).oid);
            if let Some(leaf) = siblings[pos..].iter().find_map(|&c| self.first_leaf(c)) {
                return Some(leaf);
            }
            current = parent;
        }
    }

    /// First Leaf that contains `oid` or sorts after it.
    pub fn seek_next(&self, oid: &Oid) -> Option<NodeId> {
        let mut node = self.root();
        loop {
            if let Some(child) = self.child_containing(node, oid) {
                if self.at(child).is_leaf() {
                    return Some(child);
                }
                node = child;
                continue;
            }
            let children = &self.at(node).children;
            let idx = children.partition_point(|&c| self.at(c).oid <= *oid);
            if let Some(leaf) = children[idx..].iter().find_map(|&c| self.first_leaf(c)) {
                return Some(leaf);
            }
            return self.find_next(node);
        }
    }

    /// All Leaf nodes in OID order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.first_leaf(self.root()), |&id| self.find_next(id))
    }
}

impl Default for MibTree {
    fn default() -> Self {
        Self::new()
    }
}
