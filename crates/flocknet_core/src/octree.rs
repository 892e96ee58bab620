use flocknet_data::{Aabb, Agent, NetId, Vec3};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Compile-time parameters of an [`Octree`].
///
/// Elements are treated as points: `bounding_point` is the only geometry the
/// tree ever looks at. Identity is decided by `key`, never by position.
pub trait OctreeSemantics {
    type Element: Clone;
    type Key: Copy + Eq + Hash + Debug;

    /// A leaf holding more than this many elements splits into eight children.
    const MAX_ELEMENTS_PER_LEAF: usize = 10;
    /// An internal node whose subtree drops below this count collapses into a leaf.
    const MIN_INCLUSIVE_ELEMENTS_PER_NODE: usize = 5;
    /// Leaves at this depth never split (root is depth 0).
    const MAX_NODE_DEPTH: u32 = 20;

    fn bounding_point(element: &Self::Element) -> Vec3;
    fn key(element: &Self::Element) -> Self::Key;
}

/// Octree semantics for agent snapshots keyed by their network id.
pub struct AgentOctreeSemantics;

impl OctreeSemantics for AgentOctreeSemantics {
    type Element = Agent;
    type Key = NetId;

    #[inline]
    fn bounding_point(element: &Agent) -> Vec3 {
        element.location
    }

    #[inline]
    fn key(element: &Agent) -> NetId {
        element.id
    }
}

pub type AgentOctree = Octree<AgentOctreeSemantics>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub const ROOT: NodeIndex = NodeIndex(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node<E> {
    bounds: Aabb,
    depth: u32,
    parent: Option<NodeIndex>,
    /// Children occupy eight consecutive slots starting here.
    first_child: Option<NodeIndex>,
    inclusive_len: usize,
    elements: Vec<E>,
}

impl<E> Node<E> {
    fn new(bounds: Aabb, depth: u32, parent: Option<NodeIndex>) -> Self {
        Self {
            bounds,
            depth,
            parent,
            first_child: None,
            inclusive_len: 0,
            elements: Vec::new(),
        }
    }
}

/// Bounded-depth octree over point elements with incremental insert/remove.
///
/// Nodes live in a flat arena; child blocks freed by a collapse are recycled
/// by later splits. Elements are only ever stored in leaves. The root bounds
/// are fixed at construction: points outside them are rejected by
/// [`Octree::insert`].
///
/// # Examples
/// ```
/// use flocknet_core::octree::AgentOctree;
/// use flocknet_data::{Aabb, Agent, NetId, Vec3};
///
/// let mut tree = AgentOctree::new(Vec3::ZERO, 1000.0);
/// tree.insert(Agent::new(NetId(1), Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO));
/// tree.insert(Agent::new(NetId(2), Vec3::new(900.0, 0.0, 0.0), Vec3::ZERO));
///
/// let found = tree.query_box(&Aabb::cube(Vec3::ZERO, 50.0));
/// assert_eq!(found.len(), 1);
/// ```
pub struct Octree<S: OctreeSemantics> {
    nodes: Vec<Node<S::Element>>,
    free_child_blocks: Vec<NodeIndex>,
    element_nodes: HashMap<S::Key, NodeIndex>,
}

impl<S: OctreeSemantics> Octree<S> {
    pub fn new(center: Vec3, extent: f32) -> Self {
        Self {
            nodes: vec![Node::new(Aabb::cube(center, extent), 0, None)],
            free_child_blocks: Vec::new(),
            element_nodes: HashMap::new(),
        }
    }

    #[inline]
    pub fn root_bounds(&self) -> Aabb {
        self.nodes[NodeIndex::ROOT.0].bounds
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes[NodeIndex::ROOT.0].inclusive_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &S::Key) -> bool {
        self.element_nodes.contains_key(key)
    }

    /// Returns the stored element with `key`.
    pub fn get(&self, key: &S::Key) -> Option<&S::Element> {
        let node = self.element_nodes.get(key)?;
        self.nodes[node.0]
            .elements
            .iter()
            .find(|e| S::key(e) == *key)
    }

    /// Inserts `element` at its bounding point.
    ///
    /// Returns `false` and stores nothing when the point is non-finite or lies
    /// outside the root bounds. An element whose key is already present
    /// replaces the stored one.
    pub fn insert(&mut self, element: S::Element) -> bool {
        let point = S::bounding_point(&element);
        if !point.is_finite() || !self.root_bounds().contains_point(point) {
            return false;
        }

        let key = S::key(&element);
        if self.element_nodes.contains_key(&key) {
            self.remove_by_key(&key);
        }

        let mut idx = NodeIndex::ROOT;
        loop {
            let node = &mut self.nodes[idx.0];
            node.inclusive_len += 1;
            match node.first_child {
                Some(first) => idx = NodeIndex(first.0 + node.bounds.octant_index(point)),
                None => break,
            }
        }

        self.nodes[idx.0].elements.push(element);
        self.element_nodes.insert(key, idx);
        self.split_if_needed(idx);
        true
    }

    /// Removes the element with the same key as `element`, wherever it is stored.
    pub fn remove(&mut self, element: &S::Element) -> bool {
        self.remove_by_key(&S::key(element)).is_some()
    }

    /// Removes and returns the element with `key`, collapsing sparse subtrees.
    pub fn remove_by_key(&mut self, key: &S::Key) -> Option<S::Element> {
        let leaf = self.element_nodes.remove(key)?;
        let elements = &mut self.nodes[leaf.0].elements;
        let pos = elements.iter().position(|e| S::key(e) == *key)?;
        let removed = elements.swap_remove(pos);

        // Topmost internal ancestor that became too sparse.
        let mut collapse = None;
        let mut cur = Some(leaf);
        while let Some(idx) = cur {
            let node = &mut self.nodes[idx.0];
            node.inclusive_len -= 1;
            if node.first_child.is_some()
                && node.inclusive_len < S::MIN_INCLUSIVE_ELEMENTS_PER_NODE
            {
                collapse = Some(idx);
            }
            cur = node.parent;
        }

        if let Some(idx) = collapse {
            self.collapse(idx);
        }
        Some(removed)
    }

    /// Removes every element and child node. Root bounds are kept.
    pub fn clear(&mut self) {
        let bounds = self.root_bounds();
        self.nodes.clear();
        self.nodes.push(Node::new(bounds, 0, None));
        self.free_child_blocks.clear();
        self.element_nodes.clear();
    }

    /// Collects a copy of every element whose point lies inside `query`.
    pub fn query_box(&self, query: &Aabb) -> Vec<S::Element> {
        let mut found = Vec::new();
        self.find_elements_with_bounds_test(query, |e| found.push(e.clone()));
        found
    }

    /// Calls `visit` for every element whose point lies inside `query`.
    pub fn find_elements_with_bounds_test<F>(&self, query: &Aabb, mut visit: F)
    where
        F: FnMut(&S::Element),
    {
        let mut stack = vec![NodeIndex::ROOT];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx.0];
            if node.inclusive_len == 0 || !node.bounds.intersects(query) {
                continue;
            }
            match node.first_child {
                Some(first) => stack.extend((0..8).map(|oct| NodeIndex(first.0 + oct))),
                None => {
                    for element in &node.elements {
                        if query.contains_point(S::bounding_point(element)) {
                            visit(element);
                        }
                    }
                }
            }
        }
    }

    /// Depth-first node traversal with early rejection.
    ///
    /// `predicate(parent, node, bounds)` decides whether a node is visited;
    /// children of a rejected node are never considered. `visitor` receives
    /// the same arguments for every accepted node.
    pub fn find_nodes_with_predicate<P, V>(&self, mut predicate: P, mut visitor: V)
    where
        P: FnMut(Option<NodeIndex>, NodeIndex, &Aabb) -> bool,
        V: FnMut(Option<NodeIndex>, NodeIndex, &Aabb),
    {
        let mut stack = vec![(None, NodeIndex::ROOT)];
        while let Some((parent, idx)) = stack.pop() {
            let node = &self.nodes[idx.0];
            if !predicate(parent, idx, &node.bounds) {
                continue;
            }
            visitor(parent, idx, &node.bounds);
            if let Some(first) = node.first_child {
                stack.extend((0..8).rev().map(|oct| (Some(idx), NodeIndex(first.0 + oct))));
            }
        }
    }

    /// Elements stored directly in `node` (empty for internal nodes).
    pub fn elements_for_node(&self, node: NodeIndex) -> &[S::Element] {
        &self.nodes[node.0].elements
    }

    pub fn node_depth(&self, node: NodeIndex) -> u32 {
        self.nodes[node.0].depth
    }

    pub fn is_leaf(&self, node: NodeIndex) -> bool {
        self.nodes[node.0].first_child.is_none()
    }

    /// Number of elements in the subtree rooted at `node`.
    pub fn inclusive_len(&self, node: NodeIndex) -> usize {
        self.nodes[node.0].inclusive_len
    }

    fn split_if_needed(&mut self, idx: NodeIndex) {
        let node = &self.nodes[idx.0];
        if node.elements.len() <= S::MAX_ELEMENTS_PER_LEAF || node.depth >= S::MAX_NODE_DEPTH {
            return;
        }

        let bounds = node.bounds;
        let first = self.allocate_children(idx);
        let elements = std::mem::take(&mut self.nodes[idx.0].elements);
        for element in elements {
            let child = NodeIndex(first.0 + bounds.octant_index(S::bounding_point(&element)));
            self.element_nodes.insert(S::key(&element), child);
            let child_node = &mut self.nodes[child.0];
            child_node.inclusive_len += 1;
            child_node.elements.push(element);
        }

        for oct in 0..8 {
            self.split_if_needed(NodeIndex(first.0 + oct));
        }
    }

    fn allocate_children(&mut self, parent: NodeIndex) -> NodeIndex {
        let bounds = self.nodes[parent.0].bounds;
        let depth = self.nodes[parent.0].depth + 1;
        let children = (0..8).map(|oct| Node::new(bounds.octant(oct), depth, Some(parent)));

        let first = match self.free_child_blocks.pop() {
            Some(first) => {
                for (slot, child) in self.nodes[first.0..first.0 + 8].iter_mut().zip(children) {
                    *slot = child;
                }
                first
            }
            None => {
                let first = NodeIndex(self.nodes.len());
                self.nodes.extend(children);
                first
            }
        };
        self.nodes[parent.0].first_child = Some(first);
        first
    }

    fn collapse(&mut self, idx: NodeIndex) {
        let mut gathered = Vec::new();
        self.drain_children(idx, &mut gathered);
        for element in &gathered {
            self.element_nodes.insert(S::key(element), idx);
        }
        self.nodes[idx.0].elements.extend(gathered);
    }

    fn drain_children(&mut self, idx: NodeIndex, out: &mut Vec<S::Element>) {
        if let Some(first) = self.nodes[idx.0].first_child.take() {
            for oct in 0..8 {
                let child = NodeIndex(first.0 + oct);
                out.append(&mut self.nodes[child.0].elements);
                self.drain_children(child, out);
            }
            self.free_child_blocks.push(first);
        }
    }
}
