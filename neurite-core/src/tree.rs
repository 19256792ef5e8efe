//! Binary morphology tree.
//!
//! Nodes live in an arena owned by [`Tree`]. Each node is referenced by
//! exactly one parent slot (`left` or `right`), and keeps a non-owning
//! `parent` index for upward queries. A node with only `left` set is a
//! straight continuation (used to chain compartments), a node with no
//! children is a terminal, and a node with both is a bifurcation.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::types::{Key, NodeId, ROOT};

/// Structural role of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Cell body; always the root.
    Soma,
    /// One whole unbranched section (BES and AD models).
    Segment,
    /// Fixed-length piece of a section (ADcm model).
    Compartment,
    /// Actively extending tip marker (ADcm model).
    GrowthCone,
}

#[derive(Clone, Debug)]
pub struct TreeNode {
    pub key: Key,
    pub kind: NodeKind,
    /// Centrifugal order; 0 at the soma and the first neurite.
    pub order: u32,
    pub length: f32,
    pub diameter: f32,
    /// Distance from the root to the far end of this node. Refreshed by
    /// [`Tree::max_path_length`].
    pub pathlength: f32,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    /// Concentration of the branch-inducing chemical (branch propensity
    /// in the BES model).
    pub conc: f32,
    /// `conc` as it stood at the end of the previous tick.
    pub conc_prev: f32,
    /// Elongation-rate deviate, drawn once when the branch is created.
    pub erate: f32,
    /// Length gained by a growth cone in its latest elongation.
    pub delta_l: f32,
}

impl TreeNode {
    pub fn new_soma(length: f32, diameter: f32) -> Self {
        Self::new_child(NodeKind::Soma, 0, length, diameter)
    }

    pub fn new_child(kind: NodeKind, order: u32, length: f32, diameter: f32) -> Self {
        Self {
            key: 0,
            kind,
            order,
            length,
            diameter,
            pathlength: 0.0,
            parent: None,
            left: None,
            right: None,
            conc: 0.0,
            conc_prev: 0.0,
            erate: 0.0,
            delta_l: 0.0,
        }
    }

    /// Sets both the current and previous concentration.
    pub fn with_concentration(mut self, conc: f32) -> Self {
        self.conc = conc;
        self.conc_prev = conc;
        self
    }

    pub fn with_erate(mut self, erate: f32) -> Self {
        self.erate = erate;
        self
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    #[inline]
    pub fn is_bifurcation(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Amount of chemical held, taking the node's own geometry as its volume.
    pub fn chemical(&self) -> f32 {
        self.diameter * self.diameter * self.length * self.conc
    }
}

#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    free: Vec<NodeId>,
    next_key: Key,
}

impl Tree {
    /// Creates a tree holding only the soma, which gets key 0.
    pub fn new(mut soma: TreeNode) -> Self {
        soma.key = 0;
        soma.parent = None;
        soma.left = None;
        soma.right = None;
        Self {
            nodes: vec![soma],
            free: Vec::new(),
            next_key: 1,
        }
    }

    fn alloc(&mut self, mut node: TreeNode, parent: NodeId) -> NodeId {
        node.key = self.next_key;
        self.next_key += 1;
        node.parent = Some(parent);
        node.left = None;
        node.right = None;
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Attaches `node` under `parent`, filling `left` first.
    ///
    /// ### Panics
    /// Panics if `parent` already has two children.
    pub fn add_child(&mut self, parent: NodeId, node: TreeNode) -> NodeId {
        assert!(
            !self.nodes[parent].is_bifurcation(),
            "node {parent} already has two children"
        );
        let id = self.alloc(node, parent);
        let p = &mut self.nodes[parent];
        if p.left.is_none() {
            p.left = Some(id);
        } else {
            p.right = Some(id);
        }
        id
    }

    /// Turns terminal `id` into a bifurcation with the given children.
    ///
    /// ### Returns
    /// The ids of the new `(left, right)` children.
    pub fn sprout(&mut self, id: NodeId, left: TreeNode, right: TreeNode) -> (NodeId, NodeId) {
        assert!(self.nodes[id].is_terminal(), "only terminals can branch");
        let l = self.add_child(id, left);
        let r = self.add_child(id, right);
        (l, r)
    }

    /// Splices `node` in between `id` and its single child.
    ///
    /// ### Returns
    /// The id of the inserted node, which now owns `id`'s former child.
    pub fn insert_below(&mut self, id: NodeId, node: TreeNode) -> NodeId {
        assert!(
            self.nodes[id].right.is_none(),
            "cannot insert below a bifurcation"
        );
        let below = self.nodes[id].left.take();
        let inserted = self.add_child(id, node);
        if let Some(child) = below {
            self.nodes[inserted].left = Some(child);
            self.nodes[child].parent = Some(inserted);
        }
        inserted
    }

    /// Discards terminal `leaf` and hangs two new subtrees roots in its
    /// place, turning its parent into a bifurcation.
    ///
    /// ### Returns
    /// The ids of the new `(left, right)` nodes.
    ///
    /// ### Panics
    /// If `leaf` is the soma, has children, or has a sibling.
    pub fn replace_leaf_with_pair(
        &mut self,
        leaf: NodeId,
        left: TreeNode,
        right: TreeNode,
    ) -> (NodeId, NodeId) {
        assert!(self.nodes[leaf].is_terminal(), "only a terminal can be replaced");
        let parent = self.nodes[leaf]
            .parent
            .expect("the soma cannot be replaced");
        assert!(
            self.nodes[parent].left == Some(leaf) && self.nodes[parent].right.is_none(),
            "replaced leaf must be its parent's only child"
        );
        self.nodes[parent].left = None;
        self.nodes[leaf].parent = None;
        self.free.push(leaf);
        let l = self.add_child(parent, left);
        let r = self.add_child(parent, right);
        (l, r)
    }

    #[inline]
    pub fn root(&self) -> &TreeNode {
        &self.nodes[ROOT]
    }

    /// Number of nodes reachable from the root, soma included.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key the next created node will receive.
    pub fn next_key(&self) -> Key {
        self.next_key
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + use<> {
        let n = &self.nodes[id];
        n.left.into_iter().chain(n.right)
    }

    /// Node ids in pre-order, left subtree before right.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            out.push(id);
            let n = &self.nodes[id];
            if let Some(r) = n.right {
                stack.push(r);
            }
            if let Some(l) = n.left {
                stack.push(l);
            }
        }
        out
    }

    /// Iterates over `(id, node)` pairs reachable from the root, in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> + '_ {
        self.preorder().into_iter().map(move |id| (id, &self.nodes[id]))
    }

    #[inline]
    fn links(&self, id: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        let n = &self.nodes[id];
        (n.left, n.right)
    }

    /// Number of segments below `id`; unbranched chains count once.
    pub fn count_segments(&self, id: NodeId) -> u32 {
        match self.links(id) {
            (None, None) => 1,
            (Some(c), None) | (None, Some(c)) => self.count_segments(c),
            (Some(l), Some(r)) => 1 + self.count_segments(l) + self.count_segments(r),
        }
    }

    pub fn count_terminals(&self, id: NodeId) -> u32 {
        match self.links(id) {
            (None, None) => 1,
            (Some(c), None) | (None, Some(c)) => self.count_terminals(c),
            (Some(l), Some(r)) => self.count_terminals(l) + self.count_terminals(r),
        }
    }

    pub fn count_bifurcations(&self, id: NodeId) -> u32 {
        match self.links(id) {
            (None, None) => 0,
            (Some(c), None) | (None, Some(c)) => self.count_bifurcations(c),
            (Some(l), Some(r)) => 1 + self.count_bifurcations(l) + self.count_bifurcations(r),
        }
    }

    /// Summed length of every non-root node below and including `id`.
    pub fn total_path_length(&self, id: NodeId) -> f32 {
        let node = &self.nodes[id];
        let own = if node.is_root() { 0.0 } else { node.length };
        own + self
            .children(id)
            .map(|c| self.total_path_length(c))
            .sum::<f32>()
    }

    /// Recomputes `pathlength` top-down from `id` and returns the largest
    /// value found at a terminal. The soma contributes no length.
    pub fn max_path_length(&mut self, id: NodeId) -> f32 {
        let path = match self.nodes[id].parent {
            None => 0.0,
            Some(p) => self.nodes[p].pathlength + self.nodes[id].length,
        };
        self.nodes[id].pathlength = path;
        match self.links(id) {
            (None, None) => path,
            (Some(c), None) | (None, Some(c)) => self.max_path_length(c),
            (Some(l), Some(r)) => {
                let lp = self.max_path_length(l);
                let rp = self.max_path_length(r);
                lp.max(rp)
            }
        }
    }

    /// Writes the length of every terminal segment into `out` starting
    /// at `at`, left subtree first.
    ///
    /// A segment's length is the summed length of the unbranched chain
    /// of nodes that forms it.
    ///
    /// ### Returns
    /// The offset just past the last value written.
    pub fn collect_terminal_lengths(&self, id: NodeId, out: &mut [f32], at: usize) -> usize {
        self.terminal_lengths_from(id, 0.0, out, at)
    }

    fn terminal_lengths_from(&self, id: NodeId, run: f32, out: &mut [f32], at: usize) -> usize {
        let node = &self.nodes[id];
        let run = if node.is_root() { 0.0 } else { run + node.length };
        match self.links(id) {
            (None, None) => {
                out[at] = run;
                at + 1
            }
            (Some(c), None) | (None, Some(c)) => self.terminal_lengths_from(c, run, out, at),
            (Some(l), Some(r)) => {
                let at = self.terminal_lengths_from(l, 0.0, out, at);
                self.terminal_lengths_from(r, 0.0, out, at)
            }
        }
    }

    /// Writes the length of every intermediate (bifurcating) segment into
    /// `out` starting at `at`, in pre-order.
    ///
    /// ### Returns
    /// The offset just past the last value written.
    pub fn collect_intermediate_lengths(&self, id: NodeId, out: &mut [f32], at: usize) -> usize {
        self.intermediate_lengths_from(id, 0.0, out, at)
    }

    fn intermediate_lengths_from(
        &self,
        id: NodeId,
        run: f32,
        out: &mut [f32],
        at: usize,
    ) -> usize {
        let node = &self.nodes[id];
        let run = if node.is_root() { 0.0 } else { run + node.length };
        match self.links(id) {
            (None, None) => at,
            (Some(c), None) | (None, Some(c)) => self.intermediate_lengths_from(c, run, out, at),
            (Some(l), Some(r)) => {
                out[at] = run;
                let at = self.intermediate_lengths_from(l, 0.0, out, at + 1);
                self.intermediate_lengths_from(r, 0.0, out, at)
            }
        }
    }

    /// Writes the stored `pathlength` of every terminal into `out`.
    ///
    /// Values are only current after [`Tree::max_path_length`] has run
    /// on the same tree shape.
    pub fn collect_path_lengths(&self, id: NodeId, out: &mut [f32], at: usize) -> usize {
        match self.links(id) {
            (None, None) => {
                out[at] = self.nodes[id].pathlength;
                at + 1
            }
            (Some(c), None) | (None, Some(c)) => self.collect_path_lengths(c, out, at),
            (Some(l), Some(r)) => {
                let at = self.collect_path_lengths(l, out, at);
                self.collect_path_lengths(r, out, at)
            }
        }
    }

    /// Writes the centrifugal order of every terminal into `out`.
    pub fn collect_orders(&self, id: NodeId, out: &mut [u32], at: usize) -> usize {
        match self.links(id) {
            (None, None) => {
                out[at] = self.nodes[id].order;
                at + 1
            }
            (Some(c), None) | (None, Some(c)) => self.collect_orders(c, out, at),
            (Some(l), Some(r)) => {
                let at = self.collect_orders(l, out, at);
                self.collect_orders(r, out, at)
            }
        }
    }

    /// Largest centrifugal order among the terminals below `id`.
    pub fn max_order(&self, id: NodeId) -> u32 {
        match self.links(id) {
            (None, None) => self.nodes[id].order,
            (Some(c), None) | (None, Some(c)) => self.max_order(c),
            (Some(l), Some(r)) => self.max_order(l).max(self.max_order(r)),
        }
    }

    fn asymmetry_partition(&self, id: NodeId) -> f32 {
        match self.links(id) {
            (None, None) => 0.0,
            (Some(c), None) | (None, Some(c)) => self.asymmetry_partition(c),
            (Some(l), Some(r)) => {
                let ln = self.count_terminals(l);
                let rn = self.count_terminals(r);
                if ln == 1 && rn == 1 {
                    return 0.0;
                }
                let part = ln.abs_diff(rn) as f32 / (ln + rn - 2) as f32;
                part + self.asymmetry_partition(l) + self.asymmetry_partition(r)
            }
        }
    }

    /// Van Pelt tree asymmetry index of the subtree at `id`, in `[0, 1]`.
    pub fn asymmetry_index(&self, id: NodeId) -> f32 {
        let n = self.count_terminals(id);
        if n == 1 {
            0.0
        } else {
            self.asymmetry_partition(id) / (n - 1) as f32
        }
    }

    /// `(key, value)` for the soma followed by every terminal, left first.
    pub fn terminal_values(&self, value: impl Fn(&TreeNode) -> f32) -> Vec<(Key, f32)> {
        let mut out = Vec::with_capacity(self.count_terminals(ROOT) as usize + 1);
        out.push((self.root().key, value(self.root())));
        for (_, node) in self.iter().filter(|(id, n)| *id != ROOT && n.is_terminal()) {
            out.push((node.key, value(node)));
        }
        out
    }
}

impl Index<NodeId> for Tree {
    type Output = TreeNode;

    #[inline]
    fn index(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for Tree {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id]
    }
}

impl fmt::Display for Tree {
    /// One `Key: k Order: o` line per node, in pre-order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, node) in self.iter() {
            writeln!(f, "Key: {} Order: {}", node.key, node.order)?;
        }
        Ok(())
    }
}
