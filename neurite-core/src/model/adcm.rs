//! Compartmental diffusion + active transport model with growth cones.
//!
//! Every section is a chain of compartments of length `dL` ending in a
//! growth cone of length `gcL`, which is the only terminal node. The
//! chemistry mirrors [`crate::model::ad`], but exchange happens between
//! neighbouring compartments. Elongation is added to the compartment
//! behind the growth cone; once that compartment reaches `2 * dL`,
//! `dL` pieces are split off until it is shorter again. When a growth cone branches it is replaced by two new
//! branches (compartment + growth cone each) which share its chemical.

use tracing::debug;

use crate::{
    config::{AdcmConfig, GrowthConfig},
    model::{GrowthRule, ValueKind},
    rng::GrowthRng,
    tree::{NodeKind, Tree, TreeNode},
    types::{NodeId, ROOT},
};

#[derive(Clone, Debug)]
pub struct AdcmModel {
    config: AdcmConfig,
    rate: f32,
}

impl AdcmModel {
    pub fn new(config: AdcmConfig) -> Self {
        Self {
            rate: config.growth.branching_rate,
            config,
        }
    }

    pub fn config(&self) -> &AdcmConfig {
        &self.config
    }

    fn compartment(&self, order: u32, conc: f32, erate: f32) -> TreeNode {
        TreeNode::new_child(
            NodeKind::Compartment,
            order,
            self.config.compartment_length,
            self.config.growth.terminal_diameter,
        )
        .with_concentration(conc)
        .with_erate(erate)
    }

    /// Hangs a growth cone under compartment `comp`, inheriting its
    /// diameter, concentration and elongation deviate.
    fn attach_growth_cone(&self, tree: &mut Tree, comp: NodeId) -> NodeId {
        let c = &tree[comp];
        let cone = TreeNode::new_child(
            NodeKind::GrowthCone,
            c.order,
            self.config.growth_cone_length,
            c.diameter,
        )
        .with_concentration(c.conc)
        .with_erate(c.erate);
        let id = tree.add_child(comp, cone);
        refresh_chain_paths(tree, comp);
        id
    }

    /// Compartment + growth cone under `parent`.
    fn attach_branch(&self, tree: &mut Tree, parent: NodeId, node: TreeNode) -> NodeId {
        let comp = tree.add_child(parent, node);
        self.attach_growth_cone(tree, comp);
        comp
    }

    /// Splits compartment `id` by inserting a new compartment of length
    /// `dL` between it and its child; `id` keeps the remaining length.
    /// Both carry `id`'s concentration, so the chemical held is unchanged.
    ///
    /// ### Returns
    /// The id of the inserted compartment.
    pub fn split_compartment(&self, tree: &mut Tree, id: NodeId) -> NodeId {
        let dl = self.config.compartment_length;
        let src = &tree[id];
        let inserted = TreeNode::new_child(NodeKind::Compartment, src.order, dl, src.diameter)
            .with_concentration(src.conc)
            .with_erate(src.erate);
        tree[id].length -= dl;
        let n = tree.insert_below(id, inserted);
        refresh_chain_paths(tree, id);
        debug!(key = tree[id].key, new_key = tree[n].key, "compartment split");
        n
    }

    /// Replaces growth cone `cone` with two new branches, each taking
    /// half of the cone's chemical spread over a fresh branch volume.
    fn branch_growth_cone(
        &self,
        tree: &mut Tree,
        cone: NodeId,
        rng: &mut GrowthRng,
    ) -> (NodeId, NodeId) {
        let g = &self.config.growth;
        let tip = &tree[cone];
        let order = tip.order + 1;
        let reference_volume = g.terminal_diameter
            * g.terminal_diameter
            * (self.config.compartment_length + self.config.growth_cone_length);
        let conc = tip.conc * 0.5 * (tip.diameter * tip.diameter * tip.length / reference_volume);

        let left = self.compartment(order, conc, rng.rate_deviate(self.rate, g.rate_cv));
        let right = self.compartment(order, conc, rng.rate_deviate(self.rate, g.rate_cv));
        let (l, r) = tree.replace_leaf_with_pair(cone, left, right);
        self.attach_growth_cone(tree, l);
        self.attach_growth_cone(tree, r);
        (l, r)
    }

    fn updated_concentration(&self, tree: &Tree, id: NodeId, dt: f32) -> f32 {
        let chem = &self.config.transport;
        let node = &tree[id];
        let d2 = node.diameter * node.diameter;
        let cp = node.conc_prev;

        let mut diffusive = 0.0;
        let mut active = 0.0;
        if let Some(p) = node.parent {
            let parent = &tree[p];
            diffusive = d2 * (parent.conc_prev - cp) / (node.length + parent.length);
            active += parent.conc_prev * d2;
        }
        for c in tree.children(id) {
            let child = &tree[c];
            let cd2 = child.diameter * child.diameter;
            diffusive -= cd2 * (cp - child.conc_prev) / (node.length + child.length);
            active -= cp * cd2;
        }

        let volume = d2 * node.length;
        let mut conc = cp
            + dt * (chem.diffusion * 2.0 * diffusive / volume + chem.transport * active / volume);
        if node.is_root() {
            conc += dt * (chem.production - chem.soma_uptake * cp);
        }
        if node.is_terminal() {
            conc -= dt * chem.terminal_uptake * cp;
        }
        conc.max(0.0)
    }

    /// The growth cone hanging directly under compartment `id`, if any.
    fn growth_cone_below(tree: &Tree, id: NodeId) -> Option<NodeId> {
        let node = &tree[id];
        if node.kind != NodeKind::Compartment || node.right.is_some() {
            return None;
        }
        node.left.filter(|&c| tree[c].kind == NodeKind::GrowthCone)
    }
}

/// Recomputes `pathlength` from `id` down its unbranched chain.
fn refresh_chain_paths(tree: &mut Tree, id: NodeId) {
    let mut current = Some(id);
    while let Some(n) = current {
        let base = tree[n].parent.map_or(0.0, |p| tree[p].pathlength);
        tree[n].pathlength = base + tree[n].length;
        current = match (tree[n].left, tree[n].right) {
            (Some(c), None) => Some(c),
            _ => None,
        };
    }
}

impl GrowthRule for AdcmModel {
    fn growth(&self) -> &GrowthConfig {
        &self.config.growth
    }

    fn seed_tree(&mut self, rng: &mut GrowthRng) -> Tree {
        let g = self.config.growth;
        self.rate = g.branching_rate;
        let steady = self.config.transport.steady_state();
        let mut tree = Tree::new(
            TreeNode::new_soma(g.soma_length, g.soma_diameter).with_concentration(steady),
        );
        let first = self.compartment(0, steady, rng.rate_deviate(self.rate, g.rate_cv));
        self.attach_branch(&mut tree, ROOT, first);
        tree
    }

    fn branch(&mut self, tree: &mut Tree, t: f64, dt: f32, rng: &mut GrowthRng) {
        let active = self.config.growth.branching_active(t);
        let kbr = self.config.transport.kbr;

        for id in tree.preorder() {
            let conc = self.updated_concentration(tree, id, dt);
            tree[id].conc = conc;

            if active
                && tree[id].kind == NodeKind::GrowthCone
                && tree[id].is_terminal()
                && f64::from(conc * kbr * dt) >= rng.uniform()
            {
                let key = tree[id].key;
                let (l, r) = self.branch_growth_cone(tree, id, rng);
                debug!(t, key, conc, l, r, "growth cone branched");
            }
        }
    }

    fn elongate(&mut self, tree: &mut Tree, t: f64, dt: f32) {
        let g = self.config.growth;
        self.rate = g.mean_rate(t);
        let split_at = 2.0 * self.config.compartment_length;

        for id in tree.preorder() {
            let Some(cone) = Self::growth_cone_below(tree, id) else {
                continue;
            };
            let delta = (g.rate_cv * self.rate * tree[cone].erate + self.rate) * dt;
            tree[cone].delta_l = delta;

            // Fold the cone's advance into the compartment behind it,
            // diluting its chemical over the longer volume.
            let comp = &mut tree[id];
            let new_length = comp.length + delta;
            comp.conc *= comp.length / new_length;
            comp.length = new_length;

            // A long step can cover several compartment lengths; split
            // until the remainder is back under `2 * dL`.
            if new_length < split_at {
                refresh_chain_paths(tree, id);
            }
            while tree[id].length >= split_at {
                self.split_compartment(tree, id);
            }
        }
    }

    fn supports(&self, _kind: ValueKind) -> bool {
        true
    }
}
