//! Section-level diffusion + active transport model.
//!
//! A branch-inducing chemical is produced in the soma, taken up in the
//! soma and at terminals, diffuses along the neurite and is carried
//! towards the tips by active transport. Each section holds one
//! concentration sample, measured in a fixed volume of length `dL` at
//! its far end. A terminal branches with a probability proportional to
//! its concentration; new branches start at `min_length` with no
//! chemical, and sections shorter than `min_length` do not exchange by
//! diffusion yet.

use tracing::debug;

use crate::{
    config::{AdConfig, GrowthConfig},
    model::{GrowthRule, ValueKind},
    phases,
    rng::GrowthRng,
    tree::{NodeKind, Tree, TreeNode},
    types::{NodeId, ROOT},
};

#[derive(Clone, Debug)]
pub struct AdModel {
    config: AdConfig,
    rate: f32,
}

impl AdModel {
    pub fn new(config: AdConfig) -> Self {
        Self {
            rate: config.growth.branching_rate,
            config,
        }
    }

    pub fn config(&self) -> &AdConfig {
        &self.config
    }

    fn new_branch(&self, order: u32, rng: &mut GrowthRng) -> TreeNode {
        let g = &self.config.growth;
        TreeNode::new_child(
            NodeKind::Segment,
            order,
            self.config.min_length,
            g.terminal_diameter,
        )
        .with_erate(rng.rate_deviate(self.rate, g.rate_cv))
    }

    /// New concentration at `id`, computed only from the previous
    /// tick's values of the node and its neighbours.
    fn updated_concentration(&self, tree: &Tree, id: NodeId, dt: f32) -> f32 {
        let cfg = &self.config;
        let chem = &cfg.transport;
        let node = &tree[id];
        let d2 = node.diameter * node.diameter;
        let cp = node.conc_prev;

        let mut diffusive = 0.0;
        let mut active = 0.0;

        match node.parent {
            None => {
                // The soma exchanges with its neurite across half of its
                // own length beyond the sampling volume.
                if let Some(c) = node.left {
                    let child = &tree[c];
                    if child.length >= cfg.min_length {
                        let dist = (node.length - cfg.sampling_length) / 2.0 + child.length;
                        diffusive = child.diameter * child.diameter * (child.conc_prev - cp) / dist;
                    }
                }
            }
            Some(p) => {
                let parent = &tree[p];
                if node.length >= cfg.min_length {
                    let dist = if parent.is_root() {
                        (parent.length - cfg.sampling_length) / 2.0 + node.length
                    } else {
                        node.length
                    };
                    diffusive = d2 * (parent.conc_prev - cp) / dist;
                }
                for c in tree.children(id) {
                    let child = &tree[c];
                    if child.length >= cfg.min_length {
                        diffusive -=
                            child.diameter * child.diameter * (cp - child.conc_prev) / child.length;
                    }
                }
                active += parent.conc_prev * d2;
            }
        }
        for c in tree.children(id) {
            let child = &tree[c];
            active -= cp * child.diameter * child.diameter;
        }

        let volume = d2 * cfg.sampling_length;
        let mut conc =
            cp + dt * (chem.diffusion * diffusive / volume + chem.transport * active / volume);
        if node.is_root() {
            conc += dt * (chem.production - chem.soma_uptake * cp);
        }
        if node.is_terminal() {
            conc -= dt * chem.terminal_uptake * cp;
        }
        conc.max(0.0)
    }
}

impl GrowthRule for AdModel {
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
        let first = self.new_branch(0, rng).with_concentration(steady);
        tree.add_child(ROOT, first);
        tree
    }

    fn branch(&mut self, tree: &mut Tree, t: f64, dt: f32, rng: &mut GrowthRng) {
        let active = self.config.growth.branching_active(t);
        let kbr = self.config.transport.kbr;

        for id in tree.preorder() {
            let conc = self.updated_concentration(tree, id, dt);
            tree[id].conc = conc;

            if active
                && !tree[id].is_root()
                && tree[id].is_terminal()
                && f64::from(conc * kbr * dt) >= rng.uniform()
            {
                let order = tree[id].order;
                let left = self.new_branch(order + 1, rng);
                let right = self.new_branch(order + 1, rng);
                let (l, r) = tree.sprout(id, left, right);
                debug!(t, key = tree[id].key, order, conc, l, r, "terminal branched");
            }
        }
    }

    fn elongate(&mut self, tree: &mut Tree, t: f64, dt: f32) {
        self.rate = self.config.growth.mean_rate(t);
        phases::elongate_terminals(tree, &self.config.growth, self.rate, dt);
    }

    fn supports(&self, kind: ValueKind) -> bool {
        matches!(
            kind,
            ValueKind::Concentration | ValueKind::PreviousConcentration | ValueKind::PathLength
        )
    }
}
