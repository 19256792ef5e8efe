//! Van Pelt's BES growth model.
//!
//! Branching probability of a terminal depends on the number of
//! terminals in the tree (exponent E) and on its centrifugal order
//! (exponent S). Order dependence is normalised by
//! `C = sum over terminals of 2^(-S * order)`, computed at commit time
//! and consumed by the next tick's branch pass.

use tracing::debug;

use crate::{
    config::{BesConfig, GrowthConfig},
    model::{GrowthRule, ValueKind},
    phases,
    rng::GrowthRng,
    tree::{NodeKind, Tree, TreeNode},
    types::ROOT,
};

#[derive(Clone, Debug)]
pub struct BesModel {
    config: BesConfig,
    kbr: f32,
    /// Order normalisation from the last commit.
    order_sum: f32,
    /// Terminal-count factor of the branch probability, from the last
    /// branch pass.
    pbr: f32,
    /// Mean elongation rate in force; new branches draw their deviate
    /// against it.
    rate: f32,
}

impl BesModel {
    pub fn new(config: BesConfig) -> Self {
        Self {
            kbr: config.kbr(),
            order_sum: 1.0,
            pbr: 1.0,
            rate: config.growth.branching_rate,
            config,
        }
    }

    pub fn config(&self) -> &BesConfig {
        &self.config
    }

    /// Terminal-count factor `(n / C) / n^E` used by the latest branch pass.
    pub fn branch_factor(&self) -> f32 {
        self.pbr
    }

    /// Normalisation `C` that the next branch pass will use.
    pub fn order_normalization(&self) -> f32 {
        self.order_sum
    }

    fn order_weight(&self, order: u32) -> f32 {
        2f32.powf(-self.config.s * order as f32)
    }

    fn new_branch(&self, order: u32, rng: &mut GrowthRng) -> TreeNode {
        let g = &self.config.growth;
        TreeNode::new_child(NodeKind::Segment, order, 0.0, g.terminal_diameter)
            .with_erate(rng.rate_deviate(self.rate, g.rate_cv))
    }
}

impl GrowthRule for BesModel {
    fn growth(&self) -> &GrowthConfig {
        &self.config.growth
    }

    fn seed_tree(&mut self, rng: &mut GrowthRng) -> Tree {
        let g = self.config.growth;
        self.rate = g.branching_rate;
        let mut tree =
            Tree::new(TreeNode::new_soma(g.soma_length, g.soma_diameter).with_concentration(1.0));
        let first = self.new_branch(0, rng).with_concentration(1.0);
        tree.add_child(ROOT, first);
        tree
    }

    fn branch(&mut self, tree: &mut Tree, t: f64, dt: f32, rng: &mut GrowthRng) {
        // The normalisation is the one committed at the end of the
        // previous tick.
        let terminals = tree.count_terminals(ROOT) as f32;
        let norm = terminals / self.order_sum;
        self.pbr = norm / terminals.powf(self.config.e);

        if !self.config.growth.branching_active(t) {
            return;
        }

        let candidates: Vec<_> = tree
            .preorder()
            .into_iter()
            .filter(|&id| id != ROOT && tree[id].is_terminal())
            .collect();
        for id in candidates {
            let order = tree[id].order;
            let propensity = self.pbr * self.order_weight(order);
            tree[id].conc = propensity;
            if f64::from(propensity * self.kbr * dt) >= rng.uniform() {
                let left = self.new_branch(order + 1, rng);
                let right = self.new_branch(order + 1, rng);
                let (l, r) = tree.sprout(id, left, right);
                debug!(t, key = tree[id].key, order, l, r, "terminal branched");
            }
        }
    }

    fn elongate(&mut self, tree: &mut Tree, t: f64, dt: f32) {
        self.rate = self.config.growth.mean_rate(t);
        phases::elongate_terminals(tree, &self.config.growth, self.rate, dt);
    }

    fn commit(&mut self, tree: &mut Tree, _t: f64) {
        phases::commit_concentrations(tree);
        self.order_sum = tree
            .iter()
            .filter(|(id, n)| *id != ROOT && n.is_terminal())
            .map(|(_, n)| self.order_weight(n.order))
            .sum();
    }

    fn supports(&self, kind: ValueKind) -> bool {
        matches!(
            kind,
            ValueKind::Concentration | ValueKind::PreviousConcentration | ValueKind::PathLength
        )
    }
}
