//! Per-tick growth phases shared by the model variants.
//!
//! One tick runs, in this order:
//! 1. [`GrowthRule::branch`] — concentrations are updated from the
//!    previous tick's snapshot and some terminals become bifurcations.
//! 2. [`GrowthRule::elongate`] — growth-active nodes get longer
//!    (usually via [`elongate_terminals`]).
//! 3. [`GrowthRule::rescale_diameters`] — Rall's power law is reapplied
//!    bottom-up (usually via [`rescale_diameters`]).
//! 4. [`GrowthRule::commit`] — the new concentrations become the
//!    snapshot read by the next tick ([`commit_concentrations`]).
//!
//! [`step`] runs all four and then refreshes stored path lengths.

use tracing::trace;

use crate::{
    config::GrowthConfig,
    model::GrowthRule,
    rng::GrowthRng,
    tree::Tree,
    types::{NodeId, ROOT},
};

/// Lengthens every non-root terminal by its own stochastic rate.
///
/// A terminal with deviate `erate` grows by
/// `(rate_cv * rate * erate + rate) * dt`, where `rate` is the mean rate
/// currently in force. The deviate was drawn so that this increment is
/// positive.
///
/// ### Parameters
/// - `tree` - Tree whose terminals grow; the soma is never elongated.
/// - `growth` - Shared growth parameters, providing `rate_cv`.
/// - `rate` - Mean elongation rate for this tick
///   ([`GrowthConfig::mean_rate`]).
/// - `dt` - Timestep.
pub fn elongate_terminals(tree: &mut Tree, growth: &GrowthConfig, rate: f32, dt: f32) {
    let terminals: Vec<NodeId> = tree
        .iter()
        .filter(|(id, n)| *id != ROOT && n.is_terminal())
        .map(|(id, _)| id)
        .collect();
    for id in terminals {
        let node = &mut tree[id];
        node.length += (growth.rate_cv * rate * node.erate + rate) * dt;
    }
}

/// Recomputes every non-root, non-terminal diameter from the number of
/// terminals it carries: `d = terminal_diameter * n^(1 / branch_power)`.
///
/// Children are visited before their parent. Concentrations are
/// densities, so `conc` and `conc_prev` are scaled by
/// `(old_d / new_d)^2` to keep the amount of chemical unchanged.
/// Terminals keep the diameter they were created with.
///
/// Does nothing when `branch_power == 0`.
///
/// ### Parameters
/// - `tree` - The tree to update in place.
/// - `growth` - Shared growth parameters, providing the terminal
///   diameter and the branch power.
pub fn rescale_diameters(tree: &mut Tree, growth: &GrowthConfig) {
    if growth.branch_power == 0.0 {
        return;
    }
    rescale_below(tree, ROOT, growth);
}

/// Returns the number of terminals under `id`.
fn rescale_below(tree: &mut Tree, id: NodeId, growth: &GrowthConfig) -> u32 {
    let children: Vec<NodeId> = tree.children(id).collect();
    if children.is_empty() {
        return 1;
    }
    let terminals: u32 = children
        .into_iter()
        .map(|c| rescale_below(tree, c, growth))
        .sum();

    let node = &mut tree[id];
    if !node.is_root() {
        let old = node.diameter;
        let new = growth.terminal_diameter * (terminals as f32).powf(1.0 / growth.branch_power);
        let ratio = (old * old) / (new * new);
        node.diameter = new;
        node.conc *= ratio;
        node.conc_prev *= ratio;
    }
    terminals
}

/// Copies each node's current concentration into its previous-tick slot.
pub fn commit_concentrations(tree: &mut Tree) {
    for id in tree.preorder() {
        let node = &mut tree[id];
        node.conc_prev = node.conc;
    }
}

/// Advances `tree` by one tick at simulation time `t`.
///
/// Runs the four phases of `model` in their fixed order, then refreshes
/// every node's `pathlength` with [`Tree::max_path_length`].
///
/// ### Parameters
/// - `model` - Growth rule driving the tick.
/// - `tree` - Tree grown by `model`.
/// - `t` - Simulation time of this tick (already advanced by `dt`).
/// - `dt` - Timestep.
/// - `rng` - Random streams belonging to this tree.
///
/// ### Returns
/// The largest root-to-terminal path length after the tick.
pub fn step<M: GrowthRule + ?Sized>(
    model: &mut M,
    tree: &mut Tree,
    t: f64,
    dt: f32,
    rng: &mut GrowthRng,
) -> f32 {
    model.branch(tree, t, dt, rng);
    model.elongate(tree, t, dt);
    model.rescale_diameters(tree, t);
    model.commit(tree, t);
    let longest = tree.max_path_length(ROOT);
    trace!(t, nodes = tree.len(), longest, "tick complete");
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AdConfig, BesConfig, TransportConfig},
        model::{AdModel, BesModel},
        tree::{NodeKind, TreeNode},
    };

    fn segment(order: u32, length: f32) -> TreeNode {
        TreeNode::new_child(NodeKind::Segment, order, length, 1.0)
    }

    /// soma -> s -> [a, b -> [c, d]]
    fn branched() -> (Tree, [NodeId; 5]) {
        let mut tree = Tree::new(TreeNode::new_soma(10.0, 10.0));
        let s = tree.add_child(ROOT, segment(0, 2.0));
        let (a, b) = tree.sprout(s, segment(1, 3.0), segment(1, 4.0));
        let (c, d) = tree.sprout(b, segment(2, 5.0), segment(2, 6.0));
        (tree, [s, a, b, c, d])
    }

    #[test]
    fn elongation_grows_terminals_only() {
        let (mut tree, [s, a, b, c, d]) = branched();
        tree[a].erate = 1.0;
        tree[c].erate = -1.0;
        let growth = GrowthConfig {
            rate_cv: 0.5,
            ..GrowthConfig::default()
        };

        elongate_terminals(&mut tree, &growth, 2.0, 0.5);

        // 0.5 * 2 * 1 + 2 = 3 per unit time for a, 1 for c, 2 for d.
        assert_eq!(tree[a].length, 3.0 + 1.5);
        assert_eq!(tree[c].length, 5.0 + 0.5);
        assert_eq!(tree[d].length, 6.0 + 1.0);
        // Bifurcations and the soma are untouched.
        assert_eq!(tree[s].length, 2.0);
        assert_eq!(tree[b].length, 4.0);
        assert_eq!(tree[ROOT].length, 10.0);
    }

    #[test]
    fn rescale_follows_power_law_and_conserves_chemical() {
        let (mut tree, [s, a, b, _, _]) = branched();
        tree[s].conc = 0.9;
        tree[s].conc_prev = 0.6;
        let before = tree[s].chemical();
        let growth = GrowthConfig {
            terminal_diameter: 0.8,
            branch_power: 1.6,
            ..GrowthConfig::default()
        };

        rescale_diameters(&mut tree, &growth);

        let expected_s = 0.8 * 3f32.powf(1.0 / 1.6);
        let expected_b = 0.8 * 2f32.powf(1.0 / 1.6);
        assert!((tree[s].diameter - expected_s).abs() < 1e-6);
        assert!((tree[b].diameter - expected_b).abs() < 1e-6);
        // Terminals and the soma keep their diameters.
        assert_eq!(tree[a].diameter, 1.0);
        assert_eq!(tree[ROOT].diameter, 10.0);

        assert!((tree[s].chemical() - before).abs() < 1e-5);
        let ratio = 1.0 / (expected_s * expected_s);
        assert!((tree[s].conc_prev - 0.6 * ratio).abs() < 1e-6);
    }

    #[test]
    fn zero_branch_power_keeps_diameters() {
        let (mut tree, [s, ..]) = branched();
        let growth = GrowthConfig {
            branch_power: 0.0,
            ..GrowthConfig::default()
        };
        rescale_diameters(&mut tree, &growth);
        assert_eq!(tree[s].diameter, 1.0);
    }

    #[test]
    fn commit_copies_current_into_previous() {
        let (mut tree, ids) = branched();
        for (i, id) in ids.into_iter().enumerate() {
            tree[id].conc = i as f32;
        }
        commit_concentrations(&mut tree);
        for (i, id) in ids.into_iter().enumerate() {
            assert_eq!(tree[id].conc_prev, i as f32);
        }
    }

    #[test]
    fn step_runs_all_phases_and_refreshes_path_lengths() {
        let cfg = BesConfig {
            growth: GrowthConfig {
                rate_cv: 0.0,
                ..BesConfig::default().growth
            },
            ..BesConfig::default()
        };
        let mut rng = GrowthRng::seed_from_u64(5);
        let mut model = BesModel::new(cfg);
        let mut tree = model.seed_tree(&mut rng);

        let longest = step(&mut model, &mut tree, 1.0, 1.0, &mut rng);

        let terminals: Vec<_> = tree
            .iter()
            .filter(|(id, n)| *id != ROOT && n.is_terminal())
            .map(|(_, n)| n.pathlength)
            .collect();
        assert!(!terminals.is_empty());
        assert!(terminals.iter().all(|&p| p <= longest));
        assert!(terminals.iter().any(|&p| p == longest));
        // Every node committed this tick's concentration.
        assert!(tree.iter().all(|(_, n)| n.conc_prev == n.conc));
    }

    #[test]
    fn step_accepts_a_trait_object() {
        let cfg = AdConfig {
            transport: TransportConfig {
                kbr: 0.0,
                ..TransportConfig::default()
            },
            ..AdConfig::default()
        };
        let mut rng = GrowthRng::seed_from_u64(5);
        let mut model = AdModel::new(cfg);
        let mut tree = model.seed_tree(&mut rng);
        let rule: &mut dyn GrowthRule = &mut model;

        step(rule, &mut tree, 1.0, 1.0, &mut rng);
        assert_eq!(tree.count_terminals(ROOT), 1);
        assert!(tree[tree[ROOT].left.unwrap()].length > 5.0);
    }
}
