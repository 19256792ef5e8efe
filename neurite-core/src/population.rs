//! Populations of independently grown trees and their statistics.
//!
//! Trees share no state, so each [`Population::advance`] grows them in
//! parallel. Tree `i` draws from its own streams seeded with
//! `seed + i`, which keeps results identical to a sequential run.

use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    config::{ModelConfig, PopulationConfig},
    error::GrowthResult,
    neuron::{Neuron, TreeStats},
    stats::Summary,
    tree::Tree,
    types::ROOT,
};

/// Per-tree scalars plus per-terminal and per-intermediate samples
/// pooled over a population.
///
/// Pooled arrays are concatenated in tree order; each tree writes one
/// contiguous slice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopulationStats {
    pub trees: Vec<TreeStats>,
    /// Root-to-terminal path length of every terminal.
    pub path_lengths: Vec<f32>,
    pub terminal_lengths: Vec<f32>,
    pub intermediate_lengths: Vec<f32>,
    /// Centrifugal order of every terminal.
    pub orders: Vec<u32>,
}

impl PopulationStats {
    pub fn from_trees(trees: &mut [&mut Tree]) -> Self {
        let per_tree: Vec<TreeStats> = trees.iter_mut().map(|t| TreeStats::of(t)).collect();
        let n_terms: usize = per_tree.iter().map(|s| s.terminals as usize).sum();
        let n_ints: usize = per_tree.iter().map(|s| s.intermediates() as usize).sum();

        let mut path_lengths = vec![0.0; n_terms];
        let mut terminal_lengths = vec![0.0; n_terms];
        let mut intermediate_lengths = vec![0.0; n_ints];
        let mut orders = vec![0; n_terms];

        let mut at = 0;
        let mut at_int = 0;
        for tree in trees.iter() {
            tree.collect_path_lengths(ROOT, &mut path_lengths, at);
            tree.collect_terminal_lengths(ROOT, &mut terminal_lengths, at);
            at_int = tree.collect_intermediate_lengths(ROOT, &mut intermediate_lengths, at_int);
            at = tree.collect_orders(ROOT, &mut orders, at);
        }

        Self {
            trees: per_tree,
            path_lengths,
            terminal_lengths,
            intermediate_lengths,
            orders,
        }
    }

    fn per_tree<T: Copy + Into<f64>>(&self, f: impl Fn(&TreeStats) -> T) -> Summary {
        let values: Vec<T> = self.trees.iter().map(f).collect();
        Summary::of(&values)
    }

    pub fn segments(&self) -> Summary {
        self.per_tree(|s| s.segments)
    }

    /// Number of terminals per tree.
    pub fn degree(&self) -> Summary {
        self.per_tree(|s| s.terminals)
    }

    pub fn total_length(&self) -> Summary {
        self.per_tree(|s| s.total_length)
    }

    pub fn asymmetry(&self) -> Summary {
        self.per_tree(|s| s.asymmetry)
    }

    pub fn max_order(&self) -> Summary {
        self.per_tree(|s| s.max_order)
    }

    pub fn max_path_length(&self) -> Summary {
        self.per_tree(|s| s.max_path_length)
    }

    pub fn centrifugal_order(&self) -> Summary {
        Summary::of(&self.orders)
    }

    pub fn path_length(&self) -> Summary {
        Summary::of(&self.path_lengths)
    }

    pub fn terminal_length(&self) -> Summary {
        Summary::of(&self.terminal_lengths)
    }

    pub fn intermediate_length(&self) -> Summary {
        Summary::of(&self.intermediate_lengths)
    }

    fn fmt_segment_lengths(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.path_length();
        let i = self.intermediate_length();
        let t = self.terminal_length();
        writeln!(f, "Path length: m={}, std={}", p.mean, p.std)?;
        writeln!(f, "Intermediate length: m={}, std={}", i.mean, i.std)?;
        write!(f, "Terminal length: m={}, std={}", t.mean, t.std)
    }
}

impl fmt::Display for PopulationStats {
    /// A single tree is reported individually; larger populations as
    /// means and standard deviations.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.trees.as_slice() {
            writeln!(f, "{only}")?;
            return self.fmt_segment_lengths(f);
        }
        let d = self.degree();
        let a = self.asymmetry();
        let c = self.centrifugal_order();
        let l = self.total_length();
        writeln!(f, "Degree: mean={}, std={}", d.mean, d.std)?;
        writeln!(f, "Asymmetry: mean={}, std={}", a.mean, a.std)?;
        writeln!(f, "Centrifugal order: mean={}, std={}", c.mean, c.std)?;
        writeln!(f, "Total length: mean={}, std={}", l.mean, l.std)?;
        self.fmt_segment_lengths(f)
    }
}

/// A set of trees grown with the same model and parameters.
#[derive(Clone, Debug)]
pub struct Population {
    model: ModelConfig,
    config: PopulationConfig,
    neurons: Vec<Neuron>,
}

impl Population {
    /// Seeds `config.trees` neurons, tree `i` with `config.seed + i`.
    ///
    /// ### Errors
    /// Fails if either configuration does not validate.
    pub fn new(model: ModelConfig, config: PopulationConfig) -> GrowthResult<Self> {
        config.validate()?;
        model.validate()?;
        if let Some(limit) = model.transport().and_then(|t| t.max_stable_dt())
            && config.dt > limit
        {
            warn!(
                dt = config.dt,
                limit, "timestep too large for the transport rates; concentrations will oscillate"
            );
        }
        let neurons = (0..config.trees)
            .map(|i| {
                Neuron::new(&model, config.seed.wrapping_add(i as u64))
                    .map(|n| n.with_sample_interval(config.sample_interval))
            })
            .collect::<GrowthResult<Vec<_>>>()?;
        info!(
            model = %model.kind(),
            trees = config.trees,
            dt = config.dt,
            t_stop = config.t_stop,
            seed = config.seed,
            "population seeded"
        );
        Ok(Self {
            model,
            config,
            neurons,
        })
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    /// Simulation time shared by every tree.
    pub fn time(&self) -> f64 {
        self.neurons.first().map_or(0.0, Neuron::time)
    }

    pub fn is_finished(&self) -> bool {
        self.time() + 0.5 * f64::from(self.config.dt) >= self.config.t_stop
    }

    /// Grows every tree for `duration` more time units, stopping at
    /// `t_stop`.
    pub fn advance(&mut self, duration: f64) -> GrowthResult<()> {
        let target = (self.time() + duration).min(self.config.t_stop);
        let dt = self.config.dt;
        self.neurons
            .par_iter_mut()
            .try_for_each(|n| n.run_until(target, dt).map(|_| ()))?;
        debug!(t = self.time(), "population advanced");
        Ok(())
    }

    /// Grows every tree to `t_stop` and returns the final statistics.
    pub fn run(&mut self) -> GrowthResult<PopulationStats> {
        self.advance(self.config.t_stop - self.time())?;
        info!(t = self.time(), "population finished");
        Ok(self.statistics())
    }

    pub fn statistics(&mut self) -> PopulationStats {
        let mut trees: Vec<&mut Tree> = self.neurons.iter_mut().map(|n| &mut n.tree).collect();
        PopulationStats::from_trees(&mut trees)
    }

    /// Terminal count averaged over trees at each sampled time.
    pub fn mean_terminal_history(&self) -> Vec<(f64, f32)> {
        let Some(first) = self.neurons.first() else {
            return Vec::new();
        };
        let n = self.neurons.len() as f32;
        first
            .terminal_history()
            .iter()
            .enumerate()
            .map(|(i, &(t, _))| {
                let total: u32 = self
                    .neurons
                    .iter()
                    .filter_map(|nr| nr.terminal_history().get(i))
                    .map(|&(_, c)| c)
                    .sum();
                (t, total as f32 / n)
            })
            .collect()
    }
}
