//! Single-tree driver: one morphology, its growth rule, its random
//! streams and its simulation clock.

use std::fmt;

use crate::{
    config::{ModelConfig, ModelKind},
    error::{GrowthError, GrowthResult},
    model::{GrowthRule, Model, ValueKind},
    phases,
    rng::GrowthRng,
    tree::Tree,
    types::{Key, NodeId, ROOT},
};

/// Scalar shape measures of one tree.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TreeStats {
    pub segments: u32,
    /// Number of terminals (the tree's degree).
    pub terminals: u32,
    pub bifurcations: u32,
    pub total_length: f32,
    pub asymmetry: f32,
    pub max_order: u32,
    pub max_path_length: f32,
}

impl TreeStats {
    /// Measures `tree`, refreshing its stored path lengths on the way.
    pub fn of(tree: &mut Tree) -> Self {
        Self {
            segments: tree.count_segments(ROOT),
            terminals: tree.count_terminals(ROOT),
            bifurcations: tree.count_bifurcations(ROOT),
            total_length: tree.total_path_length(ROOT),
            asymmetry: tree.asymmetry_index(ROOT),
            max_order: tree.max_order(ROOT),
            max_path_length: tree.max_path_length(ROOT),
        }
    }

    /// Number of intermediate (non-terminal) segments.
    pub fn intermediates(&self) -> u32 {
        self.segments - self.terminals
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Segments = {}; Degree = {}; Asymmetry = {}; Order = {}",
            self.segments, self.terminals, self.asymmetry, self.max_order
        )?;
        write!(
            f,
            "Total Length = {}; Max Path Length = {}",
            self.total_length, self.max_path_length
        )
    }
}

/// One growing neurite.
///
/// ### Fields
/// - `tree` - Morphology grown so far.
/// - `model` - Growth rule with its parameters and per-tree state.
/// - `rng` - Random streams owned by this tree alone.
/// - `time` - Simulation time of the last completed tick.
/// - `ticks` - Number of completed ticks.
/// - `sample_interval` - Time between terminal-count samples.
/// - `terminal_history` - `(time, terminals)` samples, starting at time 0.
#[derive(Clone, Debug)]
pub struct Neuron {
    pub(crate) tree: Tree,
    model: Model,
    rng: GrowthRng,
    time: f64,
    ticks: u64,
    sample_interval: f64,
    terminal_history: Vec<(f64, u32)>,
}

impl Neuron {
    /// Builds the model described by `config` and seeds its tree with a
    /// soma and one initial neurite.
    ///
    /// ### Errors
    /// Returns [`GrowthError::Config`] if `config` does not validate.
    pub fn new(config: &ModelConfig, seed: u64) -> GrowthResult<Self> {
        let mut model = Model::new(config)?;
        let mut rng = GrowthRng::seed_from_u64(seed);
        let tree = model.seed_tree(&mut rng);
        Ok(Self {
            tree,
            model,
            rng,
            time: 0.0,
            ticks: 0,
            sample_interval: 1.0,
            terminal_history: vec![(0.0, 1)],
        })
    }

    pub fn with_sample_interval(mut self, interval: f64) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Advances the clock by `dt`, then runs one tick at the new time.
    ///
    /// The terminal count is sampled whenever the tick count is a
    /// multiple of `sample_interval / dt` (rounded).
    ///
    /// ### Errors
    /// Returns [`GrowthError::Simulation`] if `dt` is not a positive
    /// finite number; the tree is left untouched in that case.
    pub fn step(&mut self, dt: f32) -> GrowthResult<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(GrowthError::Simulation(format!(
                "dt must be > 0, got {dt}"
            )));
        }
        self.time += f64::from(dt);
        self.ticks += 1;
        phases::step(&mut self.model, &mut self.tree, self.time, dt, &mut self.rng);

        let every = (self.sample_interval / f64::from(dt)).round().max(1.0) as u64;
        if self.ticks % every == 0 {
            let terminals = self.tree.count_terminals(ROOT);
            self.terminal_history.push((self.time, terminals));
        }
        Ok(())
    }

    /// Steps with `dt` until the clock reaches `t_end`.
    ///
    /// The clock is treated as having reached `t_end` once it is within
    /// half a step of it, so accumulated rounding never adds a tick.
    ///
    /// ### Returns
    /// The number of ticks run.
    pub fn run_until(&mut self, t_end: f64, dt: f32) -> GrowthResult<u64> {
        let half = 0.5 * f64::from(dt);
        let mut ran = 0;
        while self.time + half < t_end {
            self.step(dt)?;
            ran += 1;
        }
        Ok(ran)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Value of `kind` at node `id`; 0 when the model does not define it.
    pub fn value(&self, id: NodeId, kind: ValueKind) -> f32 {
        self.model.value(&self.tree[id], kind)
    }

    /// Like [`Neuron::value`], looked up by display name. Unknown names
    /// read as 0.
    pub fn value_by_name(&self, id: NodeId, name: &str) -> f32 {
        ValueKind::from_name(name).map_or(0.0, |kind| self.value(id, kind))
    }

    /// `(key, value)` of `kind` for the soma and then each terminal.
    pub fn terminal_values(&self, kind: ValueKind) -> Vec<(Key, f32)> {
        self.tree.terminal_values(|n| self.model.value(n, kind))
    }

    pub fn stats(&mut self) -> TreeStats {
        TreeStats::of(&mut self.tree)
    }

    pub fn terminal_history(&self) -> &[(f64, u32)] {
        &self.terminal_history
    }
}
