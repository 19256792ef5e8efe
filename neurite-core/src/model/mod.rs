//! Growth rules.
//!
//! Each variant implements the same four-phase contract,
//! [`GrowthRule`], called once per tick in the order
//! `branch -> elongate -> rescale_diameters -> commit`
//! (see [`crate::phases::step`]).

pub mod ad;
pub mod adcm;
pub mod bes;

use crate::{
    config::{GrowthConfig, ModelConfig, ModelKind},
    error::GrowthResult,
    phases,
    rng::GrowthRng,
    tree::{Tree, TreeNode},
};

pub use ad::AdModel;
pub use adcm::AdcmModel;
pub use bes::BesModel;

/// Per-node quantities the display layer can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Concentration,
    PreviousConcentration,
    PathLength,
    /// Length added to a growth cone in its latest elongation.
    PendingElongation,
}

impl ValueKind {
    pub const ALL: [ValueKind; 4] = [
        ValueKind::Concentration,
        ValueKind::PreviousConcentration,
        ValueKind::PathLength,
        ValueKind::PendingElongation,
    ];

    /// Looks a kind up by its display name.
    ///
    /// The short parameter names of the published models (`Cbr`, `Cbrp`,
    /// `pathlength`, `deltL`) are accepted as aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "concentration" | "Cbr" => Some(ValueKind::Concentration),
            "previousConcentration" | "Cbrp" => Some(ValueKind::PreviousConcentration),
            "pathLength" | "pathlength" => Some(ValueKind::PathLength),
            "pendingElongation" | "deltL" => Some(ValueKind::PendingElongation),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Concentration => "concentration",
            ValueKind::PreviousConcentration => "previousConcentration",
            ValueKind::PathLength => "pathLength",
            ValueKind::PendingElongation => "pendingElongation",
        }
    }
}

/// The four-phase growth contract shared by every model variant.
pub trait GrowthRule {
    fn growth(&self) -> &GrowthConfig;

    /// Builds the soma with its single initial neurite.
    fn seed_tree(&mut self, rng: &mut GrowthRng) -> Tree;

    /// Updates concentrations and turns some terminals into bifurcations.
    fn branch(&mut self, tree: &mut Tree, t: f64, dt: f32, rng: &mut GrowthRng);

    /// Lengthens growth-active nodes.
    fn elongate(&mut self, tree: &mut Tree, t: f64, dt: f32);

    fn rescale_diameters(&mut self, tree: &mut Tree, _t: f64) {
        phases::rescale_diameters(tree, self.growth());
    }

    /// Freezes this tick's concentrations for the next tick to read.
    fn commit(&mut self, tree: &mut Tree, _t: f64) {
        phases::commit_concentrations(tree);
    }

    /// Whether this variant defines `kind`.
    fn supports(&self, kind: ValueKind) -> bool;

    /// Value of `kind` at `node`, or 0 for kinds the variant does not define.
    fn value(&self, node: &TreeNode, kind: ValueKind) -> f32 {
        if !self.supports(kind) {
            return 0.0;
        }
        match kind {
            ValueKind::Concentration => node.conc,
            ValueKind::PreviousConcentration => node.conc_prev,
            ValueKind::PathLength => node.pathlength,
            ValueKind::PendingElongation => node.delta_l,
        }
    }
}

/// A growth model of any variant.
#[derive(Clone, Debug)]
pub enum Model {
    Bes(BesModel),
    Ad(AdModel),
    Adcm(AdcmModel),
}

impl Model {
    /// Builds the model described by `config`.
    ///
    /// ### Errors
    /// Returns [`crate::error::GrowthError::Config`] if the parameters do
    /// not validate.
    pub fn new(config: &ModelConfig) -> GrowthResult<Self> {
        config.validate()?;
        Ok(match config {
            ModelConfig::Bes(c) => Model::Bes(BesModel::new(*c)),
            ModelConfig::Ad(c) => Model::Ad(AdModel::new(*c)),
            ModelConfig::Adcm(c) => Model::Adcm(AdcmModel::new(*c)),
        })
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Model::Bes(_) => ModelKind::Bes,
            Model::Ad(_) => ModelKind::Ad,
            Model::Adcm(_) => ModelKind::Adcm,
        }
    }

    fn rule(&self) -> &dyn GrowthRule {
        match self {
            Model::Bes(m) => m,
            Model::Ad(m) => m,
            Model::Adcm(m) => m,
        }
    }

    fn rule_mut(&mut self) -> &mut dyn GrowthRule {
        match self {
            Model::Bes(m) => m,
            Model::Ad(m) => m,
            Model::Adcm(m) => m,
        }
    }
}

impl GrowthRule for Model {
    fn growth(&self) -> &GrowthConfig {
        self.rule().growth()
    }

    fn seed_tree(&mut self, rng: &mut GrowthRng) -> Tree {
        self.rule_mut().seed_tree(rng)
    }

    fn branch(&mut self, tree: &mut Tree, t: f64, dt: f32, rng: &mut GrowthRng) {
        self.rule_mut().branch(tree, t, dt, rng)
    }

    fn elongate(&mut self, tree: &mut Tree, t: f64, dt: f32) {
        self.rule_mut().elongate(tree, t, dt)
    }

    fn rescale_diameters(&mut self, tree: &mut Tree, t: f64) {
        self.rule_mut().rescale_diameters(tree, t)
    }

    fn commit(&mut self, tree: &mut Tree, t: f64) {
        self.rule_mut().commit(tree, t)
    }

    fn supports(&self, kind: ValueKind) -> bool {
        self.rule().supports(kind)
    }

    fn value(&self, node: &TreeNode, kind: ValueKind) -> f32 {
        self.rule().value(node, kind)
    }
}
