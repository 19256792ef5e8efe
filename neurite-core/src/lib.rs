//! Core neurite growth simulation library.
//!
//! Main components:
//! - [`tree`] - binary morphology tree and its traversal statistics.
//! - [`model`] - the BES, AD and ADcm growth rules behind one contract.
//! - [`phases`] - the per-tick phase pipeline shared by every rule.
//! - [`neuron`] - a single tree with its own clock and random streams.
//! - [`population`] - many trees grown in parallel, plus pooled statistics.
//! - [`stats`] - mean / variance / standard deviation helpers.
//! - [`layout`] - 2-D placement of a tree for drawing.
//! - [`config`] - parameter records with defaults and validation.
//! - [`rng`] - per-tree seeded random streams.
//! - [`error`] - the crate error type.
//! - [`types`] - shared type aliases and IDs.

pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod neuron;
pub mod phases;
pub mod population;
pub mod rng;
pub mod stats;
pub mod tree;
pub mod types;

pub use config::{ModelConfig, ModelKind, PopulationConfig};
pub use error::{GrowthError, GrowthResult};
pub use model::{GrowthRule, Model, ValueKind};
pub use neuron::{Neuron, TreeStats};
pub use population::{Population, PopulationStats};
