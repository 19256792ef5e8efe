//! Parameter records for the growth models and the population driver.
//!
//! Defaults follow the published parameter sets for each model. Every
//! record has a `validate` method; models refuse to build from a record
//! that does not validate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GrowthError, GrowthResult};

fn ensure_finite(name: &str, value: f64) -> GrowthResult<()> {
    if !value.is_finite() {
        return Err(GrowthError::Config(format!(
            "{name} must be finite, got {value}"
        )));
    }
    Ok(())
}

fn ensure_positive(name: &str, value: f64) -> GrowthResult<()> {
    ensure_finite(name, value)?;
    if value <= 0.0 {
        return Err(GrowthError::Config(format!(
            "{name} must be > 0, got {value}"
        )));
    }
    Ok(())
}

fn ensure_non_negative(name: &str, value: f64) -> GrowthResult<()> {
    ensure_finite(name, value)?;
    if value < 0.0 {
        return Err(GrowthError::Config(format!(
            "{name} must be >= 0, got {value}"
        )));
    }
    Ok(())
}

/// Parameters shared by every growth model: elongation rates, the end
/// of the branching phase, and soma/diameter geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Mean elongation rate while branching is active (Vbr).
    pub branching_rate: f32,
    /// Mean elongation rate after branching stops (Vel).
    pub elongation_rate: f32,
    /// Coefficient of variation of per-branch elongation rates.
    pub rate_cv: f32,
    /// Time after which no more branching occurs.
    pub branching_stop: f64,
    pub soma_length: f32,
    pub soma_diameter: f32,
    pub terminal_diameter: f32,
    /// Rall exponent `e` in `d = d_term * n^(1/e)`; 0 keeps diameters fixed.
    pub branch_power: f32,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            branching_rate: 0.22,
            elongation_rate: 0.51,
            rate_cv: 0.28,
            branching_stop: 264.0,
            soma_length: 10.0,
            soma_diameter: 10.0,
            terminal_diameter: 1.0,
            branch_power: 8.0,
        }
    }
}

impl GrowthConfig {
    /// Mean elongation rate in force at time `t`.
    pub fn mean_rate(&self, t: f64) -> f32 {
        if t > self.branching_stop {
            self.elongation_rate
        } else {
            self.branching_rate
        }
    }

    /// Whether terminals may still branch at time `t`.
    pub fn branching_active(&self, t: f64) -> bool {
        t <= self.branching_stop
    }

    pub fn validate(&self) -> GrowthResult<()> {
        // Non-positive mean rates would never terminate the deviate
        // rejection loop.
        ensure_positive("branching_rate", self.branching_rate as f64)?;
        ensure_positive("elongation_rate", self.elongation_rate as f64)?;
        ensure_non_negative("rate_cv", self.rate_cv as f64)?;
        ensure_positive("branching_stop", self.branching_stop)?;
        ensure_positive("soma_length", self.soma_length as f64)?;
        ensure_positive("soma_diameter", self.soma_diameter as f64)?;
        ensure_positive("terminal_diameter", self.terminal_diameter as f64)?;
        ensure_non_negative("branch_power", self.branch_power as f64)?;
        Ok(())
    }
}

/// Parameters of the order/terminal-count branching model (BES).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BesConfig {
    /// Overall branching parameter B.
    pub b: f32,
    /// Dependence on the number of terminals, E.
    pub e: f32,
    /// Dependence on centrifugal order, S.
    pub s: f32,
    pub growth: GrowthConfig,
}

impl Default for BesConfig {
    fn default() -> Self {
        Self {
            b: 3.85,
            e: 0.74,
            s: 0.87,
            growth: GrowthConfig {
                terminal_diameter: 0.8,
                branch_power: 1.6,
                ..GrowthConfig::default()
            },
        }
    }
}

impl BesConfig {
    /// Branching rate scale `Kbr = B / Tbstop`.
    pub fn kbr(&self) -> f32 {
        self.b / self.growth.branching_stop as f32
    }

    pub fn validate(&self) -> GrowthResult<()> {
        self.growth.validate()?;
        ensure_non_negative("b", self.b as f64)?;
        ensure_finite("e", self.e as f64)?;
        ensure_finite("s", self.s as f64)?;
        Ok(())
    }
}

/// Chemistry of the branch-inducing substance, shared by both
/// diffusion/active-transport models.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Branching scale factor Kbr.
    pub kbr: f32,
    /// Diffusion constant D.
    pub diffusion: f32,
    /// Active transport rate a.
    pub transport: f32,
    /// Production rate in the soma.
    pub production: f32,
    pub soma_uptake: f32,
    pub terminal_uptake: f32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kbr: 0.01925,
            diffusion: 0.0,
            transport: 100.0,
            production: 10.0,
            soma_uptake: 9.0,
            terminal_uptake: 100.0,
        }
    }
}

impl TransportConfig {
    /// Soma concentration at which production balances uptake.
    ///
    /// Returns 0 when there is no uptake at all.
    pub fn steady_state(&self) -> f32 {
        let uptake = self.soma_uptake + self.terminal_uptake;
        if uptake > 0.0 {
            self.production / uptake
        } else {
            0.0
        }
    }

    /// Rough largest timestep for which the explicit concentration
    /// update does not overshoot: `1 / max(D, a, soma_uptake, terminal_uptake)`.
    ///
    /// `None` when every rate is zero.
    pub fn max_stable_dt(&self) -> Option<f32> {
        let fastest = self
            .diffusion
            .max(self.transport)
            .max(self.soma_uptake)
            .max(self.terminal_uptake);
        (fastest > 0.0).then(|| 1.0 / fastest)
    }

    pub fn validate(&self) -> GrowthResult<()> {
        ensure_non_negative("kbr", self.kbr as f64)?;
        ensure_non_negative("diffusion", self.diffusion as f64)?;
        ensure_non_negative("transport", self.transport as f64)?;
        ensure_non_negative("production", self.production as f64)?;
        ensure_non_negative("soma_uptake", self.soma_uptake as f64)?;
        ensure_non_negative("terminal_uptake", self.terminal_uptake as f64)?;
        Ok(())
    }
}

/// Parameters of the section-level diffusion + active transport model (AD).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdConfig {
    pub transport: TransportConfig,
    /// Length of the fixed sampling volume at the end of each section (dL).
    pub sampling_length: f32,
    /// Length of new branches; shorter sections do not exchange chemical.
    pub min_length: f32,
    pub growth: GrowthConfig,
}

impl Default for AdConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            sampling_length: 1.0,
            min_length: 5.0,
            growth: GrowthConfig::default(),
        }
    }
}

impl AdConfig {
    pub fn validate(&self) -> GrowthResult<()> {
        self.growth.validate()?;
        self.transport.validate()?;
        ensure_positive("sampling_length", self.sampling_length as f64)?;
        ensure_positive("min_length", self.min_length as f64)?;
        if self.growth.soma_length < self.sampling_length {
            return Err(GrowthError::Config(format!(
                "soma_length ({}) must be >= sampling_length ({})",
                self.growth.soma_length, self.sampling_length
            )));
        }
        Ok(())
    }
}

/// Parameters of the compartmental growth-cone model (ADcm).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcmConfig {
    pub transport: TransportConfig,
    /// Length of one compartment (dL).
    pub compartment_length: f32,
    /// Length of the growth cone at each tip.
    pub growth_cone_length: f32,
    pub growth: GrowthConfig,
}

impl Default for AdcmConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            compartment_length: 1.0,
            growth_cone_length: 1.0,
            growth: GrowthConfig::default(),
        }
    }
}

impl AdcmConfig {
    pub fn validate(&self) -> GrowthResult<()> {
        self.growth.validate()?;
        self.transport.validate()?;
        ensure_positive("compartment_length", self.compartment_length as f64)?;
        ensure_positive("growth_cone_length", self.growth_cone_length as f64)?;
        Ok(())
    }
}

/// Names the growth model variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Bes,
    Ad,
    Adcm,
}

impl FromStr for ModelKind {
    type Err = GrowthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bes" => Ok(ModelKind::Bes),
            "ad" => Ok(ModelKind::Ad),
            "adcm" => Ok(ModelKind::Adcm),
            _ => Err(GrowthError::UnknownModel(s.to_string())),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Bes => "bes",
            ModelKind::Ad => "ad",
            ModelKind::Adcm => "adcm",
        };
        f.write_str(name)
    }
}

/// Configuration of one growth model, tagged by variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum ModelConfig {
    Bes(BesConfig),
    Ad(AdConfig),
    Adcm(AdcmConfig),
}

impl ModelConfig {
    /// Default parameter set for the given variant.
    pub fn default_for(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Bes => ModelConfig::Bes(BesConfig::default()),
            ModelKind::Ad => ModelConfig::Ad(AdConfig::default()),
            ModelKind::Adcm => ModelConfig::Adcm(AdcmConfig::default()),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ModelConfig::Bes(_) => ModelKind::Bes,
            ModelConfig::Ad(_) => ModelKind::Ad,
            ModelConfig::Adcm(_) => ModelKind::Adcm,
        }
    }

    pub fn growth(&self) -> &GrowthConfig {
        match self {
            ModelConfig::Bes(c) => &c.growth,
            ModelConfig::Ad(c) => &c.growth,
            ModelConfig::Adcm(c) => &c.growth,
        }
    }

    pub fn growth_mut(&mut self) -> &mut GrowthConfig {
        match self {
            ModelConfig::Bes(c) => &mut c.growth,
            ModelConfig::Ad(c) => &mut c.growth,
            ModelConfig::Adcm(c) => &mut c.growth,
        }
    }

    /// Chemistry of the transport models; `None` for BES.
    pub fn transport(&self) -> Option<&TransportConfig> {
        match self {
            ModelConfig::Bes(_) => None,
            ModelConfig::Ad(c) => Some(&c.transport),
            ModelConfig::Adcm(c) => Some(&c.transport),
        }
    }

    pub fn validate(&self) -> GrowthResult<()> {
        match self {
            ModelConfig::Bes(c) => c.validate(),
            ModelConfig::Ad(c) => c.validate(),
            ModelConfig::Adcm(c) => c.validate(),
        }
    }
}

/// Settings for growing a population of trees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Number of independently grown trees.
    pub trees: usize,
    pub dt: f32,
    /// Simulation end time.
    pub t_stop: f64,
    /// Time between terminal-count samples.
    pub sample_interval: f64,
    /// Tree `i` is seeded with `seed + i`.
    pub seed: u64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            trees: 1,
            dt: 1.0,
            t_stop: 200.0,
            sample_interval: 1.0,
            seed: 0,
        }
    }
}

impl PopulationConfig {
    pub fn validate(&self) -> GrowthResult<()> {
        if self.trees == 0 {
            return Err(GrowthError::Simulation(
                "population needs at least one tree".to_string(),
            ));
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(GrowthError::Simulation(format!(
                "dt must be > 0, got {}",
                self.dt
            )));
        }
        ensure_non_negative("t_stop", self.t_stop)?;
        ensure_positive("sample_interval", self.sample_interval)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        for kind in [ModelKind::Bes, ModelKind::Ad, ModelKind::Adcm] {
            assert!(ModelConfig::default_for(kind).validate().is_ok());
        }
        assert!(PopulationConfig::default().validate().is_ok());
    }

    #[test]
    fn non_positive_mean_rate_is_rejected() {
        let mut cfg = BesConfig::default();
        cfg.growth.branching_rate = 0.0;
        assert!(matches!(cfg.validate(), Err(GrowthError::Config(_))));

        let mut cfg = AdConfig::default();
        cfg.growth.elongation_rate = -0.5;
        assert!(matches!(cfg.validate(), Err(GrowthError::Config(_))));
    }

    #[test]
    fn soma_shorter_than_sampling_length_is_rejected() {
        let mut cfg = AdConfig::default();
        cfg.growth.soma_length = 0.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn model_kind_parses_case_insensitively() {
        assert_eq!("BES".parse::<ModelKind>(), Ok(ModelKind::Bes));
        assert_eq!(" ad ".parse::<ModelKind>(), Ok(ModelKind::Ad));
        assert_eq!("ADcm".parse::<ModelKind>(), Ok(ModelKind::Adcm));
    }

    #[test]
    fn unknown_model_name_is_an_error() {
        let err = "tree".parse::<ModelKind>().unwrap_err();
        assert_eq!(err, GrowthError::UnknownModel("tree".to_string()));
    }

    #[test]
    fn bes_kbr_scales_with_branching_stop() {
        let cfg = BesConfig::default();
        assert!((cfg.kbr() - 3.85 / 264.0).abs() < 1e-7);
    }

    #[test]
    fn steady_state_without_uptake_is_zero() {
        let cfg = TransportConfig {
            production: 0.0,
            soma_uptake: 0.0,
            terminal_uptake: 0.0,
            ..TransportConfig::default()
        };
        assert_eq!(cfg.steady_state(), 0.0);
        assert!((TransportConfig::default().steady_state() - 10.0 / 109.0).abs() < 1e-7);
    }

    #[test]
    fn stable_dt_is_set_by_the_fastest_rate() {
        assert_eq!(TransportConfig::default().max_stable_dt(), Some(0.01));
        let still = TransportConfig {
            diffusion: 0.0,
            transport: 0.0,
            soma_uptake: 0.0,
            terminal_uptake: 0.0,
            ..TransportConfig::default()
        };
        assert_eq!(still.max_stable_dt(), None);
        assert!(ModelConfig::default_for(ModelKind::Bes).transport().is_none());
    }

    #[test]
    fn mean_rate_switches_after_branching_stop() {
        let g = GrowthConfig::default();
        assert_eq!(g.mean_rate(264.0), g.branching_rate);
        assert_eq!(g.mean_rate(265.0), g.elongation_rate);
        assert!(g.branching_active(264.0));
        assert!(!g.branching_active(264.5));
    }

    #[test]
    fn model_config_deserializes_with_partial_fields() {
        let json = r#"{ "model": "ad", "min_length": 2.5 }"#;
        let cfg: ModelConfig = serde_json::from_str(json).unwrap();
        match cfg {
            ModelConfig::Ad(ad) => {
                assert_eq!(ad.min_length, 2.5);
                assert_eq!(ad.sampling_length, 1.0);
                assert_eq!(ad.transport, TransportConfig::default());
            }
            other => panic!("expected AD config, got {other:?}"),
        }
    }
}
