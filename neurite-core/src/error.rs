use thiserror::Error;

/// Root error type for neurite growth failures.
///
/// All of these are raised while building a model or a population; a
/// running simulation never fails mid-tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrowthError {
    /// A parameter is outside the range the model can work with.
    #[error("config error: {0}")]
    Config(String),

    /// The requested growth model variant does not exist.
    #[error("unknown growth model: {0:?} (expected one of: bes, ad, adcm)")]
    UnknownModel(String),

    /// The driver asked for something the simulation cannot do.
    #[error("simulation error: {0}")]
    Simulation(String),
}

pub type GrowthResult<T> = Result<T, GrowthError>;
