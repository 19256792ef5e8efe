//! Descriptive statistics over flat numeric samples.

use std::fmt;

/// Arithmetic mean; 0 for an empty sample.
pub fn mean<T: Copy + Into<f64>>(values: &[T]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v.into()).sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance; 0 when there are fewer than two values.
pub fn variance<T: Copy + Into<f64>>(values: &[T]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values
        .iter()
        .map(|&v| {
            let d = v.into() - m;
            d * d
        })
        .sum();
    ss / (values.len() - 1) as f64
}

pub fn std_dev<T: Copy + Into<f64>>(values: &[T]) -> f64 {
    variance(values).sqrt()
}

/// Mean and standard deviation of one sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
}

impl Summary {
    pub fn of<T: Copy + Into<f64>>(values: &[T]) -> Self {
        Self {
            mean: mean(values),
            std: std_dev(values),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} +/- {:.4}", self.mean, self.std)
    }
}
