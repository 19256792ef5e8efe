use std::fmt;

use neurite_core::{
    GrowthResult, ModelConfig, ModelKind, Population, PopulationConfig, PopulationStats,
    ValueKind,
    layout::{self, LayoutParams},
};
use tracing::info;

/// Everything one invocation of the runner needs.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub model: ModelKind,
    pub population: PopulationConfig,
    pub branching_stop: Option<f64>,
    pub print_tree: bool,
    pub time_course: bool,
    pub layout: bool,
    pub values: Option<String>,
}

/// Grows the population described by `options` to its end time and
/// renders the requested report.
pub fn run(options: &RunOptions) -> GrowthResult<String> {
    let mut model = ModelConfig::default_for(options.model);
    if let Some(stop) = options.branching_stop {
        model.growth_mut().branching_stop = stop;
    }

    let mut population = Population::new(model, options.population)?;
    let stats = population.run()?;
    info!(
        trees = stats.trees.len(),
        terminals = stats.orders.len(),
        "run complete"
    );

    let report = Report {
        options,
        population: &population,
        stats: &stats,
    };
    Ok(report.to_string())
}

/// A finished population rendered as requested by `options`.
struct Report<'a> {
    options: &'a RunOptions,
    population: &'a Population,
    stats: &'a PopulationStats,
}

impl Report<'_> {
    fn fmt_values(&self, f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
        let first = &self.population.neurons()[0];
        let values = match ValueKind::from_name(name) {
            Some(kind) => first.terminal_values(kind),
            // Unknown names read as zeros, like any unsupported value.
            None => {
                writeln!(f, "(unknown value {name:?})")?;
                first.tree().terminal_values(|_| 0.0)
            }
        };
        for (key, value) in values {
            writeln!(f, "{key} {value}")?;
        }
        Ok(())
    }

    fn fmt_layout(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = &self.population.neurons()[0];
        let placed = layout::layout(first.tree(), &LayoutParams::default());
        if let Some((lo, hi)) = layout::bounds(&placed) {
            writeln!(f, "Bounds: {:.3} {:.3} {:.3} {:.3}", lo.x, lo.y, hi.x, hi.y)?;
        }
        for seg in placed {
            writeln!(
                f,
                "{} {:.3} {:.3} {:.3} {:.3} {:.3}",
                seg.id, seg.start.x, seg.start.y, seg.end.x, seg.end.y, seg.diameter
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = self.options;
        writeln!(f, "Model: {}", options.model)?;
        writeln!(f, "{}", self.stats)?;

        if options.print_tree {
            write!(f, "{}", self.population.neurons()[0].tree())?;
        }
        if let Some(name) = &options.values {
            self.fmt_values(f, name)?;
        }
        if options.time_course {
            for (t, count) in self.population.mean_terminal_history() {
                writeln!(f, "{t} {count}")?;
            }
        }
        if options.layout {
            self.fmt_layout(f)?;
        }
        Ok(())
    }
}
