//! Tally Statistics Plugin
//!
//! Descriptive statistics over decimal samples: central tendency,
//! dispersion and distribution shape. Degenerate samples (empty, too short,
//! zero spread) yield 0 rather than an error.
//!
//! Each statistic is available three ways: a typed function over `f64`
//! samples, a `calculate_*` function over `Number`s, and a plugin.

mod helpers;
mod central;
mod dispersion;
mod shape;

pub use central::{calculate_geometric_mean, calculate_mean, geometric_mean, mean};
pub use dispersion::{
    calculate_coefficient_of_variation, calculate_mean_absolute_deviation,
    calculate_sample_std_dev, calculate_sample_variance, coefficient_of_variation,
    mean_absolute_deviation, sample_std_dev, sample_variance,
};
pub use shape::{calculate_excess_kurtosis, calculate_sample_skewness, excess_kurtosis, sample_skewness};

use tally_plugin::PluginRegistry;

/// Load statistics functions into registry
pub fn load_stats_library(registry: PluginRegistry) -> PluginRegistry {
    registry
        // Central tendency
        .with_function(central::Mean)
        .with_function(central::GeometricMean)

        // Dispersion
        .with_function(dispersion::Variance)
        .with_function(dispersion::Stddev)
        .with_function(dispersion::Mad)
        .with_function(dispersion::Cv)

        // Shape
        .with_function(shape::Skewness)
        .with_function(shape::Kurtosis)
}
