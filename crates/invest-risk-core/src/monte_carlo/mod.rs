pub mod distribution;
pub mod simulation;
pub mod statistics;

pub use distribution::DistributionSpec;
pub use simulation::{run_monte_carlo, McInputSummary, MonteCarloConfig, MonteCarloOutput, MAX_ITERATIONS};
pub use statistics::{HistogramBin, McPercentiles, PercentileMethod};
