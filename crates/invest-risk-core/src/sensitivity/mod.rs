pub mod heatmap;
pub mod range;
pub mod tornado;

pub use heatmap::{run_heatmap, HeatMapConfig, HeatMapOutput};
pub use range::{SensitivityRange, SensitivityVariable, MAX_RANGE_POINTS};
pub use tornado::{run_tornado, SensitivityPoint, TornadoConfig, TornadoEntry, TornadoOutput};
