pub mod config;
pub mod report;
pub mod runner;

pub use config::AnalysisConfig;
pub use report::{AnalysisReport, SectionOutcome};
pub use runner::run_analysis;
