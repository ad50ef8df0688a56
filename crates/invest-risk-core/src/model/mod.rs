pub mod assumption;
pub mod scenario;

pub use assumption::{Assumption, BaseScenario};
pub use scenario::Scenario;
