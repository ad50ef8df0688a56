pub mod search;
pub mod solver;

pub use search::{run_breakeven, BreakEvenConfig, BreakEvenOutput, BreakEvenResult, Difficulty, MAX_SOLVER_ITERATIONS};
pub use solver::{SolverMethod, UnreachableReason};
