//! Bracketed one-dimensional root finding.
//!
//! Both methods keep the root inside `[lo, hi]` at every step, so they
//! terminate within `max_iterations` and never report a root outside the
//! search bounds.

use serde::{Deserialize, Serialize};

use crate::evaluator::EvalError;

/// Root-finding method for break-even searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMethod {
    /// Halve the bracket each step.
    #[default]
    Bisection,
    /// Regula falsi with the Illinois modification.
    Secant,
}

/// Why a search ended without a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableReason {
    /// The metric does not cross the target between the bounds.
    NotBracketed,
    IterationBudgetExhausted,
    /// The bracket shrank to adjacent floats without meeting the tolerance,
    /// i.e. the metric jumps across the target.
    NoConvergence,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Solve {
    Converged { x: f64, fx: f64, iterations: u32 },
    Unreachable { reason: UnreachableReason, iterations: u32 },
}

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Lo,
    Hi,
}

/// Find `x` in `[lo, hi]` with `|f(x)| <= tolerance`.
///
/// Endpoint evaluations do not count toward the iteration budget.
pub(crate) fn solve<F>(
    mut f: F,
    mut lo: f64,
    mut hi: f64,
    tolerance: f64,
    max_iterations: u32,
    method: SolverMethod,
) -> Result<Solve, EvalError>
where
    F: FnMut(f64) -> Result<f64, EvalError>,
{
    let mut f_lo = f(lo)?;
    if f_lo.abs() <= tolerance {
        return Ok(Solve::Converged { x: lo, fx: f_lo, iterations: 0 });
    }
    let mut f_hi = f(hi)?;
    if f_hi.abs() <= tolerance {
        return Ok(Solve::Converged { x: hi, fx: f_hi, iterations: 0 });
    }

    if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
        return Ok(Solve::Unreachable {
            reason: UnreachableReason::NotBracketed,
            iterations: 0,
        });
    }

    let mut last_side: Option<Side> = None;

    for iter in 1..=max_iterations {
        let mid = lo + (hi - lo) / 2.0;
        if mid <= lo || mid >= hi {
            return Ok(Solve::Unreachable {
                reason: UnreachableReason::NoConvergence,
                iterations: iter - 1,
            });
        }

        let x = match method {
            SolverMethod::Bisection => mid,
            SolverMethod::Secant => {
                let candidate = (lo * f_hi - hi * f_lo) / (f_hi - f_lo);
                if candidate.is_finite() && candidate > lo && candidate < hi {
                    candidate
                } else {
                    mid
                }
            }
        };

        let fx = f(x)?;
        if fx.abs() <= tolerance {
            return Ok(Solve::Converged { x, fx, iterations: iter });
        }

        if fx.is_sign_negative() == f_lo.is_sign_negative() {
            lo = x;
            f_lo = fx;
            if method == SolverMethod::Secant && last_side == Some(Side::Lo) {
                f_hi /= 2.0;
            }
            last_side = Some(Side::Lo);
        } else {
            hi = x;
            f_hi = fx;
            if method == SolverMethod::Secant && last_side == Some(Side::Hi) {
                f_lo /= 2.0;
            }
            last_side = Some(Side::Hi);
        }
    }

    Ok(Solve::Unreachable {
        reason: UnreachableReason::IterationBudgetExhausted,
        iterations: max_iterations,
    })
}
