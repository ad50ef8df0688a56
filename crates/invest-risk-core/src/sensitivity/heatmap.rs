use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::InvestRiskError;
use crate::evaluator::{base_metric_or_warn, evaluate_checked, EvalError, Evaluator};
use crate::model::BaseScenario;
use crate::parallel::ordered_map;
use crate::sensitivity::range::{ResolvedAxis, SensitivityVariable};
use crate::types::*;
use crate::InvestRiskResult;

/// Upper bound on `rows * cols`; both axes may sit under the per-axis cap
/// and still multiply out to far more cells than is useful.
pub const MAX_HEATMAP_CELLS: usize = 1_000_000;

/// Input for 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatMapConfig {
    /// Rows of the grid
    pub var1: SensitivityVariable,
    /// Columns of the grid
    pub var2: SensitivityVariable,
}

impl HeatMapConfig {
    pub fn validate(&self, base: &BaseScenario) -> InvestRiskResult<()> {
        self.resolve(base).map(|_| ())
    }

    fn resolve(&self, base: &BaseScenario) -> InvestRiskResult<(ResolvedAxis, ResolvedAxis)> {
        if self.var1.name == self.var2.name {
            return Err(InvestRiskError::invalid(
                "heatmap",
                format!("Both axes vary '{}'; choose two different variables", self.var1.name),
            ));
        }
        let rows = self.var1.resolve(base)?;
        let cols = self.var2.resolve(base)?;
        let cells = rows.values.len().saturating_mul(cols.values.len());
        if cells > MAX_HEATMAP_CELLS {
            return Err(InvestRiskError::invalid(
                "heatmap",
                format!(
                    "Grid of {} x {} = {cells} cells exceeds the limit of {MAX_HEATMAP_CELLS}",
                    rows.values.len(),
                    cols.values.len()
                ),
            ));
        }
        Ok((rows, cols))
    }
}

/// Output of 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatMapOutput {
    pub metric_name: String,
    pub var1_name: String,
    pub var2_name: String,
    pub var1_values: Vec<f64>,
    pub var2_values: Vec<f64>,
    /// grid[i][j] = metric at (var1_values[i], var2_values[j]); `None` if
    /// the evaluator failed for that cell.
    pub metric_grid: Vec<Vec<Option<f64>>>,
    /// `None` when the base case itself failed; see `warnings`.
    pub base_metric: Option<f64>,
    /// (row, col) of the cell where both axes sit at their base values.
    pub base_case_position: Option<(usize, usize)>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
    pub failed_cells: usize,
    /// Evaluator calls made for the grid (`rows * cols`).
    pub evaluations: usize,
}

/// Evaluate the metric over the full grid of two variables.
///
/// Costs `len(var1) * len(var2)` evaluator calls; cells are independent and
/// are evaluated in parallel when the `parallel` feature is on.
pub fn run_heatmap<E>(
    base: &BaseScenario,
    evaluator: &E,
    config: &HeatMapConfig,
) -> InvestRiskResult<ComputationOutput<HeatMapOutput>>
where
    E: Evaluator + ?Sized,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (rows, cols) = config.resolve(base)?;
    let base_metric = base_metric_or_warn(evaluator, base, &mut warnings);

    let n_rows = rows.values.len();
    let n_cols = cols.values.len();
    tracing::debug!(rows = n_rows, cols = n_cols, "running heat map");

    // Scenarios are built per cell inside the mapper so only the flat index
    // list is held for the whole grid.
    let cells: Vec<usize> = (0..n_rows * n_cols).collect();
    let results = ordered_map(&cells, |&idx| -> Result<f64, EvalError> {
        let (v1, v2) = (rows.values[idx / n_cols], cols.values[idx % n_cols]);
        match base_metric {
            Some(m) if v1 == rows.base_value && v2 == cols.base_value => Ok(m),
            _ => {
                let mut scenario = base
                    .with_override(&rows.name, v1)
                    .map_err(|e| EvalError::Failed(e.to_string()))?;
                scenario.set(&cols.name, v2);
                evaluate_checked(evaluator, &scenario)
            }
        }
    });

    let mut metric_grid = vec![vec![None; n_cols]; n_rows];
    let mut failed_cells = 0usize;
    let mut first_error: Option<String> = None;
    let mut sum = 0.0_f64;
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;

    for (idx, result) in results.into_iter().enumerate() {
        let (i, j) = (idx / n_cols, idx % n_cols);
        match result {
            Ok(m) => {
                metric_grid[i][j] = Some(m);
                sum += m;
                min = Some(min.map_or(m, |x: f64| x.min(m)));
                max = Some(max.map_or(m, |x: f64| x.max(m)));
            }
            Err(e) => {
                failed_cells += 1;
                first_error.get_or_insert_with(|| {
                    format!("({}, {}): {e}", rows.values[i], cols.values[j])
                });
            }
        }
    }

    let total = n_rows * n_cols;
    if failed_cells == total {
        return Err(InvestRiskError::InsufficientData(format!(
            "All {total} heat map cells failed to evaluate"
        )));
    }
    if failed_cells > 0 {
        tracing::warn!(failed_cells, total, "heat map cells failed");
        warnings.push(format!(
            "{failed_cells} of {total} cells failed to evaluate; first failure at {}",
            first_error.unwrap_or_default()
        ));
    }

    let base_row = rows.values.iter().position(|&v| v == rows.base_value);
    let base_col = cols.values.iter().position(|&v| v == cols.base_value);
    let base_case_position = base_row.zip(base_col);

    let successful = total - failed_cells;
    let output = HeatMapOutput {
        metric_name: evaluator.metric_name().to_string(),
        var1_name: rows.name.clone(),
        var2_name: cols.name.clone(),
        var1_values: rows.values,
        var2_values: cols.values,
        metric_grid,
        base_metric,
        base_case_position,
        min,
        max,
        average: Some(sum / successful as f64),
        failed_cells,
        evaluations: total,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-Way Sensitivity (Heat Map)",
        &serde_json::json!({
            "var1": output.var1_name,
            "var2": output.var2_name,
            "rows": n_rows,
            "cols": n_cols,
        }),
        warnings,
        elapsed,
        output,
    ))
}
