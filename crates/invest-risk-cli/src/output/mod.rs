pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Result fields holding one row per variable, scenario or bin, in the
/// order they are preferred for row-oriented output.
pub(crate) const ROW_KEYS: [&str; 6] = [
    "entries",
    "results",
    "input_summaries",
    "histogram",
    "failed_variables",
    "failures",
];

/// Sections of a combined report, in run order.
pub(crate) const SECTION_KEYS: [&str; 5] = ["tornado", "heatmap", "monte_carlo", "scenarios", "breakeven"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` object inside a computation envelope, or the value itself.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// True for a heat map result.
pub(crate) fn is_grid(map: &Map<String, Value>) -> bool {
    map.contains_key("metric_grid")
}

/// True for a combined analysis report.
pub(crate) fn is_report(map: &Map<String, Value>) -> bool {
    SECTION_KEYS.iter().any(|k| map.contains_key(*k))
}

/// Render a scalar for a cell; nested values become compact JSON.
pub(crate) fn cell(value: &Value, null: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => null.to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Column names for rows of objects: the scalar fields of the first row.
pub(crate) fn scalar_columns(rows: &[Value]) -> Vec<String> {
    match rows.first() {
        Some(Value::Object(first)) => first
            .iter()
            .filter(|(_, v)| !v.is_array() && !v.is_object())
            .map(|(k, _)| k.clone())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_of_envelope() {
        let v = json!({"result": {"mean": 1.0}, "warnings": []});
        assert_eq!(result_of(&v), &json!({"mean": 1.0}));
        let bare = json!([1, 2]);
        assert_eq!(result_of(&bare), &bare);
    }

    #[test]
    fn test_report_detection() {
        let report = json!({"metric_name": "noi", "tornado": {"status": "completed"}});
        let single = json!({"metric_name": "noi", "entries": []});
        assert!(is_report(report.as_object().unwrap()));
        assert!(!is_report(single.as_object().unwrap()));
    }

    #[test]
    fn test_scalar_columns_skip_nested() {
        let rows = vec![json!({"name": "rent", "swing": 4560.0, "points": [1, 2]})];
        assert_eq!(scalar_columns(&rows), vec!["name".to_string(), "swing".to_string()]);
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell(&json!(null), "-"), "-");
        assert_eq!(cell(&json!("Boom"), "-"), "Boom");
        assert_eq!(cell(&json!([0, 1]), "-"), "[0,1]");
    }
}
