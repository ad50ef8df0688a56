use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, is_grid, is_report, result_of, scalar_columns, ROW_KEYS, SECTION_KEYS};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match result_of(value) {
        Value::Object(result) if is_report(result) => print_report(result),
        Value::Object(result) => print_result(result),
        Value::Array(rows) => print_rows(rows),
        other => println!("{}", other),
    }
    if let Value::Object(envelope) = value {
        print_notes(envelope);
    }
}

fn print_report(report: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for key in ["metric_name", "base_metric", "base_metric_error"] {
        if let Some(v) = report.get(key) {
            builder.push_record([key, &cell(v, "-")]);
        }
    }
    println!("{}", Table::from(builder));

    for section in SECTION_KEYS {
        let Some(Value::Object(outcome)) = report.get(section) else {
            continue;
        };
        let status = outcome.get("status").map(|s| cell(s, "")).unwrap_or_default();
        println!("\n== {} ({}) ==", section, status);
        match (outcome.get("output"), outcome.get("error")) {
            (Some(output), _) => match result_of(output) {
                Value::Object(result) => print_result(result),
                other => println!("{}", other),
            },
            (None, Some(error)) => println!("{}", cell(error, "")),
            _ => {}
        }
    }
}

fn print_result(result: &Map<String, Value>) {
    if is_grid(result) {
        print_grid(result);
    }

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in result {
        if !val.is_array() && !val.is_object() {
            builder.push_record([key.as_str(), &cell(val, "-")]);
        }
    }
    println!("{}", Table::from(builder));

    if let Some(Value::Object(percentiles)) = result.get("percentiles") {
        let mut builder = Builder::default();
        builder.push_record(percentiles.keys().map(String::as_str));
        builder.push_record(percentiles.values().map(|v| cell(v, "-")));
        println!("\nPercentiles:\n{}", Table::from(builder));
    }

    for key in ROW_KEYS {
        if let Some(Value::Array(rows)) = result.get(key) {
            if !rows.is_empty() {
                println!("\n{}:", key);
                print_rows(rows);
            }
        }
    }
}

/// Heat map as a matrix: var1 values down, var2 values across.
fn print_grid(result: &Map<String, Value>) {
    let (Some(Value::Array(rows)), Some(Value::Array(cols)), Some(Value::Array(grid))) = (
        result.get("var1_values"),
        result.get("var2_values"),
        result.get("metric_grid"),
    ) else {
        return;
    };
    let corner = format!(
        "{} \\ {}",
        result.get("var1_name").map(|v| cell(v, "")).unwrap_or_default(),
        result.get("var2_name").map(|v| cell(v, "")).unwrap_or_default()
    );

    let mut builder = Builder::default();
    builder.push_record(std::iter::once(corner).chain(cols.iter().map(|c| cell(c, "-"))));
    for (row_value, row) in rows.iter().zip(grid) {
        let cells = row.as_array().map(|r| r.as_slice()).unwrap_or_default();
        builder.push_record(
            std::iter::once(cell(row_value, "-")).chain(cells.iter().map(|c| cell(c, "n/a"))),
        );
    }
    println!("{}\n", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let columns = scalar_columns(rows);
    if columns.is_empty() {
        for item in rows {
            println!("{}", cell(item, "-"));
        }
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(&columns);
    for item in rows {
        if let Value::Object(map) = item {
            builder.push_record(
                columns
                    .iter()
                    .map(|c| map.get(c.as_str()).map(|v| cell(v, "-")).unwrap_or_default()),
            );
        }
    }
    println!("{}", Table::from(builder));
}

fn print_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
