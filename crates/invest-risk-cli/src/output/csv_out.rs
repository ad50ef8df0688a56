use serde_json::{Map, Value};
use std::io;

use super::{cell, is_grid, is_report, result_of, scalar_columns, ROW_KEYS};

type Out<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Row-shaped results (tornado entries, scenario and break-even results)
/// become one record per row; a heat map becomes a matrix; anything else
/// is written as field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match result_of(value) {
        Value::Object(result) if is_report(result) => write_report(&mut wtr, result),
        Value::Object(result) if is_grid(result) => write_grid(&mut wtr, result),
        Value::Object(result) => match ROW_KEYS.iter().find_map(|k| non_empty_rows(result, k)) {
            Some(rows) => write_rows(&mut wtr, rows),
            None => write_fields(&mut wtr, result),
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        other => wtr.write_record([cell(other, "")]),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("CSV output error: {}", e);
    }
}

fn non_empty_rows<'v>(result: &'v Map<String, Value>, key: &str) -> Option<&'v [Value]> {
    match result.get(key) {
        Some(Value::Array(rows)) if !rows.is_empty() => Some(rows),
        _ => None,
    }
}

fn write_fields(wtr: &mut Out<'_>, map: &Map<String, Value>) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &cell(val, "")])?;
    }
    Ok(())
}

fn write_rows(wtr: &mut Out<'_>, rows: &[Value]) -> csv::Result<()> {
    let columns = scalar_columns(rows);
    if columns.is_empty() {
        for item in rows {
            wtr.write_record([cell(item, "")])?;
        }
        return Ok(());
    }
    wtr.write_record(&columns)?;
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = columns
                .iter()
                .map(|c| map.get(c.as_str()).map(|v| cell(v, "")).unwrap_or_default())
                .collect();
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}

fn write_grid(wtr: &mut Out<'_>, result: &Map<String, Value>) -> csv::Result<()> {
    let empty = Vec::new();
    let array = |key: &str| result.get(key).and_then(Value::as_array).unwrap_or(&empty);
    let header = std::iter::once(
        result.get("var1_name").map(|v| cell(v, "")).unwrap_or_default(),
    )
    .chain(array("var2_values").iter().map(|v| cell(v, "")));
    wtr.write_record(header.collect::<Vec<_>>())?;
    for (row_value, row) in array("var1_values").iter().zip(array("metric_grid")) {
        let cells = row.as_array().unwrap_or(&empty);
        let record = std::iter::once(cell(row_value, "")).chain(cells.iter().map(|c| cell(c, "")));
        wtr.write_record(record.collect::<Vec<_>>())?;
    }
    Ok(())
}

/// One record per section: `section,status,headline`.
fn write_report(wtr: &mut Out<'_>, report: &Map<String, Value>) -> csv::Result<()> {
    wtr.write_record(["section", "status", "detail"])?;
    for section in super::SECTION_KEYS {
        let Some(Value::Object(outcome)) = report.get(section) else {
            continue;
        };
        let status = outcome.get("status").map(|s| cell(s, "")).unwrap_or_default();
        let detail = match (outcome.get("output"), outcome.get("error")) {
            (Some(output), _) => super::minimal::headline(result_of(output)).unwrap_or_default(),
            (None, Some(error)) => cell(error, ""),
            _ => String::new(),
        };
        wtr.write_record([section, status.as_str(), detail.as_str()])?;
    }
    Ok(())
}
