use serde_json::Value;

use super::{cell, is_report, result_of, SECTION_KEYS};

/// Print just the key answer from the output.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);
    if let Value::Object(map) = result {
        if is_report(map) {
            for section in SECTION_KEYS {
                if let Some(Value::Object(outcome)) = map.get(section) {
                    let line = match (outcome.get("output"), outcome.get("error")) {
                        (Some(output), _) => headline(result_of(output)).unwrap_or_default(),
                        (None, Some(error)) => format!("failed: {}", cell(error, "")),
                        _ => String::new(),
                    };
                    println!("{}: {}", section, line);
                }
            }
            return;
        }
    }
    match headline(result) {
        Some(line) => println!("{}", line),
        None => println!("{}", cell(result, "null")),
    }
}

/// One-line answer for an analysis result.
///
/// Tornado: the top driver and its swing. Break-even: each solved value.
/// Otherwise the first present field from a priority list.
pub(crate) fn headline(result: &Value) -> Option<String> {
    let map = result.as_object()?;

    if let Some(Value::Array(entries)) = map.get("entries") {
        let top = entries.first()?;
        return Some(format!("{} (swing {})", cell(&top["name"], "-"), cell(&top["swing"], "-")));
    }

    if let Some(Value::Array(results)) = map.get("results") {
        if results.iter().any(|r| r.get("difficulty").is_some()) {
            let parts: Vec<String> = results
                .iter()
                .map(|r| {
                    let answer = match r.get("breakeven_value") {
                        Some(v) if !v.is_null() => cell(v, "-"),
                        _ => "unreachable".to_string(),
                    };
                    format!("{}={}", cell(&r["name"], "-"), answer)
                })
                .collect();
            return Some(parts.join(" "));
        }
    }

    // Priority list of key output fields
    let priority_keys = [
        "mean",
        "probability_weighted_value",
        "best_case",
        "average",
        "base_metric",
    ];
    priority_keys
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|val| !val.is_null())
        .map(|val| cell(val, "null"))
}
