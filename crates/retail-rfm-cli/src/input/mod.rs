pub mod csv_in;
pub mod file;
pub mod stdin;

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::Value;

use retail_rfm_core::schema::{parse_transactions, validate_columns, RawTransaction};
use retail_rfm_core::Transaction;

/// Load and parse transactions from `--input`, or from piped JSON on stdin.
///
/// Files ending in `.json` hold an array of row objects; anything else is
/// read as CSV with a header row.
pub fn load_transactions(input: Option<&str>) -> Result<Vec<Transaction>, Box<dyn std::error::Error>> {
    let raw: Vec<RawTransaction> = match input {
        Some(path) if is_json(path) => rows_from_value(file::read_json_value(path)?)?,
        Some(path) => csv_in::read_csv_file(path)?,
        None => match stdin::read_stdin()? {
            Some(value) => rows_from_value(value)?,
            None => return Err("no input: pass --input <file> or pipe a JSON array on stdin".into()),
        },
    };
    tracing::debug!(rows = raw.len(), "loaded raw rows");
    Ok(parse_transactions(&raw)?)
}

fn is_json(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Deserialise raw rows from JSON, accepting numbers where text is expected.
///
/// The union of keys across all rows plays the part of a CSV header and must
/// name every required column.
pub fn rows_from_value(value: Value) -> Result<Vec<RawTransaction>, Box<dyn std::error::Error>> {
    match value {
        Value::Array(items) => {
            if !items.is_empty() {
                let keys: BTreeSet<&str> = items
                    .iter()
                    .filter_map(Value::as_object)
                    .flat_map(|row| row.keys().map(String::as_str))
                    .collect();
                let headers: Vec<&str> = keys.into_iter().collect();
                validate_columns(&headers)?;
            }
            let rows = items
                .into_iter()
                .map(|item| serde_json::from_value(stringify_scalars(item)))
                .collect::<Result<Vec<RawTransaction>, _>>()?;
            Ok(rows)
        }
        _ => Err("expected a JSON array of transaction rows".into()),
    }
}

fn stringify_scalars(row: Value) -> Value {
    match row {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::Number(n) => Value::String(n.to_string()),
                        Value::Bool(b) => Value::String(b.to_string()),
                        other => other,
                    };
                    (k, v)
                })
                .collect(),
        ),
        other => other,
    }
}
