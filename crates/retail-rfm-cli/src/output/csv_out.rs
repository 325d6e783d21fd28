use serde_json::Value;
use std::fs::File;
use std::io::{self, Write};

use chrono::NaiveDateTime;
use serde::Serialize;

use retail_rfm_core::{Money, Transaction};

/// Result arrays written as the CSV body, in order of preference.
const PRIMARY_ARRAYS: &[&str] = &["customers", "segment_summary", "monthly_revenue"];

/// Write output as CSV to stdout.
///
/// The per-customer table is the natural CSV payload of an RFM run, so the
/// first non-empty array named in [`PRIMARY_ARRAYS`] wins. Anything else is
/// written as two columns: field, value.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            if let Some(arr) = primary_array(result) {
                write_array_csv(&mut wtr, arr);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(result)]);
        }
    }

    let _ = wtr.flush();
}

fn primary_array(result: &Value) -> Option<&Vec<Value>> {
    let lookup = |key: &str| {
        result
            .get(key)
            .or_else(|| result.get("tables").and_then(|t| t.get(key)))
            .and_then(Value::as_array)
            .filter(|a| !a.is_empty())
    };
    PRIMARY_ARRAYS.iter().find_map(|key| lookup(key))
}

fn write_array_csv<W: Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Fixed-column CSV row; optional fields are written as empty cells.
#[derive(Serialize)]
struct TransactionRow<'a> {
    customer_id: Option<&'a str>,
    invoice_id: &'a str,
    item_code: &'a str,
    quantity: i64,
    unit_price: Money,
    timestamp: NaiveDateTime,
    description: Option<&'a str>,
    country: Option<&'a str>,
}

impl<'a> From<&'a Transaction> for TransactionRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        TransactionRow {
            customer_id: tx.customer_id.as_deref(),
            invoice_id: &tx.invoice_id,
            item_code: &tx.item_code,
            quantity: tx.quantity,
            unit_price: tx.unit_price,
            timestamp: tx.timestamp,
            description: tx.description.as_deref(),
            country: tx.country.as_deref(),
        }
    }
}

/// Write cleaned transactions to a CSV file with canonical headers.
pub fn write_transactions(path: &str, transactions: &[Transaction]) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path).map_err(|e| format!("Failed to create '{}': {}", path, e))?;
    write_transactions_to(file, transactions)
}

fn write_transactions_to<W: Write>(
    writer: W,
    transactions: &[Transaction],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(writer);
    for tx in transactions {
        wtr.serialize(TransactionRow::from(tx))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::csv_in::read_csv;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use retail_rfm_core::schema::parse_transactions;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_cleaned_rows_read_back() {
        let tx = Transaction {
            customer_id: None,
            invoice_id: "536544".into(),
            item_code: "21773".into(),
            quantity: 3,
            unit_price: Decimal::new(251, 2),
            timestamp: NaiveDate::from_ymd_opt(2010, 12, 1)
                .unwrap()
                .and_hms_opt(14, 32, 0)
                .unwrap(),
            description: Some("DECORATIVE ROSE BATHROOM BOTTLE".into()),
            country: Some("United Kingdom".into()),
        };
        let bare = Transaction {
            customer_id: Some("17850".into()),
            description: None,
            country: None,
            ..tx.clone()
        };

        let mut buf = Vec::new();
        write_transactions_to(&mut buf, &[tx.clone(), bare.clone()]).unwrap();

        let raw = read_csv(buf.as_slice()).unwrap();
        let parsed = parse_transactions(&raw).unwrap();
        assert_eq!(parsed, vec![tx, bare]);
    }

    #[test]
    fn test_customers_preferred_over_summary() {
        let result = json!({
            "segment_summary": [{"segment": "VIP"}],
            "customers": [{"customer_id": "12346"}],
        });
        let arr = primary_array(&result).unwrap();
        assert_eq!(arr[0]["customer_id"], "12346");
    }

    #[test]
    fn test_kpi_tables_fall_back_to_monthly() {
        let result = json!({"summary": {}, "tables": {"monthly_revenue": [{"month": "2011-01"}]}});
        assert_eq!(primary_array(&result).unwrap().len(), 1);
    }
}
