use std::fs::File;
use std::io::Read;

use retail_rfm_core::schema::{validate_columns, RawTransaction};

use super::file::resolve_path;

/// Read raw transaction rows from a CSV file with a header row.
pub fn read_csv_file(path: &str) -> Result<Vec<RawTransaction>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    read_csv(file).map_err(|e| -> Box<dyn std::error::Error> {
        format!("Failed to parse '{}': {}", canonical.display(), e).into()
    })
}

/// Read raw rows from any CSV source. The header is checked against the
/// column contract before any row is decoded.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawTransaction>, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    validate_columns(&headers)?;

    let mut rows = Vec::new();
    for record in rdr.deserialize() {
        let row: RawTransaction = record?;
        rows.push(row);
    }
    Ok(rows)
}
