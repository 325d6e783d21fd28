//! Column contract for transaction tables and raw-row parsing.
//!
//! Sources arrive either with canonical snake_case headers or with the
//! Online Retail export headers (`InvoiceNo`, `CustomerID`, ...). Both are
//! accepted. Every field of a [`RawTransaction`] is kept as text so that a
//! malformed value surfaces as a [`RfmError::Validation`] naming the row and
//! the column, instead of a generic deserialisation failure.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RfmError;
use crate::types::Transaction;
use crate::RfmResult;

/// A column of the transaction table and the header names it may appear under.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

impl ColumnSpec {
    fn matches(&self, header: &str) -> bool {
        let header = header.trim();
        header == self.name || self.aliases.contains(&header)
    }
}

pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        name: "customer_id",
        aliases: &["CustomerID", "Customer ID"],
        required: true,
    },
    ColumnSpec {
        name: "invoice_id",
        aliases: &["InvoiceNo", "Invoice"],
        required: true,
    },
    ColumnSpec {
        name: "quantity",
        aliases: &["Quantity"],
        required: true,
    },
    ColumnSpec {
        name: "unit_price",
        aliases: &["UnitPrice", "Price"],
        required: true,
    },
    ColumnSpec {
        name: "timestamp",
        aliases: &["InvoiceDate", "invoice_date"],
        required: true,
    },
    ColumnSpec {
        name: "item_code",
        aliases: &["StockCode"],
        required: false,
    },
    ColumnSpec {
        name: "description",
        aliases: &["Description"],
        required: false,
    },
    ColumnSpec {
        name: "country",
        aliases: &["Country"],
        required: false,
    },
];

/// Check that a table header carries every required column.
///
/// Extra columns are ignored.
pub fn validate_columns<S: AsRef<str>>(headers: &[S]) -> RfmResult<()> {
    let missing: Vec<String> = COLUMNS
        .iter()
        .filter(|c| c.required)
        .filter(|c| !headers.iter().any(|h| c.matches(h.as_ref())))
        .map(|c| match c.aliases.first() {
            Some(alias) => format!("{} ({})", c.name, alias),
            None => c.name.to_string(),
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(RfmError::validation(
            "columns",
            format!("missing required column(s): {}", missing.join(", ")),
        ))
    }
}

/// One row of a transaction table before type conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default, alias = "CustomerID", alias = "Customer ID")]
    pub customer_id: Option<String>,
    #[serde(default, alias = "InvoiceNo", alias = "Invoice")]
    pub invoice_id: Option<String>,
    #[serde(default, alias = "StockCode")]
    pub item_code: Option<String>,
    #[serde(default, alias = "Quantity")]
    pub quantity: Option<String>,
    #[serde(default, alias = "UnitPrice", alias = "Price")]
    pub unit_price: Option<String>,
    #[serde(default, alias = "InvoiceDate", alias = "invoice_date")]
    pub timestamp: Option<String>,
    #[serde(default, alias = "Description")]
    pub description: Option<String>,
    #[serde(default, alias = "Country")]
    pub country: Option<String>,
}

impl RawTransaction {
    /// Convert to a typed [`Transaction`]. `row` is the 1-based data row used
    /// in error messages.
    pub fn parse(&self, row: usize) -> RfmResult<Transaction> {
        let invoice_id = non_empty(&self.invoice_id).ok_or_else(|| {
            RfmError::validation("invoice_id", format!("row {row}: value is missing"))
        })?;

        let quantity_raw = non_empty(&self.quantity).ok_or_else(|| {
            RfmError::validation("quantity", format!("row {row}: value is missing"))
        })?;
        let quantity = parse_quantity(&quantity_raw).ok_or_else(|| {
            RfmError::validation(
                "quantity",
                format!("row {row}: '{quantity_raw}' is not an integer"),
            )
        })?;

        let price_raw = non_empty(&self.unit_price).ok_or_else(|| {
            RfmError::validation("unit_price", format!("row {row}: value is missing"))
        })?;
        let unit_price = parse_decimal(&price_raw).ok_or_else(|| {
            RfmError::validation(
                "unit_price",
                format!("row {row}: '{price_raw}' is not a decimal number"),
            )
        })?;

        let ts_raw = non_empty(&self.timestamp).ok_or_else(|| {
            RfmError::validation("timestamp", format!("row {row}: value is missing"))
        })?;
        let timestamp = parse_timestamp(&ts_raw).ok_or_else(|| {
            RfmError::validation(
                "timestamp",
                format!("row {row}: '{ts_raw}' is not a recognised date-time"),
            )
        })?;

        Ok(Transaction {
            customer_id: self.customer_id.as_deref().and_then(normalize_customer_id),
            invoice_id,
            item_code: non_empty(&self.item_code).unwrap_or_default(),
            quantity,
            unit_price,
            timestamp,
            description: non_empty(&self.description),
            country: non_empty(&self.country),
        })
    }
}

/// Parse a batch of raw rows, failing on the first malformed row.
pub fn parse_transactions(rows: &[RawTransaction]) -> RfmResult<Vec<Transaction>> {
    rows.iter()
        .enumerate()
        .map(|(i, raw)| raw.parse(i + 1))
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Normalise a customer identifier.
///
/// Null markers from dataframe exports become `None`, and float-formatted
/// integer ids ("17850.0") lose their trailing zero fraction.
pub fn normalize_customer_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "nan" | "none" | "null" | "<na>"
    ) {
        return None;
    }
    if let Some((int_part, frac)) = trimmed.split_once('.') {
        if !int_part.is_empty()
            && int_part.chars().all(|c| c.is_ascii_digit())
            && frac.chars().all(|c| c == '0')
        {
            return Some(int_part.to_string());
        }
    }
    Some(trimmed.to_string())
}

fn parse_quantity(raw: &str) -> Option<i64> {
    if let Ok(q) = raw.parse::<i64>() {
        return Some(q);
    }
    // "6.0" style exports
    let d = parse_decimal(raw)?;
    if d.fract().is_zero() {
        d.to_i64()
    } else {
        None
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse the date-time layouts seen in retail exports.
///
/// Offsets in RFC 3339 input are converted to UTC and dropped; a bare date
/// is taken as midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
