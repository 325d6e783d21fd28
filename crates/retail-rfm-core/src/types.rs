use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RfmError;
use crate::RfmResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages expressed as 0-100 with two decimal places.
pub type Percent = Decimal;

/// Customer identifier as it appears in the source data (e.g. "17850").
pub type CustomerId = String;

/// A single transaction line (one item on one invoice).
///
/// Quantity may be negative for returns and unit_price may be zero or
/// negative for data-entry errors; the cleaning step removes both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    /// Missing for guest purchases.
    pub customer_id: Option<CustomerId>,
    pub invoice_id: String,
    pub item_code: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub timestamp: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Transaction {
    /// Line revenue: quantity × unit_price. Fails when the product does not
    /// fit in a `Decimal`.
    pub fn revenue(&self) -> RfmResult<Money> {
        Decimal::from(self.quantity)
            .checked_mul(self.unit_price)
            .ok_or_else(|| {
                RfmError::validation(
                    "revenue",
                    format!(
                        "invoice {}: {} × {} overflows",
                        self.invoice_id, self.quantity, self.unit_price
                    ),
                )
            })
    }

    pub fn is_guest(&self) -> bool {
        self.customer_id.is_none()
    }
}

/// Add `amount` to a running money total, failing on overflow.
pub(crate) fn add_money(total: Money, amount: Money, field: &str) -> RfmResult<Money> {
    total
        .checked_add(amount)
        .ok_or_else(|| RfmError::validation(field, format!("total overflows after adding {amount}")))
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn line(quantity: i64, unit_price: Decimal) -> Transaction {
        Transaction {
            customer_id: None,
            invoice_id: "536365".into(),
            item_code: "85123A".into(),
            quantity,
            unit_price,
            timestamp: NaiveDate::from_ymd_opt(2010, 12, 1)
                .unwrap()
                .and_hms_opt(8, 26, 0)
                .unwrap(),
            description: None,
            country: None,
        }
    }

    #[test]
    fn test_revenue_is_quantity_times_price() {
        assert_eq!(line(6, dec!(2.55)).revenue().unwrap(), dec!(15.30));
    }

    #[test]
    fn test_return_line_has_negative_revenue() {
        assert_eq!(line(-2, dec!(3.39)).revenue().unwrap(), dec!(-6.78));
    }

    #[test]
    fn test_revenue_overflow_is_error() {
        let huge = line(9_000_000_000_000_000_000, dec!(100000000000));
        match huge.revenue().unwrap_err() {
            RfmError::Validation { field, .. } => assert_eq!(field, "revenue"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_add_money_overflow_is_error() {
        assert_eq!(add_money(dec!(1), dec!(2), "total").unwrap(), dec!(3));
        assert!(add_money(Decimal::MAX, dec!(1), "total").is_err());
    }

    #[test]
    fn test_missing_customer_is_guest() {
        assert!(line(1, dec!(1)).is_guest());
    }

    #[test]
    fn test_with_metadata_envelope() {
        let out = with_metadata("test", &serde_json::json!({"a": 1}), vec![], 12, 5u32);
        assert_eq!(out.result, 5);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        assert_eq!(out.metadata.computation_time_us, 12);
        assert_eq!(out.assumptions["a"], 1);
    }
}
