//! Data-quality rules applied before analysis.
//!
//! Rules, in order:
//! 1. **Exact duplicates** -- a row identical in every field to an earlier
//!    row is dropped (first occurrence kept).
//! 2. **Non-positive quantity** -- returns and cancellations (quantity <= 0).
//! 3. **Non-positive price** -- data-entry errors and adjustments
//!    (unit_price <= 0).
//!
//! Guest rows (no customer id) are kept: they still count towards revenue
//! KPIs and are only excluded later, at the customer-level RFM step.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Transaction;

/// Row counts removed by each rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub non_positive_quantity_removed: usize,
    pub non_positive_price_removed: usize,
    pub output_rows: usize,
    /// Rows kept without a customer id.
    pub guest_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningOutput {
    pub transactions: Vec<Transaction>,
    pub report: CleaningReport,
}

/// Apply the cleaning rules. Row order of the survivors is preserved.
pub fn clean_transactions(transactions: &[Transaction]) -> CleaningOutput {
    let mut report = CleaningReport {
        input_rows: transactions.len(),
        ..Default::default()
    };

    let mut seen: HashSet<&Transaction> = HashSet::with_capacity(transactions.len());
    let mut kept = Vec::with_capacity(transactions.len());

    for tx in transactions {
        if !seen.insert(tx) {
            report.duplicates_removed += 1;
            continue;
        }
        if tx.quantity <= 0 {
            report.non_positive_quantity_removed += 1;
            continue;
        }
        if tx.unit_price <= Decimal::ZERO {
            report.non_positive_price_removed += 1;
            continue;
        }
        kept.push(tx.clone());
    }

    report.output_rows = kept.len();
    report.guest_rows = kept.iter().filter(|t| t.is_guest()).count();

    debug!(
        input = report.input_rows,
        output = report.output_rows,
        duplicates = report.duplicates_removed,
        "cleaned transactions"
    );

    CleaningOutput {
        transactions: kept,
        report,
    }
}
