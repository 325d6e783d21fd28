//! Per-customer Recency, Frequency and Monetary metrics.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RfmError;
use crate::types::*;
use crate::RfmResult;

/// Raw RFM metrics for one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerMetrics {
    pub customer_id: CustomerId,
    pub last_purchase: NaiveDateTime,
    /// Whole calendar days from the last purchase date to the snapshot date.
    pub recency_days: u64,
    /// Distinct invoices.
    pub frequency: u64,
    /// Sum of quantity × unit_price.
    pub monetary: Money,
}

#[derive(Default)]
struct Accumulator<'a> {
    last_purchase: Option<NaiveDateTime>,
    invoices: BTreeSet<&'a str>,
    monetary: Money,
}

/// Group transactions by customer and derive RFM metrics.
///
/// Guest rows (no customer id) are skipped. Output is ordered by customer id.
pub fn compute_customer_metrics(
    transactions: &[Transaction],
    snapshot_date: NaiveDate,
) -> RfmResult<Vec<CustomerMetrics>> {
    let mut by_customer: BTreeMap<&str, Accumulator<'_>> = BTreeMap::new();

    for tx in transactions {
        let Some(ref id) = tx.customer_id else {
            continue;
        };
        let acc = by_customer.entry(id.as_str()).or_default();
        acc.last_purchase = acc.last_purchase.max(Some(tx.timestamp));
        acc.invoices.insert(tx.invoice_id.as_str());
        acc.monetary = add_money(acc.monetary, tx.revenue()?, "monetary")?;
    }

    if by_customer.is_empty() {
        return Err(RfmError::InsufficientData(
            "No transactions with a customer id.".into(),
        ));
    }

    let mut metrics = Vec::with_capacity(by_customer.len());
    // segment summaries add these up, so the population total must fit too
    let mut population_total = Decimal::ZERO;
    for (customer_id, acc) in by_customer {
        // every accumulator saw at least one row
        let Some(last_purchase) = acc.last_purchase else {
            continue;
        };

        let days = (snapshot_date - last_purchase.date()).num_days();
        if days < 0 {
            return Err(RfmError::validation(
                "snapshot_date",
                format!(
                    "{snapshot_date} precedes the last purchase ({}) of customer {customer_id}",
                    last_purchase.date()
                ),
            ));
        }
        if acc.monetary < Decimal::ZERO {
            return Err(RfmError::validation(
                "monetary",
                format!(
                    "customer {customer_id} has negative net spend {}; clean returns first",
                    acc.monetary
                ),
            ));
        }
        population_total = add_money(population_total, acc.monetary, "monetary")?;

        metrics.push(CustomerMetrics {
            customer_id: customer_id.to_string(),
            last_purchase,
            recency_days: days as u64,
            frequency: acc.invoices.len() as u64,
            monetary: acc.monetary,
        });
    }

    debug!(customers = metrics.len(), %snapshot_date, "computed customer metrics");
    Ok(metrics)
}
