use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::rfm::config::{RfmConfig, TieStrategy};
use crate::rfm::metrics::compute_customer_metrics;
use crate::rfm::scoring::{score_customers, BinningMethod, MetricBinning};
use crate::rfm::segments::{segment_customers, SegmentedCustomer};
use crate::rfm::summary::{summarize_segments, SegmentSummary};
use crate::types::*;
use crate::RfmResult;

/// Output of a full RFM run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfmOutput {
    pub snapshot_date: NaiveDate,
    pub snapshot_inferred: bool,
    pub bin_count: u32,
    pub tie_strategy: TieStrategy,
    pub customer_count: usize,
    /// Rows without a customer id, left out of customer-level metrics.
    pub excluded_guest_rows: usize,
    pub binning: Vec<MetricBinning>,
    /// One row per customer, ordered by customer id.
    pub customers: Vec<SegmentedCustomer>,
    pub segment_summary: Vec<SegmentSummary>,
}

/// Run metrics, scoring, segmentation and summary over a transaction set.
///
/// The input is used as given; apply [`crate::cleaning::clean_transactions`]
/// first to drop returns and bad prices.
pub fn run_rfm(
    transactions: &[Transaction],
    config: &RfmConfig,
) -> RfmResult<ComputationOutput<RfmOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let resolved = config.resolve(transactions)?;
    if resolved.snapshot_inferred {
        warnings.push(format!(
            "snapshot_date not given; using latest transaction date {}",
            resolved.snapshot_date
        ));
    }

    let excluded_guest_rows = transactions.iter().filter(|t| t.is_guest()).count();
    if excluded_guest_rows > 0 {
        warnings.push(format!(
            "{excluded_guest_rows} guest row(s) without customer id excluded from RFM"
        ));
    }

    let metrics = compute_customer_metrics(transactions, resolved.snapshot_date)?;
    let scoring = score_customers(&metrics, resolved.bin_count, resolved.tie_strategy)?;

    for b in &scoring.binning {
        if b.method == BinningMethod::AverageRank {
            warnings.push(format!(
                "{}: quantile cut points not unique ({} distinct values); scored by average rank",
                b.metric, b.distinct_values
            ));
        }
    }
    if metrics.len() < resolved.bin_count as usize {
        warnings.push(format!(
            "only {} customer(s) for {} bins; some scores are unused",
            metrics.len(),
            resolved.bin_count
        ));
    }

    let customers = segment_customers(scoring.customers);
    let segment_summary = summarize_segments(&customers);

    info!(
        customers = customers.len(),
        snapshot_date = %resolved.snapshot_date,
        bins = resolved.bin_count,
        "RFM segmentation complete"
    );

    let assumptions = serde_json::json!({
        "snapshot_date": resolved.snapshot_date,
        "recency": "calendar days from last purchase date to snapshot date",
        "frequency": "distinct invoices",
        "monetary": "sum of quantity * unit_price",
        "bin_count": resolved.bin_count,
        "tie_strategy": resolved.tie_strategy,
        "segment_rules": "VIP > Loyal > Growth Potential > At Risk > Dormant > Mainstream",
    });

    let output = RfmOutput {
        snapshot_date: resolved.snapshot_date,
        snapshot_inferred: resolved.snapshot_inferred,
        bin_count: resolved.bin_count,
        tie_strategy: resolved.tie_strategy,
        customer_count: customers.len(),
        excluded_guest_rows,
        binning: scoring.binning,
        customers,
        segment_summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Quantile RFM scoring with ordered segment rules",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfm::segments::Segment;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn tx(customer: Option<&str>, invoice: &str, day: u32, quantity: i64, price: Decimal) -> Transaction {
        Transaction {
            customer_id: customer.map(str::to_string),
            invoice_id: invoice.into(),
            item_code: "X".into(),
            quantity,
            unit_price: price,
            timestamp: NaiveDate::from_ymd_opt(2011, 12, day)
                .unwrap()
                .and_hms_opt(11, 0, 0)
                .unwrap(),
            description: None,
            country: None,
        }
    }

    #[test]
    fn test_inferred_snapshot_is_reported() {
        let rows = vec![
            tx(Some("1001"), "INV001", 1, 2, dec!(10)),
            tx(Some("1003"), "INV005", 5, 2, dec!(30)),
        ];
        let out = run_rfm(&rows, &RfmConfig::default()).unwrap();
        assert!(out.result.snapshot_inferred);
        assert_eq!(out.result.snapshot_date, NaiveDate::from_ymd_opt(2011, 12, 5).unwrap());
        assert!(out.warnings.iter().any(|w| w.contains("snapshot_date")));
        // latest buyer has recency 0
        assert_eq!(out.result.customers[1].scored.metrics.recency_days, 0);
    }

    #[test]
    fn test_guest_rows_counted_and_excluded() {
        let rows = vec![
            tx(Some("1001"), "INV001", 1, 2, dec!(10)),
            tx(None, "INV002", 2, 1, dec!(99)),
        ];
        let cfg = RfmConfig {
            snapshot_date: NaiveDate::from_ymd_opt(2011, 12, 10),
            ..Default::default()
        };
        let out = run_rfm(&rows, &cfg).unwrap();
        assert_eq!(out.result.excluded_guest_rows, 1);
        assert_eq!(out.result.customer_count, 1);
        assert_eq!(out.result.segment_summary[0].total_revenue, dec!(20));
    }

    #[test]
    fn test_single_customer_is_growth_potential() {
        // one customer: recency ranks highest, frequency and monetary lowest
        let rows = vec![tx(Some("1001"), "INV001", 1, 1, dec!(10))];
        let cfg = RfmConfig {
            snapshot_date: NaiveDate::from_ymd_opt(2011, 12, 10),
            ..Default::default()
        };
        let out = run_rfm(&rows, &cfg).unwrap();
        let c = &out.result.customers[0];
        assert_eq!(c.scored.rfm_code, "511");
        assert_eq!(c.segment, Segment::GrowthPotential);
    }
}
