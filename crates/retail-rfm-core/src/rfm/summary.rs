use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::rfm::segments::{Segment, SegmentedCustomer};
use crate::types::{Money, Percent};

/// Customer and revenue share of one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customer_count: usize,
    pub total_revenue: Money,
    pub pct_customers: Percent,
    pub pct_revenue: Percent,
}

/// Aggregate segmented customers by segment.
///
/// Only segments with at least one customer appear. Rows are ordered by
/// revenue, largest first; equal revenue falls back to rule priority.
pub fn summarize_segments(customers: &[SegmentedCustomer]) -> Vec<SegmentSummary> {
    let mut groups: BTreeMap<Segment, (usize, Money)> = BTreeMap::new();
    for c in customers {
        let entry = groups.entry(c.segment).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += c.scored.metrics.monetary;
    }

    let total_customers = Decimal::from(customers.len() as u64);
    let total_revenue: Money = groups.values().map(|(_, r)| *r).sum();

    let mut rows: Vec<SegmentSummary> = groups
        .into_iter()
        .map(|(segment, (count, revenue))| SegmentSummary {
            segment,
            customer_count: count,
            total_revenue: revenue,
            pct_customers: share(Decimal::from(count as u64), total_customers),
            pct_revenue: share(revenue, total_revenue),
        })
        .collect();

    // stable sort keeps priority order among equal revenues
    rows.sort_by(|a, b| b.total_revenue.cmp(&a.total_revenue));
    rows
}

fn share(part: Decimal, whole: Decimal) -> Percent {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part / whole * dec!(100)).round_dp(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfm::metrics::CustomerMetrics;
    use crate::rfm::scoring::{RfmScores, ScoredCustomer};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn seg(id: &str, monetary: Money, segment: Segment) -> SegmentedCustomer {
        let scores = RfmScores {
            r_score: 1,
            f_score: 1,
            m_score: 1,
        };
        SegmentedCustomer {
            scored: ScoredCustomer {
                metrics: CustomerMetrics {
                    customer_id: id.into(),
                    last_purchase: NaiveDate::from_ymd_opt(2011, 1, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap(),
                    recency_days: 1,
                    frequency: 1,
                    monetary,
                },
                rfm_code: scores.code(),
                scores,
            },
            segment,
        }
    }

    #[test]
    fn test_summary_shares() {
        let customers = vec![
            seg("1", dec!(5000), Segment::Vip),
            seg("2", dec!(1500), Segment::Mainstream),
            seg("3", dec!(200), Segment::Dormant),
            seg("4", dec!(300), Segment::Mainstream),
        ];
        let summary = summarize_segments(&customers);

        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].segment, Segment::Vip);
        assert_eq!(summary[0].pct_customers, dec!(25.00));
        assert_eq!(summary[0].pct_revenue, dec!(71.43));

        assert_eq!(summary[1].segment, Segment::Mainstream);
        assert_eq!(summary[1].customer_count, 2);
        assert_eq!(summary[1].total_revenue, dec!(1800));
        assert_eq!(summary[1].pct_customers, dec!(50.00));

        assert_eq!(summary[2].segment, Segment::Dormant);
    }

    #[test]
    fn test_equal_revenue_keeps_priority_order() {
        let customers = vec![
            seg("1", dec!(100), Segment::Dormant),
            seg("2", dec!(100), Segment::Loyal),
        ];
        let summary = summarize_segments(&customers);
        assert_eq!(summary[0].segment, Segment::Loyal);
        assert_eq!(summary[1].segment, Segment::Dormant);
    }

    #[test]
    fn test_zero_revenue_has_zero_share() {
        let summary = summarize_segments(&[seg("1", Decimal::ZERO, Segment::Dormant)]);
        assert_eq!(summary[0].pct_revenue, Decimal::ZERO);
        assert_eq!(summary[0].pct_customers, dec!(100));
    }

    #[test]
    fn test_empty() {
        assert!(summarize_segments(&[]).is_empty());
    }
}
