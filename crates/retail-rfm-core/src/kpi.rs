//! Revenue-level KPIs and top-N ranking tables.
//!
//! Works on every row handed to it, guest purchases included. Only the
//! top-customers table drops rows without a customer id.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RfmError;
use crate::types::*;
use crate::RfmResult;

const UNKNOWN: &str = "Unknown";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Headline KPIs for a transaction set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub date_min: NaiveDateTime,
    pub date_max: NaiveDateTime,
    /// Distinct invoices.
    pub orders: usize,
    /// Distinct non-null customer ids.
    pub customers: usize,
    pub total_revenue: Money,
    pub total_quantity: i64,
    pub avg_order_value: Money,
    pub avg_items_per_order: Decimal,
    /// Mean count of distinct item codes per invoice.
    pub avg_unique_items: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRevenue {
    pub item_code: String,
    pub description: String,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRevenue {
    pub country: String,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRevenue {
    pub customer_id: CustomerId,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// Calendar month as "YYYY-MM".
    pub month: String,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiTables {
    pub top_products: Vec<ProductRevenue>,
    pub top_countries: Vec<CountryRevenue>,
    pub top_customers: Vec<CustomerRevenue>,
    /// Every month from the first to the last transaction, gaps as zero.
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiReport {
    pub summary: KpiSummary,
    pub tables: KpiTables,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Compute the headline KPIs.
pub fn compute_kpis(transactions: &[Transaction]) -> RfmResult<KpiSummary> {
    let (date_min, date_max) = date_range(transactions)?;

    let mut invoices: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut customers: BTreeSet<&str> = BTreeSet::new();
    let mut total_revenue = Decimal::ZERO;
    let mut total_quantity: i64 = 0;

    for tx in transactions {
        invoices
            .entry(tx.invoice_id.as_str())
            .or_default()
            .insert(tx.item_code.as_str());
        if let Some(ref id) = tx.customer_id {
            customers.insert(id.as_str());
        }
        total_revenue = add_money(total_revenue, tx.revenue()?, "revenue")?;
        total_quantity = total_quantity.checked_add(tx.quantity).ok_or_else(|| {
            RfmError::validation("quantity", "total quantity overflows i64")
        })?;
    }

    let orders = invoices.len();
    let orders_d = Decimal::from(orders as u64);
    let unique_items: usize = invoices.values().map(BTreeSet::len).sum();

    // orders > 0 whenever the input is non-empty
    let avg_order_value = (total_revenue / orders_d).round_dp(2);
    let avg_items_per_order = (Decimal::from(total_quantity) / orders_d).round_dp(2);
    let avg_unique_items = (Decimal::from(unique_items as u64) / orders_d).round_dp(2);

    Ok(KpiSummary {
        date_min,
        date_max,
        orders,
        customers: customers.len(),
        total_revenue,
        total_quantity,
        avg_order_value,
        avg_items_per_order,
        avg_unique_items,
    })
}

/// Build the ranked revenue tables, keeping `top_n` rows in each.
pub fn build_tables(transactions: &[Transaction], top_n: usize) -> RfmResult<KpiTables> {
    let (date_min, date_max) = date_range(transactions)?;

    let mut products: BTreeMap<(String, String), Money> = BTreeMap::new();
    let mut countries: BTreeMap<String, Money> = BTreeMap::new();
    let mut customers: BTreeMap<CustomerId, Money> = BTreeMap::new();
    let mut months: BTreeMap<(i32, u32), Money> = BTreeMap::new();

    for tx in transactions {
        let revenue = tx.revenue()?;
        let description = tx.description.clone().unwrap_or_else(|| UNKNOWN.into());
        accumulate(&mut products, (tx.item_code.clone(), description), revenue)?;
        accumulate(
            &mut countries,
            tx.country.clone().unwrap_or_else(|| UNKNOWN.into()),
            revenue,
        )?;
        if let Some(ref id) = tx.customer_id {
            accumulate(&mut customers, id.clone(), revenue)?;
        }
        accumulate(
            &mut months,
            (tx.timestamp.year(), tx.timestamp.month()),
            revenue,
        )?;
    }

    let top_products = rank_by_revenue(products, top_n)
        .into_iter()
        .map(|((item_code, description), revenue)| ProductRevenue {
            item_code,
            description,
            revenue,
        })
        .collect();
    let top_countries = rank_by_revenue(countries, top_n)
        .into_iter()
        .map(|(country, revenue)| CountryRevenue { country, revenue })
        .collect();
    let top_customers = rank_by_revenue(customers, top_n)
        .into_iter()
        .map(|(customer_id, revenue)| CustomerRevenue {
            customer_id,
            revenue,
        })
        .collect();

    let mut monthly_revenue = Vec::new();
    let (mut year, mut month) = (date_min.year(), date_min.month());
    let end = (date_max.year(), date_max.month());
    while (year, month) <= end {
        monthly_revenue.push(MonthlyRevenue {
            month: format!("{year:04}-{month:02}"),
            revenue: months.get(&(year, month)).copied().unwrap_or(Decimal::ZERO),
        });
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    Ok(KpiTables {
        top_products,
        top_countries,
        top_customers,
        monthly_revenue,
    })
}

/// KPIs and tables in the standard output envelope.
pub fn kpi_report(
    transactions: &[Transaction],
    top_n: usize,
) -> RfmResult<ComputationOutput<KpiReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if top_n == 0 {
        return Err(RfmError::validation("top_n", "must be at least 1"));
    }

    let summary = compute_kpis(transactions)?;
    let tables = build_tables(transactions, top_n)?;

    let guest_rows = transactions.iter().filter(|t| t.is_guest()).count();
    if guest_rows > 0 {
        warnings.push(format!(
            "{guest_rows} guest row(s) included in revenue totals but not in top customers"
        ));
    }
    if transactions.iter().any(|t| t.quantity <= 0 || t.unit_price <= Decimal::ZERO) {
        warnings.push("input contains returns or non-positive prices; run cleaning first".into());
    }

    info!(
        orders = summary.orders,
        customers = summary.customers,
        revenue = %summary.total_revenue,
        "computed KPIs"
    );

    let assumptions = serde_json::json!({
        "top_n": top_n,
        "revenue": "quantity * unit_price",
        "ranking": "revenue descending, key ascending on ties",
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Revenue KPIs and top-N tables",
        &assumptions,
        warnings,
        elapsed,
        KpiReport { summary, tables },
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn date_range(transactions: &[Transaction]) -> RfmResult<(NaiveDateTime, NaiveDateTime)> {
    let min = transactions.iter().map(|t| t.timestamp).min();
    let max = transactions.iter().map(|t| t.timestamp).max();
    match (min, max) {
        (Some(min), Some(max)) => Ok((min, max)),
        _ => Err(RfmError::InsufficientData(
            "At least one transaction is required.".into(),
        )),
    }
}

/// Sort by revenue descending; BTreeMap iteration order breaks ties by key.
fn accumulate<K: Ord>(totals: &mut BTreeMap<K, Money>, key: K, revenue: Money) -> RfmResult<()> {
    let entry = totals.entry(key).or_default();
    *entry = add_money(*entry, revenue, "revenue")?;
    Ok(())
}

fn rank_by_revenue<K: Ord>(totals: BTreeMap<K, Money>, top_n: usize) -> Vec<(K, Money)> {
    let mut ranked: Vec<(K, Money)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(top_n);
    ranked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn tx(
        customer: Option<&str>,
        invoice: &str,
        item: &str,
        quantity: i64,
        price: Decimal,
        (y, m, d): (i32, u32, u32),
        country: &str,
    ) -> Transaction {
        Transaction {
            customer_id: customer.map(str::to_string),
            invoice_id: invoice.into(),
            item_code: item.into(),
            quantity,
            unit_price: price,
            timestamp: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            description: None,
            country: Some(country.into()),
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx(Some("17850"), "536365", "85123A", 6, dec!(2.55), (2010, 12, 1), "United Kingdom"),
            tx(Some("17850"), "536365", "71053", 6, dec!(3.39), (2010, 12, 1), "United Kingdom"),
            tx(Some("12583"), "536370", "22728", 24, dec!(3.75), (2011, 2, 1), "France"),
            tx(None, "536544", "21773", 2, dec!(2.51), (2011, 2, 3), "United Kingdom"),
        ]
    }

    #[test]
    fn test_summary_counts_guest_revenue() {
        let kpis = compute_kpis(&sample()).unwrap();
        assert_eq!(kpis.orders, 3);
        assert_eq!(kpis.customers, 2);
        // 15.30 + 20.34 + 90.00 + 5.02
        assert_eq!(kpis.total_revenue, dec!(130.66));
        assert_eq!(kpis.total_quantity, 38);
        assert_eq!(kpis.avg_order_value, dec!(43.55));
        assert_eq!(kpis.avg_items_per_order, dec!(12.67));
        // invoice 536365 has 2 items, the others 1 each
        assert_eq!(kpis.avg_unique_items, dec!(1.33));
        assert_eq!(kpis.date_min.date(), NaiveDate::from_ymd_opt(2010, 12, 1).unwrap());
        assert_eq!(kpis.date_max.date(), NaiveDate::from_ymd_opt(2011, 2, 3).unwrap());
    }

    #[test]
    fn test_top_customers_exclude_guests() {
        let tables = build_tables(&sample(), 10).unwrap();
        let ids: Vec<&str> = tables
            .top_customers
            .iter()
            .map(|c| c.customer_id.as_str())
            .collect();
        assert_eq!(ids, vec!["12583", "17850"]);
        assert_eq!(tables.top_customers[0].revenue, dec!(90.00));
    }

    #[test]
    fn test_top_countries_ranked() {
        let tables = build_tables(&sample(), 1).unwrap();
        assert_eq!(
            tables.top_countries,
            vec![CountryRevenue {
                country: "France".into(),
                revenue: dec!(90.00)
            }]
        );
    }

    #[test]
    fn test_products_without_description_are_unknown() {
        let tables = build_tables(&sample(), 10).unwrap();
        assert!(tables.top_products.iter().all(|p| p.description == "Unknown"));
        assert_eq!(tables.top_products[0].item_code, "22728");
    }

    #[test]
    fn test_monthly_revenue_fills_gaps() {
        let tables = build_tables(&sample(), 10).unwrap();
        let months: Vec<(&str, Decimal)> = tables
            .monthly_revenue
            .iter()
            .map(|m| (m.month.as_str(), m.revenue))
            .collect();
        assert_eq!(
            months,
            vec![
                ("2010-12", dec!(35.64)),
                ("2011-01", Decimal::ZERO),
                ("2011-02", dec!(95.02)),
            ]
        );
    }

    #[test]
    fn test_ties_broken_by_key() {
        let rows = vec![
            tx(Some("B"), "1", "X", 1, dec!(10), (2011, 1, 1), "UK"),
            tx(Some("A"), "2", "X", 1, dec!(10), (2011, 1, 1), "UK"),
        ];
        let tables = build_tables(&rows, 10).unwrap();
        assert_eq!(tables.top_customers[0].customer_id, "A");
    }

    #[test]
    fn test_empty_input_is_insufficient() {
        assert!(matches!(
            compute_kpis(&[]),
            Err(RfmError::InsufficientData(_))
        ));
        assert!(build_tables(&[], 10).is_err());
    }

    #[test]
    fn test_report_warns_about_guests() {
        let out = kpi_report(&sample(), 5).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("guest"));
        assert_eq!(out.result.summary.orders, 3);
    }

    #[test]
    fn test_report_rejects_zero_top_n() {
        assert!(matches!(
            kpi_report(&sample(), 0),
            Err(RfmError::Validation { .. })
        ));
    }

    #[test]
    fn test_quantity_overflow_is_error() {
        let rows = vec![
            tx(Some("1"), "A", "X", 9_000_000_000_000_000_000, dec!(0.000000001), (2011, 1, 1), "UK"),
            tx(Some("1"), "B", "X", 9_000_000_000_000_000_000, dec!(0.000000001), (2011, 1, 2), "UK"),
        ];
        match compute_kpis(&rows).unwrap_err() {
            RfmError::Validation { field, .. } => assert_eq!(field, "quantity"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_revenue_overflow_is_error() {
        let rows = vec![tx(
            Some("1"),
            "A",
            "X",
            9_000_000_000_000_000_000,
            dec!(100000000000),
            (2011, 1, 1),
            "UK",
        )];
        assert!(matches!(
            compute_kpis(&rows),
            Err(RfmError::Validation { ref field, .. }) if field == "revenue"
        ));
        assert!(build_tables(&rows, 5).is_err());
    }

    #[test]
    fn test_table_total_overflow_is_error() {
        let big = Decimal::MAX / dec!(2) + dec!(1);
        let rows = vec![
            tx(Some("1"), "A", "X", 1, big, (2011, 1, 1), "UK"),
            tx(Some("2"), "B", "X", 1, big, (2011, 1, 2), "UK"),
        ];
        assert!(matches!(
            build_tables(&rows, 5),
            Err(RfmError::Validation { ref field, .. }) if field == "revenue"
        ));
    }
}
