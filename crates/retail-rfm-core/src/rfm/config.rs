use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RfmError;
use crate::types::Transaction;
use crate::RfmResult;

pub const DEFAULT_BIN_COUNT: u32 = 5;

/// How a metric is binned when its quantile cut points coincide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieStrategy {
    /// Fall back to average-rank binning for that metric.
    #[default]
    AverageRank,
    /// Fail with a scoring error.
    Strict,
}

impl std::fmt::Display for TieStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TieStrategy::AverageRank => write!(f, "average_rank"),
            TieStrategy::Strict => write!(f, "strict"),
        }
    }
}

/// Caller-facing RFM configuration. Every field has a default, so `{}` is a
/// valid JSON config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfmConfig {
    /// Reference "today" for recency. Defaults to the date of the latest
    /// transaction in the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_date: Option<NaiveDate>,
    #[serde(default = "default_bin_count")]
    pub bin_count: u32,
    #[serde(default)]
    pub tie_strategy: TieStrategy,
}

fn default_bin_count() -> u32 {
    DEFAULT_BIN_COUNT
}

impl Default for RfmConfig {
    fn default() -> Self {
        RfmConfig {
            snapshot_date: None,
            bin_count: DEFAULT_BIN_COUNT,
            tie_strategy: TieStrategy::default(),
        }
    }
}

/// Configuration with every default made concrete for one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub snapshot_date: NaiveDate,
    /// True when the snapshot date came from the data rather than the caller.
    pub snapshot_inferred: bool,
    pub bin_count: u32,
    pub tie_strategy: TieStrategy,
}

impl RfmConfig {
    /// Resolve defaults against the transaction set.
    pub fn resolve(&self, transactions: &[Transaction]) -> RfmResult<ResolvedConfig> {
        if self.bin_count == 0 {
            return Err(RfmError::validation("bin_count", "must be at least 1"));
        }

        let (snapshot_date, snapshot_inferred) = match self.snapshot_date {
            Some(date) => (date, false),
            None => {
                let latest = transactions
                    .iter()
                    .map(|t| t.timestamp)
                    .max()
                    .ok_or_else(|| {
                        RfmError::InsufficientData(
                            "Cannot infer a snapshot date from an empty transaction set.".into(),
                        )
                    })?;
                (latest.date(), true)
            }
        };

        Ok(ResolvedConfig {
            snapshot_date,
            snapshot_inferred,
            bin_count: self.bin_count,
            tie_strategy: self.tie_strategy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx_on(y: i32, m: u32, d: u32) -> Transaction {
        Transaction {
            customer_id: None,
            invoice_id: "1".into(),
            item_code: "A".into(),
            quantity: 1,
            unit_price: dec!(1),
            timestamp: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(12, 50, 0)
                .unwrap(),
            description: None,
            country: None,
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = RfmConfig::default();
        assert_eq!(cfg.bin_count, 5);
        assert_eq!(cfg.tie_strategy, TieStrategy::AverageRank);
        assert!(cfg.snapshot_date.is_none());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let cfg: RfmConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RfmConfig::default());
    }

    #[test]
    fn test_json_config() {
        let cfg: RfmConfig = serde_json::from_str(
            r#"{"snapshot_date": "2011-12-10", "bin_count": 4, "tie_strategy": "strict"}"#,
        )
        .unwrap();
        assert_eq!(cfg.snapshot_date, NaiveDate::from_ymd_opt(2011, 12, 10));
        assert_eq!(cfg.bin_count, 4);
        assert_eq!(cfg.tie_strategy, TieStrategy::Strict);
    }

    #[test]
    fn test_snapshot_inferred_from_latest_transaction() {
        let rows = vec![tx_on(2011, 12, 9), tx_on(2010, 12, 1)];
        let resolved = RfmConfig::default().resolve(&rows).unwrap();
        assert_eq!(resolved.snapshot_date, NaiveDate::from_ymd_opt(2011, 12, 9).unwrap());
        assert!(resolved.snapshot_inferred);
    }

    #[test]
    fn test_explicit_snapshot_kept() {
        let cfg = RfmConfig {
            snapshot_date: NaiveDate::from_ymd_opt(2012, 1, 1),
            ..Default::default()
        };
        let resolved = cfg.resolve(&[]).unwrap();
        assert_eq!(resolved.snapshot_date, NaiveDate::from_ymd_opt(2012, 1, 1).unwrap());
        assert!(!resolved.snapshot_inferred);
    }

    #[test]
    fn test_zero_bins_rejected() {
        let cfg = RfmConfig {
            bin_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.resolve(&[tx_on(2011, 1, 1)]),
            Err(RfmError::Validation { .. })
        ));
    }

    #[test]
    fn test_empty_input_without_snapshot() {
        assert!(matches!(
            RfmConfig::default().resolve(&[]),
            Err(RfmError::InsufficientData(_))
        ));
    }
}
