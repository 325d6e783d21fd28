use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use serde_json::Value;

use retail_rfm_core::rfm::{self, RfmConfig, TieStrategy};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TieStrategyArg {
    /// Fall back to average-rank bins when quantile cut points repeat
    AverageRank,
    /// Fail when quantile cut points repeat
    Strict,
}

impl From<TieStrategyArg> for TieStrategy {
    fn from(arg: TieStrategyArg) -> Self {
        match arg {
            TieStrategyArg::AverageRank => TieStrategy::AverageRank,
            TieStrategyArg::Strict => TieStrategy::Strict,
        }
    }
}

/// Arguments for RFM scoring and segmentation
#[derive(Args)]
pub struct RfmArgs {
    /// Path to CSV or JSON transactions (reads JSON from stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Reference date for recency, YYYY-MM-DD (defaults to the latest transaction date)
    #[arg(long)]
    pub snapshot_date: Option<NaiveDate>,

    /// Number of score bins per metric
    #[arg(long)]
    pub bins: Option<u32>,

    /// Handling of repeated quantile cut points
    #[arg(long, value_enum)]
    pub tie_strategy: Option<TieStrategyArg>,

    /// Path to a JSON RfmConfig; flags override its fields
    #[arg(long)]
    pub config: Option<String>,

    /// Skip the cleaning rules and score rows as loaded
    #[arg(long)]
    pub raw: bool,
}

impl RfmArgs {
    fn config(&self) -> Result<RfmConfig, Box<dyn std::error::Error>> {
        let mut config: RfmConfig = match self.config {
            Some(ref path) => input::file::read_json(path)?,
            None => RfmConfig::default(),
        };
        if let Some(date) = self.snapshot_date {
            config.snapshot_date = Some(date);
        }
        if let Some(bins) = self.bins {
            config.bin_count = bins;
        }
        if let Some(strategy) = self.tie_strategy {
            config.tie_strategy = strategy.into();
        }
        Ok(config)
    }
}

pub fn run_rfm(args: RfmArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.config()?;
    let transactions = input::load_transactions(args.input.as_deref())?;
    let transactions = super::prepare(transactions, args.raw);
    let result = rfm::run_rfm(&transactions, &config)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args() -> RfmArgs {
        RfmArgs {
            input: None,
            snapshot_date: None,
            bins: None,
            tie_strategy: None,
            config: None,
            raw: false,
        }
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = args().config().unwrap();
        assert_eq!(config, RfmConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = RfmArgs {
            snapshot_date: NaiveDate::from_ymd_opt(2011, 12, 10),
            bins: Some(4),
            tie_strategy: Some(TieStrategyArg::Strict),
            ..args()
        }
        .config()
        .unwrap();
        assert_eq!(config.snapshot_date, NaiveDate::from_ymd_opt(2011, 12, 10));
        assert_eq!(config.bin_count, 4);
        assert_eq!(config.tie_strategy, TieStrategy::Strict);
    }
}
