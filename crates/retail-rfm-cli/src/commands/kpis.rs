use clap::Args;
use serde_json::Value;

use retail_rfm_core::kpi;

use crate::input;

/// Arguments for KPI reporting
#[derive(Args)]
pub struct KpisArgs {
    /// Path to CSV or JSON transactions (reads JSON from stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Rows kept in each top-N table
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Skip the cleaning rules and report on rows as loaded
    #[arg(long)]
    pub raw: bool,
}

pub fn run_kpis(args: KpisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let transactions = input::load_transactions(args.input.as_deref())?;
    let transactions = super::prepare(transactions, args.raw);
    let result = kpi::kpi_report(&transactions, args.top)?;
    Ok(serde_json::to_value(result)?)
}
