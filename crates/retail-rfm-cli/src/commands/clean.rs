use clap::Args;
use serde_json::Value;

use retail_rfm_core::cleaning::clean_transactions;

use crate::input;
use crate::output;

/// Arguments for transaction cleaning
#[derive(Args)]
pub struct CleanArgs {
    /// Path to CSV or JSON transactions (reads JSON from stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Write the cleaned rows to this CSV file
    #[arg(long)]
    pub write: Option<String>,
}

pub fn run_clean(args: CleanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let transactions = input::load_transactions(args.input.as_deref())?;
    let cleaned = clean_transactions(&transactions);

    if let Some(ref path) = args.write {
        output::csv_out::write_transactions(path, &cleaned.transactions)?;
        tracing::info!(path = %path, rows = cleaned.transactions.len(), "wrote cleaned rows");
    }

    let mut value = serde_json::to_value(&cleaned.report)?;
    if let (Some(path), Value::Object(map)) = (args.write, &mut value) {
        map.insert("written_to".into(), Value::String(path));
    }
    Ok(value)
}
