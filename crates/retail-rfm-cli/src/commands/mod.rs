pub mod clean;
pub mod kpis;
pub mod rfm;
pub mod segment;

use retail_rfm_core::cleaning::clean_transactions;
use retail_rfm_core::Transaction;

/// Apply the cleaning rules unless the caller asked for raw rows.
pub(crate) fn prepare(transactions: Vec<Transaction>, raw: bool) -> Vec<Transaction> {
    if raw {
        return transactions;
    }
    let cleaned = clean_transactions(&transactions);
    tracing::info!(
        input_rows = cleaned.report.input_rows,
        output_rows = cleaned.report.output_rows,
        "cleaned transactions"
    );
    cleaned.transactions
}
