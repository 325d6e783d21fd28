use clap::Args;
use serde_json::{json, Value};

use retail_rfm_core::rfm::{assign_segment, RfmScores, DEFAULT_BIN_COUNT};

/// Arguments for labelling a single score triple
#[derive(Args)]
pub struct SegmentArgs {
    /// Recency score
    #[arg(long)]
    pub r: u32,

    /// Frequency score
    #[arg(long)]
    pub f: u32,

    /// Monetary score
    #[arg(long)]
    pub m: u32,

    /// Upper bound of the score scale
    #[arg(long, default_value_t = DEFAULT_BIN_COUNT)]
    pub bins: u32,
}

pub fn run_segment(args: SegmentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scores = RfmScores::new(args.r, args.f, args.m, args.bins)?;
    let segment = assign_segment(&scores);
    Ok(json!({
        "result": {
            "r_score": scores.r_score,
            "f_score": scores.f_score,
            "m_score": scores.m_score,
            "rfm_code": scores.code(),
            "segment": segment,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vip_triple() {
        let out = run_segment(SegmentArgs { r: 5, f: 5, m: 5, bins: 5 }).unwrap();
        assert_eq!(out["result"]["segment"], "VIP");
        assert_eq!(out["result"]["rfm_code"], "555");
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        assert!(run_segment(SegmentArgs { r: 6, f: 1, m: 1, bins: 5 }).is_err());
    }
}
