//! Quantile scoring of RFM metrics.
//!
//! Each metric is binned independently across the whole customer population:
//!
//! 1. **Cut points** -- `bin_count + 1` quantiles at `i / bin_count`, using
//!    linear interpolation between order statistics.
//! 2. **Assignment** -- a value lands in the first bin whose upper edge is
//!    >= the value; the minimum belongs to bin 1.
//! 3. **Direction** -- Frequency and Monetary score the bin index as is;
//!    Recency is inverted (`bin_count + 1 - bin`) so recent buyers score high.
//!
//! When cut points coincide (few distinct values, typical for Frequency),
//! [`TieStrategy::AverageRank`] bins by average rank instead: a tied group
//! occupying sorted positions `first..=last` (1-based) goes to bin
//! `floor((first + last - 2) * bin_count / (2n)) + 1`. Equal values always
//! share a score.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RfmError;
use crate::rfm::config::TieStrategy;
use crate::rfm::metrics::CustomerMetrics;
use crate::RfmResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl Metric {
    /// Whether a larger raw value is "better" and earns a higher score.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Metric::Recency)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Recency => write!(f, "Recency"),
            Metric::Frequency => write!(f, "Frequency"),
            Metric::Monetary => write!(f, "Monetary"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinningMethod {
    Quantile,
    AverageRank,
}

/// How one metric was binned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricBinning {
    pub metric: Metric,
    pub method: BinningMethod,
    /// Quantile cut points (empty when average-rank binning was used).
    pub edges: Vec<Decimal>,
    pub distinct_values: usize,
}

/// The three scores for one customer, each in `1..=bin_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RfmScores {
    pub r_score: u32,
    pub f_score: u32,
    pub m_score: u32,
}

impl RfmScores {
    /// Build a score triple, checking each score lies in `1..=bin_count`.
    pub fn new(r_score: u32, f_score: u32, m_score: u32, bin_count: u32) -> RfmResult<Self> {
        for (field, score) in [("r_score", r_score), ("f_score", f_score), ("m_score", m_score)] {
            if score == 0 || score > bin_count {
                return Err(RfmError::validation(
                    field,
                    format!("{score} is outside 1..={bin_count}"),
                ));
            }
        }
        Ok(RfmScores {
            r_score,
            f_score,
            m_score,
        })
    }

    /// Concatenated score string, e.g. "545".
    pub fn code(&self) -> String {
        format!("{}{}{}", self.r_score, self.f_score, self.m_score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredCustomer {
    #[serde(flatten)]
    pub metrics: CustomerMetrics,
    #[serde(flatten)]
    pub scores: RfmScores,
    pub rfm_code: String,
}

#[derive(Debug, Clone)]
pub struct ScoringOutput {
    pub customers: Vec<ScoredCustomer>,
    pub binning: Vec<MetricBinning>,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Score every customer on all three metrics.
pub fn score_customers(
    metrics: &[CustomerMetrics],
    bin_count: u32,
    strategy: TieStrategy,
) -> RfmResult<ScoringOutput> {
    let recency: Vec<Decimal> = metrics.iter().map(|m| Decimal::from(m.recency_days)).collect();
    let frequency: Vec<Decimal> = metrics.iter().map(|m| Decimal::from(m.frequency)).collect();
    let monetary: Vec<Decimal> = metrics.iter().map(|m| m.monetary).collect();

    let (r, r_binning) = score_metric(Metric::Recency, &recency, bin_count, strategy)?;
    let (f, f_binning) = score_metric(Metric::Frequency, &frequency, bin_count, strategy)?;
    let (m, m_binning) = score_metric(Metric::Monetary, &monetary, bin_count, strategy)?;

    let customers = metrics
        .iter()
        .enumerate()
        .map(|(i, cm)| {
            let scores = RfmScores {
                r_score: r[i],
                f_score: f[i],
                m_score: m[i],
            };
            ScoredCustomer {
                metrics: cm.clone(),
                rfm_code: scores.code(),
                scores,
            }
        })
        .collect();

    Ok(ScoringOutput {
        customers,
        binning: vec![r_binning, f_binning, m_binning],
    })
}

/// Score one metric column. Scores are returned in input order.
pub fn score_metric(
    metric: Metric,
    values: &[Decimal],
    bin_count: u32,
    strategy: TieStrategy,
) -> RfmResult<(Vec<u32>, MetricBinning)> {
    if bin_count == 0 {
        return Err(RfmError::validation("bin_count", "must be at least 1"));
    }
    if values.is_empty() {
        return Err(RfmError::InsufficientData(format!(
            "No {metric} values to score."
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort();
    let distinct_values = 1 + sorted.windows(2).filter(|w| w[0] != w[1]).count();

    let edges = quantile_edges(&sorted, bin_count)?;
    let unique_edges = edges.windows(2).all(|w| w[0] < w[1]);

    let (bins, binning) = if bin_count == 1 || unique_edges {
        let bins = values.iter().map(|v| quantile_bin(&edges, *v)).collect();
        let binning = MetricBinning {
            metric,
            method: BinningMethod::Quantile,
            edges,
            distinct_values,
        };
        (bins, binning)
    } else {
        match strategy {
            TieStrategy::Strict => {
                return Err(RfmError::Scoring {
                    metric: metric.to_string(),
                    bins: bin_count,
                    reason: format!(
                        "quantile cut points are not unique ({distinct_values} distinct values)"
                    ),
                });
            }
            TieStrategy::AverageRank => {
                warn!(%metric, bin_count, distinct_values, "duplicate quantile edges, using average rank");
                let binning = MetricBinning {
                    metric,
                    method: BinningMethod::AverageRank,
                    edges: Vec::new(),
                    distinct_values,
                };
                (average_rank_bins(values, bin_count), binning)
            }
        }
    };

    let scores = if metric.higher_is_better() {
        bins
    } else {
        bins.into_iter().map(|b| bin_count + 1 - b).collect()
    };

    debug!(%metric, method = ?binning.method, "scored metric");
    Ok((scores, binning))
}

/// Quantile cut points of an ascending-sorted slice.
pub fn quantile_edges(sorted: &[Decimal], bin_count: u32) -> RfmResult<Vec<Decimal>> {
    if bin_count == 0 {
        return Err(RfmError::validation("bin_count", "must be at least 1"));
    }
    if sorted.is_empty() {
        return Err(RfmError::InsufficientData(
            "No values to compute quantiles from.".into(),
        ));
    }

    let last = (sorted.len() - 1) as u64;
    let bins = u64::from(bin_count);
    let edges = (0..=bins)
        .map(|i| {
            // position = last * i / bins, split into integer and fractional parts
            let scaled = last * i;
            let lo = (scaled / bins) as usize;
            let rem = Decimal::from(scaled % bins);
            if rem.is_zero() {
                sorted[lo]
            } else {
                let lower = sorted[lo];
                let gap = sorted[lo + 1] - lower;
                let bins = Decimal::from(bins);
                // divide first only when gap * rem would not fit
                let step = match gap.checked_mul(rem) {
                    Some(product) => product / bins,
                    None => gap / bins * rem,
                };
                lower + step
            }
        })
        .collect();
    Ok(edges)
}

fn quantile_bin(edges: &[Decimal], value: Decimal) -> u32 {
    // edges[1..] are the upper bounds of bins 1..=n
    let n = edges.len() - 1;
    let idx = edges[1..].partition_point(|e| *e < value).min(n - 1);
    idx as u32 + 1
}

fn average_rank_bins(values: &[Decimal], bin_count: u32) -> Vec<u32> {
    let n = values.len() as u64;
    let bins = u64::from(bin_count);

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].cmp(&values[b]));

    let mut out = vec![0u32; values.len()];
    let mut start = 0usize;
    while start < order.len() {
        let value = values[order[start]];
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == value {
            end += 1;
        }
        // 1-based positions first = start + 1, last = end + 1
        let rank_sum = (start + end) as u64;
        let bin = (rank_sum * bins / (2 * n)) as u32 + 1;
        for &i in &order[start..=end] {
            out[i] = bin;
        }
        start = end + 1;
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
