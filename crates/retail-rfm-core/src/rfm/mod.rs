//! Quantile-based RFM (Recency, Frequency, Monetary) customer segmentation.
//!
//! Stages, each usable on its own:
//! 1. [`metrics`] -- per-customer recency, frequency and monetary value.
//! 2. [`scoring`] -- 1..=bin_count score per metric from quantile cut points.
//! 3. [`segments`] -- ordered business rules mapping scores to a label.
//! 4. [`summary`] -- customer and revenue share per segment.
//!
//! [`pipeline::run_rfm`] chains them behind an explicit [`config::RfmConfig`].

pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod scoring;
pub mod segments;
pub mod summary;

pub use config::{ResolvedConfig, RfmConfig, TieStrategy, DEFAULT_BIN_COUNT};
pub use metrics::{compute_customer_metrics, CustomerMetrics};
pub use pipeline::{run_rfm, RfmOutput};
pub use scoring::{score_customers, Metric, RfmScores, ScoredCustomer};
pub use segments::{assign_segment, Segment, SegmentedCustomer, SEGMENT_RULES};
pub use summary::{summarize_segments, SegmentSummary};
