//! # Shellbench Stats
//!
//! Pure numeric reduction for the harness: collecting readings into a
//! [`SampleSeries`], reducing it with [`summarize`], comparing two variants
//! with [`compare`] / [`ComparisonResult`], and turning summaries into
//! threshold [`recommend`]ations.

pub mod comparison;
pub mod recommendations;
pub mod series;
pub mod summary;

pub use comparison::{compare, ComparisonResult, Improvement};
pub use recommendations::{recommend, Thresholds, WITHIN_RANGES};
pub use series::SampleSeries;
pub use summary::{summarize, summarize_values, MetricSummaries, SummaryStatistics};
