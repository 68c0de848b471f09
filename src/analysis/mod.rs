// Lap comparison engine: alignment, derived metrics and result assembly

pub mod aligner;
pub mod comparison;
pub mod metrics;

pub use aligner::{AlignedPair, AlignedSeries, Metric, align};
pub use comparison::{ComparisonResult, LapSummary, assemble};
pub use metrics::{LapMetrics, PairMetrics, compute_kpis, compute_pair_metrics};
