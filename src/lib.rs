// Library interface for pitwall
// This allows integration tests and benchmarks to access internal modules

pub mod analysis;
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod writer;

// Re-export commonly used types
pub use analysis::{AlignedPair, ComparisonResult, LapMetrics, PairMetrics, align, assemble};
pub use errors::PitwallError;
pub use telemetry::{
    FileLapProvider, Lap, LapProvider, LapQuery, LapSelector, SessionKey, SessionType,
    TelemetrySample,
};
