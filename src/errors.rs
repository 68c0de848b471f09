// Error types for pitwall

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum PitwallError {
    // Errors reported by the lap provider
    #[snafu(display("Lap unavailable: {reason}"))]
    LapUnavailable { reason: String },

    // Errors raised by the comparison engine
    #[snafu(display("Unable to align laps: {reason}"))]
    Alignment { reason: String },
    #[snafu(display(
        "Incomplete sector data for {driver_id} lap {lap_number}: {recorded} of 3 sectors recorded"
    ))]
    IncompleteSectorData {
        driver_id: String,
        lap_number: u32,
        recorded: usize,
    },
    #[snafu(display("Cannot aggregate empty series: {series}"))]
    EmptySeries { series: String },
    #[snafu(display("Series contains a NaN or infinite value: {series}"))]
    NonFiniteValue { series: String },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Errors for the comparison writer
    #[snafu(display("Error writing comparison output"))]
    WriterError { source: io::Error },
    #[snafu(display("Error serializing comparison output"))]
    ExportSerializeError { source: serde_json::Error },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },
}

impl PitwallError {
    /// Whether the assembler can degrade the comparison instead of failing it
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PitwallError::Alignment { .. })
    }
}
