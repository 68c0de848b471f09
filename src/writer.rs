// Presentation adapter: serializes comparison results without touching the engine

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    PitwallError,
    analysis::{AlignedSeries, ComparisonResult},
};

/// Values of one lap at a grid point
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RowValues {
    pub speed: Option<f64>,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub time: Option<f64>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
}

impl RowValues {
    fn at(series: &AlignedSeries, idx: usize) -> Self {
        Self {
            speed: series.speed[idx],
            throttle: series.throttle[idx],
            brake: series.brake[idx],
            time: series.time[idx],
            position_x: series.position_x[idx],
            position_y: series.position_y[idx],
        }
    }
}

/// One line of the aligned export
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AlignedRow {
    pub distance: f64,
    pub a: RowValues,
    pub b: RowValues,
    pub delta_time: Option<f64>,
}

/// Flatten the aligned pair of a comparison into per-distance rows
pub fn aligned_rows(result: &ComparisonResult) -> Result<Vec<AlignedRow>, PitwallError> {
    let aligned = result
        .aligned
        .as_ref()
        .ok_or_else(|| PitwallError::InvalidUserInput {
            field: "aligned-output".to_string(),
            reason: format!(
                "comparison has no aligned telemetry: {}",
                result.degraded_reason.as_deref().unwrap_or("alignment unavailable")
            ),
        })?;
    let delta = result.delta_time_series.as_deref().unwrap_or_default();

    Ok(aligned
        .distance_grid
        .iter()
        .enumerate()
        .map(|(idx, distance)| AlignedRow {
            distance: *distance,
            a: RowValues::at(&aligned.series_a, idx),
            b: RowValues::at(&aligned.series_b, idx),
            delta_time: delta.get(idx).copied().flatten(),
        })
        .collect())
}

pub fn comparison_to_string(
    result: &ComparisonResult,
    pretty: bool,
) -> Result<String, PitwallError> {
    if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    }
    .map_err(|e| PitwallError::ExportSerializeError { source: e })
}

/// Write a comparison as a single JSON document
pub fn write_comparison(
    file: &Path,
    result: &ComparisonResult,
    pretty: bool,
) -> Result<(), PitwallError> {
    let output_file = File::create(file).map_err(|e| PitwallError::WriterError { source: e })?;
    let mut output_writer = BufWriter::new(output_file);
    writeln!(output_writer, "{}", comparison_to_string(result, pretty)?)
        .map_err(|e| PitwallError::WriterError { source: e })?;
    output_writer
        .flush()
        .map_err(|e| PitwallError::WriterError { source: e })?;
    Ok(())
}

/// Write the aligned telemetry as JSON lines, one grid point per line
pub fn write_aligned_jsonl(file: &Path, result: &ComparisonResult) -> Result<(), PitwallError> {
    let rows = aligned_rows(result)?;
    serde_jsonlines::write_json_lines(file, &rows)
        .map_err(|e| PitwallError::WriterError { source: e })
}
