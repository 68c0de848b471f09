use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::PitwallError;
use crate::telemetry::{Lap, TelemetrySample};

/// Telemetry channels carried onto the shared distance grid
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Metric {
    Speed,
    Throttle,
    Brake,
    Time,
    PositionX,
    PositionY,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Speed,
        Metric::Throttle,
        Metric::Brake,
        Metric::Time,
        Metric::PositionX,
        Metric::PositionY,
    ];

    fn sample_value(&self, sample: &TelemetrySample) -> Option<f64> {
        match self {
            Metric::Speed => Some(sample.speed),
            Metric::Throttle => Some(sample.throttle),
            Metric::Brake => Some(sample.brake),
            Metric::Time => Some(sample.time),
            Metric::PositionX => sample.position_x,
            Metric::PositionY => sample.position_y,
        }
    }
}

/// One lap resampled onto a distance grid. `None` marks grid points with no data.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AlignedSeries {
    pub speed: Vec<Option<f64>>,
    pub throttle: Vec<Option<f64>>,
    pub brake: Vec<Option<f64>>,
    pub time: Vec<Option<f64>>,
    pub position_x: Vec<Option<f64>>,
    pub position_y: Vec<Option<f64>>,
}

impl AlignedSeries {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            speed: Vec::with_capacity(capacity),
            throttle: Vec::with_capacity(capacity),
            brake: Vec::with_capacity(capacity),
            time: Vec::with_capacity(capacity),
            position_x: Vec::with_capacity(capacity),
            position_y: Vec::with_capacity(capacity),
        }
    }

    pub fn get(&self, metric: Metric) -> &[Option<f64>] {
        match metric {
            Metric::Speed => &self.speed,
            Metric::Throttle => &self.throttle,
            Metric::Brake => &self.brake,
            Metric::Time => &self.time,
            Metric::PositionX => &self.position_x,
            Metric::PositionY => &self.position_y,
        }
    }

    fn get_mut(&mut self, metric: Metric) -> &mut Vec<Option<f64>> {
        match metric {
            Metric::Speed => &mut self.speed,
            Metric::Throttle => &mut self.throttle,
            Metric::Brake => &mut self.brake,
            Metric::Time => &mut self.time,
            Metric::PositionX => &mut self.position_x,
            Metric::PositionY => &mut self.position_y,
        }
    }

    /// Number of grid points with a resolved sample
    pub fn resolved_points(&self) -> usize {
        self.time.iter().flatten().count()
    }
}

/// Two laps resampled onto the same strictly increasing distance grid
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AlignedPair {
    pub distance_grid: Vec<f64>,
    pub series_a: AlignedSeries,
    pub series_b: AlignedSeries,
}

impl AlignedPair {
    pub fn len(&self) -> usize {
        self.distance_grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance_grid.is_empty()
    }
}

/// Validate that a lap can be resampled and return its covered distance range
fn alignable_range(lap: &Lap) -> Result<(f64, f64), PitwallError> {
    let samples = &lap.telemetry;
    if samples.len() < 2 {
        return Err(PitwallError::Alignment {
            reason: format!(
                "{} lap {} has {} telemetry samples, at least 2 are needed",
                lap.driver_id,
                lap.lap_number,
                samples.len()
            ),
        });
    }
    if samples.iter().any(|s| !s.distance.is_finite()) {
        return Err(PitwallError::Alignment {
            reason: format!(
                "{} lap {} has non-finite distances",
                lap.driver_id, lap.lap_number
            ),
        });
    }
    if samples
        .iter()
        .tuple_windows()
        .any(|(prev, next)| next.distance < prev.distance)
    {
        return Err(PitwallError::Alignment {
            reason: format!(
                "{} lap {} telemetry is not ordered by distance",
                lap.driver_id, lap.lap_number
            ),
        });
    }

    Ok((samples[0].distance, samples[samples.len() - 1].distance))
}

/// Resample a lap onto the grid with the nearest-preceding rule.
///
/// Grid points outside the lap's own distance range stay unresolved.
fn resample(samples: &[TelemetrySample], range: (f64, f64), grid: &[f64]) -> AlignedSeries {
    let (start, end) = range;
    let mut series = AlignedSeries::with_capacity(grid.len());
    for &distance in grid {
        let sample = if distance < start || distance > end {
            None
        } else {
            samples
                .partition_point(|s| s.distance <= distance)
                .checked_sub(1)
                .map(|idx| &samples[idx])
        };
        for metric in Metric::ALL {
            series
                .get_mut(metric)
                .push(sample.and_then(|s| metric.sample_value(s)));
        }
    }
    series
}

/// Resample two laps onto a shared distance grid.
///
/// The grid is the sorted, de-duplicated union of both laps' sample distances. For each grid
/// point `d` each lap contributes its latest sample with `distance <= d`, and nothing before its
/// first or after its last sample.
///
/// Fails with [`PitwallError::Alignment`] when either lap has fewer than two samples, carries
/// distances that are not finite or not ordered, or when the two laps' distance ranges do not
/// overlap.
pub fn align(lap_a: &Lap, lap_b: &Lap) -> Result<AlignedPair, PitwallError> {
    let range_a = alignable_range(lap_a)?;
    let range_b = alignable_range(lap_b)?;

    if range_a.1 < range_b.0 || range_b.1 < range_a.0 {
        return Err(PitwallError::Alignment {
            reason: format!(
                "distance ranges do not overlap: {:.1}-{:.1}m vs {:.1}-{:.1}m",
                range_a.0, range_a.1, range_b.0, range_b.1
            ),
        });
    }

    let distance_grid = lap_a
        .telemetry
        .iter()
        .chain(lap_b.telemetry.iter())
        .map(|s| s.distance)
        .sorted_by(f64::total_cmp)
        .dedup()
        .collect_vec();

    let series_a = resample(&lap_a.telemetry, range_a, &distance_grid);
    let series_b = resample(&lap_b.telemetry, range_b, &distance_grid);

    debug!(
        "Aligned {} ({} samples) and {} ({} samples) onto {} grid points",
        lap_a.driver_id,
        lap_a.telemetry.len(),
        lap_b.driver_id,
        lap_b.telemetry.len(),
        distance_grid.len()
    );

    Ok(AlignedPair {
        distance_grid,
        series_a,
        series_b,
    })
}
