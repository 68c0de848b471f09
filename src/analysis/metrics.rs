// Derived metrics: lap KPIs, delta-time, accelerations and sector deltas

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uom::si::acceleration::meter_per_second_squared;
use uom::si::f64::{Acceleration, Time, Velocity};
use uom::si::time::second;
use uom::si::velocity::kilometer_per_hour;

use super::aligner::AlignedPair;
use crate::PitwallError;
use crate::telemetry::{Lap, TelemetrySample};

/// Standard gravity, m/s^2
pub const G: f64 = 9.80665;

/// Number of timing sectors on a lap
pub const SECTOR_COUNT: usize = 3;

/// Convert an acceleration in m/s^2 to multiples of standard gravity
pub fn to_g(accel_mps2: f64) -> f64 {
    accel_mps2 / G
}

/// Per-lap part of the metrics bundle, computed on the lap's own telemetry
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapMetrics {
    /// km/h
    pub max_speed: f64,
    /// km/h
    pub mean_speed: f64,
    /// percent
    pub mean_throttle: f64,
    /// percent
    pub mean_brake: f64,
    /// m/s^2, one entry per consecutive sample pair. See [`longitudinal_accel`]
    pub longitudinal_accel: Vec<Option<f64>>,
    /// One entry per consecutive sample pair. See [`lateral_accel`]
    pub lateral_accel: Vec<Option<f64>>,
    /// Strongest longitudinal acceleration in G, `None` when no step gains speed
    pub peak_acceleration_g: Option<f64>,
    /// Strongest braking in G as a positive number, `None` when no step loses speed
    pub peak_deceleration_g: Option<f64>,
}

/// Pair-level part of the metrics bundle
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PairMetrics {
    /// Seconds, one entry per grid point. Positive where lap A arrives later
    pub delta_time_series: Vec<Option<f64>>,
    /// Seconds per sector, lap A minus lap B
    pub sector_delta: [f64; SECTOR_COUNT],
}

fn finite_values(
    series: &str,
    values: impl IntoIterator<Item = f64>,
) -> impl Iterator<Item = Result<f64, PitwallError>> {
    values.into_iter().map(move |v| {
        if v.is_finite() {
            Ok(v)
        } else {
            Err(PitwallError::NonFiniteValue {
                series: series.to_string(),
            })
        }
    })
}

/// Largest value of a series.
///
/// Fails on an empty series rather than inventing a value, and on a NaN or infinite entry
/// rather than skipping it.
pub fn max(series: &str, values: impl IntoIterator<Item = f64>) -> Result<f64, PitwallError> {
    finite_values(series, values)
        .process_results(|values| values.reduce(f64::max))?
        .ok_or_else(|| PitwallError::EmptySeries {
            series: series.to_string(),
        })
}

/// Arithmetic mean of a series. Same failure cases as [`max`].
pub fn mean(series: &str, values: impl IntoIterator<Item = f64>) -> Result<f64, PitwallError> {
    let (count, sum) = finite_values(series, values).process_results(|values| {
        values.fold((0usize, 0.), |(count, sum), v| (count + 1, sum + v))
    })?;
    if count == 0 {
        return Err(PitwallError::EmptySeries {
            series: series.to_string(),
        });
    }
    Ok(sum / count as f64)
}

/// Longitudinal acceleration between consecutive samples, m/s^2.
///
/// Entry `j` covers samples `j` and `j + 1`, so the result has one entry less than the input.
/// A step whose time does not move forward yields `None`, never NaN or infinity.
pub fn longitudinal_accel(samples: &[TelemetrySample]) -> Vec<Option<f64>> {
    samples
        .iter()
        .tuple_windows()
        .map(|(prev, next)| {
            let dt = next.time - prev.time;
            if !(dt > 0.) {
                return None;
            }
            let dv = Velocity::new::<kilometer_per_hour>(next.speed - prev.speed);
            let accel: Acceleration = dv / Time::new::<second>(dt);
            Some(accel.get::<meter_per_second_squared>()).filter(|a| a.is_finite())
        })
        .collect()
}

/// Lateral load estimate between consecutive samples.
///
/// This is a simplification, not a physical measurement: it is the Euclidean displacement in
/// track coordinates divided by the elapsed time. Steps where either sample lacks a position are
/// reported as exactly `0.0`. Steps with positions whose time does not move forward yield `None`.
pub fn lateral_accel(samples: &[TelemetrySample]) -> Vec<Option<f64>> {
    samples
        .iter()
        .tuple_windows()
        .map(|(prev, next)| match (prev.position(), next.position()) {
            (Some((x0, y0)), Some((x1, y1))) => {
                let dt = next.time - prev.time;
                if !(dt > 0.) {
                    return None;
                }
                Some((x1 - x0).hypot(y1 - y0) / dt).filter(|a| a.is_finite())
            }
            _ => Some(0.),
        })
        .collect()
}

/// Peak acceleration and peak deceleration of a longitudinal series, in G
pub fn peak_g(longitudinal: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    let steps = longitudinal.iter().flatten().copied();
    let acceleration = steps.clone().filter(|a| *a > 0.).reduce(f64::max);
    let deceleration = steps.filter(|a| *a < 0.).map(f64::abs).reduce(f64::max);
    (acceleration.map(to_g), deceleration.map(to_g))
}

/// Summary KPIs and acceleration series for one lap
pub fn compute_kpis(lap: &Lap) -> Result<LapMetrics, PitwallError> {
    let samples = &lap.telemetry;
    let series = |channel: &str| format!("{} lap {} {}", lap.driver_id, lap.lap_number, channel);
    let longitudinal = longitudinal_accel(samples);
    let (peak_acceleration_g, peak_deceleration_g) = peak_g(&longitudinal);

    Ok(LapMetrics {
        max_speed: max(&series("speed"), samples.iter().map(|s| s.speed))?,
        mean_speed: mean(&series("speed"), samples.iter().map(|s| s.speed))?,
        mean_throttle: mean(&series("throttle"), samples.iter().map(|s| s.throttle))?,
        mean_brake: mean(&series("brake"), samples.iter().map(|s| s.brake))?,
        longitudinal_accel: longitudinal,
        lateral_accel: lateral_accel(samples),
        peak_acceleration_g,
        peak_deceleration_g,
    })
}

/// Time gap of lap A over lap B at every grid point where both laps have data
pub fn delta_time(pair: &AlignedPair) -> Vec<Option<f64>> {
    pair.series_a
        .time
        .iter()
        .zip(&pair.series_b.time)
        .map(|(a, b)| Some((*a)? - (*b)?))
        .collect()
}

fn sector_times(lap: &Lap) -> Result<[f64; SECTOR_COUNT], PitwallError> {
    let recorded = lap.recorded_sectors();
    if recorded < SECTOR_COUNT {
        return Err(PitwallError::IncompleteSectorData {
            driver_id: lap.driver_id.clone(),
            lap_number: lap.lap_number,
            recorded,
        });
    }
    let mut sectors = [0.; SECTOR_COUNT];
    for (slot, time) in sectors.iter_mut().zip(lap.sector_times.iter().flatten()) {
        *slot = *time;
    }
    Ok(sectors)
}

/// Per-sector time difference, lap A minus lap B
pub fn sector_delta(lap_a: &Lap, lap_b: &Lap) -> Result<[f64; SECTOR_COUNT], PitwallError> {
    let sectors_a = sector_times(lap_a)?;
    let sectors_b = sector_times(lap_b)?;
    Ok(std::array::from_fn(|k| sectors_a[k] - sectors_b[k]))
}

/// Comparison-only metrics of an aligned pair
pub fn compute_pair_metrics(
    pair: &AlignedPair,
    lap_a: &Lap,
    lap_b: &Lap,
) -> Result<PairMetrics, PitwallError> {
    Ok(PairMetrics {
        delta_time_series: delta_time(pair),
        sector_delta: sector_delta(lap_a, lap_b)?,
    })
}
