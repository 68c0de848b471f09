use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::aligner::{AlignedPair, align};
use super::metrics::{
    self, LapMetrics, PairMetrics, SECTOR_COUNT, compute_kpis, compute_pair_metrics,
};
use crate::PitwallError;
use crate::telemetry::Lap;

/// Identifying data of a compared lap
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapSummary {
    pub driver_id: String,
    pub lap_number: u32,
    pub lap_time: Option<f64>,
    pub sector_times: Vec<Option<f64>>,
    pub samples: usize,
}

impl From<&Lap> for LapSummary {
    fn from(lap: &Lap) -> Self {
        Self {
            driver_id: lap.driver_id.clone(),
            lap_number: lap.lap_number,
            lap_time: lap.lap_time,
            sector_times: lap.sector_times.clone(),
            samples: lap.telemetry.len(),
        }
    }
}

/// Everything presentation needs to show a two-lap comparison.
///
/// When the laps cannot be aligned the result is degraded: `aligned` and `delta_time_series`
/// are unset and `degraded_reason` says why, while per-lap metrics and sector deltas are still
/// populated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub lap_a: LapSummary,
    pub lap_b: LapSummary,
    pub metrics_a: LapMetrics,
    pub metrics_b: LapMetrics,
    /// Seconds, lap A minus lap B, when both laps were timed
    pub lap_time_delta: Option<f64>,
    pub sector_delta: [f64; SECTOR_COUNT],
    pub aligned: Option<AlignedPair>,
    pub delta_time_series: Option<Vec<Option<f64>>>,
    pub degraded_reason: Option<String>,
}

impl ComparisonResult {
    pub fn is_degraded(&self) -> bool {
        self.aligned.is_none()
    }

    /// Time gap at the end of the aligned distance, the last grid point both laps reached
    pub fn final_delta(&self) -> Option<f64> {
        self.delta_time_series.as_ref()?.iter().rev().flatten().next().copied()
    }
}

/// Compare two laps.
///
/// Alignment failures degrade the result instead of failing it. Missing telemetry and
/// incomplete sector data are propagated.
pub fn assemble(lap_a: &Lap, lap_b: &Lap) -> Result<ComparisonResult, PitwallError> {
    let metrics_a = compute_kpis(lap_a)?;
    let metrics_b = compute_kpis(lap_b)?;

    let (aligned, delta_time_series, sector_delta, degraded_reason) = match align(lap_a, lap_b) {
        Ok(pair) => {
            let PairMetrics {
                delta_time_series,
                sector_delta,
            } = compute_pair_metrics(&pair, lap_a, lap_b)?;
            (Some(pair), Some(delta_time_series), sector_delta, None)
        }
        Err(e) if e.is_recoverable() => {
            warn!(
                "Comparing {} lap {} with {} lap {} without alignment: {}",
                lap_a.driver_id, lap_a.lap_number, lap_b.driver_id, lap_b.lap_number, e
            );
            let sector_delta = metrics::sector_delta(lap_a, lap_b)?;
            (None, None, sector_delta, Some(e.to_string()))
        }
        Err(e) => return Err(e),
    };

    let lap_time_delta = lap_a
        .timed_lap_time()
        .zip(lap_b.timed_lap_time())
        .map(|(a, b)| a - b);

    debug!(
        "Assembled comparison of {} lap {} and {} lap {}",
        lap_a.driver_id, lap_a.lap_number, lap_b.driver_id, lap_b.lap_number
    );

    Ok(ComparisonResult {
        lap_a: LapSummary::from(lap_a),
        lap_b: LapSummary::from(lap_b),
        metrics_a,
        metrics_b,
        lap_time_delta,
        sector_delta,
        aligned,
        delta_time_series,
        degraded_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetrySample;

    fn lap(driver: &str, distances: &[f64], speeds: &[f64], sectors: [f64; 3]) -> Lap {
        let telemetry = distances
            .iter()
            .zip(speeds)
            .enumerate()
            .map(|(i, (d, v))| TelemetrySample::new(*d, i as f64 * 0.1, *v).with_inputs(90., 10.))
            .collect();
        Lap::new(driver, 1, sectors.iter().sum())
            .with_sectors(sectors)
            .with_telemetry(telemetry)
    }

    #[test]
    fn test_full_comparison() {
        let lap_a = lap("A", &[0., 10., 20.], &[200., 210., 220.], [28.1, 31.4, 29.8]);
        let lap_b = lap("B", &[0., 15., 20.], &[195., 205., 215.], [27.9, 31.6, 29.5]);

        let result = assemble(&lap_a, &lap_b).unwrap();
        assert!(!result.is_degraded());
        assert!(result.degraded_reason.is_none());

        let aligned = result.aligned.as_ref().unwrap();
        assert_eq!(aligned.distance_grid, vec![0., 10., 15., 20.]);
        assert_eq!(result.delta_time_series.as_ref().unwrap().len(), 4);
        assert_eq!(result.metrics_a.max_speed, 220.);
        assert_eq!(result.metrics_b.max_speed, 215.);
        assert!((result.lap_time_delta.unwrap() - 0.3).abs() < 1e-9);
        assert!((result.sector_delta[2] - 0.3).abs() < 1e-9);
        assert!(result.final_delta().unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_single_sample_lap_degrades() {
        let lap_a = lap("A", &[0.], &[180.], [28.1, 31.4, 29.8]);
        let lap_b = lap("B", &[0., 15., 20.], &[195., 205., 215.], [27.9, 31.6, 29.5]);

        let result = assemble(&lap_a, &lap_b).unwrap();
        assert!(result.is_degraded());
        assert!(result.delta_time_series.is_none());
        assert!(result.final_delta().is_none());
        assert!(result.degraded_reason.as_ref().unwrap().contains("at least 2"));
        assert_eq!(result.metrics_a.max_speed, 180.);
        assert_eq!(result.metrics_b.max_speed, 215.);
        assert!((result.metrics_b.mean_speed - 205.).abs() < 1e-9);
        assert!((result.sector_delta[0] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_laps_degrade() {
        let lap_a = lap("A", &[0., 10.], &[180., 190.], [28.1, 31.4, 29.8]);
        let lap_b = lap("B", &[50., 60.], &[195., 205.], [27.9, 31.6, 29.5]);

        let result = assemble(&lap_a, &lap_b).unwrap();
        assert!(result.is_degraded());
        assert!(result.degraded_reason.unwrap().contains("do not overlap"));
    }

    #[test]
    fn test_empty_lap_propagates() {
        let lap_a = lap("A", &[], &[], [28.1, 31.4, 29.8]);
        let lap_b = lap("B", &[0., 15., 20.], &[195., 205., 215.], [27.9, 31.6, 29.5]);
        assert!(matches!(
            assemble(&lap_a, &lap_b),
            Err(PitwallError::EmptySeries { .. })
        ));
    }

    #[test]
    fn test_incomplete_sectors_propagate_even_when_degraded() {
        let lap_a = lap("A", &[0.], &[180.], [28.1, 31.4, 29.8]);
        let mut lap_b = lap("B", &[0., 15., 20.], &[195., 205., 215.], [27.9, 31.6, 29.5]);
        lap_b.sector_times.pop();
        assert!(matches!(
            assemble(&lap_a, &lap_b),
            Err(PitwallError::IncompleteSectorData { .. })
        ));
    }

    #[test]
    fn test_untimed_lap_has_no_lap_time_delta() {
        let lap_a = lap("A", &[0., 10., 20.], &[200., 210., 220.], [28.1, 31.4, 29.8]);
        let mut lap_b = lap("B", &[0., 15., 20.], &[195., 205., 215.], [27.9, 31.6, 29.5]);
        lap_b.lap_time = None;
        let result = assemble(&lap_a, &lap_b).unwrap();
        assert!(result.lap_time_delta.is_none());
    }
}
