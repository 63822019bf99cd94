//! Demand signal: mean population density within the catchment circle,
//! converted to a 0..=100 score.

pub mod raster;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::score::clamp_score;
use raster::AsciiGrid;

/// Score substituted when no density measurement is available.
pub const NEUTRAL_DEMAND_SCORE: u8 = 60;

/// Calibration ceiling: densities at or above this map to 100.
pub const DEFAULT_MAX_DENSITY: f64 = 5000.0;

/// Why a signal could not be measured. Absence is a legitimate outcome, not
/// an error; the reason is threaded into the response diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandFallback {
    DisabledByRequest,
    MissingCoordinates,
    RasterUnconfigured,
    RasterUnreadable,
    NoValidCells,
}

/// Outcome of a density sampling attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DensitySignal {
    Measured(f64),
    Unavailable(DemandFallback),
}

impl DensitySignal {
    pub fn measured(&self) -> Option<f64> {
        match self {
            Self::Measured(value) => Some(*value),
            Self::Unavailable(_) => None,
        }
    }
}

/// Samples mean population density from the configured raster.
///
/// Every failure path degrades to [`DensitySignal::Unavailable`] with a
/// warning log; this type never returns an error to its caller.
#[derive(Debug, Clone)]
pub struct DensitySampler {
    raster_path: Option<PathBuf>,
}

impl DensitySampler {
    pub fn new(raster_path: Option<PathBuf>) -> Self {
        Self { raster_path }
    }

    /// A sampler with no raster configured; every sample falls back.
    pub fn disabled() -> Self {
        Self { raster_path: None }
    }

    pub fn sample(&self, lat: f64, lon: f64, radius_m: u32) -> DensitySignal {
        let Some(path) = &self.raster_path else {
            warn!("population raster path not configured; demand falls back to neutral");
            return DensitySignal::Unavailable(DemandFallback::RasterUnconfigured);
        };

        let grid = match AsciiGrid::open(path) {
            Ok(grid) => grid,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "population raster unreadable");
                return DensitySignal::Unavailable(DemandFallback::RasterUnreadable);
            }
        };

        match grid.mean_within(lat, lon, f64::from(radius_m)) {
            Some(mean) => DensitySignal::Measured(mean),
            None => {
                warn!(lat, lon, radius_m, "catchment circle covers no valid raster cells");
                DensitySignal::Unavailable(DemandFallback::NoValidCells)
            }
        }
    }
}

/// Maps a raw density measurement to a 0..=100 demand score.
///
/// A missing measurement maps to the neutral score; a non-positive
/// `max_density` calibration is replaced by [`DEFAULT_MAX_DENSITY`].
pub fn density_to_score(mean_density: Option<f64>, max_density: f64) -> u8 {
    let Some(density) = mean_density else {
        return NEUTRAL_DEMAND_SCORE;
    };

    let max_density = if max_density > 0.0 {
        max_density
    } else {
        warn!(max_density, "non-positive max density calibration; using default");
        DEFAULT_MAX_DENSITY
    };

    clamp_score(100.0 * density / max_density)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn absent_density_maps_to_neutral_score() {
        assert_eq!(density_to_score(None, DEFAULT_MAX_DENSITY), 60);
    }

    #[test]
    fn score_is_monotone_and_saturates_at_max_density() {
        let max = 5000.0;
        let mut last = 0;
        for density in [0.0, 100.0, 1250.0, 2500.0, 4999.0, 5000.0, 20_000.0] {
            let score = density_to_score(Some(density), max);
            assert!(score >= last, "score must not decrease as density grows");
            last = score;
        }
        assert_eq!(density_to_score(Some(5000.0), max), 100);
        assert_eq!(density_to_score(Some(9000.0), max), 100);
        assert_eq!(density_to_score(Some(0.0), max), 0);
    }

    #[test]
    fn non_positive_max_density_falls_back_to_default() {
        assert_eq!(
            density_to_score(Some(2500.0), 0.0),
            density_to_score(Some(2500.0), DEFAULT_MAX_DENSITY)
        );
        assert_eq!(
            density_to_score(Some(2500.0), -10.0),
            density_to_score(Some(2500.0), DEFAULT_MAX_DENSITY)
        );
    }

    #[test]
    fn unconfigured_sampler_reports_fallback_reason() {
        let sampler = DensitySampler::disabled();
        let signal = sampler.sample(12.97, 77.59, 500);
        assert_eq!(
            signal,
            DensitySignal::Unavailable(DemandFallback::RasterUnconfigured)
        );
    }

    #[test]
    fn missing_raster_file_reports_unreadable() {
        let sampler = DensitySampler::new(Some("/definitely/not/here.asc".into()));
        let signal = sampler.sample(12.97, 77.59, 500);
        assert_eq!(
            signal,
            DensitySignal::Unavailable(DemandFallback::RasterUnreadable)
        );
    }

    #[test]
    fn samples_mean_from_raster_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp raster");
        write!(
            file,
            "ncols 3\nnrows 3\nxllcorner 77.575\nyllcorner 12.955\ncellsize 0.01\nNODATA_value -9999\n\
             200 200 200\n200 200 200\n200 200 200\n"
        )
        .expect("write raster");

        let sampler = DensitySampler::new(Some(file.path().to_path_buf()));
        let signal = sampler.sample(12.97, 77.59, 2_500);
        assert_eq!(signal.measured(), Some(200.0));
    }
}
