//! Competition signal: nearby same-category points of interest, fetched
//! cache-first from the spatial query service and converted to a 0..=100
//! score.

pub mod cache;
pub mod overpass;

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::score::clamp_score;
use cache::{cache_key, PoiCache};
pub use overpass::{ElementKind, OverpassClient, PoiSource, PoiSourceError, PointOfInterest};

/// Score when no competitors were detected. Distinct from "could not
/// measure": an empty catchment is itself informative.
pub const NO_COMPETITORS_SCORE: u8 = 20;

/// Score when the catchment area is degenerate (non-positive).
pub const INVALID_AREA_SCORE: u8 = 50;

/// City calibration: POIs per km² multiplied by this yield the raw score
/// (~15 POIs/km² saturates at 100 with the default).
pub const DEFAULT_POI_DENSITY_SCALE: f64 = 15.0;

/// Cache-first POI retrieval over a [`PoiSource`].
pub struct PoiFetcher<S> {
    source: S,
    cache: PoiCache,
}

impl<S: PoiSource> PoiFetcher<S> {
    pub fn new(source: S, cache: PoiCache) -> Self {
        Self { source, cache }
    }

    /// Fetches POIs around a point, consulting the cache before the live
    /// service. Transport-level source failures degrade to an empty result
    /// (and are not cached); payload decode failures propagate so the
    /// orchestrator can apply its own step-level fallback.
    ///
    /// # Errors
    ///
    /// Returns [`PoiSourceError`] only for non-transport failures.
    pub async fn fetch(
        &self,
        lat: f64,
        lon: f64,
        radius_m: u32,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<PointOfInterest>, PoiSourceError> {
        let key = cache_key(lat, lon, radius_m, tags);
        if let Some(cached) = self.cache.load(&key) {
            return Ok(cached);
        }

        match self.source.query(lat, lon, radius_m, tags).await {
            Ok(pois) => {
                info!(count = pois.len(), ?tags, "live poi query succeeded");
                self.cache.store(&key, &pois);
                Ok(pois)
            }
            Err(err) if err.is_transport() => {
                warn!(error = %err, "poi query transport failure, treating as zero results");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

/// Converts a POI count within the catchment into a competition score.
pub fn competition_score_from_pois(count: usize, radius_m: u32, scale: f64) -> u8 {
    if count == 0 {
        return NO_COMPETITORS_SCORE;
    }

    let area_km2 = std::f64::consts::PI * (f64::from(radius_m) / 1000.0).powi(2);
    if area_km2 <= 0.0 {
        warn!(radius_m, "degenerate catchment area for competition score");
        return INVALID_AREA_SCORE;
    }

    let density = count as f64 / area_km2;
    clamp_score(density * scale)
}
