use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use siteline::analysis::{
    Calibration, CompetitionFallback, COMPETITION_STEP_FALLBACK_SCORE, MAX_POIS_IN_RESPONSE,
    NEUTRAL_COMPETITION_SCORE,
};
use siteline::catalog::CategoryCatalog;
use siteline::competition::cache::PoiCache;
use siteline::competition::{
    ElementKind, PoiFetcher, PoiSource, PoiSourceError, PointOfInterest,
};
use siteline::demand::{DemandFallback, DensitySampler};
use siteline::error::AnalysisError;
use siteline::predict::{PredictionInput, ViabilityPredictor};
use siteline::{AnalysisRequest, AnalysisService};

/// Programmable POI source that counts live queries.
struct StubSource {
    calls: Arc<AtomicUsize>,
    behavior: StubBehavior,
}

enum StubBehavior {
    Pois(Vec<PointOfInterest>),
    TransportFailure,
    DecodeFailure,
}

#[async_trait]
impl PoiSource for StubSource {
    async fn query(
        &self,
        _lat: f64,
        _lon: f64,
        _radius_m: u32,
        _tags: &BTreeMap<String, String>,
    ) -> Result<Vec<PointOfInterest>, PoiSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            StubBehavior::Pois(pois) => Ok(pois.clone()),
            StubBehavior::TransportFailure => {
                Err(PoiSourceError::Status(reqwest::StatusCode::BAD_GATEWAY))
            }
            StubBehavior::DecodeFailure => {
                Err(PoiSourceError::Decode("unexpected payload".to_string()))
            }
        }
    }
}

fn poi(name: &str) -> PointOfInterest {
    PointOfInterest {
        lat: 12.97,
        lon: 77.59,
        name: name.to_string(),
        kind: ElementKind::Node,
    }
}

struct Harness {
    service: AnalysisService<StubSource>,
    calls: Arc<AtomicUsize>,
    _cache_dir: tempfile::TempDir,
}

fn harness(behavior: StubBehavior) -> Harness {
    harness_with_sampler(behavior, DensitySampler::disabled())
}

fn harness_with_sampler(behavior: StubBehavior, sampler: DensitySampler) -> Harness {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache_dir = tempfile::tempdir().expect("temp cache dir");
    let source = StubSource {
        calls: Arc::clone(&calls),
        behavior,
    };
    let fetcher = PoiFetcher::new(source, PoiCache::new(cache_dir.path().to_path_buf()));
    let service = AnalysisService::new(
        CategoryCatalog::builtin(),
        sampler,
        Some(fetcher),
        ViabilityPredictor::default(),
    );
    Harness {
        service,
        calls,
        _cache_dir: cache_dir,
    }
}

fn located_cafe_request() -> AnalysisRequest {
    let mut request = AnalysisRequest::new("cafe");
    request.lat = Some(12.97);
    request.lon = Some(77.59);
    request.seating_capacity = 30;
    request
}

#[tokio::test]
async fn invalid_latitude_is_rejected_before_any_fetch() {
    let h = harness(StubBehavior::Pois(vec![poi("should not be fetched")]));
    let mut request = located_cafe_request();
    request.lat = Some(95.0);

    let err = h.service.analyze(&request).await.expect_err("invalid latitude");
    assert_eq!(err, AnalysisError::LatitudeOutOfRange(95.0));
    assert_eq!(h.calls.load(Ordering::SeqCst), 0, "no live query may fire");
}

#[tokio::test]
async fn quiet_cafe_scenario_degrades_to_documented_scores() {
    // No raster configured, zero POIs returned: demand 60, competition 20,
    // risk 50 + 8 (14h day) with budget and seating inside the cafe range.
    let h = harness(StubBehavior::Pois(Vec::new()));
    let result = h
        .service
        .analyze(&located_cafe_request())
        .await
        .expect("analysis succeeds");

    assert_eq!(result.scores.demand, 60);
    assert_eq!(result.scores.competition, 20);
    assert_eq!(result.scores.risk, 58);

    assert!(result
        .pros
        .iter()
        .any(|p| p.starts_with("Cafe format fits well")));
    assert_eq!(
        result.pros.last().map(String::as_str),
        Some("Analysis covers 500m radius.")
    );

    assert_eq!(result.debug.poi_count, 0);
    assert!(!result.debug.raster_used);
    assert_eq!(result.debug.mean_density, None);
    assert_eq!(
        result.debug.demand_fallback,
        Some(DemandFallback::RasterUnconfigured)
    );
    assert_eq!(result.debug.competition_fallback, None);
    assert!(result
        .summary
        .contains("demand 60, risk 58, competition 20"));
}

#[tokio::test]
async fn disabled_competition_signal_uses_neutral_baseline() {
    let h = harness(StubBehavior::Pois(vec![poi("ignored")]));
    let mut request = located_cafe_request();
    request.consider_competition = false;

    let result = h.service.analyze(&request).await.expect("analysis succeeds");
    assert_eq!(result.scores.competition, NEUTRAL_COMPETITION_SCORE);
    assert_eq!(
        result.debug.competition_fallback,
        Some(CompetitionFallback::DisabledByRequest)
    );
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_coordinates_degrade_both_signals() {
    let h = harness(StubBehavior::Pois(vec![poi("ignored")]));
    let mut request = AnalysisRequest::new("cafe");
    request.seating_capacity = 30;
    request.city = Some("Mysuru".to_string());

    let result = h.service.analyze(&request).await.expect("analysis succeeds");
    assert_eq!(result.scores.demand, 60);
    assert_eq!(result.scores.competition, NEUTRAL_COMPETITION_SCORE);
    assert_eq!(
        result.debug.demand_fallback,
        Some(DemandFallback::MissingCoordinates)
    );
    assert_eq!(
        result.debug.competition_fallback,
        Some(CompetitionFallback::MissingCoordinates)
    );
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        result.pros.last().map(String::as_str),
        Some("Analysis covers 500m radius in Mysuru.")
    );
}

#[tokio::test]
async fn transport_failure_reads_as_zero_competitors() {
    let h = harness(StubBehavior::TransportFailure);
    let result = h
        .service
        .analyze(&located_cafe_request())
        .await
        .expect("analysis succeeds");
    assert_eq!(result.scores.competition, 20);
    assert_eq!(result.debug.competition_fallback, None);
}

#[tokio::test]
async fn decode_failure_substitutes_step_fallback() {
    let h = harness(StubBehavior::DecodeFailure);
    let result = h
        .service
        .analyze(&located_cafe_request())
        .await
        .expect("analysis succeeds");
    assert_eq!(result.scores.competition, COMPETITION_STEP_FALLBACK_SCORE);
    assert_eq!(
        result.debug.competition_fallback,
        Some(CompetitionFallback::StepFailed)
    );
}

#[tokio::test]
async fn unconfigured_fetcher_substitutes_step_fallback() {
    let service: AnalysisService<StubSource> = AnalysisService::new(
        CategoryCatalog::builtin(),
        DensitySampler::disabled(),
        None,
        ViabilityPredictor::default(),
    );
    let result = service
        .analyze(&located_cafe_request())
        .await
        .expect("analysis succeeds");
    assert_eq!(result.scores.competition, COMPETITION_STEP_FALLBACK_SCORE);
    assert_eq!(
        result.debug.competition_fallback,
        Some(CompetitionFallback::StepFailed)
    );
}

#[tokio::test]
async fn poi_list_is_capped_but_count_reports_the_full_set() {
    let many: Vec<PointOfInterest> = (0..60).map(|i| poi(&format!("cafe {i}"))).collect();
    let h = harness(StubBehavior::Pois(many));
    let result = h
        .service
        .analyze(&located_cafe_request())
        .await
        .expect("analysis succeeds");

    assert_eq!(result.pois.len(), MAX_POIS_IN_RESPONSE);
    assert_eq!(result.debug.poi_count, 60);
    // 60 POIs in ~0.785 km² saturates the competition score.
    assert_eq!(result.scores.competition, 100);
    assert!(result
        .cons
        .iter()
        .any(|c| c.contains("Heavy competition")));
}

#[tokio::test]
async fn measured_density_feeds_demand_and_summary() {
    let mut raster = tempfile::NamedTempFile::new().expect("temp raster");
    write!(
        raster,
        "ncols 3\nnrows 3\nxllcorner 77.575\nyllcorner 12.955\ncellsize 0.01\nNODATA_value -9999\n\
         3000 3000 3000\n3000 3000 3000\n3000 3000 3000\n"
    )
    .expect("write raster");

    let sampler = DensitySampler::new(Some(raster.path().to_path_buf()));
    let h = harness_with_sampler(StubBehavior::Pois(Vec::new()), sampler);
    let result = h
        .service
        .analyze(&located_cafe_request())
        .await
        .expect("analysis succeeds");

    // 3000 of max 5000 => demand 60, this time measured.
    assert_eq!(result.scores.demand, 60);
    assert!(result.debug.raster_used);
    assert_eq!(result.debug.mean_density, Some(3000.0));
    assert_eq!(result.debug.demand_fallback, None);
    assert!(result.summary.contains("(population density: 3000.0)"));
}

#[tokio::test]
async fn calibration_rescales_the_conversions() {
    let h = harness(StubBehavior::Pois(vec![poi("lone rival")]));
    let service = h.service.with_calibration(Calibration {
        max_density: 5000.0,
        poi_density_scale: 30.0,
    });

    let result = service
        .analyze(&located_cafe_request())
        .await
        .expect("analysis succeeds");
    // 1 POI in ~0.785 km² at scale 30 => round(1.273 * 30) = 38.
    assert_eq!(result.scores.competition, 38);
}

#[tokio::test]
async fn predict_without_model_returns_fixed_fallback() {
    let h = harness(StubBehavior::Pois(Vec::new()));
    let prediction = h.service.predict(&PredictionInput {
        business_type: "cafe",
        city: "Bengaluru",
        budget_lakh: 12.0,
        seating_capacity: 30,
        radius_m: 500,
        demand_score: None,
    });
    assert_eq!(prediction.label, "Promising");
    assert!((prediction.confidence - 0.78).abs() < 1e-9);
    assert!(prediction.note.is_some());
}
