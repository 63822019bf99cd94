//! Orchestrator: sequences the demand, competition, and risk signals per
//! request, applies the documented fallbacks, and assembles the response.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::CategoryCatalog;
use crate::competition::cache::PoiCache;
use crate::competition::{
    competition_score_from_pois, OverpassClient, PoiFetcher, PoiSource, PointOfInterest,
    DEFAULT_POI_DENSITY_SCALE,
};
use crate::config::ScoringConfig;
use crate::demand::{density_to_score, DemandFallback, DensitySampler, DensitySignal, DEFAULT_MAX_DENSITY};
use crate::error::{AnalysisError, ServiceBuildError};
use crate::insights::generate_insights;
use crate::predict::{Prediction, PredictionInput, ViabilityPredictor};
use crate::risk::{compute_risk, RiskComponent};
use crate::score::ScoreSet;

/// Competition baseline when the signal was not requested or no location
/// was provided.
pub const NEUTRAL_COMPETITION_SCORE: u8 = 45;

/// Safe fallback when the competition step itself failed — distinct from
/// the fetcher's own empty-result path (which scores 20).
pub const COMPETITION_STEP_FALLBACK_SCORE: u8 = 55;

/// Bound on the raw POI list included in a response.
pub const MAX_POIS_IN_RESPONSE: usize = 50;

/// One feasibility analysis request. Created per call, immutable after
/// validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub business_type: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_m: u32,
    pub budget_lakh: f64,
    pub seating_capacity: u32,
    /// `"HH:MM-HH:MM"`; a missing value assumes a standard working day.
    pub open_hours: Option<String>,
    pub use_population_density: bool,
    pub consider_competition: bool,
    pub notes: Option<String>,
}

impl AnalysisRequest {
    /// A request with the standard defaults: 500 m radius, 10 lakh budget,
    /// both signals enabled.
    pub fn new(business_type: impl Into<String>) -> Self {
        Self {
            business_type: business_type.into(),
            city: None,
            address: None,
            lat: None,
            lon: None,
            radius_m: 500,
            budget_lakh: 10.0,
            seating_capacity: 0,
            open_hours: Some("08:00-22:00".to_string()),
            use_population_density: true,
            consider_competition: true,
            notes: None,
        }
    }

    /// Structural validation; runs before any raster or network access.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] when a bound is violated.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if let Some(lat) = self.lat {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(AnalysisError::LatitudeOutOfRange(lat));
            }
        }
        if let Some(lon) = self.lon {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(AnalysisError::LongitudeOutOfRange(lon));
            }
        }
        if !(100..=5000).contains(&self.radius_m) {
            return Err(AnalysisError::RadiusOutOfRange(self.radius_m));
        }
        if !(self.budget_lakh > 0.0 && self.budget_lakh <= 1000.0) {
            return Err(AnalysisError::BudgetOutOfRange(self.budget_lakh));
        }
        if self.seating_capacity > 1000 {
            return Err(AnalysisError::SeatingOutOfRange(self.seating_capacity));
        }
        Ok(())
    }

    /// A usable location requires both halves of the pair.
    fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Why the competition score is a substitute rather than a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionFallback {
    DisabledByRequest,
    MissingCoordinates,
    StepFailed,
}

/// Degradation record: which signals fell back and why, plus the raw
/// measurements. The only place partial degradation is visible to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisDiagnostics {
    pub poi_count: usize,
    pub mean_density: Option<f64>,
    pub raster_used: bool,
    pub business_type: String,
    pub radius_m: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demand_fallback: Option<DemandFallback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competition_fallback: Option<CompetitionFallback>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub risk_components: Vec<RiskComponent>,
}

/// Full analysis response; exists only for one request/response cycle.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub scores: ScoreSet,
    pub debug: AnalysisDiagnostics,
    /// Bounded prefix of the raw POI list (see [`MAX_POIS_IN_RESPONSE`]).
    pub pois: Vec<PointOfInterest>,
}

/// Scaling constants for the raw-signal-to-score conversions.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    pub max_density: f64,
    pub poi_density_scale: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            max_density: DEFAULT_MAX_DENSITY,
            poi_density_scale: DEFAULT_POI_DENSITY_SCALE,
        }
    }
}

/// The analysis service: catalog, samplers, and the loaded model held as
/// fields, constructed once at process start and shared by reference.
pub struct AnalysisService<S> {
    catalog: CategoryCatalog,
    sampler: DensitySampler,
    fetcher: Option<PoiFetcher<S>>,
    predictor: ViabilityPredictor,
    calibration: Calibration,
}

impl AnalysisService<OverpassClient> {
    /// Assembles the production service from configuration. Model-artifact
    /// problems downgrade to the fallback predictor; catalog and HTTP
    /// client problems are startup errors.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceBuildError`] if the catalog override is invalid or
    /// the HTTP client cannot be built.
    pub fn from_config(config: &ScoringConfig) -> Result<Self, ServiceBuildError> {
        let catalog = match &config.catalog_path {
            Some(path) => CategoryCatalog::from_json(path)?,
            None => CategoryCatalog::builtin(),
        };
        let sampler = DensitySampler::new(config.raster_path.clone());
        let client = OverpassClient::new(config.overpass_url.clone(), config.http_timeout)?;
        let fetcher = PoiFetcher::new(client, PoiCache::new(config.cache_dir.clone()));
        let predictor = ViabilityPredictor::from_path(config.model_path.as_deref());

        Ok(Self::new(catalog, sampler, Some(fetcher), predictor).with_calibration(Calibration {
            max_density: config.max_density,
            poi_density_scale: config.poi_density_scale,
        }))
    }
}

impl<S: PoiSource> AnalysisService<S> {
    pub fn new(
        catalog: CategoryCatalog,
        sampler: DensitySampler,
        fetcher: Option<PoiFetcher<S>>,
        predictor: ViabilityPredictor,
    ) -> Self {
        Self {
            catalog,
            sampler,
            fetcher,
            predictor,
            calibration: Calibration::default(),
        }
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Runs the full scoring pipeline for one request.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] only for structurally invalid input; every
    /// downstream signal failure degrades to its documented fallback.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        request.validate()?;
        let coordinates = request.coordinates();

        // 1) Demand from the population raster.
        let density = if !request.use_population_density {
            DensitySignal::Unavailable(DemandFallback::DisabledByRequest)
        } else {
            match coordinates {
                Some((lat, lon)) => self.sampler.sample(lat, lon, request.radius_m),
                None => DensitySignal::Unavailable(DemandFallback::MissingCoordinates),
            }
        };
        let mean_density = density.measured();
        let demand = density_to_score(mean_density, self.calibration.max_density);
        let demand_fallback = match density {
            DensitySignal::Measured(_) => None,
            DensitySignal::Unavailable(reason) => Some(reason),
        };

        // 2) Competition from nearby POIs.
        let (competition, pois, competition_fallback) =
            self.competition_step(request, coordinates).await;

        // 3) Risk.
        let (_, profile) = self.catalog.resolve(&request.business_type);
        let assessment = compute_risk(
            profile,
            request.budget_lakh,
            request.seating_capacity,
            request.open_hours.as_deref(),
            demand,
            competition,
        );

        // 4) Narrative.
        let insights = generate_insights(
            &request.business_type,
            demand,
            assessment.score,
            competition,
            request.city.as_deref(),
            request.radius_m,
        );

        let location = request.city.as_deref().unwrap_or("this area");
        let density_note = mean_density
            .map(|d| format!(" (population density: {d:.1})"))
            .unwrap_or_default();
        let summary = format!(
            "Feasibility analysis for a {} in {}: demand {}, risk {}, competition {}{}.",
            profile.label.to_lowercase(),
            location,
            demand,
            assessment.score,
            competition,
            density_note,
        );

        info!(
            demand,
            risk = assessment.score,
            competition,
            poi_count = pois.len(),
            "analysis complete"
        );

        let poi_count = pois.len();
        let mut pois = pois;
        pois.truncate(MAX_POIS_IN_RESPONSE);

        Ok(AnalysisResult {
            summary,
            pros: insights.pros,
            cons: insights.cons,
            scores: ScoreSet {
                demand,
                risk: assessment.score,
                competition,
            },
            debug: AnalysisDiagnostics {
                poi_count,
                mean_density,
                raster_used: mean_density.is_some(),
                business_type: request.business_type.clone(),
                radius_m: request.radius_m,
                demand_fallback,
                competition_fallback,
                risk_components: assessment.components,
            },
            pois,
        })
    }

    async fn competition_step(
        &self,
        request: &AnalysisRequest,
        coordinates: Option<(f64, f64)>,
    ) -> (u8, Vec<PointOfInterest>, Option<CompetitionFallback>) {
        if !request.consider_competition {
            return (
                NEUTRAL_COMPETITION_SCORE,
                Vec::new(),
                Some(CompetitionFallback::DisabledByRequest),
            );
        }
        let Some((lat, lon)) = coordinates else {
            return (
                NEUTRAL_COMPETITION_SCORE,
                Vec::new(),
                Some(CompetitionFallback::MissingCoordinates),
            );
        };
        let Some(fetcher) = &self.fetcher else {
            warn!("poi fetcher unavailable, substituting safe competition fallback");
            return (
                COMPETITION_STEP_FALLBACK_SCORE,
                Vec::new(),
                Some(CompetitionFallback::StepFailed),
            );
        };

        let (_, profile) = self.catalog.resolve(&request.business_type);
        match fetcher.fetch(lat, lon, request.radius_m, &profile.poi_tags).await {
            Ok(pois) => {
                let score = competition_score_from_pois(
                    pois.len(),
                    request.radius_m,
                    self.calibration.poi_density_scale,
                );
                (score, pois, None)
            }
            Err(err) => {
                warn!(error = %err, "competition step failed, substituting safe fallback");
                (
                    COMPETITION_STEP_FALLBACK_SCORE,
                    Vec::new(),
                    Some(CompetitionFallback::StepFailed),
                )
            }
        }
    }

    /// Learned-model viability prediction; independent of [`Self::analyze`].
    pub fn predict(&self, input: &PredictionInput<'_>) -> Prediction {
        self.predictor.predict(input)
    }
}
