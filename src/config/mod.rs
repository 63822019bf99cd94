use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::competition::overpass::DEFAULT_OVERPASS_URL;
use crate::competition::DEFAULT_POI_DENSITY_SCALE;
use crate::demand::DEFAULT_MAX_DENSITY;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the scoring service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig::load()?,
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the scoring pipeline and its external collaborators.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Population raster (ESRI ASCII grid); unset disables the demand signal.
    pub raster_path: Option<PathBuf>,
    /// Calibration ceiling for density-to-score conversion.
    pub max_density: f64,
    /// Directory holding the on-disk POI cache.
    pub cache_dir: PathBuf,
    pub overpass_url: String,
    /// Bounded timeout applied to every outbound spatial query.
    pub http_timeout: Duration,
    /// POIs-per-km² multiplier for the competition score.
    pub poi_density_scale: f64,
    /// Learned-model artifact; unset selects the fallback predictor.
    pub model_path: Option<PathBuf>,
    /// Category catalog override; unset uses the built-in table.
    pub catalog_path: Option<PathBuf>,
}

impl ScoringConfig {
    fn load() -> Result<Self, ConfigError> {
        let raster_path = env::var("SITELINE_POP_RASTER_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        // Calibration knobs substitute their defaults rather than failing:
        // a bad calibration must not take analysis down.
        let max_density = positive_or_default("SITELINE_MAX_DENSITY", DEFAULT_MAX_DENSITY);
        let poi_density_scale =
            positive_or_default("SITELINE_POI_DENSITY_SCALE", DEFAULT_POI_DENSITY_SCALE);

        let cache_dir = env::var("SITELINE_CACHE_DIR")
            .unwrap_or_else(|_| "cache/pois".to_string())
            .into();
        let overpass_url =
            env::var("SITELINE_OVERPASS_URL").unwrap_or_else(|_| DEFAULT_OVERPASS_URL.to_string());

        let timeout_secs = env::var("SITELINE_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let model_path = env::var("SITELINE_MODEL_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let catalog_path = env::var("SITELINE_CATALOG_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            raster_path,
            max_density,
            cache_dir,
            overpass_url,
            http_timeout: Duration::from_secs(timeout_secs),
            poi_density_scale,
            model_path,
            catalog_path,
        })
    }
}

fn positive_or_default(var: &str, default: f64) -> f64 {
    match env::var(var) {
        Err(_) => default,
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(value) if value > 0.0 => value,
            _ => {
                warn!(var, raw, "calibration value must be a positive number; using default");
                default
            }
        },
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout => {
                write!(f, "SITELINE_HTTP_TIMEOUT_SECS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
