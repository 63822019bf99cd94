//! Optional learned-model viability prediction.
//!
//! The artifact is a logistic-regression bundle exported to JSON: one-hot
//! vocabularies for the categorical features, a numeric passthrough list,
//! coefficients, and an intercept. Unknown categorical values encode to an
//! all-zero one-hot block, matching the training-side "ignore unknowns"
//! encoder. If the artifact is missing or unreadable the predictor degrades
//! to a fixed plausible fallback instead of failing requests.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Demand score assumed when the caller supplies none.
pub const DEFAULT_DEMAND_SCORE: f64 = 60.0;

const FALLBACK_LABEL: &str = "Promising";
const FALLBACK_CONFIDENCE: f64 = 0.78;

#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub business_type_vocab: Vec<String>,
    pub city_vocab: Vec<String>,
    /// Numeric feature names in coefficient order, after the one-hot blocks.
    pub numeric_features: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

const KNOWN_NUMERIC: [&str; 4] = ["budget_lakh", "seating_capacity", "radius_m", "demand_score"];

impl ModelArtifact {
    /// # Errors
    ///
    /// Returns [`ModelError`] if the file is unreadable, not valid JSON, or
    /// internally inconsistent.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let artifact: Self = serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), ModelError> {
        let expected =
            self.business_type_vocab.len() + self.city_vocab.len() + self.numeric_features.len();
        if self.coefficients.len() != expected {
            return Err(ModelError::CoefficientMismatch {
                expected,
                actual: self.coefficients.len(),
            });
        }
        for name in &self.numeric_features {
            if !KNOWN_NUMERIC.contains(&name.as_str()) {
                return Err(ModelError::UnknownFeature { name: name.clone() });
            }
        }
        Ok(())
    }

    fn encode(&self, input: &PredictionInput<'_>) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.coefficients.len());

        let business_type = crate::catalog::normalize_category(input.business_type);
        for value in &self.business_type_vocab {
            row.push(if *value == business_type { 1.0 } else { 0.0 });
        }
        let city = input.city.trim().to_lowercase();
        for value in &self.city_vocab {
            row.push(if value.to_lowercase() == city { 1.0 } else { 0.0 });
        }

        for name in &self.numeric_features {
            row.push(match name.as_str() {
                "budget_lakh" => input.budget_lakh,
                "seating_capacity" => f64::from(input.seating_capacity),
                "radius_m" => f64::from(input.radius_m),
                "demand_score" => input.demand_score.unwrap_or(DEFAULT_DEMAND_SCORE),
                // validate() guarantees this is unreachable
                _ => 0.0,
            });
        }

        row
    }

    fn probability_promising(&self, input: &PredictionInput<'_>) -> f64 {
        let row = self.encode(input);
        let z: f64 = row
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.intercept;
        1.0 / (1.0 + (-z).exp())
    }
}

#[derive(Debug)]
pub enum ModelError {
    Io { path: String, source: std::io::Error },
    Parse { path: String, source: serde_json::Error },
    CoefficientMismatch { expected: usize, actual: usize },
    UnknownFeature { name: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Io { path, .. } => write!(f, "unable to read model artifact {path}"),
            ModelError::Parse { path, .. } => write!(f, "model artifact {path} is not valid JSON"),
            ModelError::CoefficientMismatch { expected, actual } => {
                write!(f, "model has {actual} coefficients, features require {expected}")
            }
            ModelError::UnknownFeature { name } => {
                write!(f, "model references unknown numeric feature '{name}'")
            }
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Io { source, .. } => Some(source),
            ModelError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Feature inputs for one viability prediction.
#[derive(Debug, Clone, Copy)]
pub struct PredictionInput<'a> {
    pub business_type: &'a str,
    pub city: &'a str,
    pub budget_lakh: f64,
    pub seating_capacity: u32,
    pub radius_m: u32,
    /// Preferably the demand score from a prior analysis run.
    pub demand_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbabilities {
    pub not_viable: f64,
    pub promising: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ClassProbabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Holds the loaded model artifact, constructed once at service start.
/// Missing or broken artifacts never fail the predictor; they select the
/// fallback path.
#[derive(Debug, Clone, Default)]
pub struct ViabilityPredictor {
    model: Option<ModelArtifact>,
}

impl ViabilityPredictor {
    pub fn new(model: Option<ModelArtifact>) -> Self {
        Self { model }
    }

    /// Loads the artifact from an optional configured path, downgrading any
    /// load failure to the fallback predictor.
    pub fn from_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("no model artifact configured; predictions use the fallback path");
            return Self::default();
        };
        match ModelArtifact::load(path) {
            Ok(model) => {
                info!(path = %path.display(), "loaded viability model artifact");
                Self::new(Some(model))
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "model artifact unusable, falling back");
                Self::default()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn predict(&self, input: &PredictionInput<'_>) -> Prediction {
        let Some(model) = &self.model else {
            return Prediction {
                label: FALLBACK_LABEL.to_string(),
                confidence: FALLBACK_CONFIDENCE,
                probabilities: None,
                note: Some("model not loaded, using fallback prediction".to_string()),
            };
        };

        let promising = model.probability_promising(input);
        let label = if promising >= 0.5 {
            "Promising"
        } else {
            "Not viable"
        };

        Prediction {
            label: label.to_string(),
            confidence: promising.max(1.0 - promising),
            probabilities: Some(ClassProbabilities {
                not_viable: 1.0 - promising,
                promising,
            }),
            note: None,
        }
    }
}
