use crate::catalog::CatalogError;
use crate::competition::PoiSourceError;

/// Request validation failure — the only error the analysis pipeline itself
/// surfaces to callers. Every downstream signal failure degrades to a
/// documented fallback instead.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnalysisError {
    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("radius_m {0} out of range [100, 5000]")]
    RadiusOutOfRange(u32),
    #[error("budget_lakh {0} out of range (0, 1000]")]
    BudgetOutOfRange(f64),
    #[error("seating_capacity {0} exceeds 1000")]
    SeatingOutOfRange(u32),
}

/// Startup failure while assembling the analysis service from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServiceBuildError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    PoiSource(#[from] PoiSourceError),
}
