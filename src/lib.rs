//! Core scoring pipeline for business-location feasibility analysis.
//!
//! Given a geographic point, a business category, and operating parameters,
//! the crate estimates market demand (population raster), competitive
//! density (nearby points of interest), and operational risk, then narrates
//! the result as pros/cons. HTTP routing, templating, and report rendering
//! live in the consuming service, not here.

pub mod analysis;
pub mod catalog;
pub mod competition;
pub mod config;
pub mod demand;
pub mod error;
pub mod insights;
pub mod predict;
pub mod risk;
pub mod score;
pub mod telemetry;

pub use analysis::{AnalysisRequest, AnalysisResult, AnalysisService};
pub use catalog::{BusinessProfile, CategoryCatalog};
pub use error::AnalysisError;
pub use score::ScoreSet;
