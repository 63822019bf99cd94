//! Overpass API client for nearby points of interest.
//!
//! The public Overpass instances are rate limited; callers are expected to
//! go through the on-disk cache in [`super::PoiFetcher`] rather than hitting
//! the live endpoint per request.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// OSM element kind the POI was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "node" => Some(Self::Node),
            "way" => Some(Self::Way),
            "relation" => Some(Self::Relation),
            _ => None,
        }
    }
}

/// A nearby point of interest with its representative center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub kind: ElementKind,
}

#[derive(Debug, thiserror::Error)]
pub enum PoiSourceError {
    #[error("spatial query transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("spatial query returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected spatial query payload: {0}")]
    Decode(String),
}

impl PoiSourceError {
    /// Transport-level failures (network, timeout, HTTP status) are absorbed
    /// by the fetcher as an empty result; anything else propagates.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status(_))
    }
}

/// Seam for the external spatial query service.
#[async_trait]
pub trait PoiSource: Send + Sync {
    async fn query(
        &self,
        lat: f64,
        lon: f64,
        radius_m: u32,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<PointOfInterest>, PoiSourceError>;
}

/// Production [`PoiSource`] backed by the Overpass interpreter endpoint.
pub struct OverpassClient {
    client: reqwest::Client,
    base_url: String,
}

impl OverpassClient {
    /// # Errors
    ///
    /// Returns [`PoiSourceError::Transport`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PoiSourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PoiSource for OverpassClient {
    async fn query(
        &self,
        lat: f64,
        lon: f64,
        radius_m: u32,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<PointOfInterest>, PoiSourceError> {
        let query = build_query(lat, lon, radius_m, tags);
        let resp = self
            .client
            .post(&self.base_url)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PoiSourceError::Status(status));
        }

        let raw = resp.text().await?;
        let body: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|err| PoiSourceError::Decode(err.to_string()))?;
        parse_elements(&body)
    }
}

/// Builds the union query requesting nodes, ways, and relations with their
/// representative centers.
fn build_query(lat: f64, lon: f64, radius_m: u32, tags: &BTreeMap<String, String>) -> String {
    let filters: String = tags
        .iter()
        .map(|(k, v)| format!("[\"{k}\"=\"{v}\"]"))
        .collect();
    format!(
        "[out:json][timeout:25];\n(\n  node{filters}(around:{radius_m},{lat},{lon});\n  way{filters}(around:{radius_m},{lat},{lon});\n  relation{filters}(around:{radius_m},{lat},{lon});\n);\nout center;"
    )
}

/// Parses Overpass elements. Ways and relations carry their coordinates in
/// a nested `center` object; entries without a resolvable center or with an
/// unknown kind are skipped.
fn parse_elements(body: &serde_json::Value) -> Result<Vec<PointOfInterest>, PoiSourceError> {
    let elements = body["elements"]
        .as_array()
        .ok_or_else(|| PoiSourceError::Decode("response has no elements array".to_string()))?;

    let mut pois = Vec::new();
    for element in elements {
        let lat = element["lat"]
            .as_f64()
            .or_else(|| element["center"]["lat"].as_f64());
        let lon = element["lon"]
            .as_f64()
            .or_else(|| element["center"]["lon"].as_f64());
        let (Some(lat), Some(lon)) = (lat, lon) else {
            continue;
        };

        let Some(kind) = element["type"].as_str().and_then(ElementKind::parse) else {
            continue;
        };

        let name = element["tags"]["name"]
            .as_str()
            .unwrap_or("Unnamed")
            .to_string();

        pois.push(PointOfInterest { lat, lon, name, kind });
    }

    Ok(pois)
}
