//! Category reference table: per-category budget/seating norms and the POI
//! tag filter used for competition queries.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Static per-category reference data. Loaded once at service construction
/// and treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub label: String,
    /// Typical budget range in lakh (lo, hi).
    pub budget_range: (f64, f64),
    /// Typical seating range; (0, 0) marks categories without seating.
    pub seating_range: (u32, u32),
    /// OSM tag filter used to find competing points of interest.
    pub poi_tags: BTreeMap<String, String>,
    pub description: String,
}

impl BusinessProfile {
    pub fn uses_seating(&self) -> bool {
        self.seating_range.1 > 0
    }

    fn validate(&self, key: &str) -> Result<(), CatalogError> {
        if self.label.trim().is_empty() {
            return Err(CatalogError::Invalid {
                key: key.to_string(),
                reason: "label must not be empty",
            });
        }
        if self.budget_range.0 > self.budget_range.1 {
            return Err(CatalogError::Invalid {
                key: key.to_string(),
                reason: "budget range low exceeds high",
            });
        }
        if self.seating_range.0 > self.seating_range.1 {
            return Err(CatalogError::Invalid {
                key: key.to_string(),
                reason: "seating range low exceeds high",
            });
        }
        if self.poi_tags.is_empty() {
            return Err(CatalogError::Invalid {
                key: key.to_string(),
                reason: "poi_tags must not be empty",
            });
        }
        Ok(())
    }
}

/// Normalizes a free-form category name for catalog lookup: trimmed,
/// lowercased, spaces and hyphens folded to underscores.
pub fn normalize_category(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

/// Mapping from normalized category key to [`BusinessProfile`], with a fixed
/// default profile for unknown or empty keys.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    profiles: BTreeMap<String, BusinessProfile>,
    default_key: String,
}

impl CategoryCatalog {
    /// The built-in category table shipped with the crate.
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert("cafe".to_string(), profile(
            "Cafe", (8.0, 25.0), (15, 60),
            &[("amenity", "cafe")],
            "Coffee shops and casual dining",
        ));
        profiles.insert("gym".to_string(), profile(
            "Gym / Fitness", (30.0, 120.0), (0, 0),
            &[("leisure", "fitness_centre")],
            "Fitness centers and gyms",
        ));
        profiles.insert("stationery".to_string(), profile(
            "Stationery / Print", (3.0, 12.0), (0, 0),
            &[("shop", "stationery")],
            "Office supplies and printing services",
        ));
        profiles.insert("hostel_mess".to_string(), profile(
            "Hostel Mess", (10.0, 40.0), (40, 200),
            &[("amenity", "restaurant")],
            "Student dining facilities",
        ));
        profiles.insert("restaurant".to_string(), profile(
            "Restaurant", (15.0, 80.0), (20, 100),
            &[("amenity", "restaurant")],
            "Full-service restaurants",
        ));
        profiles.insert("retail".to_string(), profile(
            "Retail Store", (5.0, 30.0), (0, 0),
            &[("shop", "general")],
            "General retail stores",
        ));

        Self {
            profiles,
            default_key: "cafe".to_string(),
        }
    }

    /// Loads a catalog override from a JSON file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read or parsed, any
    /// profile fails validation, or the declared default key is missing.
    pub fn from_json(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: CatalogFile = serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        let catalog = Self {
            profiles: file.categories,
            default_key: normalize_category(&file.default_category),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if !self.profiles.contains_key(&self.default_key) {
            return Err(CatalogError::MissingDefault {
                key: self.default_key.clone(),
            });
        }
        for (key, prof) in &self.profiles {
            prof.validate(key)?;
        }
        Ok(())
    }

    /// Resolves a free-form category name to `(normalized_key, profile)`.
    /// Unknown and empty names resolve to the default category.
    pub fn resolve(&self, name: &str) -> (&str, &BusinessProfile) {
        let normalized = normalize_category(name);
        match self.profiles.get_key_value(&normalized) {
            Some((key, prof)) => (key.as_str(), prof),
            None => {
                let prof = &self.profiles[&self.default_key];
                (self.default_key.as_str(), prof)
            }
        }
    }

    pub fn profile(&self, name: &str) -> &BusinessProfile {
        self.resolve(name).1
    }
}

fn profile(
    label: &str,
    budget_range: (f64, f64),
    seating_range: (u32, u32),
    tags: &[(&str, &str)],
    description: &str,
) -> BusinessProfile {
    BusinessProfile {
        label: label.to_string(),
        budget_range,
        seating_range,
        poi_tags: tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        description: description.to_string(),
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    default_category: String,
    categories: BTreeMap<String, BusinessProfile>,
}

#[derive(Debug)]
pub enum CatalogError {
    Io { path: String, source: std::io::Error },
    Parse { path: String, source: serde_json::Error },
    MissingDefault { key: String },
    Invalid { key: String, reason: &'static str },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io { path, .. } => write!(f, "unable to read catalog file {path}"),
            CatalogError::Parse { path, .. } => write!(f, "catalog file {path} is not valid JSON"),
            CatalogError::MissingDefault { key } => {
                write!(f, "default category '{key}' is not present in the catalog")
            }
            CatalogError::Invalid { key, reason } => {
                write!(f, "category '{key}' is invalid: {reason}")
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io { source, .. } => Some(source),
            CatalogError::Parse { source, .. } => Some(source),
            CatalogError::MissingDefault { .. } | CatalogError::Invalid { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn lookup_is_case_and_separator_insensitive() {
        let catalog = CategoryCatalog::builtin();
        let (a, _) = catalog.resolve("Hostel Mess");
        let (b, _) = catalog.resolve("hostel_mess");
        let (c, _) = catalog.resolve("hostel-mess");
        assert_eq!(a, "hostel_mess");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn unknown_and_empty_categories_fall_back_to_default() {
        let catalog = CategoryCatalog::builtin();
        let (key, prof) = catalog.resolve("food_truck");
        assert_eq!(key, "cafe");
        assert_eq!(prof.label, "Cafe");
        let (key, _) = catalog.resolve("  ");
        assert_eq!(key, "cafe");
    }

    #[test]
    fn builtin_profiles_are_internally_consistent() {
        let catalog = CategoryCatalog::builtin();
        catalog.validate().expect("builtin catalog validates");
        assert!(!catalog.profile("gym").uses_seating());
        assert!(catalog.profile("restaurant").uses_seating());
    }

    #[test]
    fn rejects_catalog_file_with_missing_default() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"default_category": "bakery", "categories": {{
                "cafe": {{"label": "Cafe", "budget_range": [8, 25],
                          "seating_range": [15, 60],
                          "poi_tags": {{"amenity": "cafe"}},
                          "description": "Coffee"}}
            }}}}"#
        )
        .expect("write catalog json");

        let err = CategoryCatalog::from_json(file.path()).expect_err("default must exist");
        assert!(matches!(err, CatalogError::MissingDefault { key } if key == "bakery"));
    }

    #[test]
    fn rejects_profile_with_inverted_budget_range() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"default_category": "cafe", "categories": {{
                "cafe": {{"label": "Cafe", "budget_range": [25, 8],
                          "seating_range": [15, 60],
                          "poi_tags": {{"amenity": "cafe"}},
                          "description": "Coffee"}}
            }}}}"#
        )
        .expect("write catalog json");

        let err = CategoryCatalog::from_json(file.path()).expect_err("range must be ordered");
        assert!(matches!(err, CatalogError::Invalid { reason, .. }
            if reason.contains("budget")));
    }
}
