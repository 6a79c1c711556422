//! Normalized packages and the in-memory catalog

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::index::{PackageIndex, PackageInfo, RawPackageEntry};

/// A package as consumed by search, filtering and resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Unique identifier, e.g. "github.com/LiteLDev/LeviLamina"
    pub tooth: String,

    /// Display metadata from the index
    pub info: PackageInfo,

    /// Star count
    pub stars: u64,

    /// Last update timestamp, verbatim
    pub updated: String,

    /// Published versions, oldest first
    pub versions: Vec<String>,
}

impl Package {
    fn from_entry(tooth: String, entry: RawPackageEntry) -> Self {
        let mut versions: Vec<String> = entry.versions.into_keys().collect();
        sort_versions(&mut versions);

        Self {
            tooth,
            info: entry.info,
            stars: entry.stars,
            updated: entry.updated_at,
            versions,
        }
    }

    /// The newest published version
    pub fn latest_version(&self) -> Option<&str> {
        self.versions.last().map(|s| s.as_str())
    }

    /// Whether `version` is literally one of the published versions
    pub fn has_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    /// Parsed `updated` timestamp
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated)
    }

    /// Whether every tag in `tags` is on this package
    pub fn has_all_tags<'a>(&self, mut tags: impl Iterator<Item = &'a String>) -> bool {
        tags.all(|tag| self.info.tags.contains(tag))
    }
}

/// Sort versions ascending by semver precedence.
///
/// Versions that are not valid semver keep their document order and sort
/// before every valid one, so the last element is always the newest
/// release the index knows how to compare.
fn sort_versions(versions: &mut [String]) {
    versions.sort_by_cached_key(|v| semver::Version::parse(v).ok());
}

/// Flatten an index into packages, one per key, in document order
pub fn normalize(index: PackageIndex) -> Vec<Package> {
    index
        .packages
        .into_iter()
        .map(|(tooth, entry)| Package::from_entry(tooth, entry))
        .collect()
}

/// Parse an index timestamp.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and a
/// bare `YYYY-MM-DD` (UTC midnight).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalized packages with tooth lookups
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    packages: Vec<Package>,
    by_tooth: HashMap<String, usize>,
    by_lower_tooth: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from normalized packages
    pub fn new(packages: Vec<Package>) -> Self {
        let mut by_tooth = HashMap::with_capacity(packages.len());
        let mut by_lower_tooth = HashMap::with_capacity(packages.len());

        for (idx, pkg) in packages.iter().enumerate() {
            by_tooth.insert(pkg.tooth.clone(), idx);
            // First key in document order wins a case-insensitive clash
            by_lower_tooth
                .entry(pkg.tooth.to_lowercase())
                .or_insert(idx);
        }

        Self {
            packages,
            by_tooth,
            by_lower_tooth,
        }
    }

    /// Normalize an index and build a catalog from it
    pub fn from_index(index: PackageIndex) -> Self {
        Self::new(normalize(index))
    }

    /// All packages in document order
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Exact tooth lookup
    pub fn get(&self, tooth: &str) -> Option<&Package> {
        self.by_tooth.get(tooth).map(|&idx| &self.packages[idx])
    }

    /// Exact lookup, then case-insensitive lookup
    pub fn find(&self, tooth: &str) -> Option<&Package> {
        self.get(tooth).or_else(|| {
            self.by_lower_tooth
                .get(&tooth.to_lowercase())
                .map(|&idx| &self.packages[idx])
        })
    }
}
