//! Registry index and manifest wire formats
//!
//! The index.json document lists every package in the registry keyed by
//! tooth, with its info block, popularity and published versions.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Display metadata for a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Human readable package name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Short description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Tags, in the order the author listed them
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    /// Avatar image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A package record as served by the index, keyed by tooth
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPackageEntry {
    /// Package info (missing info decodes as empty)
    #[serde(default, deserialize_with = "null_as_default")]
    pub info: PackageInfo,

    /// Last update timestamp, verbatim
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,

    /// Star count
    #[serde(default, deserialize_with = "null_as_default")]
    pub stars: u64,

    /// Published versions mapped to their file lists, in document order
    #[serde(default, deserialize_with = "null_as_default")]
    pub versions: IndexMap<String, Value>,
}

/// The root index document (index.json)
///
/// Entries are decoded one at a time: an entry that does not fit the
/// schema is kept with empty fields and logged, and the rest of the
/// document still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireIndex")]
pub struct PackageIndex {
    /// Index format version
    pub format_version: u32,

    /// Index format identifier
    pub format_uuid: String,

    /// All packages keyed by tooth, in document order
    pub packages: IndexMap<String, RawPackageEntry>,
}

/// Both index schemas the registry has served
#[derive(Deserialize)]
struct WireIndex {
    #[serde(default, deserialize_with = "null_as_default")]
    format_version: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    format_uuid: String,
    packages: WirePackages,
}

/// Entries stay raw JSON so one bad entry cannot fail the variant match
#[derive(Deserialize)]
#[serde(untagged)]
enum WirePackages {
    Keyed(IndexMap<String, Value>),
    Listed(Vec<Value>),
}

/// Entry of the older array-shaped index
#[derive(Deserialize)]
struct ListedPackage {
    tooth: String,
    #[serde(default, deserialize_with = "null_as_default")]
    info: PackageInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    stars: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    updated: String,
    #[serde(default, deserialize_with = "null_as_default")]
    versions: Vec<String>,
}

impl From<ListedPackage> for RawPackageEntry {
    fn from(listed: ListedPackage) -> Self {
        Self {
            info: listed.info,
            updated_at: listed.updated,
            stars: listed.stars,
            versions: listed
                .versions
                .into_iter()
                .map(|v| (v, Value::Array(Vec::new())))
                .collect(),
        }
    }
}

fn keyed_entry(tooth: &str, value: Value) -> RawPackageEntry {
    match serde_json::from_value(value) {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Malformed index entry '{}' kept with empty fields: {}", tooth, e);
            RawPackageEntry::default()
        }
    }
}

fn listed_entry(position: usize, value: Value) -> Option<(String, RawPackageEntry)> {
    let tooth = value.get("tooth").and_then(Value::as_str).map(str::to_string);
    match serde_json::from_value::<ListedPackage>(value) {
        Ok(listed) => Some((listed.tooth.clone(), listed.into())),
        Err(e) => match tooth {
            Some(tooth) => {
                warn!("Malformed index entry '{}' kept with empty fields: {}", tooth, e);
                Some((tooth, RawPackageEntry::default()))
            }
            None => {
                warn!("Skipping index entry #{} without a tooth: {}", position, e);
                None
            }
        },
    }
}

impl From<WireIndex> for PackageIndex {
    fn from(wire: WireIndex) -> Self {
        let packages = match wire.packages {
            WirePackages::Keyed(packages) => packages
                .into_iter()
                .map(|(tooth, value)| {
                    let entry = keyed_entry(&tooth, value);
                    (tooth, entry)
                })
                .collect(),
            WirePackages::Listed(listed) => listed
                .into_iter()
                .enumerate()
                .filter_map(|(position, value)| listed_entry(position, value))
                .collect(),
        };

        Self {
            format_version: wire.format_version,
            format_uuid: wire.format_uuid,
            packages,
        }
    }
}

impl PackageIndex {
    /// Parse index from a JSON string
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Number of packages in the index
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Total number of versions across all packages
    pub fn version_count(&self) -> usize {
        self.packages.values().map(|p| p.versions.len()).sum()
    }
}

/// A per-version manifest (tooth.json)
///
/// Only `info` is consumed; the other fields are kept for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooth: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Raw info block; may be absent or malformed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

impl Manifest {
    /// Parse manifest from a JSON string
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// The info block, if present, shaped like [`PackageInfo`] and named
    pub fn info(&self) -> Option<PackageInfo> {
        let value = self.info.as_ref()?;
        serde_json::from_value::<PackageInfo>(value.clone())
            .ok()
            .filter(|info| !info.name.is_empty())
    }
}
