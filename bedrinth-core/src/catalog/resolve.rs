//! Detail-page path resolution
//!
//! Turns the path segments of a detail URL into a package and version.
//! Supported forms:
//!
//! - `/{tooth}` (redirects to the latest version)
//! - `/{tooth}@{version}`
//! - `/{tooth}/{version}`
//! - `/packages/{tooth}/{version}` (legacy, see [`legacy_redirect`])
//!
//! Tooth lookups fall back to a case-insensitive match.

use super::package::{Catalog, Package};

/// Outcome of resolving a detail path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A concrete package version
    Found {
        /// Canonical tooth as spelled in the index
        tooth: &'a str,
        package: &'a Package,
        version: &'a str,
    },
    /// A package without a version; go to its latest
    Redirect {
        tooth: &'a str,
        version: &'a str,
        location: String,
    },
    /// Nothing matched
    NotFound,
}

/// Canonical detail URL for a tooth and optional version
pub fn package_url(tooth: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("/{tooth}@{version}"),
        None => format!("/{tooth}"),
    }
}

/// Percent-decode a segment, keeping it raw if it does not decode
fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::debug!("Keeping undecodable segment '{}': {}", segment, e);
            segment.to_string()
        }
    }
}

/// Look up `tooth` and accept it only if `version` was published
fn with_version<'a>(
    catalog: &'a Catalog,
    tooth: &str,
    version: &str,
) -> Option<(&'a Package, &'a str)> {
    if version.is_empty() {
        return None;
    }
    let package = catalog.find(tooth)?;
    let version = package.versions.iter().find(|v| v.as_str() == version)?;
    Some((package, version.as_str()))
}

/// Resolve detail path segments against the catalog
///
/// Strategies, first hit wins: exact tooth, case-insensitive tooth,
/// `tooth@version` split at the last `@`, and finally the last segment
/// as the version.
pub fn resolve<'a, S: AsRef<str>>(segments: &[S], catalog: &'a Catalog) -> Resolution<'a> {
    let parts: Vec<String> = segments
        .iter()
        .map(|s| decode_segment(s.as_ref()))
        .collect();
    let path = parts.join("/");

    let mut found: Option<(&Package, Option<&str>)> = catalog.find(&path).map(|pkg| (pkg, None));

    if found.is_none() {
        if let Some(at) = path.rfind('@').filter(|&at| at > 0) {
            let (tooth, version) = (&path[..at], &path[at + 1..]);
            found = with_version(catalog, tooth, version).map(|(pkg, v)| (pkg, Some(v)));
        }
    }

    if found.is_none() && parts.len() > 1 {
        if let Some((version, tooth_parts)) = parts.split_last() {
            let tooth = tooth_parts.join("/");
            found = with_version(catalog, &tooth, version).map(|(pkg, v)| (pkg, Some(v)));
        }
    }

    let Some((package, version)) = found else {
        tracing::debug!("No package matches '{}'", path);
        return Resolution::NotFound;
    };

    match version {
        Some(version) => Resolution::Found {
            tooth: &package.tooth,
            package,
            version,
        },
        None => match package.latest_version() {
            Some(latest) => Resolution::Redirect {
                tooth: &package.tooth,
                version: latest,
                location: package_url(&package.tooth, Some(latest)),
            },
            None => {
                tracing::debug!("Package '{}' has no versions", package.tooth);
                Resolution::NotFound
            }
        },
    }
}

/// Target of a legacy `/packages/{tooth...}/{version}` path
///
/// Returns `None` when there is nothing to redirect to.
pub fn legacy_redirect<S: AsRef<str>>(segments: &[S]) -> Option<String> {
    match segments {
        [] => None,
        [only] => Some(format!("/{}", only.as_ref())),
        [tooth_parts @ .., version] => {
            let version = version.as_ref();
            let tooth = tooth_parts
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join("/");
            if version.is_empty() || tooth.is_empty() {
                return None;
            }
            Some(package_url(&tooth, Some(version)))
        }
    }
}
