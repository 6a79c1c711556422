//! Bedrinth Catalog - package discovery for the LeviLamina registry
//!
//! This module provides functionality for fetching the registry index,
//! searching and filtering packages, and resolving detail-page paths
//! to a concrete package version.
//!
//! # Architecture
//!
//! ```text
//! Registry (lipr.levimc.org)
//!     │
//!     ├── index.json                       ← All packages and versions
//!     └── {tooth}/@v/{version}/tooth.json  ← Per-version manifest
//!            │
//!            ▼
//!     PackageIndex ──normalize──▶ Catalog
//!                                  │
//!                 ┌────────────────┼─────────────────┐
//!                 ▼                ▼                 ▼
//!            SearchIndex     select() + Reveal    resolve()
//!                                                    │
//!                                                    ▼
//!                                           DetailLoader (manifest + README)
//! ```

mod detail;
mod fetcher;
mod index;
mod package;
mod readme;
mod resolve;
mod search;
mod select;

pub use detail::{DetailInfo, DetailLoader, InfoSource, PackageDetail, RequestSequence, Ticket};
pub use fetcher::{HttpResponse, HttpSource, RegistryClient, ReqwestSource};
pub use index::{Manifest, PackageIndex, PackageInfo, RawPackageEntry};
pub use package::{normalize, parse_timestamp, Catalog, Package};
pub use readme::rewrite_relative_links;
pub use resolve::{legacy_redirect, package_url, resolve, Resolution};
pub use search::{SearchHit, SearchIndex};
pub use select::{select, tag_facets, Reveal, SortBy, TagCount, ViewState};
