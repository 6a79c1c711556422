//! Package detail loading
//!
//! Combines the index entry for a resolved package version with its
//! remote manifest and README. Loads are sequenced so that a slow
//! response for a version the user already navigated away from is
//! dropped instead of overwriting a newer one.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::fetcher::{HttpSource, RegistryClient};
use super::index::{Manifest, PackageInfo};
use super::package::Package;
use super::readme::rewrite_relative_links;

/// Monotonic counter handing out detail-load tickets
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: AtomicU64,
}

/// Identifies one detail load; only the newest ticket is current
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, superseding every earlier one
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Where the displayed package info came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoSource {
    Manifest,
    Index,
}

/// Package info shown on the detail view, tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailInfo {
    pub source: InfoSource,
    #[serde(flatten)]
    pub info: PackageInfo,
}

impl DetailInfo {
    /// Prefer the version manifest's info, falling back to the index entry
    pub fn choose(manifest: Option<&Manifest>, package: &Package) -> Self {
        match manifest.and_then(Manifest::info) {
            Some(info) => Self {
                source: InfoSource::Manifest,
                info,
            },
            None => Self {
                source: InfoSource::Index,
                info: package.info.clone(),
            },
        }
    }
}

/// Everything the detail view shows for one package version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDetail {
    pub tooth: String,
    pub version: String,
    pub info: DetailInfo,
    /// Tags from the index entry
    pub tags: Vec<String>,
    pub stars: u64,
    pub updated: String,
    /// Newest first
    pub versions: Vec<String>,
    /// Source repository, `https://{tooth}`
    pub repository_url: String,
    /// README with relative links pointed at the repository
    pub readme: Option<String>,
}

impl PackageDetail {
    fn assemble(
        package: &Package,
        version: &str,
        manifest: Option<&Manifest>,
        readme: Option<String>,
    ) -> Self {
        Self {
            tooth: package.tooth.clone(),
            version: version.to_string(),
            info: DetailInfo::choose(manifest, package),
            tags: package.info.tags.clone(),
            stars: package.stars,
            updated: package.updated.clone(),
            versions: package.versions.iter().rev().cloned().collect(),
            repository_url: format!("https://{}", package.tooth),
            readme: readme.map(|r| rewrite_relative_links(&r, &package.tooth)),
        }
    }
}

/// Loads package details, discarding superseded results
pub struct DetailLoader<'c, S> {
    client: &'c RegistryClient<S>,
    sequence: RequestSequence,
}

impl<'c, S: HttpSource> DetailLoader<'c, S> {
    pub fn new(client: &'c RegistryClient<S>) -> Self {
        Self {
            client,
            sequence: RequestSequence::new(),
        }
    }

    /// Start a new load, superseding any in flight
    pub fn begin(&self) -> Ticket {
        self.sequence.issue()
    }

    /// Fetch manifest and README concurrently for `ticket`
    ///
    /// Returns `None` when a newer load began before this one finished.
    pub async fn load_with(
        &self,
        ticket: Ticket,
        package: &Package,
        version: &str,
    ) -> Option<PackageDetail> {
        let (manifest, readme) = tokio::join!(
            self.client.fetch_manifest(&package.tooth, version),
            self.client.fetch_readme(&package.tooth, version),
        );

        if !self.sequence.is_current(ticket) {
            debug!(
                "Discarding stale detail for {}@{} ({:?})",
                package.tooth, version, ticket
            );
            return None;
        }

        Some(PackageDetail::assemble(
            package,
            version,
            manifest.as_ref(),
            readme,
        ))
    }

    /// Begin and run a load in one step
    pub async fn load(&self, package: &Package, version: &str) -> Option<PackageDetail> {
        let ticket = self.begin();
        self.load_with(ticket, package, version).await
    }
}
