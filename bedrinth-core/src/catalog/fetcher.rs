//! Registry HTTP access
//!
//! Fetches the index document, per-version manifests and READMEs. The
//! transport sits behind [`HttpSource`] so tests can serve canned
//! responses instead of hitting the network.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::index::{Manifest, PackageIndex};
use super::package::Catalog;
use crate::config::BedrinthConfig;
use crate::error::CatalogError;

/// Status and body of a GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP transports
///
/// Implementations return `Err` only for transport failures; any status
/// code the server answers with is an `Ok` response.
#[async_trait]
pub trait HttpSource: Send + Sync {
    /// GET a URL and read the whole body as text
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// Source identifier for logging/debugging
    fn name(&self) -> &'static str;
}

/// reqwest-backed transport
pub struct ReqwestSource {
    client: reqwest::Client,
}

impl ReqwestSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("bedrinth/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpSource for ReqwestSource {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(HttpResponse { status, body })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

/// Client for the registry's index, manifests and READMEs
pub struct RegistryClient<S = ReqwestSource> {
    source: S,
    config: BedrinthConfig,
}

impl RegistryClient<ReqwestSource> {
    /// Create a client that talks to the network
    pub fn from_config(config: BedrinthConfig) -> Result<Self> {
        let source = ReqwestSource::new(Duration::from_secs(config.timeout_seconds))?;
        Ok(Self::with_source(source, config))
    }
}

impl<S: HttpSource> RegistryClient<S> {
    pub fn with_source(source: S, config: BedrinthConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &BedrinthConfig {
        &self.config
    }

    /// Fetch and decode the index document once
    pub async fn fetch_index(&self) -> Result<PackageIndex, CatalogError> {
        let url = self.config.index_url.as_str();
        debug!("Fetching package index from {} via {}", url, self.source.name());

        let response = self
            .source
            .get(url)
            .await
            .map_err(|source| CatalogError::Fetch {
                url: url.to_string(),
                source,
            })?;

        if !response.is_success() {
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        PackageIndex::from_json(&response.body).map_err(|source| CatalogError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch the index, retrying transient failures after a fixed delay
    pub async fn fetch_index_with_retry(&self) -> Result<PackageIndex, CatalogError> {
        let attempts = self.config.retry_attempts.max(1);
        let delay = Duration::from_secs(self.config.retry_delay_seconds);
        let mut attempt = 1;

        loop {
            match self.fetch_index().await {
                Ok(index) => return Ok(index),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(
                        "Index fetch failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch the index and normalize it into a catalog
    pub async fn fetch_catalog(&self) -> Result<Catalog, CatalogError> {
        let index = self.fetch_index_with_retry().await?;
        info!(
            "Loaded package index: {} packages, {} versions",
            index.package_count(),
            index.version_count()
        );
        Ok(Catalog::from_index(index))
    }

    /// Manifest URL for a scheme ("https" or "http")
    pub fn manifest_url(&self, scheme: &str, tooth: &str, version: &str) -> String {
        format!(
            "{scheme}://{}/{tooth}/@v/{version}/tooth.json",
            self.config.registry_host
        )
    }

    async fn try_manifest(&self, url: &str) -> Option<Manifest> {
        let response = match self.source.get(url).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Manifest request to {} failed: {:#}", url, e);
                return None;
            }
        };
        if !response.is_success() {
            debug!("Manifest request to {} returned HTTP {}", url, response.status);
            return None;
        }
        match Manifest::from_json(&response.body) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                debug!("Manifest at {} is not valid JSON: {}", url, e);
                None
            }
        }
    }

    /// Fetch a version manifest, over https first and then plain http
    ///
    /// Never fails; `None` means neither attempt produced a manifest.
    pub async fn fetch_manifest(&self, tooth: &str, version: &str) -> Option<Manifest> {
        let secure = self.manifest_url("https", tooth, version);
        if let Some(manifest) = self.try_manifest(&secure).await {
            return Some(manifest);
        }

        let insecure = self.manifest_url("http", tooth, version);
        debug!("Falling back to {}", insecure);
        let manifest = self.try_manifest(&insecure).await;
        if manifest.is_none() {
            warn!("No manifest available for {}@{}", tooth, version);
        }
        manifest
    }

    /// README URL, when the tooth lives on the configured forge
    ///
    /// Requires `{forge}/{owner}/{repo}` at minimum; the tag is the
    /// version prefixed with `v`.
    pub fn readme_url(&self, tooth: &str, version: &str) -> Option<String> {
        let parts: Vec<&str> = tooth.split('/').collect();
        if parts.len() < 3 || parts[0] != self.config.forge_host {
            return None;
        }

        let repo_path = parts[1..].join("/");
        Some(format!(
            "{}/{repo_path}/v{version}/README.md",
            self.config.readme_base_url.trim_end_matches('/')
        ))
    }

    /// Fetch the README for a version; `None` on any failure
    pub async fn fetch_readme(&self, tooth: &str, version: &str) -> Option<String> {
        let url = self.readme_url(tooth, version)?;

        match self.source.get(&url).await {
            Ok(response) if response.is_success() => Some(response.body),
            Ok(response) => {
                debug!("README request to {} returned HTTP {}", url, response.status);
                None
            }
            Err(e) => {
                debug!("README request to {} failed: {:#}", url, e);
                None
            }
        }
    }
}


#[cfg(test)]
mod fetcher_tests {
    use super::mock::MockSource;
    use super::*;
    use pretty_assertions::assert_eq;

    const INDEX_URL: &str = "https://lipr.levimc.org/index.json";
    const TOOTH: &str = "github.com/LiteLDev/LegacyMoney";
    const HTTPS_MANIFEST: &str =
        "https://lipr.levimc.org/github.com/LiteLDev/LegacyMoney/@v/0.8.0/tooth.json";
    const HTTP_MANIFEST: &str =
        "http://lipr.levimc.org/github.com/LiteLDev/LegacyMoney/@v/0.8.0/tooth.json";
    const README: &str =
        "https://raw.githubusercontent.com/LiteLDev/LegacyMoney/v0.8.0/README.md";

    fn test_config() -> BedrinthConfig {
        BedrinthConfig {
            retry_delay_seconds: 0,
            ..Default::default()
        }
    }

    fn client(source: MockSource) -> RegistryClient<MockSource> {
        RegistryClient::with_source(source, test_config())
    }

    const INDEX_BODY: &str = r#"{"format_version": 3, "format_uuid": "u", "packages": {
        "github.com/LiteLDev/LegacyMoney": {
            "info": {"name": "LegacyMoney", "description": "Economy", "tags": ["economy"]},
            "updated_at": "2024-03-10", "stars": 40, "versions": {"0.8.0": []}}}}"#;

    #[tokio::test]
    async fn test_fetch_index() {
        let client = client(MockSource::new().respond(INDEX_URL, 200, INDEX_BODY));
        let index = client.fetch_index().await.unwrap();
        assert_eq!(index.package_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_index_status_error() {
        let client = client(MockSource::new().respond(INDEX_URL, 503, "unavailable"));
        let err = client.fetch_index().await.unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_index_decode_error_not_retried() {
        let source = MockSource::new().respond(INDEX_URL, 200, "<html>oops</html>");
        let client = client(source);
        let err = client.fetch_index_with_retry().await.unwrap_err();
        assert!(matches!(err, CatalogError::Decode { .. }));
        assert_eq!(client.source.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_index_retries_transient_failures() {
        let client = client(MockSource::new().fail(INDEX_URL, "timed out"));
        let err = client.fetch_index_with_retry().await.unwrap_err();
        assert!(matches!(err, CatalogError::Fetch { .. }));
        assert_eq!(client.source.requested().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_catalog() {
        let client = client(MockSource::new().respond(INDEX_URL, 200, INDEX_BODY));
        let catalog = client.fetch_catalog().await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(TOOTH).is_some());
    }

    #[tokio::test]
    async fn test_manifest_https_first() {
        let client = client(MockSource::new().respond(
            HTTPS_MANIFEST,
            200,
            r#"{"info": {"name": "LegacyMoney", "description": "secure", "tags": []}}"#,
        ));
        let manifest = client.fetch_manifest(TOOTH, "0.8.0").await.unwrap();
        assert_eq!(manifest.info().unwrap().description, "secure");
        assert_eq!(client.source.requested(), vec![HTTPS_MANIFEST.to_string()]);
    }

    #[tokio::test]
    async fn test_manifest_falls_back_to_http() {
        let client = client(
            MockSource::new()
                .respond(HTTPS_MANIFEST, 404, "")
                .respond(
                    HTTP_MANIFEST,
                    200,
                    r#"{"info": {"name": "LegacyMoney", "description": "plain", "tags": []}}"#,
                ),
        );
        let manifest = client.fetch_manifest(TOOTH, "0.8.0").await.unwrap();
        assert_eq!(manifest.info().unwrap().description, "plain");
        assert_eq!(
            client.source.requested(),
            vec![HTTPS_MANIFEST.to_string(), HTTP_MANIFEST.to_string()]
        );
    }

    #[tokio::test]
    async fn test_manifest_transport_error_falls_back() {
        let client = client(
            MockSource::new()
                .fail(HTTPS_MANIFEST, "tls handshake failed")
                .respond(HTTP_MANIFEST, 200, r#"{"version": "0.8.0"}"#),
        );
        let manifest = client.fetch_manifest(TOOTH, "0.8.0").await.unwrap();
        assert_eq!(manifest.version.as_deref(), Some("0.8.0"));
    }

    #[tokio::test]
    async fn test_manifest_all_failures_yield_none() {
        let client = client(
            MockSource::new()
                .respond(HTTPS_MANIFEST, 500, "")
                .respond(HTTP_MANIFEST, 200, "not json"),
        );
        assert!(client.fetch_manifest(TOOTH, "0.8.0").await.is_none());
    }

    #[test]
    fn test_readme_url() {
        let client = client(MockSource::new());
        assert_eq!(client.readme_url(TOOTH, "0.8.0").as_deref(), Some(README));
        assert_eq!(
            client
                .readme_url("github.com/owner/repo/sub", "1.0.0")
                .as_deref(),
            Some("https://raw.githubusercontent.com/owner/repo/sub/v1.0.0/README.md")
        );
        assert!(client.readme_url("github.com/owner", "1.0.0").is_none());
        assert!(client.readme_url("gitlab.com/owner/repo", "1.0.0").is_none());
    }

    #[tokio::test]
    async fn test_fetch_readme() {
        let client = client(MockSource::new().respond(README, 200, "# LegacyMoney"));
        assert_eq!(
            client.fetch_readme(TOOTH, "0.8.0").await.as_deref(),
            Some("# LegacyMoney")
        );

        let client = client_missing_readme();
        assert!(client.fetch_readme(TOOTH, "0.8.0").await.is_none());
        // Only the v-prefixed tag is tried
        assert_eq!(client.source.requested(), vec![README.to_string()]);
    }

    fn client_missing_readme() -> RegistryClient<MockSource> {
        client(MockSource::new().respond(README, 404, "404: Not Found"))
    }

    #[tokio::test]
    async fn test_readme_skipped_for_other_forges() {
        let client = client(MockSource::new());
        assert!(client
            .fetch_readme("gitlab.com/owner/repo", "1.0.0")
            .await
            .is_none());
        assert!(client.source.requested().is_empty());
    }
}
