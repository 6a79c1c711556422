//! Test helper functions for integration tests

use anyhow::Result;
use async_trait::async_trait;
use bedrinth_core::catalog::{HttpResponse, HttpSource};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

/// Initialize logging for tests (only once per test run)
#[allow(dead_code)]
static INIT: Once = Once::new();

#[allow(dead_code)]
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Path of a file under `tests/fixtures`
#[allow(dead_code)]
pub fn fixture_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

/// Contents of a file under `tests/fixtures`
#[allow(dead_code)]
pub fn read_fixture(relative: &str) -> String {
    let path = fixture_path(relative);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}

/// HTTP source serving fixed bodies; unknown URLs answer 404
#[allow(dead_code)]
#[derive(Default)]
pub struct FixtureSource {
    bodies: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: impl Into<String>) -> Self {
        self.bodies.insert(url.to_string(), (200, body.into()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.bodies.insert(url.to_string(), (status, String::new()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpSource for FixtureSource {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        let (status, body) = self
            .bodies
            .get(url)
            .cloned()
            .unwrap_or((404, "404: Not Found".to_string()));
        Ok(HttpResponse { status, body })
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
