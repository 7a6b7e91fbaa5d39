//! Integration tests for the ReCraft REST API.
//!
//! Each test starts the storefront router on an ephemeral port over a fresh
//! temporary data directory and talks to it with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p recraft-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_api` - Health, serviceability, donations and catalog endpoints

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;

use reqwest::Client;
use tempfile::TempDir;

use recraft_storefront::config::StorefrontConfig;
use recraft_storefront::state::AppState;

/// A running server and a client pointed at it.
///
/// The server stops when the test's runtime shuts down; the data directory
/// is removed when the context is dropped.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub data_dir: TempDir,
}

impl TestContext {
    /// Start a server over an empty data directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory, listener or server cannot be set up.
    pub async fn new() -> Self {
        let data_dir = tempfile::tempdir().expect("create temp data dir");
        let state = AppState::new(StorefrontConfig::local(data_dir.path()))
            .await
            .expect("build app state");

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("listener address");

        let app = recraft_storefront::app(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
            data_dir,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
