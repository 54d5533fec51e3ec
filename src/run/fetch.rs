//! Manifest and asset retrieval
//!
//! Plain request/response HTTP against the karma server's file handler.
//! There is no retry policy here: a failed fetch aborts the current run.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::common::{Error, Result};

/// Well-known manifest path relative to the base URL
pub const MANIFEST_PATH: &str = "/context.json";

/// One test asset, fetched and ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// URL relative to the base URL, as listed in the manifest
    pub url: String,
    /// Raw asset content
    pub content: String,
}

/// Shape of `context.json`
#[derive(Debug, Deserialize)]
struct ContextManifest {
    files: Vec<String>,
}

/// Source of the run manifest and asset contents
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the ordered list of asset URLs for a run
    async fn manifest(&self, base_url: &str) -> Result<Vec<String>>;

    /// Fetch one asset's raw content
    async fn asset(&self, base_url: &str, asset_url: &str) -> Result<String>;
}

/// HTTP-backed asset source
#[derive(Debug, Default, Clone)]
pub struct HttpAssetSource {
    http: reqwest::Client,
}

impl HttpAssetSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn manifest(&self, base_url: &str) -> Result<Vec<String>> {
        let url = format!("{base_url}{MANIFEST_PATH}");
        debug!(%url, "Downloading file list");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::manifest_fetch(&url, e))?;
        let manifest: ContextManifest = response
            .json()
            .await
            .map_err(|e| Error::manifest_fetch(&url, e))?;

        Ok(manifest.files)
    }

    async fn asset(&self, base_url: &str, asset_url: &str) -> Result<String> {
        let url = format!("{base_url}{asset_url}");
        debug!(%url, "Downloading asset");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::asset_fetch(&url, e))?;
        response.text().await.map_err(|e| Error::asset_fetch(&url, e))
    }
}
