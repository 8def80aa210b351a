//!
//! src/fetch.rs  Oct 18th, 2026
//!
//! Defines methods for hitting the catalog preview and release status
//! endpoints. Both ride on the one pooled client built for the scan.
//!

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header, redirect};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{CatalogConfig, HttpConfig, StatusConfig};
use crate::errors::ScoutError;
use crate::scanner::{PreviewSource, StatusSource};
use crate::tags;
use crate::types::{ReleaseStatus, TrackId, TrackMetadata};

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

/// Pooled client shared by every fetch and status check of a run
pub fn scan_client(http: &HttpConfig) -> Result<Client, ScoutError> {
    client_helper(http)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .build()
        .map_err(|e| ScoutError::Http(format!("build client: {e}")))
}

/// Stateless client for a single call; keeps no idle connections
pub fn one_shot_client(http: &HttpConfig) -> Result<Client, ScoutError> {
    client_helper(http)
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|e| ScoutError::Http(format!("build client: {e}")))
}

#[derive(Clone, Debug)]
pub struct CatalogClient {
    http: Client,
    base: Url,
}

impl CatalogClient {
    pub fn new(http: Client, cfg: &CatalogConfig) -> Self {
        Self { http, base: cfg.base_url.clone() }
    }

    /// GET {base}/api/fetch/preview/{id}
    fn preview_url(&self, id: TrackId) -> Result<Url, ScoutError> {
        self.base.join(&format!("api/fetch/preview/{id}"))
            .map_err(|e| ScoutError::Config(format!("preview url: {e}")))
    }

    pub async fn try_fetch_preview(&self, id: TrackId) -> Result<TrackMetadata, ScoutError> {
        let response = self.http.get(self.preview_url(id)?).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScoutError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        tags::read_preview_tags(&body)
    }
}

#[async_trait]
impl PreviewSource for CatalogClient {
    async fn fetch_preview(&self, id: TrackId) -> Option<TrackMetadata> {
        match self.try_fetch_preview(id).await {
            Ok(meta) => {
                info!(id, status = 200, "fetch.preview");
                Some(meta)
            }
            Err(ScoutError::Status(code)) => {
                warn!(id, status = code, "fetch.preview");
                None
            }
            Err(e) => {
                error!(id, error = %e, "fetch.preview.failed");
                None
            }
        }
    }
}

///
/// Typed view of the status page. Only the first substructure's `data`
/// object is inspected.
///
#[derive(Debug, Deserialize)]
struct StatusPage {
    #[serde(default)]
    substructure: Vec<Substructure>,
}

#[derive(Debug, Deserialize)]
struct Substructure {
    data: Option<Map<String, Value>>,
}

/// Unreleased iff `error_field` is present and non-null. A body of the
/// wrong shape is inconclusive.
pub fn classify_status(body: &[u8], error_field: &str) -> ReleaseStatus {
    let Ok(page) = serde_json::from_slice::<StatusPage>(body) else {
        return ReleaseStatus::Unknown;
    };
    let Some(data) = page.substructure.first().and_then(|s| s.data.as_ref()) else {
        return ReleaseStatus::Unknown;
    };
    match data.get(error_field) {
        Some(v) if !v.is_null() => ReleaseStatus::Unreleased,
        _ => ReleaseStatus::Released,
    }
}

#[derive(Clone, Debug)]
pub struct StatusClient {
    http: Client,
    base: Url,
    tenant_id: header::HeaderValue,
    error_field: String,
}

impl StatusClient {
    pub fn new(http: Client, cfg: &StatusConfig) -> Result<Self, ScoutError> {
        let tenant_id = header::HeaderValue::from_str(&cfg.tenant_id)
            .map_err(|e| ScoutError::Config(format!("invalid tenant id: {e}")))?;
        Ok( Self {
            http,
            base: cfg.base_url.clone(),
            tenant_id,
            error_field: cfg.error_field.clone(),
        })
    }

    /// GET {base}/structure/pages_music_tracks_details?id={id}
    pub async fn try_check(&self, id: TrackId) -> Result<ReleaseStatus, ScoutError> {
        let url = self.base.join("structure/pages_music_tracks_details")
            .map_err(|e| ScoutError::Config(format!("status url: {e}")))?;
        let response = self.http.get(url)
            .query(&[("id", id.to_string())])
            .header("x-tenant-id", self.tenant_id.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScoutError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(classify_status(&body, &self.error_field))
    }
}

#[async_trait]
impl StatusSource for StatusClient {
    async fn release_status(&self, id: TrackId) -> ReleaseStatus {
        match self.try_check(id).await {
            Ok(status) => {
                debug!(id, status = ?status, "status.check");
                status
            }
            Err(ScoutError::Status(code)) => {
                warn!(id, status = code, "status.check");
                ReleaseStatus::Unknown
            }
            Err(e) => {
                error!(id, error = %e, "status.check.failed");
                ReleaseStatus::Unknown
            }
        }
    }
}
