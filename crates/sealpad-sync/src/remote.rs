//! Remote store client: the three wire operations of the site API
//!
//! The trait returns parsed wire responses; interpreting a rejection as a
//! conflict or a generic failure is the session's job, so fake stores in
//! tests only have to speak the wire shapes. Retry and backoff live in the
//! transport configuration, not here; the per-request timeout makes an
//! expired attempt surface as a transport error.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use sealpad_core::config::RemoteConfig;
use sealpad_core::types::{
    DeleteSiteRequest, DeleteSiteResponse, FetchSiteResponse, SaveSiteRequest, SaveSiteResponse,
};
use sealpad_core::{SealpadError, SealpadResult};

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_site(&self, site_id: &str) -> SealpadResult<FetchSiteResponse>;
    async fn save_site(&self, request: &SaveSiteRequest) -> SealpadResult<SaveSiteResponse>;
    async fn delete_site(&self, request: &DeleteSiteRequest) -> SealpadResult<DeleteSiteResponse>;
}

/// HTTP+JSON implementation of [`RemoteStore`].
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(config: &RemoteConfig) -> SealpadResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sealpad/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SealpadError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_site(&self, site_id: &str) -> SealpadResult<FetchSiteResponse> {
        debug!(site = site_id, "fetching site");
        let res = self
            .client
            .get(format!("{}/api/json", self.base_url))
            .query(&[("site", site_id)])
            .send()
            .await
            .map_err(|e| SealpadError::Transport(e.to_string()))?;
        if !res.status().is_success() {
            return Err(SealpadError::Transport(format!(
                "fetch failed: HTTP {}",
                res.status()
            )));
        }
        res.json()
            .await
            .map_err(|e| SealpadError::MalformedData(format!("fetch response: {e}")))
    }

    async fn save_site(&self, request: &SaveSiteRequest) -> SealpadResult<SaveSiteResponse> {
        debug!(site = %request.site, "saving site");
        let res = self
            .client
            .post(format!("{}/api/save", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| SealpadError::Transport(e.to_string()))?;
        if !res.status().is_success() {
            return Err(SealpadError::Transport(format!(
                "save failed: HTTP {}",
                res.status()
            )));
        }
        res.json()
            .await
            .map_err(|e| SealpadError::MalformedData(format!("save response: {e}")))
    }

    async fn delete_site(&self, request: &DeleteSiteRequest) -> SealpadResult<DeleteSiteResponse> {
        debug!(site = %request.site, "deleting site");
        let res = self
            .client
            .post(format!("{}/api/delete", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| SealpadError::Transport(e.to_string()))?;
        if !res.status().is_success() {
            return Err(SealpadError::Transport(format!(
                "delete failed: HTTP {}",
                res.status()
            )));
        }
        res.json()
            .await
            .map_err(|e| SealpadError::MalformedData(format!("delete response: {e}")))
    }
}
