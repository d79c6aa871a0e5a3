use async_trait::async_trait;
use bss_sync_server::wire::DownloadResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CentralClientError {
    #[error("request to central failed: {0}")]
    Transport(String),
    #[error("central returned an error status: {0}")]
    Status(u16),
}

/// What the poller needs from central, abstracted so the §8 end-to-end
/// scenarios can be exercised against an in-process fake instead of a
/// real socket (mirrors the `RowStore`/`ChangeLogStore`/`CursorStore`
/// injection pattern the rest of this workspace uses).
#[async_trait]
pub trait CentralClient: Send + Sync {
    async fn download(&self, query: &DownloadQuery) -> Result<DownloadResponse, CentralClientError>;
}

/// The parameters a poll cycle sends to central's `/api/sync/changes`
/// (§4.8 step b).
#[derive(Clone, Debug)]
pub struct DownloadQuery {
    pub store_id: String,
    pub store_type: String,
    pub server_role: Option<String>,
    pub page_size: Option<i64>,
    pub last_sync_time: Option<bss_repr::Timestamp>,
}

/// [`CentralClient`] over a real `reqwest` connection to
/// `CentralApiBaseUrl` (§6.4).
pub struct ReqwestCentralClient {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestCentralClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CentralClient for ReqwestCentralClient {
    async fn download(&self, query: &DownloadQuery) -> Result<DownloadResponse, CentralClientError> {
        let url = format!("{}/api/sync/changes", self.base_url.trim_end_matches('/'));
        let mut request = self.http.get(url).query(&[
            ("storeId", query.store_id.as_str()),
            ("storeType", query.store_type.as_str()),
        ]);
        if let Some(server_role) = &query.server_role {
            request = request.query(&[("serverRole", server_role.as_str())]);
        }
        if let Some(page_size) = query.page_size {
            request = request.query(&[("pageSize", page_size.to_string())]);
        }
        if let Some(last_sync_time) = query.last_sync_time {
            request = request.query(&[("lastSyncTime", last_sync_time.to_rfc3339())]);
        }

        let response = request
            .send()
            .await
            .map_err(|err| CentralClientError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(CentralClientError::Status(response.status().as_u16()));
        }
        response
            .json()
            .await
            .map_err(|err| CentralClientError::Transport(err.to_string()))
    }
}
