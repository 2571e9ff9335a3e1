use std::future::Future;

use reqwest::Client;
use tracker_core::{Hour, Snapshot};

use crate::FetchError;

/// Anything that can produce the snapshot for one hour of the window.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch_hour(&self, hour: Hour) -> impl Future<Output = Result<Snapshot, FetchError>> + Send;
}

/// Position feed served as `{base}/treasure/{HH}.json`.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: Client,
    base_url: String,
}

impl HttpSnapshotSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder().build().map_err(FetchError::Client)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, hour: Hour) -> String {
        format!("{}/treasure/{}.json", self.base_url, hour.label())
    }
}

impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_hour(&self, hour: Hour) -> Result<Snapshot, FetchError> {
        let url = self.url_for(hour);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Network { hour, source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                hour,
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Network { hour, source })?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Parse { hour, source })
    }
}
