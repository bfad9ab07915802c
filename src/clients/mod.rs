pub mod aggregator;

use futures_util::future::BoxFuture;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::models::k8s::{ClusterList, ClusterSummary, Envelope, NodeList, WorkerNodeDetail};

/// The upstream calls the topology core depends on.
pub trait DashboardApi: Send + Sync {
    fn fetch_cluster_snapshot(&self) -> BoxFuture<'_, Result<Vec<ClusterSummary>, ClientError>>;

    fn fetch_cluster_nodes(
        &self,
        cluster: String,
    ) -> BoxFuture<'_, Result<Vec<WorkerNodeDetail>, ClientError>>;
}

pub struct ApiClient {
    pub base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = cfg.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: cfg.base_url.clone(),
            http,
        })
    }

    pub async fn list_clusters(&self) -> Result<Vec<ClusterSummary>, ClientError> {
        let list: ClusterList = self.get_json("/api/v1/cluster").await?;
        Ok(list.clusters)
    }

    pub async fn list_member_nodes(
        &self,
        cluster: &str,
    ) -> Result<Vec<WorkerNodeDetail>, ClientError> {
        let list: NodeList = self
            .get_json(&format!("/api/v1/member/{}/nodes", cluster))
            .await?;
        Ok(list.nodes)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        debug!("GET {}{}", self.base_url, path);
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
                path: path.to_string(),
                source,
            })?;
        Ok(envelope.data)
    }
}

impl DashboardApi for ApiClient {
    fn fetch_cluster_snapshot(&self) -> BoxFuture<'_, Result<Vec<ClusterSummary>, ClientError>> {
        Box::pin(self.list_clusters())
    }

    fn fetch_cluster_nodes(
        &self,
        cluster: String,
    ) -> BoxFuture<'_, Result<Vec<WorkerNodeDetail>, ClientError>> {
        Box::pin(async move { self.list_member_nodes(&cluster).await })
    }
}
