use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::lock;
use crate::clients::DashboardApi;
use crate::models::k8s::WorkerNodeDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Pending,
    Ready,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub cluster_name: String,
    pub state: CacheState,
    pub nodes: Arc<Vec<WorkerNodeDetail>>,
}

/// Session-lifetime store of worker nodes per member cluster.
///
/// At most one entry exists per cluster name, and a `Pending` entry always has
/// exactly one fetch task in flight. Ready entries are never evicted. A failed
/// fetch removes its entry so the next [`NodeCache::ensure_loaded`] retries.
pub struct NodeCache {
    api: Arc<dyn DashboardApi>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    changes: watch::Sender<u64>,
}

impl NodeCache {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            api,
            entries: Mutex::new(HashMap::new()),
            changes,
        }
    }

    /// Start a fetch for `cluster` unless one is pending or data is ready.
    ///
    /// Returns true if this call spawned the fetch. Must be called from
    /// within a tokio runtime.
    pub fn ensure_loaded(self: &Arc<Self>, cluster: &str) -> bool {
        {
            let mut entries = lock(&self.entries);
            if entries.contains_key(cluster) {
                return false;
            }
            entries.insert(
                cluster.to_string(),
                CacheEntry {
                    cluster_name: cluster.to_string(),
                    state: CacheState::Pending,
                    nodes: Arc::new(Vec::new()),
                },
            );
        }

        let cache = Arc::clone(self);
        let cluster = cluster.to_string();
        tokio::spawn(async move {
            cache.load(cluster).await;
        });
        true
    }

    async fn load(&self, cluster: String) {
        debug!("fetching nodes for cluster {}", cluster);

        match self.api.fetch_cluster_nodes(cluster.clone()).await {
            Ok(mut nodes) => {
                for node in &mut nodes {
                    node.cluster_name = cluster.clone();
                }
                debug!("cluster {} has {} nodes", cluster, nodes.len());

                lock(&self.entries).insert(
                    cluster.clone(),
                    CacheEntry {
                        cluster_name: cluster,
                        state: CacheState::Ready,
                        nodes: Arc::new(nodes),
                    },
                );
                // Written before notifying, so any rebuild sees this result.
                self.changes.send_modify(|v| *v += 1);
            }
            Err(e) => {
                warn!("error fetching nodes for cluster {}: {}", cluster, e);
                lock(&self.entries).remove(&cluster);
            }
        }
    }

    /// Cached nodes for `cluster`, or an empty list if not ready.
    pub fn get_nodes(&self, cluster: &str) -> Vec<WorkerNodeDetail> {
        self.ready_nodes(cluster)
            .map(|nodes| nodes.as_ref().clone())
            .unwrap_or_default()
    }

    pub fn ready_nodes(&self, cluster: &str) -> Option<Arc<Vec<WorkerNodeDetail>>> {
        lock(&self.entries)
            .get(cluster)
            .filter(|e| e.state == CacheState::Ready)
            .map(|e| Arc::clone(&e.nodes))
    }

    pub fn state(&self, cluster: &str) -> Option<CacheState> {
        lock(&self.entries).get(cluster).map(|e| e.state)
    }

    /// Receiver that changes after every successful fetch.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
