// Shared fixtures for unit tests.

use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::clients::DashboardApi;
use crate::error::ClientError;
use crate::models::k8s::{
    AllocatedResources, ClusterSummary, NodeCondition, NodeSummary, ObjectMeta, WorkerNodeDetail,
};

pub fn cluster(name: &str, total: u32, ready: u32) -> ClusterSummary {
    ClusterSummary {
        object_meta: ObjectMeta {
            name: name.to_string(),
            creation_timestamp: Some("2025-01-01T00:00:00Z".to_string()),
            ..Default::default()
        },
        ready: true,
        kubernetes_version: "v1.31.2".to_string(),
        sync_mode: "Push".to_string(),
        node_summary: NodeSummary {
            total_num: total,
            ready_num: ready,
        },
        allocated_resources: AllocatedResources {
            cpu_capacity: 8,
            cpu_fraction: 12.5,
            memory_capacity: 16 * 1024 * 1024 * 1024,
            memory_fraction: 40.0,
            allocated_pods: 10,
            pod_capacity: 110,
            pod_fraction: 9.09,
        },
    }
}

pub fn node(name: &str) -> WorkerNodeDetail {
    let mut n = WorkerNodeDetail::default();
    n.metadata.name = name.to_string();
    n.status.conditions.push(NodeCondition {
        condition_type: "Ready".to_string(),
        status: "True".to_string(),
    });
    for (k, v) in [("cpu", "8"), ("memory", "16Gi"), ("pods", "110")] {
        n.status.capacity.insert(k.to_string(), v.to_string());
    }
    for (k, v) in [("cpu", "7500m"), ("memory", "15360Mi"), ("pods", "110")] {
        n.status.allocatable.insert(k.to_string(), v.to_string());
    }
    n
}

/// Scripted [`DashboardApi`] that records calls per cluster.
#[derive(Default)]
pub struct FakeApi {
    clusters: Mutex<Vec<ClusterSummary>>,
    nodes: Mutex<HashMap<String, Option<Vec<WorkerNodeDetail>>>>,
    node_calls: Mutex<HashMap<String, usize>>,
    snapshot_calls: Mutex<usize>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clusters(self, clusters: Vec<ClusterSummary>) -> Self {
        *self.clusters.lock().unwrap() = clusters;
        self
    }

    pub fn with_nodes(self, cluster: &str, nodes: Vec<WorkerNodeDetail>) -> Self {
        self.set_nodes(cluster, nodes);
        self
    }

    pub fn failing(self, cluster: &str) -> Self {
        self.nodes.lock().unwrap().insert(cluster.to_string(), None);
        self
    }

    pub fn set_nodes(&self, cluster: &str, nodes: Vec<WorkerNodeDetail>) {
        self.nodes
            .lock()
            .unwrap()
            .insert(cluster.to_string(), Some(nodes));
    }

    /// Hold every node fetch until a permit is added to the returned gate.
    pub fn hold(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn node_calls(&self, cluster: &str) -> usize {
        self.node_calls
            .lock()
            .unwrap()
            .get(cluster)
            .copied()
            .unwrap_or(0)
    }

    pub fn snapshot_calls(&self) -> usize {
        *self.snapshot_calls.lock().unwrap()
    }
}

impl DashboardApi for FakeApi {
    fn fetch_cluster_snapshot(&self) -> BoxFuture<'_, Result<Vec<ClusterSummary>, ClientError>> {
        *self.snapshot_calls.lock().unwrap() += 1;
        let clusters = self.clusters.lock().unwrap().clone();
        Box::pin(async move { Ok(clusters) })
    }

    fn fetch_cluster_nodes(
        &self,
        cluster: String,
    ) -> BoxFuture<'_, Result<Vec<WorkerNodeDetail>, ClientError>> {
        *self
            .node_calls
            .lock()
            .unwrap()
            .entry(cluster.clone())
            .or_default() += 1;
        let gate = self.gate.lock().unwrap().clone();
        let result = self
            .nodes
            .lock()
            .unwrap()
            .get(&cluster)
            .cloned()
            .unwrap_or_else(|| Some(Vec::new()));

        Box::pin(async move {
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }
            result.ok_or_else(|| ClientError::Status {
                path: format!("/api/v1/member/{}/nodes", cluster),
                status: 503,
                body: "member cluster unreachable".to_string(),
            })
        })
    }
}

/// Yield to spawned tasks until `cond` holds.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
