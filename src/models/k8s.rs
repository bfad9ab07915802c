use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Wire types for the management API. Field names follow its camelCase JSON.

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

// --- Cluster ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterList {
    #[serde(default)]
    pub clusters: Vec<ClusterSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    #[serde(default)]
    pub object_meta: ObjectMeta,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub kubernetes_version: String,
    #[serde(default)]
    pub sync_mode: String,
    #[serde(default)]
    pub node_summary: NodeSummary,
    #[serde(default)]
    pub allocated_resources: AllocatedResources,
}

impl ClusterSummary {
    pub fn name(&self) -> &str {
        &self.object_meta.name
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    #[serde(default)]
    pub total_num: u32,
    #[serde(default)]
    pub ready_num: u32,
}

// `*_fraction` fields are already percentages in 0..=100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedResources {
    #[serde(default)]
    pub cpu_capacity: u64,
    #[serde(default)]
    pub cpu_fraction: f64,
    #[serde(default)]
    pub memory_capacity: u64,
    #[serde(default)]
    pub memory_fraction: f64,
    #[serde(default)]
    pub allocated_pods: u64,
    #[serde(default)]
    pub pod_capacity: u64,
    #[serde(default)]
    pub pod_fraction: f64,
}

// --- Node ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeList {
    #[serde(default)]
    pub nodes: Vec<WorkerNodeDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkerNodeDetail {
    /// Owning member cluster; stamped by the node cache after a fetch.
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default, alias = "objectMeta")]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_summary: Option<ResourceSummary>,
}

impl WorkerNodeDetail {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    #[serde(default)]
    pub conditions: Vec<NodeCondition>,
    #[serde(default)]
    pub addresses: Vec<NodeAddress>,
    #[serde(default)]
    pub capacity: HashMap<String, String>,
    #[serde(default)]
    pub allocatable: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeCondition {
    #[serde(default, rename = "type")]
    pub condition_type: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeAddress {
    #[serde(default, rename = "type")]
    pub address_type: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    #[serde(default)]
    pub cpu_utilization: String,
    #[serde(default)]
    pub memory_utilization: String,
    #[serde(default)]
    pub pod_utilization: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_cluster_list() {
        let body = r#"{
            "code": 200,
            "message": "success",
            "data": {
                "listMeta": {"totalItems": 1},
                "clusters": [{
                    "objectMeta": {"name": "member1", "creationTimestamp": "2024-01-02T03:04:05Z"},
                    "ready": true,
                    "kubernetesVersion": "v1.31.2",
                    "syncMode": "Push",
                    "nodeSummary": {"totalNum": 3, "readyNum": 2},
                    "allocatedResources": {
                        "cpuCapacity": 12, "cpuFraction": 73.2,
                        "memoryCapacity": 1024, "memoryFraction": 10.5,
                        "allocatedPods": 17, "podCapacity": 330, "podFraction": 5.15
                    }
                }]
            }
        }"#;
        let env: Envelope<ClusterList> = serde_json::from_str(body).unwrap();
        let c = &env.data.clusters[0];
        assert_eq!(c.name(), "member1");
        assert!(c.ready);
        assert_eq!(c.sync_mode, "Push");
        assert_eq!(c.node_summary.total_num, 3);
        assert_eq!(c.allocated_resources.cpu_fraction, 73.2);
        assert_eq!(c.allocated_resources.allocated_pods, 17);
    }

    #[test]
    fn test_decode_node_list() {
        let body = r#"{
            "data": {
                "nodes": [{
                    "objectMeta": {
                        "name": "member1-control-plane",
                        "labels": {"node-role.kubernetes.io/control-plane": ""}
                    },
                    "status": {
                        "conditions": [{"type": "Ready", "status": "True"}],
                        "addresses": [{"type": "InternalIP", "address": "172.18.0.3"}],
                        "capacity": {"cpu": "8", "memory": "16Gi", "pods": "110"},
                        "allocatable": {"cpu": "7500m", "memory": "15Gi", "pods": "110"}
                    },
                    "resourceSummary": {"cpuUtilization": "91.9%"}
                }]
            }
        }"#;
        let env: Envelope<NodeList> = serde_json::from_str(body).unwrap();
        let n = &env.data.nodes[0];
        assert_eq!(n.name(), "member1-control-plane");
        assert!(n.cluster_name.is_empty());
        assert_eq!(n.status.capacity.get("memory").map(String::as_str), Some("16Gi"));
        assert_eq!(
            n.resource_summary.as_ref().map(|s| s.cpu_utilization.as_str()),
            Some("91.9%")
        );
    }
}
