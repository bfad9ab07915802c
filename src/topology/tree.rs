use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::cache::NodeCache;
use crate::models::k8s::{
    AllocatedResources, ClusterSummary, NodeAddress, NodeSummary, ResourceSummary,
    WorkerNodeDetail,
};

/// Upper bound on placeholders per cluster, whatever `totalNum` reports.
pub const MAX_PLACEHOLDERS: u32 = 5000;

pub const CONTROL_PLANE_ID: &str = "control-plane";

const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    ControlPlane,
    Cluster,
    WorkerNode,
    WorkerNodePlaceholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyNode {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub payload: NodePayload,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TopologyNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodePayload {
    ControlPlane(ControlPlanePayload),
    Cluster(ClusterPayload),
    WorkerNode(WorkerPayload),
    WorkerNodePlaceholder(PlaceholderPayload),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlanePayload {
    pub cluster_count: u32,
    pub ready_clusters: u32,
    pub total_nodes: u32,
    pub ready_nodes: u32,
    pub allocated_pods: u64,
    pub pod_capacity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPayload {
    pub ready: bool,
    pub kubernetes_version: String,
    pub sync_mode: String,
    pub node_summary: NodeSummary,
    pub allocated_resources: AllocatedResources,
    pub creation_timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    ControlPlane,
    Etcd,
    Worker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPayload {
    pub cluster_name: String,
    pub ready: bool,
    pub roles: BTreeSet<NodeRole>,
    pub addresses: Vec<NodeAddress>,
    pub capacity: ResourceList,
    pub allocatable: ResourceList,
    pub resource_summary: Option<ResourceSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceList {
    pub cpu: String,
    pub memory: String,
    pub pods: String,
}

impl ResourceList {
    fn from_map(m: &HashMap<String, String>) -> Self {
        let get = |k: &str| m.get(k).cloned().unwrap_or_default();
        Self {
            cpu: get("cpu"),
            memory: get("memory"),
            pods: get("pods"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderPayload {
    pub cluster_name: String,
    pub index: u32,
}

impl TopologyNode {
    pub fn kind(&self) -> NodeKind {
        match self.payload {
            NodePayload::ControlPlane(_) => NodeKind::ControlPlane,
            NodePayload::Cluster(_) => NodeKind::Cluster,
            NodePayload::WorkerNode(_) => NodeKind::WorkerNode,
            NodePayload::WorkerNodePlaceholder(_) => NodeKind::WorkerNodePlaceholder,
        }
    }

    pub fn find(&self, id: &str) -> Option<&TopologyNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_unique_by_name(&self, name: &str) -> Option<&TopologyNode> {
        let mut found = Vec::new();
        self.collect_by_name(name, &mut found);
        match found.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    fn collect_by_name<'a>(&'a self, name: &str, out: &mut Vec<&'a TopologyNode>) {
        if self.name == name {
            out.push(self);
        }
        for c in &self.children {
            c.collect_by_name(name, out);
        }
    }

    /// Copy of this node without its subtree.
    pub fn detached(&self) -> TopologyNode {
        TopologyNode {
            id: self.id.clone(),
            name: self.name.clone(),
            payload: self.payload.clone(),
            children: Vec::new(),
        }
    }
}

/// Build the tree for `snapshot`, requesting node data for every cluster the
/// cache has not loaded yet.
///
/// Clusters keep snapshot order and workers keep the order the API returned
/// them in, so equal inputs give structurally equal trees. Until a cluster's
/// nodes are ready it gets `totalNum` placeholders, capped at
/// [`MAX_PLACEHOLDERS`].
pub fn build(snapshot: &[ClusterSummary], cache: &Arc<NodeCache>) -> TopologyNode {
    let mut aggregate = ControlPlanePayload::default();
    let mut clusters = Vec::with_capacity(snapshot.len());

    for summary in snapshot {
        let resources = &summary.allocated_resources;
        aggregate.cluster_count = aggregate.cluster_count.saturating_add(1);
        if summary.ready {
            aggregate.ready_clusters = aggregate.ready_clusters.saturating_add(1);
        }
        aggregate.total_nodes = aggregate
            .total_nodes
            .saturating_add(summary.node_summary.total_num);
        aggregate.ready_nodes = aggregate
            .ready_nodes
            .saturating_add(summary.node_summary.ready_num);
        aggregate.allocated_pods = aggregate.allocated_pods.saturating_add(resources.allocated_pods);
        aggregate.pod_capacity = aggregate.pod_capacity.saturating_add(resources.pod_capacity);

        let children = match cache.ready_nodes(summary.name()) {
            Some(nodes) => nodes
                .iter()
                .map(|n| worker_node(summary.name(), n))
                .collect(),
            None => {
                cache.ensure_loaded(summary.name());
                placeholders(summary.name(), summary.node_summary.total_num)
            }
        };

        clusters.push(cluster_node(summary, children));
    }

    TopologyNode {
        id: CONTROL_PLANE_ID.to_string(),
        name: CONTROL_PLANE_ID.to_string(),
        payload: NodePayload::ControlPlane(aggregate),
        children: clusters,
    }
}

fn cluster_node(summary: &ClusterSummary, children: Vec<TopologyNode>) -> TopologyNode {
    TopologyNode {
        id: summary.name().to_string(),
        name: summary.name().to_string(),
        payload: NodePayload::Cluster(ClusterPayload {
            ready: summary.ready,
            kubernetes_version: summary.kubernetes_version.clone(),
            sync_mode: summary.sync_mode.clone(),
            node_summary: summary.node_summary,
            allocated_resources: summary.allocated_resources,
            creation_timestamp: summary.object_meta.creation_timestamp.clone(),
        }),
        children,
    }
}

fn worker_node(cluster: &str, node: &WorkerNodeDetail) -> TopologyNode {
    TopologyNode {
        id: format!("{}/{}", cluster, node.name()),
        name: node.name().to_string(),
        payload: NodePayload::WorkerNode(WorkerPayload {
            cluster_name: cluster.to_string(),
            ready: is_ready(node),
            roles: roles(node),
            addresses: node.status.addresses.clone(),
            capacity: ResourceList::from_map(&node.status.capacity),
            allocatable: ResourceList::from_map(&node.status.allocatable),
            resource_summary: node.resource_summary.clone(),
        }),
        children: Vec::new(),
    }
}

fn placeholders(cluster: &str, count: u32) -> Vec<TopologyNode> {
    (0..count.min(MAX_PLACEHOLDERS))
        .map(|index| TopologyNode {
            id: format!("{}/loading/{}", cluster, index),
            name: format!("loading-node-{}", index),
            payload: NodePayload::WorkerNodePlaceholder(PlaceholderPayload {
                cluster_name: cluster.to_string(),
                index,
            }),
            children: Vec::new(),
        })
        .collect()
}

fn is_ready(node: &WorkerNodeDetail) -> bool {
    node.status
        .conditions
        .iter()
        .any(|c| c.condition_type == "Ready" && c.status == "True")
}

fn roles(node: &WorkerNodeDetail) -> BTreeSet<NodeRole> {
    let mut roles: BTreeSet<NodeRole> = node
        .metadata
        .labels
        .keys()
        .filter_map(|k| k.strip_prefix(ROLE_LABEL_PREFIX))
        .filter_map(|role| match role {
            "control-plane" | "master" => Some(NodeRole::ControlPlane),
            "etcd" => Some(NodeRole::Etcd),
            _ => None,
        })
        .collect();
    if roles.is_empty() {
        roles.insert(NodeRole::Worker);
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::k8s::NodeCondition;
    use crate::testutil::{FakeApi, cluster, node, wait_until};
    use crate::topology::cache::CacheState;

    fn count(tree: &TopologyNode, kind: NodeKind) -> usize {
        let own = usize::from(tree.kind() == kind);
        own + tree.children.iter().map(|c| count(c, kind)).sum::<usize>()
    }

    #[tokio::test]
    async fn test_tree_shape_before_nodes_load() {
        let api = Arc::new(FakeApi::new());
        api.hold();
        let cache = Arc::new(NodeCache::new(api.clone()));
        let snapshot = vec![cluster("member1", 3, 3), cluster("member2", 2, 1)];

        let tree = build(&snapshot, &cache);

        assert_eq!(tree.kind(), NodeKind::ControlPlane);
        assert_eq!(tree.id, CONTROL_PLANE_ID);
        assert_eq!(count(&tree, NodeKind::ControlPlane), 1);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].id, "member1");
        assert_eq!(tree.children[1].id, "member2");
        assert_eq!(tree.children[0].children.len(), 3);
        assert_eq!(tree.children[1].children.len(), 2);
        assert_eq!(tree.children[1].children[1].id, "member2/loading/1");
        assert_eq!(tree.children[1].children[1].name, "loading-node-1");
        assert_eq!(count(&tree, NodeKind::WorkerNodePlaceholder), 5);

        assert_eq!(cache.state("member1"), Some(CacheState::Pending));
        assert_eq!(cache.state("member2"), Some(CacheState::Pending));
    }

    #[tokio::test]
    async fn test_control_plane_aggregates() {
        let api = Arc::new(FakeApi::new());
        let cache = Arc::new(NodeCache::new(api.clone()));
        let mut down = cluster("member2", 4, 1);
        down.ready = false;
        down.allocated_resources.allocated_pods = 5;

        let tree = build(&[cluster("member1", 3, 2), down], &cache);

        let NodePayload::ControlPlane(agg) = tree.payload else {
            panic!("root is not the control plane");
        };
        assert_eq!(agg.cluster_count, 2);
        assert_eq!(agg.ready_clusters, 1);
        assert_eq!(agg.total_nodes, 7);
        assert_eq!(agg.ready_nodes, 3);
        assert_eq!(agg.allocated_pods, 15);
        assert_eq!(agg.pod_capacity, 220);
    }

    #[tokio::test]
    async fn test_corrupt_node_counts_are_bounded() {
        let api = Arc::new(FakeApi::new());
        api.hold();
        let cache = Arc::new(NodeCache::new(api.clone()));
        let mut huge = cluster("member1", u32::MAX, u32::MAX);
        huge.allocated_resources.pod_capacity = u64::MAX;

        let tree = build(&[huge, cluster("member2", 2, 2)], &cache);

        let NodePayload::ControlPlane(agg) = tree.payload else {
            panic!("root is not the control plane");
        };
        assert_eq!(agg.total_nodes, u32::MAX);
        assert_eq!(agg.ready_nodes, u32::MAX);
        assert_eq!(agg.pod_capacity, u64::MAX);
        assert_eq!(tree.children[0].children.len(), MAX_PLACEHOLDERS as usize);
        assert_eq!(tree.children[1].children.len(), 2);
    }

    #[tokio::test]
    async fn test_placeholders_replaced_by_fetched_nodes() {
        let api = Arc::new(FakeApi::new().with_nodes("member1", vec![node("a"), node("b")]));
        let cache = Arc::new(NodeCache::new(api.clone()));
        let snapshot = vec![cluster("member1", 5, 5)];

        let before = build(&snapshot, &cache);
        assert_eq!(before.children[0].children.len(), 5);

        wait_until(|| cache.state("member1") == Some(CacheState::Ready)).await;
        let after = build(&snapshot, &cache);

        let workers = &after.children[0].children;
        assert_eq!(workers.len(), 2);
        assert_eq!(count(&after, NodeKind::WorkerNodePlaceholder), 0);
        assert_eq!(workers[0].id, "member1/a");
        assert_eq!(workers[1].id, "member1/b");
        assert_eq!(api.node_calls("member1"), 1);
    }

    #[tokio::test]
    async fn test_rebuild_is_deterministic() {
        let api = Arc::new(FakeApi::new().with_nodes("member1", vec![node("x"), node("y")]));
        let cache = Arc::new(NodeCache::new(api.clone()));
        let snapshot = vec![cluster("member1", 2, 2), cluster("member2", 1, 1)];

        build(&snapshot, &cache);
        wait_until(|| cache.state("member1") == Some(CacheState::Ready)).await;

        assert_eq!(build(&snapshot, &cache), build(&snapshot, &cache));
    }

    #[tokio::test]
    async fn test_worker_readiness_and_roles() {
        let mut cp = node("cp");
        cp.metadata.labels.insert(
            "node-role.kubernetes.io/control-plane".to_string(),
            String::new(),
        );
        cp.metadata
            .labels
            .insert("node-role.kubernetes.io/etcd".to_string(), String::new());
        let mut sick = node("sick");
        sick.status.conditions = vec![NodeCondition {
            condition_type: "Ready".to_string(),
            status: "False".to_string(),
        }];

        let api = Arc::new(FakeApi::new().with_nodes("member1", vec![cp, sick]));
        let cache = Arc::new(NodeCache::new(api.clone()));
        let snapshot = vec![cluster("member1", 2, 1)];
        build(&snapshot, &cache);
        wait_until(|| cache.state("member1") == Some(CacheState::Ready)).await;

        let tree = build(&snapshot, &cache);
        let workers = &tree.children[0].children;

        let NodePayload::WorkerNode(ref cp) = workers[0].payload else {
            panic!("expected worker node");
        };
        assert!(cp.ready);
        assert_eq!(
            cp.roles.iter().copied().collect::<Vec<_>>(),
            vec![NodeRole::ControlPlane, NodeRole::Etcd]
        );
        assert_eq!(cp.capacity.memory, "16Gi");

        let NodePayload::WorkerNode(ref sick) = workers[1].payload else {
            panic!("expected worker node");
        };
        assert!(!sick.ready);
        assert_eq!(sick.roles.iter().copied().collect::<Vec<_>>(), vec![NodeRole::Worker]);
    }

    #[tokio::test]
    async fn test_find_and_serialize() {
        let api = Arc::new(FakeApi::new());
        api.hold();
        let cache = Arc::new(NodeCache::new(api.clone()));
        let tree = build(&[cluster("member1", 1, 1)], &cache);

        assert_eq!(tree.find("member1/loading/0").map(|n| n.kind()), Some(NodeKind::WorkerNodePlaceholder));
        assert!(tree.find("member9").is_none());
        assert_eq!(tree.find_unique_by_name("member1").map(|n| n.id.as_str()), Some("member1"));
        assert!(tree.detached().children.is_empty());

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["type"], "control-plane");
        assert_eq!(json["clusterCount"], 1);
        assert_eq!(json["children"][0]["type"], "cluster");
        assert_eq!(json["children"][0]["syncMode"], "Push");
        assert_eq!(json["children"][0]["children"][0]["type"], "worker-node-placeholder");
    }
}
