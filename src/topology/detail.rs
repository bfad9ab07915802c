use chrono::{DateTime, Utc};
use serde::Serialize;

use super::quantity::{self, Quantity};
use super::selection::{FallbackNode, SelectedNode};
use super::tree::{
    ClusterPayload, ControlPlanePayload, NodeKind, NodePayload, NodeRole, PlaceholderPayload,
    TopologyNode, WorkerPayload,
};
use crate::helpers::{human_bytes, parse_age, parse_percent};
use crate::models::k8s::{NodeAddress, ResourceSummary};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DetailSummary {
    ControlPlane(ControlPlaneDetail),
    Cluster(ClusterDetail),
    WorkerNode(WorkerDetail),
    WorkerNodePlaceholder(PlaceholderDetail),
    Unresolved(UnresolvedDetail),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneDetail {
    pub name: String,
    pub cluster_count: u32,
    pub ready_clusters: u32,
    pub total_nodes: u32,
    pub ready_nodes: u32,
    pub allocated_pods: u64,
    pub pod_capacity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDetail {
    pub name: String,
    pub ready: bool,
    pub status: &'static str,
    pub kubernetes_version: String,
    pub sync_mode: String,
    pub total_nodes: u32,
    pub ready_nodes: u32,
    /// Percentages in 0..=100, as reported upstream.
    pub cpu_fraction: f64,
    pub memory_fraction: f64,
    pub pod_fraction: f64,
    pub cpu_capacity: u64,
    pub memory_capacity: String,
    pub allocated_pods: u64,
    pub pod_capacity: u64,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerDetail {
    pub cluster_name: String,
    pub name: String,
    pub ready: bool,
    pub status: &'static str,
    pub roles: Vec<NodeRole>,
    pub addresses: Vec<NodeAddress>,
    pub cpu_capacity: Quantity,
    pub memory_capacity: Quantity,
    pub pod_capacity: u64,
    pub cpu_allocatable: Quantity,
    pub memory_allocatable: Quantity,
    pub pod_allocatable: u64,
    pub utilization: Utilization,
}

/// Node utilization. `Unavailable` means no summary was reported, which is
/// distinct from a reported 0%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Utilization {
    Available { cpu: f64, memory: f64, pods: f64 },
    Unavailable,
}

impl From<Option<&ResourceSummary>> for Utilization {
    fn from(summary: Option<&ResourceSummary>) -> Self {
        match summary {
            Some(s) => Utilization::Available {
                cpu: parse_percent(&s.cpu_utilization),
                memory: parse_percent(&s.memory_utilization),
                pods: parse_percent(&s.pod_utilization),
            },
            None => Utilization::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderDetail {
    pub cluster_name: String,
    pub index: u32,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedDetail {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
}

pub fn present(node: &SelectedNode, now: DateTime<Utc>) -> DetailSummary {
    match node {
        SelectedNode::Resolved(n) => present_node(n, now),
        SelectedNode::Fallback(f) => present_fallback(f),
    }
}

fn present_node(node: &TopologyNode, now: DateTime<Utc>) -> DetailSummary {
    match &node.payload {
        NodePayload::ControlPlane(p) => DetailSummary::ControlPlane(control_plane(&node.name, p)),
        NodePayload::Cluster(p) => DetailSummary::Cluster(cluster(&node.name, p, now)),
        NodePayload::WorkerNode(p) => DetailSummary::WorkerNode(worker(&node.name, p)),
        NodePayload::WorkerNodePlaceholder(p) => {
            DetailSummary::WorkerNodePlaceholder(placeholder(p))
        }
    }
}

fn control_plane(name: &str, p: &ControlPlanePayload) -> ControlPlaneDetail {
    ControlPlaneDetail {
        name: name.to_string(),
        cluster_count: p.cluster_count,
        ready_clusters: p.ready_clusters,
        total_nodes: p.total_nodes,
        ready_nodes: p.ready_nodes,
        allocated_pods: p.allocated_pods,
        pod_capacity: p.pod_capacity,
    }
}

fn cluster(name: &str, p: &ClusterPayload, now: DateTime<Utc>) -> ClusterDetail {
    let res = &p.allocated_resources;
    ClusterDetail {
        name: name.to_string(),
        ready: p.ready,
        status: ready_label(p.ready),
        kubernetes_version: p.kubernetes_version.clone(),
        sync_mode: p.sync_mode.clone(),
        total_nodes: p.node_summary.total_num,
        ready_nodes: p.node_summary.ready_num,
        cpu_fraction: res.cpu_fraction,
        memory_fraction: res.memory_fraction,
        pod_fraction: res.pod_fraction,
        cpu_capacity: res.cpu_capacity,
        memory_capacity: human_bytes(res.memory_capacity),
        allocated_pods: res.allocated_pods,
        pod_capacity: res.pod_capacity,
        age: parse_age(p.creation_timestamp.as_deref(), now),
    }
}

fn worker(name: &str, p: &WorkerPayload) -> WorkerDetail {
    WorkerDetail {
        cluster_name: p.cluster_name.clone(),
        name: name.to_string(),
        ready: p.ready,
        status: ready_label(p.ready),
        roles: p.roles.iter().copied().collect(),
        addresses: p.addresses.clone(),
        cpu_capacity: quantity::parse(&p.capacity.cpu),
        memory_capacity: quantity::parse(&p.capacity.memory),
        pod_capacity: parse_count(&p.capacity.pods),
        cpu_allocatable: quantity::parse(&p.allocatable.cpu),
        memory_allocatable: quantity::parse(&p.allocatable.memory),
        pod_allocatable: parse_count(&p.allocatable.pods),
        utilization: p.resource_summary.as_ref().into(),
    }
}

fn placeholder(p: &PlaceholderPayload) -> PlaceholderDetail {
    PlaceholderDetail {
        cluster_name: p.cluster_name.clone(),
        index: p.index,
        status: "Loading",
    }
}

fn present_fallback(f: &FallbackNode) -> DetailSummary {
    DetailSummary::Unresolved(UnresolvedDetail {
        id: f.id.clone(),
        name: f.name.clone(),
        kind: f.kind,
    })
}

fn ready_label(ready: bool) -> &'static str {
    if ready { "Ready" } else { "NotReady" }
}

// Pod counts are plain integers; anything else counts as zero.
fn parse_count(s: &str) -> u64 {
    s.trim().parse().unwrap_or(0)
}
