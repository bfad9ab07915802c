use chrono::Utc;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::models::k8s::ClusterSummary;
use crate::topology::cache::NodeCache;
use crate::topology::detail::{self, DetailSummary};
use crate::topology::selection::{SelectedNode, Selection};
use crate::topology::tree::{self, TopologyNode};
use crate::topology::{lock, read, write};

use super::DashboardApi;

pub struct Aggregator {
    api: Arc<dyn DashboardApi>,
    cache: Arc<NodeCache>,
    snapshot: RwLock<Arc<Vec<ClusterSummary>>>,
    tree: RwLock<Option<Arc<TopologyNode>>>,
    selection: Mutex<Selection>,
    versions: watch::Sender<u64>,
    // Held from snapshot read to tree store so trees are stored in the order
    // their inputs were read.
    rebuilding: Mutex<()>,
}

impl Aggregator {
    pub fn new(api: Arc<dyn DashboardApi>, panel_width: u32) -> Self {
        let (versions, _) = watch::channel(0);
        Self {
            cache: Arc::new(NodeCache::new(api.clone())),
            api,
            snapshot: RwLock::new(Arc::new(Vec::new())),
            tree: RwLock::new(None),
            selection: Mutex::new(Selection::new(panel_width)),
            versions,
            rebuilding: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &Arc<NodeCache> {
        &self.cache
    }

    pub async fn refresh_snapshot(&self) -> Result<(), ClientError> {
        match self.api.fetch_cluster_snapshot().await {
            Ok(clusters) => {
                debug!("snapshot has {} clusters", clusters.len());
                self.set_snapshot(clusters);
                Ok(())
            }
            Err(e) => {
                warn!("error fetching cluster snapshot: {}", e);
                Err(e)
            }
        }
    }

    pub fn set_snapshot(&self, clusters: Vec<ClusterSummary>) -> Arc<TopologyNode> {
        let _rebuilding = lock(&self.rebuilding);
        *write(&self.snapshot) = Arc::new(clusters);
        self.build_and_store()
    }

    pub fn snapshot(&self) -> Arc<Vec<ClusterSummary>> {
        read(&self.snapshot).clone()
    }

    /// Rebuild the tree from the current snapshot and cache contents.
    pub fn rebuild(&self) -> Arc<TopologyNode> {
        let _rebuilding = lock(&self.rebuilding);
        self.build_and_store()
    }

    fn build_and_store(&self) -> Arc<TopologyNode> {
        let snapshot = self.snapshot();
        let tree = Arc::new(tree::build(&snapshot, &self.cache));

        *write(&self.tree) = Some(tree.clone());
        lock(&self.selection).ensure_default(&tree);
        self.versions.send_modify(|v| *v += 1);

        tree
    }

    pub fn get_tree(&self) -> Option<Arc<TopologyNode>> {
        read(&self.tree).clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.versions.subscribe()
    }

    pub fn selection(&self) -> Selection {
        lock(&self.selection).clone()
    }

    pub fn on_node_clicked(&self, identifier: &str) -> Selection {
        let tree = self.get_tree();
        let mut selection = lock(&self.selection);
        selection.on_node_clicked(tree.as_deref(), identifier);
        selection.clone()
    }

    pub fn on_panel_close(&self) -> Selection {
        let mut selection = lock(&self.selection);
        selection.on_panel_close();
        selection.clone()
    }

    pub fn on_panel_resize(&self, width: i64) -> Selection {
        let mut selection = lock(&self.selection);
        selection.on_panel_resize(width);
        selection.clone()
    }

    /// Summary for the selected node, using the latest tree's data for it
    /// when the node is still present.
    pub fn get_detail_summary(&self) -> Option<DetailSummary> {
        let selected = lock(&self.selection).node().cloned()?;

        let fresh = match (&selected, self.get_tree()) {
            (SelectedNode::Resolved(node), Some(tree)) => tree
                .find(&node.id)
                .map(|n| SelectedNode::Resolved(n.detached())),
            _ => None,
        };

        Some(detail::present(fresh.as_ref().unwrap_or(&selected), Utc::now()))
    }

    /// Poll the snapshot on `interval` and rebuild whenever the node cache
    /// changes, until `shutdown` fires.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<()>) {
        let mut cache_changes = self.cache.subscribe();
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = self.refresh_snapshot().await;
                }
                changed = cache_changes.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    self.rebuild();
                }
                _ = shutdown.changed() => {
                    info!("topology refresher shutting down");
                    return;
                }
            }
        }
    }
}
