use serde::Serialize;

use super::tree::{NodeKind, TopologyNode};

pub const MIN_PANEL_WIDTH: u32 = 300;
pub const MAX_PANEL_WIDTH: u32 = 800;

pub fn clamp_panel_width(width: impl Into<i64>) -> u32 {
    let width = width.into();
    width.clamp(MIN_PANEL_WIDTH as i64, MAX_PANEL_WIDTH as i64) as u32
}

/// The selected node: either resolved from the tree, or a minimal stand-in
/// built from the clicked identifier alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SelectedNode {
    Resolved(TopologyNode),
    Fallback(FallbackNode),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    pub id: String,
}

impl SelectedNode {
    pub fn id(&self) -> &str {
        match self {
            SelectedNode::Resolved(n) => &n.id,
            SelectedNode::Fallback(f) => &f.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            SelectedNode::Resolved(n) => n.kind(),
            SelectedNode::Fallback(f) => f.kind,
        }
    }
}

pub fn classify(identifier: &str) -> NodeKind {
    if identifier.contains("control-plane") {
        NodeKind::ControlPlane
    } else if identifier.contains("loading-node") {
        NodeKind::WorkerNode
    } else {
        NodeKind::Cluster
    }
}

/// `node` is `None` only before the first tree has been built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    node: Option<SelectedNode>,
    panel_open: bool,
    panel_width: u32,
}

impl Selection {
    pub fn new(panel_width: u32) -> Self {
        Self {
            node: None,
            panel_open: false,
            panel_width: clamp_panel_width(panel_width),
        }
    }

    pub fn node(&self) -> Option<&SelectedNode> {
        self.node.as_ref()
    }

    pub fn panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn panel_width(&self) -> u32 {
        self.panel_width
    }

    /// Select the tree root if nothing has been selected yet.
    pub fn ensure_default(&mut self, tree: &TopologyNode) {
        if self.node.is_none() {
            self.node = Some(SelectedNode::Resolved(tree.detached()));
        }
    }

    /// Select the node for `identifier` and open the panel.
    ///
    /// Resolution tries node ids, then a unique display name. When both miss,
    /// a fallback node is classified from the identifier text. An empty
    /// identifier leaves the selection untouched.
    pub fn on_node_clicked(
        &mut self,
        tree: Option<&TopologyNode>,
        identifier: &str,
    ) -> Option<&SelectedNode> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return self.node.as_ref();
        }

        let resolved = tree.and_then(|t| {
            t.find(identifier)
                .or_else(|| t.find_unique_by_name(identifier))
        });

        let node = match resolved {
            Some(n) => SelectedNode::Resolved(n.detached()),
            None => SelectedNode::Fallback(FallbackNode {
                kind: classify(identifier),
                name: identifier.to_string(),
                id: identifier.to_string(),
            }),
        };

        self.node = Some(node);
        self.panel_open = true;
        self.node.as_ref()
    }

    pub fn on_panel_close(&mut self) {
        self.panel_open = false;
    }

    pub fn on_panel_resize(&mut self, width: i64) -> u32 {
        self.panel_width = clamp_panel_width(width);
        self.panel_width
    }
}
