use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::join_all;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::IconsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKind {
    ControlPlane,
    Cluster,
    WorkerNode,
}

impl IconKind {
    pub const ALL: [IconKind; 3] = [IconKind::ControlPlane, IconKind::Cluster, IconKind::WorkerNode];

    pub fn glyph(&self) -> &'static str {
        match self {
            IconKind::ControlPlane => "CP",
            IconKind::Cluster => "C",
            IconKind::WorkerNode => "N",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "control-plane" => Some(IconKind::ControlPlane),
            "cluster" => Some(IconKind::Cluster),
            "worker-node" => Some(IconKind::WorkerNode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Icon {
    Image { content_type: String, bytes: Vec<u8> },
    Glyph(&'static str),
}

impl Icon {
    pub fn data_uri(&self) -> Option<String> {
        match self {
            Icon::Image {
                content_type,
                bytes,
            } => Some(format!(
                "data:{};base64,{}",
                content_type,
                STANDARD.encode(bytes)
            )),
            Icon::Glyph(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IconRef {
    DataUri(String),
    Glyph(&'static str),
}

#[derive(Debug, Clone)]
pub struct IconCache {
    icons: HashMap<IconKind, Icon>,
}

impl IconCache {
    /// Load all icons concurrently; returns once every load has settled.
    pub async fn preload(cfg: &IconsConfig, http: &Client) -> Self {
        let loads = IconKind::ALL.map(|kind| {
            let source = match kind {
                IconKind::ControlPlane => cfg.control_plane.clone(),
                IconKind::Cluster => cfg.cluster.clone(),
                IconKind::WorkerNode => cfg.worker_node.clone(),
            };
            async move {
                let icon = match source {
                    Some(src) => match load(&src, http).await {
                        Ok(icon) => {
                            debug!("loaded {:?} icon from {}", kind, src);
                            icon
                        }
                        Err(e) => {
                            warn!("failed to load {:?} icon from {}: {}", kind, src, e);
                            Icon::Glyph(kind.glyph())
                        }
                    },
                    None => Icon::Glyph(kind.glyph()),
                };
                (kind, icon)
            }
        });

        Self {
            icons: join_all(loads).await.into_iter().collect(),
        }
    }

    pub fn glyphs_only() -> Self {
        Self {
            icons: IconKind::ALL
                .into_iter()
                .map(|k| (k, Icon::Glyph(k.glyph())))
                .collect(),
        }
    }

    pub fn get(&self, kind: IconKind) -> Icon {
        self.icons
            .get(&kind)
            .cloned()
            .unwrap_or(Icon::Glyph(kind.glyph()))
    }

    pub fn manifest(&self) -> HashMap<IconKind, IconRef> {
        IconKind::ALL
            .into_iter()
            .map(|kind| {
                let icon = self.get(kind);
                let r = match icon.data_uri() {
                    Some(uri) => IconRef::DataUri(uri),
                    None => IconRef::Glyph(kind.glyph()),
                };
                (kind, r)
            })
            .collect()
    }
}

async fn load(
    source: &str,
    http: &Client,
) -> Result<Icon, Box<dyn std::error::Error + Send + Sync>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let resp = http.get(source).send().await?;
        if resp.status().as_u16() >= 400 {
            return Err(format!("GET {} returned {}", source, resp.status()).into());
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for(source).to_string());
        let bytes = resp.bytes().await?.to_vec();
        Ok(Icon::Image {
            content_type,
            bytes,
        })
    } else {
        let bytes = tokio::fs::read(source).await?;
        if bytes.is_empty() {
            return Err(format!("icon file {} is empty", source).into());
        }
        Ok(Icon::Image {
            content_type: content_type_for(source).to_string(),
            bytes,
        })
    }
}

fn content_type_for(source: &str) -> &'static str {
    let ext = Path::new(source)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
