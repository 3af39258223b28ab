//! Rendering capability the scheduler draws through.
//!
//! The scheduler never touches a concrete rendering technology. It mounts
//! image nodes hidden, fades them, removes them and toggles the caption.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{Configuration, FitMode};

/// Handle for one mounted image element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStyle {
    pub filter: String,
    pub fit: FitMode,
}

impl ImageStyle {
    pub fn from_config(cfg: &Configuration) -> Self {
        Self {
            filter: cfg.filter.clone(),
            fit: cfg.size,
        }
    }
}

/// Placement hints applied once when the surface is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceLayout {
    pub fill_region: bool,
    pub width: String,
    pub height: String,
    pub fade_edges: bool,
}

impl SurfaceLayout {
    pub fn from_config(cfg: &Configuration) -> Self {
        Self {
            fill_region: cfg.fill_region,
            width: cfg.width.clone(),
            height: cfg.height.clone(),
            fade_edges: cfg.fade_edges,
        }
    }
}

pub trait RenderSurface {
    fn configure(&mut self, layout: &SurfaceLayout);
    /// Adds an image node behind the caption at opacity 0.
    fn mount(&mut self, node: NodeId, url: &str, style: &ImageStyle);
    /// Animates `node` to `opacity` over `fade`; a zero fade is instantaneous.
    fn set_opacity(&mut self, node: NodeId, opacity: f32, fade: Duration);
    fn remove(&mut self, node: NodeId);
    /// `None` hides the caption region.
    fn set_caption(&mut self, caption: Option<&str>);
    fn set_visible(&mut self, visible: bool);
}

#[derive(Debug, Clone, PartialEq)]
pub struct MountedImage {
    pub url: String,
    pub opacity: f32,
    pub style: ImageStyle,
}

/// Keeps the surface as plain data. Hosts that poll for state, and the
/// tests, read it back through the accessors.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    nodes: BTreeMap<NodeId, MountedImage>,
    caption: Option<String>,
    visible: bool,
    layout: Option<SurfaceLayout>,
    removed: Vec<NodeId>,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            caption: None,
            visible: true,
            layout: None,
            removed: Vec::new(),
        }
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, MountedImage> {
        &self.nodes
    }

    pub fn node(&self, node: NodeId) -> Option<&MountedImage> {
        self.nodes.get(&node)
    }

    /// Nodes currently drawn at full opacity.
    pub fn opaque_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, img)| img.opacity >= 1.0)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn layout(&self) -> Option<&SurfaceLayout> {
        self.layout.as_ref()
    }

    /// Every node removed so far, in removal order.
    pub fn removed(&self) -> &[NodeId] {
        &self.removed
    }
}

impl RenderSurface for MemorySurface {
    fn configure(&mut self, layout: &SurfaceLayout) {
        self.layout = Some(layout.clone());
    }

    fn mount(&mut self, node: NodeId, url: &str, style: &ImageStyle) {
        self.nodes.insert(
            node,
            MountedImage {
                url: url.to_string(),
                opacity: 0.0,
                style: style.clone(),
            },
        );
    }

    fn set_opacity(&mut self, node: NodeId, opacity: f32, _fade: Duration) {
        if let Some(img) = self.nodes.get_mut(&node) {
            img.opacity = opacity;
        }
    }

    fn remove(&mut self, node: NodeId) {
        if self.nodes.remove(&node).is_some() {
            self.removed.push(node);
        }
    }

    fn set_caption(&mut self, caption: Option<&str>) {
        self.caption = caption.map(str::to_string);
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Reports every render operation through `tracing`. Used by the daemon,
/// where the actual drawing happens in whatever consumes the log stream.
#[derive(Debug, Default)]
pub struct TracingSurface;

impl RenderSurface for TracingSurface {
    fn configure(&mut self, layout: &SurfaceLayout) {
        info!(
            fill_region = layout.fill_region,
            width = %layout.width,
            height = %layout.height,
            fade_edges = layout.fade_edges,
            "surface configured"
        );
    }

    fn mount(&mut self, node: NodeId, url: &str, style: &ImageStyle) {
        debug!(%node, url, filter = %style.filter, fit = ?style.fit, "surface mount");
    }

    fn set_opacity(&mut self, node: NodeId, opacity: f32, fade: Duration) {
        debug!(%node, opacity, fade_ms = fade.as_millis() as u64, "surface opacity");
    }

    fn remove(&mut self, node: NodeId) {
        debug!(%node, "surface remove");
    }

    fn set_caption(&mut self, caption: Option<&str>) {
        debug!(caption, "surface caption");
    }

    fn set_visible(&mut self, visible: bool) {
        info!(visible, "surface visibility");
    }
}
