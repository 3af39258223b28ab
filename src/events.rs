use serde::{Deserialize, Serialize};

use crate::config::{ConfigUpdate, Configuration};
use crate::viewport::Orientation;

/// Alternate rendition of an image. Entries list them smallest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariant {
    pub width: u32,
    pub height: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<ImageVariant>,
}

/// Everything a provider produced for one `(source, orientation)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub source: String,
    pub orientation: Orientation,
    #[serde(default)]
    pub entries: Vec<ImageEntry>,
}

/// Inbound notifications from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WallpaperEvent {
    BatchAvailable(Batch),
    ForceAdvance,
    PresenceChanged { present: bool },
    ConfigUpdate { payload: ConfigUpdate },
}

/// Asks the provider for a fresh batch matching this snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchRequest {
    pub config: Configuration,
    pub orientation: Orientation,
}

/// Emitted once an image has fully settled on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Displayed {
    pub url: String,
    pub caption: Option<String>,
}

/// Messages the router leaves for the driver to deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Fetch(FetchRequest),
    Displayed(Displayed),
}
