use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::viewport::{Orientation, Viewport};

/// One provider source name, or a list of them sharing a single rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    Single(String),
    Many(Vec<String>),
}

impl SourceSpec {
    /// Whether a batch produced for `source` belongs to this configuration.
    pub fn matches(&self, source: &str) -> bool {
        match self {
            Self::Single(name) => name == source,
            Self::Many(names) => names.iter().any(|name| name == source),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Single(name) => name.trim().is_empty(),
            Self::Many(names) => names.iter().all(|name| name.trim().is_empty()),
        }
    }
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self::Single("bing".to_string())
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(name) => f.write_str(name),
            Self::Many(names) => f.write_str(&names.join(",")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationSetting {
    #[default]
    Auto,
    Vertical,
    Horizontal,
}

impl OrientationSetting {
    /// Fixed settings win; `auto` follows the viewport's aspect.
    pub fn resolve(self, viewport: Viewport) -> Orientation {
        match self {
            Self::Auto => viewport.orientation(),
            Self::Vertical => Orientation::Vertical,
            Self::Horizontal => Orientation::Horizontal,
        }
    }
}

/// How the surface reacts to presence reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
    #[default]
    None,
    Show,
    Hide,
}

impl PresenceAction {
    /// Desired surface visibility for a presence report, if the policy cares.
    pub fn visibility(self, present: bool) -> Option<bool> {
        match self {
            Self::None => None,
            Self::Show => Some(present),
            Self::Hide => Some(!present),
        }
    }
}

/// Object-fit mode applied to every mounted image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    #[default]
    Cover,
    Contain,
    Fill,
    None,
    ScaleDown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Provider source (or sources) the rotation draws from.
    pub source: SourceSpec,
    /// How often a fresh batch is requested from the provider.
    #[serde(with = "humantime_serde")]
    pub update_interval: Duration,
    /// Time an image stays on screen after it settles. Zero disables auto-advance.
    #[serde(with = "humantime_serde")]
    pub slide_interval: Duration,
    /// Upper bound on the number of entries kept from a batch.
    pub maximum_entries: usize,
    pub orientation: OrientationSetting,
    /// Largest variant width the resolver may pick.
    pub max_width: u32,
    /// Largest variant height the resolver may pick.
    pub max_height: u32,
    pub crossfade: bool,
    /// Show entry captions once an image settles.
    pub caption: bool,
    pub size: FitMode,
    /// Visual effect descriptor forwarded to the surface untouched.
    pub filter: String,
    pub user_presence_action: PresenceAction,
    /// Provider hint: shuffle the batch before truncation.
    pub shuffle: bool,
    /// Provider hint: append a cache-busting query to direct URLs.
    pub add_cache_buster: bool,
    /// Provider hint: allow entries flagged as not safe for work.
    pub nsfw: bool,
    /// Surface layout: stretch over the whole region instead of `width`/`height`.
    pub fill_region: bool,
    pub width: String,
    pub height: String,
    /// Surface layout: darken the top and bottom edges.
    pub fade_edges: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            source: SourceSpec::default(),
            update_interval: Duration::from_secs(60 * 60),
            slide_interval: Duration::from_secs(5 * 60),
            maximum_entries: 10,
            orientation: OrientationSetting::Auto,
            max_width: u32::MAX,
            max_height: u32::MAX,
            crossfade: true,
            caption: true,
            size: FitMode::Cover,
            filter: "grayscale(0.5) brightness(0.5)".to_string(),
            user_presence_action: PresenceAction::None,
            shuffle: true,
            add_cache_buster: true,
            nsfw: true,
            fill_region: true,
            width: "auto".to_string(),
            height: "auto".to_string(),
            fade_edges: false,
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate startup invariants that serde defaults cannot express.
    ///
    /// Runtime patches skip this on purpose; callers own what they send.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.source.is_empty(), "source must name at least one provider");
        ensure!(
            !self.update_interval.is_zero(),
            "update-interval must be greater than zero"
        );
        ensure!(
            self.maximum_entries > 0,
            "maximum-entries must be greater than zero"
        );
        Ok(self)
    }

    /// Orientation sent to the provider and used to accept batches.
    pub fn resolved_orientation(&self, viewport: Viewport) -> Orientation {
        self.orientation.resolve(viewport)
    }

    /// Field-by-field override; absent fields keep their current value.
    pub fn apply(&mut self, patch: ConfigPatch) {
        let ConfigPatch {
            source,
            update_interval,
            slide_interval,
            maximum_entries,
            orientation,
            max_width,
            max_height,
            crossfade,
            caption,
            size,
            filter,
            user_presence_action,
            shuffle,
            add_cache_buster,
            nsfw,
        } = patch;

        overwrite(&mut self.source, source);
        overwrite(&mut self.update_interval, update_interval);
        overwrite(&mut self.slide_interval, slide_interval);
        overwrite(&mut self.maximum_entries, maximum_entries);
        overwrite(&mut self.orientation, orientation);
        overwrite(&mut self.max_width, max_width);
        overwrite(&mut self.max_height, max_height);
        overwrite(&mut self.crossfade, crossfade);
        overwrite(&mut self.caption, caption);
        overwrite(&mut self.size, size);
        overwrite(&mut self.filter, filter);
        overwrite(&mut self.user_presence_action, user_presence_action);
        overwrite(&mut self.shuffle, shuffle);
        overwrite(&mut self.add_cache_buster, add_cache_buster);
        overwrite(&mut self.nsfw, nsfw);
    }
}

fn overwrite<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Partial configuration delivered at runtime.
///
/// Layout options (`fill-region`, `width`, `height`, `fade-edges`) are
/// applied once at startup and are therefore not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub update_interval: Option<Duration>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub slide_interval: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_entries: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<OrientationSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossfade: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<FitMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_presence_action: Option<PresenceAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_cache_buster: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
}

/// Runtime reconfiguration: either a new source alone or a partial patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigUpdate {
    Source(String),
    Patch(ConfigPatch),
}

impl ConfigUpdate {
    pub fn into_patch(self) -> ConfigPatch {
        match self {
            Self::Source(source) => ConfigPatch {
                source: Some(SourceSpec::Single(source)),
                ..ConfigPatch::default()
            },
            Self::Patch(patch) => patch,
        }
    }
}
