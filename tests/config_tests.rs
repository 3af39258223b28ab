use rust_wallpaper::config::{
    ConfigPatch, ConfigUpdate, Configuration, FitMode, OrientationSetting, PresenceAction,
    SourceSpec,
};
use rust_wallpaper::viewport::{Orientation, Viewport};
use std::io::Write;
use std::time::Duration;

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg, Configuration::default());
    assert_eq!(cfg.source, SourceSpec::Single("bing".into()));
    assert_eq!(cfg.update_interval, Duration::from_secs(3600));
    assert_eq!(cfg.slide_interval, Duration::from_secs(300));
    assert_eq!(cfg.maximum_entries, 10);
    assert_eq!(cfg.filter, "grayscale(0.5) brightness(0.5)");
    assert_eq!(cfg.max_width, u32::MAX);
    assert_eq!(cfg.size, FitMode::Cover);
    assert_eq!(cfg.user_presence_action, PresenceAction::None);
    assert!(cfg.crossfade && cfg.caption);
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
source: apod
update-interval: 30m
slide-interval: 45s
maximum-entries: 4
orientation: vertical
max-width: 2048
max-height: 1536
crossfade: false
size: scale-down
user-presence-action: hide
fade-edges: true
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.source, SourceSpec::Single("apod".into()));
    assert_eq!(cfg.update_interval, Duration::from_secs(30 * 60));
    assert_eq!(cfg.slide_interval, Duration::from_secs(45));
    assert_eq!(cfg.maximum_entries, 4);
    assert_eq!(cfg.orientation, OrientationSetting::Vertical);
    assert_eq!((cfg.max_width, cfg.max_height), (2048, 1536));
    assert!(!cfg.crossfade);
    assert_eq!(cfg.size, FitMode::ScaleDown);
    assert_eq!(cfg.user_presence_action, PresenceAction::Hide);
    assert!(cfg.fade_edges);
    assert!(cfg.caption, "unset keys keep their defaults");
}

#[test]
fn parse_source_list() {
    let yaml = r#"
source: [bing, apod]
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.source.matches("apod"));
    assert!(!cfg.source.matches("reddit"));
    assert_eq!(cfg.source.to_string(), "bing,apod");
}

#[test]
fn load_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source: apod\nslide-interval: 10s").unwrap();

    let cfg = Configuration::from_yaml_file(file.path())
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.source, SourceSpec::Single("apod".into()));
    assert_eq!(cfg.slide_interval, Duration::from_secs(10));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Configuration::from_yaml_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read"));
}

#[test]
fn validation_rejects_blank_source() {
    let cfg = Configuration {
        source: SourceSpec::Single("  ".into()),
        ..Configuration::default()
    };
    assert!(cfg.validated().is_err());
}

#[test]
fn validation_rejects_zero_update_interval() {
    let yaml = "update-interval: 0s\n";
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("update-interval"));
}

#[test]
fn validation_rejects_zero_maximum_entries() {
    let cfg = Configuration {
        maximum_entries: 0,
        ..Configuration::default()
    };
    assert!(cfg.validated().is_err());
}

#[test]
fn zero_slide_interval_is_valid() {
    let cfg: Configuration = serde_yaml::from_str("slide-interval: 0s\n").unwrap();
    assert!(cfg.validated().unwrap().slide_interval.is_zero());
}

#[test]
fn patch_overrides_only_present_fields() {
    let mut cfg = Configuration::default();
    cfg.apply(ConfigPatch {
        slide_interval: Some(Duration::from_secs(20)),
        filter: Some("none".into()),
        ..ConfigPatch::default()
    });
    assert_eq!(cfg.slide_interval, Duration::from_secs(20));
    assert_eq!(cfg.filter, "none");
    assert_eq!(cfg.update_interval, Duration::from_secs(3600));
    assert_eq!(cfg.source, SourceSpec::Single("bing".into()));
}

#[test]
fn update_payload_accepts_string_or_patch() {
    let source: ConfigUpdate = serde_json::from_str(r#""apod""#).unwrap();
    assert_eq!(source, ConfigUpdate::Source("apod".into()));

    let patch: ConfigUpdate =
        serde_json::from_str(r#"{"slide-interval": "2m", "caption": false}"#).unwrap();
    let patch = patch.into_patch();
    assert_eq!(patch.slide_interval, Some(Duration::from_secs(120)));
    assert_eq!(patch.caption, Some(false));
    assert!(patch.source.is_none());
}

#[test]
fn auto_orientation_follows_viewport() {
    let cfg = Configuration::default();
    assert_eq!(
        cfg.resolved_orientation(Viewport::new(1080, 1920)),
        Orientation::Vertical
    );
    assert_eq!(
        cfg.resolved_orientation(Viewport::new(1920, 1080)),
        Orientation::Horizontal
    );
    assert_eq!(
        cfg.resolved_orientation(Viewport::new(1000, 1000)),
        Orientation::Horizontal
    );
}
