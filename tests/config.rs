use std::fs;
use std::time::Duration;

use carousel_wm::common::config::{Config, ConfigError, ConfigWatcher};
use pretty_assertions::assert_eq;
use test_log::test;

#[test]
fn loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [carousel]
        window_spacing = 24
        unfocused_alpha = 0.4
        title_color = "rgba(ff8800cc)"
        "#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.carousel.window_spacing, 24);
    assert_eq!(config.carousel.unfocused_alpha, 0.4);
    assert_eq!(config.carousel.title_color.to_argb(), 0xccff8800);
    assert_eq!(config.capture, Config::default().capture);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().starts_with(&format!("failed to read {}", path.display())));
    assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
}

#[test]
fn broken_file_is_an_error_not_a_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[carousel\nfont_size = 12").unwrap();
    assert!(matches!(Config::load_or_default(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn watcher_delivers_valid_revisions_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();
    let watcher = ConfigWatcher::new(&path).unwrap();

    fs::write(&path, "[carousel]\nmonitor_size_active = 2.0").unwrap();
    assert!(watcher.receiver().recv_timeout(Duration::from_secs(1)).is_err());

    fs::write(&path, "[carousel]\nfont_size = 30").unwrap();
    let config = watcher.receiver().recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(config.carousel.font_size, 30);
}
