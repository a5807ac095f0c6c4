use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{debug, error, info, warn};

use crate::common::color::{Color, Gradient};
use crate::sys::hotkey::Hotkey;

const CONFIG_DIR: &str = "carousel";
const CONFIG_FILE: &str = "config.toml";
const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("failed to watch config: {0}")]
    Watch(#[from] notify_debouncer_mini::notify::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub carousel: CarouselSettings,
    pub capture: CaptureSettings,
    pub keys: KeySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarouselSettings {
    pub font_size: u32,
    pub border_size: u32,
    pub border_rounding: u32,
    pub border_rounding_power: f64,
    pub border_active: Gradient,
    pub border_inactive: Gradient,
    pub window_spacing: u32,
    /// Height of inactive entries relative to the active one.
    pub window_size_inactive: f64,
    /// Row height of the active monitor as a fraction of the monitor height.
    pub monitor_size_active: f64,
    pub monitor_size_inactive: f64,
    pub monitor_spacing: u32,
    /// Seconds for one full ease.
    pub animation_speed: f64,
    pub unfocused_alpha: f64,
    pub include_special: bool,
    pub dim_enabled: bool,
    pub dim_amount: f64,
    pub blur: bool,
    #[serde(with = "color_string")]
    pub title_color: Color,
    pub show_close_button: bool,
}

impl Default for CarouselSettings {
    fn default() -> Self {
        Self {
            font_size: 24,
            border_size: 1,
            border_rounding: 0,
            border_rounding_power: 2.0,
            border_active: Gradient::solid(Color::from_argb(0xff00ccdd)),
            border_inactive: Gradient::solid(Color::from_argb(0xbbccddff)),
            window_spacing: 10,
            window_size_inactive: 0.8,
            monitor_size_active: 0.4,
            monitor_size_inactive: 0.3,
            monitor_spacing: 10,
            animation_speed: 1.0,
            unfocused_alpha: 0.6,
            include_special: true,
            dim_enabled: true,
            dim_amount: 0.15,
            blur: true,
            title_color: Color::WHITE,
            show_close_button: false,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureSettings {
    /// Staleness threshold for the selected entry.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "active_ms")]
    pub active: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "on_screen_ms")]
    pub on_screen: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "off_screen_ms")]
    pub off_screen: Duration,
    /// Maximum number of recaptures per frame.
    pub budget: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            active: Duration::from_millis(30),
            on_screen: Duration::from_millis(200),
            off_screen: Duration::from_millis(1000),
            budget: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct KeySettings {
    pub trigger: Hotkey,
}

mod color_string {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use crate::common::color::Color;

    pub fn serialize<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(color)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Config::parse(&text)
    }

    /// Loads `path`, falling back to the defaults when the file does not exist.
    /// Any other failure is returned.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Config::load(path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file, using defaults");
                Ok(Config::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.carousel;
        let fraction = |key: &'static str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("{value} is outside 0.0..=1.0"),
                })
            }
        };
        fraction("carousel.window_size_inactive", c.window_size_inactive)?;
        fraction("carousel.monitor_size_active", c.monitor_size_active)?;
        fraction("carousel.monitor_size_inactive", c.monitor_size_inactive)?;
        fraction("carousel.unfocused_alpha", c.unfocused_alpha)?;
        fraction("carousel.dim_amount", c.dim_amount)?;
        if c.animation_speed.is_nan() || c.animation_speed < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "carousel.animation_speed",
                reason: format!("{} must not be negative", c.animation_speed),
            });
        }
        if c.font_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "carousel.font_size",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Watches the config file and delivers each successfully parsed revision.
/// Parse failures are logged and the previous configuration stays in effect.
pub struct ConfigWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    rx: Receiver<Config>,
}

impl ConfigWatcher {
    pub fn new(path: &Path) -> Result<ConfigWatcher, ConfigError> {
        let (tx, rx) = unbounded();
        let watched = path.to_path_buf();
        let mut debouncer =
            new_debouncer(WATCH_DEBOUNCE, move |res: DebounceEventResult| {
                handle_watch_event(&watched, &tx, res)
            })?;
        // Editors often replace the file, so watch the directory rather than
        // the inode.
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        debouncer.watcher().watch(dir, RecursiveMode::NonRecursive)?;
        debug!(path = %path.display(), "watching config");
        Ok(ConfigWatcher { _debouncer: debouncer, rx })
    }

    /// Drains pending reloads and returns the most recent one.
    pub fn try_recv(&self) -> Option<Config> { self.rx.try_iter().last() }

    pub fn receiver(&self) -> &Receiver<Config> { &self.rx }
}

fn handle_watch_event(path: &Path, tx: &Sender<Config>, res: DebounceEventResult) {
    let events = match res {
        Ok(events) => events,
        Err(err) => {
            error!("config watch error: {err}");
            return;
        }
    };
    if !events.iter().any(|e| e.path.file_name() == path.file_name()) {
        return;
    }
    match Config::load(path) {
        Ok(config) => {
            info!(path = %path.display(), "config reloaded");
            if tx.send(config).is_err() {
                debug!("config receiver gone, dropping reload");
            }
        }
        Err(err) => warn!("ignoring invalid config: {err}"),
    }
}
