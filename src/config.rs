//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\playlist-drawer\config.toml
//! - macOS: ~/Library/Application Support/playlist-drawer/config.toml
//! - Linux: ~/.config/playlist-drawer/config.toml
//!
//! The engine receives a [`Config`] at construction and never reads this
//! file itself. Later changes reach it through explicit setters.
//!
//! Unknown mode, sensitivity and action ids load as their defaults with a
//! logged warning rather than failing the whole file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::drawer::{DrawerMode, DrawerTiming};
use crate::error::{Error, Result, ResultExt};
use crate::gesture::{Action, ButtonBinding, ButtonTiming, ControlButton, GestureActionMap, Sensitivity};
use crate::playlist::{
    AutoScrollSettings, HorizontalAlign, ItemId, SeasonalSettings, VerticalAlign, VisibilitySettings,
};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Drawer mode and timing
    pub drawer: DrawerConfig,

    /// Swipe gestures on the player surface
    pub gestures: GestureConfig,

    /// Click/double-click/hold bindings of the control buttons
    pub buttons: ButtonsConfig,

    /// Filters and update debounce
    pub playlist: PlaylistConfig,

    /// Active-row auto-scroll
    pub autoscroll: AutoScrollConfig,
}

/// Drawer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawerConfig {
    /// "closed", "opened", "below-video", "fixed-fully-open",
    /// "fixed-below-video" or "disabled"
    pub mode: DrawerMode,

    /// Duration of height transitions
    pub animation_ms: u64,

    /// Snap points closer than this collapse into one
    pub min_snap_difference: f64,

    /// Minimum spacing of state commits while dragging
    pub drag_commit_interval_ms: u64,

    /// Frames to retry a measurement on before falling back to the interval
    pub measurement_retry_frames: u32,

    /// Give up on a deferred height change after this long
    pub measurement_timeout_ms: u64,

    /// Spacing of measurement retries after the first frames
    pub measurement_retry_interval_ms: u64,
}

impl Default for DrawerConfig {
    fn default() -> Self {
        Self {
            mode: DrawerMode::default(),
            animation_ms: 300,
            min_snap_difference: crate::geometry::DEFAULT_MIN_SNAP_DIFFERENCE,
            drag_commit_interval_ms: 100,
            measurement_retry_frames: 3,
            measurement_timeout_ms: 1000,
            measurement_retry_interval_ms: 100,
        }
    }
}

impl DrawerConfig {
    pub fn timing(&self) -> DrawerTiming {
        DrawerTiming {
            animation: Duration::from_millis(self.animation_ms),
            commit_interval: Duration::from_millis(self.drag_commit_interval_ms),
        }
    }
}

/// Gesture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub enabled: bool,

    /// "low", "normal" or "high"
    pub sensitivity: Sensitivity,

    /// Action per gesture
    pub actions: GestureActionMap,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitivity: Sensitivity::default(),
            actions: GestureActionMap::default(),
        }
    }
}

/// Control button settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonsConfig {
    pub double_click_ms: u64,
    pub hold_ms: u64,
    pub repeat_ms: u64,

    /// Seconds moved by one seek action
    pub seek_step_secs: f64,

    pub previous: ButtonBinding,
    pub next: ButtonBinding,
    pub playlist: ButtonBinding,
    pub voice_search: ButtonBinding,
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self {
            double_click_ms: 250,
            hold_ms: 500,
            repeat_ms: 100,
            seek_step_secs: 5.0,
            previous: ButtonBinding {
                click: Action::Previous,
                hold: Action::SeekBackward,
                repeat_hold: true,
                ..ButtonBinding::default()
            },
            next: ButtonBinding {
                click: Action::Skip,
                hold: Action::SeekForward,
                repeat_hold: true,
                ..ButtonBinding::default()
            },
            playlist: ButtonBinding::click(Action::TogglePlaylist),
            voice_search: ButtonBinding::click(Action::ToggleVoiceSearch),
        }
    }
}

impl ButtonsConfig {
    pub fn timing(&self) -> ButtonTiming {
        ButtonTiming {
            double_click: Duration::from_millis(self.double_click_ms),
            hold: Duration::from_millis(self.hold_ms),
            repeat: Duration::from_millis(self.repeat_ms),
        }
    }

    pub fn binding(&self, button: ControlButton) -> ButtonBinding {
        match button {
            ControlButton::Previous => self.previous,
            ControlButton::Next => self.next,
            ControlButton::Playlist => self.playlist,
            ControlButton::VoiceSearch => self.voice_search,
        }
    }
}

/// Playlist filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    pub hide_duplicates: bool,

    /// Keep covers and live versions apart when hiding duplicates
    pub allow_different_versions: bool,

    /// Debounce for list-mutation-triggered updates
    pub update_debounce_ms: u64,

    /// Item ids hidden everywhere
    pub blacklist: BTreeSet<ItemId>,

    /// Item ids removed per list id
    pub removed: BTreeMap<String, BTreeSet<ItemId>>,

    pub seasonal: SeasonalSettings,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            hide_duplicates: false,
            allow_different_versions: false,
            update_debounce_ms: 150,
            blacklist: BTreeSet::new(),
            removed: BTreeMap::new(),
            seasonal: SeasonalSettings::default(),
        }
    }
}

impl PlaylistConfig {
    pub fn visibility(&self) -> VisibilitySettings {
        VisibilitySettings {
            blacklist: self.blacklist.clone(),
            removed: self.removed.clone(),
            hide_duplicates: self.hide_duplicates,
            allow_different_versions: self.allow_different_versions,
            seasonal: self.seasonal.clone(),
        }
    }

    pub fn update_debounce(&self) -> Duration {
        Duration::from_millis(self.update_debounce_ms)
    }
}

/// Auto-scroll settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoScrollConfig {
    pub enabled: bool,

    /// "top", "center" or "reveal-previous"
    pub vertical: VerticalAlign,

    /// "left" or "center"
    pub horizontal: HorizontalAlign,

    /// Lay the list out horizontally
    pub horizontal_layout: bool,

    /// Viewports shorter than this switch to the horizontal layout
    pub limited_height_threshold: f64,

    /// Quiet period after a manual scroll
    pub rearm_ms: u64,

    /// Longest wait for our own scroll to finish
    pub busy_timeout_ms: u64,
}

impl Default for AutoScrollConfig {
    fn default() -> Self {
        Self::from(AutoScrollSettings::default())
    }
}

impl From<AutoScrollSettings> for AutoScrollConfig {
    fn from(s: AutoScrollSettings) -> Self {
        Self {
            enabled: s.enabled,
            vertical: s.vertical,
            horizontal: s.horizontal,
            horizontal_layout: s.horizontal_layout,
            limited_height_threshold: s.limited_height_threshold,
            rearm_ms: s.rearm.as_millis() as u64,
            busy_timeout_ms: s.busy_timeout.as_millis() as u64,
        }
    }
}

impl AutoScrollConfig {
    pub fn settings(&self) -> AutoScrollSettings {
        AutoScrollSettings {
            enabled: self.enabled,
            vertical: self.vertical,
            horizontal: self.horizontal,
            horizontal_layout: self.horizontal_layout,
            limited_height_threshold: self.limited_height_threshold,
            rearm: Duration::from_millis(self.rearm_ms),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playlist-drawer"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!(target: "config", "Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!(target: "config", "No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => {
            tracing::info!(target: "config", "Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            tracing::error!(target: "config", "{}", e);
            tracing::warn!(target: "config", "Using default configuration");
            Config::default()
        }
    }
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    toml::from_str::<Config>(&contents)
        .map_err(Error::from)
        .with_context(path.display().to_string())
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> std::result::Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to an explicit path, atomically.
pub fn save_to(config: &Config, path: &Path) -> std::result::Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!(target: "config", "Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[drawer]"));
        assert!(toml.contains("[gestures]"));
        assert!(toml.contains("[buttons]"));
        assert!(toml.contains("[playlist]"));
        assert!(toml.contains("[autoscroll]"));
        assert!(toml.contains("mode = \"closed\""));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.drawer.mode = DrawerMode::FixedBelowVideo;
        config.gestures.sensitivity = Sensitivity::High;
        config.gestures.actions.two_finger_tap = Action::Skip;
        config.playlist.hide_duplicates = true;
        config.playlist.blacklist.insert(ItemId::from("abc"));
        config
            .playlist
            .removed
            .entry("mix".to_string())
            .or_default()
            .insert(ItemId::from("def"));
        config.autoscroll.vertical = VerticalAlign::RevealPrevious;

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        // Config with only some fields
        let toml = r#"
[drawer]
mode = "below-video"

[buttons.next]
hold = "seek-forward"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        // Specified fields are set
        assert_eq!(config.drawer.mode, DrawerMode::BelowVideo);
        assert_eq!(config.buttons.next.hold, Action::SeekForward);

        // Other fields use defaults
        assert_eq!(config.drawer.animation_ms, 300);
        assert_eq!(config.buttons.next.click, Action::None);
        assert_eq!(config.gestures.sensitivity, Sensitivity::Normal);
        assert_eq!(config.playlist.update_debounce_ms, 150);
        assert_eq!(config.autoscroll.rearm_ms, 2500);
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let toml = r#"
[drawer]
mode = "sideways"

[gestures]
sensitivity = "extreme"

[gestures.actions]
two_finger_tap = "self-destruct"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.drawer.mode, DrawerMode::Closed);
        assert_eq!(config.gestures.sensitivity, Sensitivity::Normal);
        assert_eq!(config.gestures.actions.two_finger_tap, Action::None);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.playlist.seasonal.enabled = true;
        config.playlist.seasonal.bypass_lists.insert("holiday".to_string());

        save_to(&config, &path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[drawer\nmode = 1").unwrap();
        assert!(load_from(&path).is_err());
        assert!(matches!(
            load_from(&dir.path().join("missing.toml")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_derived_settings() {
        let config = Config::default();
        assert_eq!(config.drawer.timing(), DrawerTiming::default());
        assert_eq!(config.buttons.timing(), ButtonTiming::default());
        assert_eq!(config.autoscroll.settings(), AutoScrollSettings::default());
        assert_eq!(
            config.buttons.binding(ControlButton::Playlist).click,
            Action::TogglePlaylist
        );
        assert_eq!(config.playlist.visibility(), VisibilitySettings::default());
    }
}
