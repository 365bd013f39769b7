use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Playback mode selected from the home screen. Each mode owns one
/// player-role screen and, where playback is seekable, one persisted
/// position slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Radio,
    AudioFiles,
    Podcasts,
    Stream,
    Collection,
}

impl Mode {
    pub const ALL: [Mode; 5] =
        [Mode::Radio, Mode::AudioFiles, Mode::Podcasts, Mode::Stream, Mode::Collection];

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Radio => "Radio",
            Mode::AudioFiles => "Audio Files",
            Mode::Podcasts => "Podcasts",
            Mode::Stream => "Stream",
            Mode::Collection => "Collection",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenInfo {
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Display is physically rotated 180 degrees; pointer coordinates from
    /// local channels get flipped once during normalization.
    #[serde(default)]
    pub flip_touch_xy: bool,
    #[serde(default)]
    pub multi_touch: bool,
}

fn default_width() -> i32 {
    480
}

fn default_height() -> i32 {
    320
}

fn default_frame_rate() -> u32 {
    30
}

impl Default for ScreenInfo {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            frame_rate: default_frame_rate(),
            flip_touch_xy: false,
            multi_touch: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub use_lirc: bool,
    /// Log every routed event at debug level.
    #[serde(default)]
    pub show_input_events: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpioConfig {
    #[serde(default)]
    pub use_player_buttons: bool,
    #[serde(default)]
    pub use_menu_buttons: bool,
    #[serde(default)]
    pub use_rotary_encoders: bool,
    /// Action name ("left", "select", "volume-up", ...) to BCM pin number.
    #[serde(default)]
    pub player_buttons: HashMap<String, u8>,
    /// Pins for menu buttons 1..10, in order.
    #[serde(default)]
    pub menu_buttons: Vec<u8>,
    pub rotary_volume_up: Option<u8>,
    pub rotary_volume_down: Option<u8>,
    pub rotary_volume_mute: Option<u8>,
    pub rotary_move_left: Option<u8>,
    pub rotary_move_right: Option<u8>,
    pub rotary_move_select: Option<u8>,
    #[serde(default = "default_jitter_filter")]
    pub jitter_filter: u32,
}

fn default_jitter_filter() -> u32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Current {
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_mode() -> Mode {
    Mode::Radio
}

fn default_language() -> String {
    "English".to_string()
}

impl Default for Current {
    fn default() -> Self {
        Self { mode: default_mode(), language: default_language() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSettings {
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default)]
    pub pause: bool,
    #[serde(default)]
    pub mute: bool,
}

fn default_volume() -> u8 {
    30
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self { volume: default_volume(), pause: false, mute: false }
    }
}

/// Persisted resumption state for file playback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilePlayback {
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub track_time: u64,
}

/// Persisted resumption state for podcast playback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Podcasts {
    #[serde(default)]
    pub episode: String,
    #[serde(default)]
    pub episode_time: u64,
}

/// Persisted resumption state for collection playback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionPlayback {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub track_time: u64,
}

/// Wall-clock sleep/wake/poweroff timer. Times are "HH:MM".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default)]
    pub sleep: bool,
    #[serde(default)]
    pub poweroff: bool,
    #[serde(default)]
    pub wake_up: bool,
    #[serde(default)]
    pub sleep_time: String,
    #[serde(default)]
    pub wake_up_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEntry {
    pub name: String,
    pub url: String,
}

fn default_languages() -> Vec<String> {
    vec![
        "English".to_string(),
        "German".to_string(),
        "French".to_string(),
        "Russian".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub screen: ScreenInfo,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub gpio: GpioConfig,
    #[serde(default)]
    pub current: Current,
    #[serde(default)]
    pub player_settings: PlayerSettings,
    #[serde(default)]
    pub file_playback: FilePlayback,
    #[serde(default)]
    pub podcasts: Podcasts,
    #[serde(default)]
    pub collection: CollectionPlayback,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub streams: Vec<StreamEntry>,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screen: ScreenInfo::default(),
            usage: Usage::default(),
            gpio: GpioConfig::default(),
            current: Current::default(),
            player_settings: PlayerSettings::default(),
            file_playback: FilePlayback::default(),
            podcasts: Podcasts::default(),
            collection: CollectionPlayback::default(),
            timer: TimerConfig::default(),
            languages: default_languages(),
            streams: Vec::new(),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("wavedeck")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".wavedeck")
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {config_dir:?}"))?;
            info!("Created config directory: {config_dir:?}");
        }

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from: {path:?}");

        if !path.exists() {
            info!("Config file doesn't exist, using defaults");
            let mut config = Self::default();
            config.path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path:?}"))?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Write the current settings back to where they were loaded from.
    pub fn save(&self) -> Result<()> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => Self::default_path()?,
        };
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {path:?}"))?;
        debug!("Saved config to: {path:?}");
        Ok(())
    }
}
