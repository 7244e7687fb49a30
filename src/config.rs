use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::color::HexColor;

/// Counting service used when the config file does not name one.
pub const DEFAULT_API_BASE: &str = "https://server-jzk9.onrender.com";

/// Strength of the multiply tint laid over the photo.
pub const DEFAULT_FILTER_ALPHA: f32 = 0.35;

/// Frame size assumed when a camera stream has not reported its resolution.
pub const FALLBACK_FRAME_SIZE: (u32, u32) = (1280, 720);

/// One selectable poll choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub label: String,
    pub color: HexColor,
}

impl PollOption {
    pub fn new(id: &str, label: &str, color: &str) -> Result<Self, crate::error::ColorError> {
        Ok(Self {
            id: id.to_string(),
            label: label.to_string(),
            color: HexColor::parse(color)?,
        })
    }
}

/// How the preview tint is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendStrategy {
    /// The host paints the tint as a multiply layer over the untouched photo.
    #[default]
    Layered,
    /// The tint is baked into a re-encoded JPEG on every change.
    Raster,
}

/// Whether the caption field is shown and whether it gates the vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageMode {
    #[default]
    Disabled,
    Optional,
    Required,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub options: Vec<PollOption>,
    pub filter_alpha: f32,
    pub blend_strategy: BlendStrategy,
    pub camera_enabled: bool,
    pub message: MessageMode,
    pub save_responses: bool,
    pub preview_quality: u8,
    pub share_quality: u8,
    pub request_timeout_secs: u64,
    /// Image streamed as the camera feed when no camera backend is present.
    pub virtual_camera_source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            options: default_options(),
            filter_alpha: DEFAULT_FILTER_ALPHA,
            blend_strategy: BlendStrategy::default(),
            camera_enabled: true,
            message: MessageMode::default(),
            save_responses: false,
            preview_quality: 92,
            share_quality: 95,
            request_timeout_secs: 15,
            virtual_camera_source: None,
        }
    }
}

fn default_options() -> Vec<PollOption> {
    [
        ("op1", "Option 1", "#E11D48"),
        ("op2", "Option 2", "#2563EB"),
        ("op3", "Option 3", "#059669"),
        ("op4", "Option 4", "#A855F7"),
    ]
    .into_iter()
    .filter_map(|(id, label, hex)| PollOption::new(id, label, hex).ok())
    .collect()
}

/// Problems found by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("the poll needs at least one option")]
    NoOptions,
    #[error("option id {0:?} appears more than once")]
    DuplicateOption(String),
    #[error("api_base must not be empty")]
    EmptyApiBase,
}

impl Config {
    /// Directory: ~/.config/poll-filter/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("poll-filter");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, returning defaults if file doesn't exist or is invalid.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Self {
        let config = match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        match config.validate() {
            Ok(()) => config.normalized(),
            Err(e) => {
                log::warn!("Config rejected ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let dir = Self::dir();
        fs::create_dir_all(&dir)?;
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::EmptyApiBase);
        }
        if self.options.is_empty() {
            return Err(ConfigError::NoOptions);
        }
        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.id.as_str()) {
                return Err(ConfigError::DuplicateOption(option.id.clone()));
            }
        }
        Ok(())
    }

    fn normalized(mut self) -> Self {
        self.filter_alpha = self.filter_alpha.clamp(0.0, 1.0);
        self.preview_quality = self.preview_quality.clamp(1, 100);
        self.share_quality = self.share_quality.clamp(1, 100);
        self
    }

    pub fn option(&self, id: &str) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == id)
    }
}
