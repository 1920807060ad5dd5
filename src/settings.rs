use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#AD0321";
pub const DEFAULT_SPEED: f64 = 4.70;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub highlight_color: String,
    pub speed: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
            speed: DEFAULT_SPEED,
        }
    }
}

impl Settings {
    /// Replace unusable values with their defaults.
    fn sanitized(mut self) -> Self {
        if parse_hex_color(&self.highlight_color).is_none() {
            self.highlight_color = DEFAULT_HIGHLIGHT_COLOR.to_string();
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            self.speed = DEFAULT_SPEED;
        }
        self
    }

    pub fn highlight_rgb(&self) -> (u8, u8, u8) {
        parse_hex_color(&self.highlight_color)
            .or_else(|| parse_hex_color(DEFAULT_HIGHLIGHT_COLOR))
            .unwrap_or((0xAD, 0x03, 0x21))
    }
}

/// Parse `#RRGGBB` (leading `#` optional) into its components.
pub fn parse_hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

pub trait SettingsStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "speedread") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("speedread_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Settings>(&bytes) {
                Ok(settings) => return settings.sanitized(),
                Err(e) => debug!(path = %self.path.display(), "unreadable settings, using defaults: {e}"),
            },
            Err(e) => debug!(path = %self.path.display(), "no settings file, using defaults: {e}"),
        }
        Settings::default()
    }

    fn save(&self, settings: &Settings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, data)
    }
}
