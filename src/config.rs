use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::timeline::ChannelId;

const CONFIG_FILE: &str = "chat_config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Relative paths are resolved against the config directory.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Workspace seed for the local backend. The demo workspace is used
    /// when unset.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,

    #[serde(default)]
    pub settings: Settings,

    /// Channels restored into the first tab at startup.
    #[serde(default)]
    pub open_channels: Vec<ChannelId>,

    #[serde(skip)]
    pub config_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    #[serde(default = "default_true")]
    pub show_channel_column: bool,

    #[serde(default = "default_author_width")]
    pub author_width: usize,

    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_timestamps: true,
            show_channel_column: true,
            author_width: default_author_width(),
            timestamp_format: default_timestamp_format(),
            page_size: default_page_size(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_username() -> String {
    std::env::var("USER").unwrap_or_else(|_| "me".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("chat_client.log")
}

fn default_author_width() -> usize {
    12
}

fn default_timestamp_format() -> String {
    "%H:%M".to_string()
}

fn default_page_size() -> usize {
    50
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Self::get_config_dir())
    }

    /// Load `chat_config.json` from `config_dir`, writing defaults there if
    /// it does not exist yet.
    pub fn load_from(config_dir: PathBuf) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let mut config: Config = serde_json::from_str(&content)?;
            config.config_dir = config_dir;
            Ok(config)
        } else {
            let config = Self::with_defaults(config_dir);
            fs::create_dir_all(&config.config_dir)?;
            config.save()?;
            Ok(config)
        }
    }

    pub fn with_defaults(config_dir: PathBuf) -> Self {
        Config {
            username: default_username(),
            log_level: default_log_level(),
            log_file: default_log_file(),
            seed_file: None,
            settings: Settings::default(),
            open_channels: Vec::new(),
            config_dir,
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = self.config_dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(config_path, content)?;
        Ok(())
    }

    fn get_config_dir() -> PathBuf {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        if current_dir.join(CONFIG_FILE).exists() {
            return current_dir;
        }

        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir).join("chat_client_rs")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".config").join("chat_client_rs")
        } else {
            PathBuf::from(".chat_client_rs")
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.resolve(&self.log_file)
    }

    pub fn seed_path(&self) -> Option<PathBuf> {
        self.seed_file.as_deref().map(|p| self.resolve(p))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }
}
