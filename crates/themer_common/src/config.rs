//! Configuration management for themerd.
//!
//! Loads settings from `$XDG_CONFIG_HOME/konsole-themer/config.toml` or uses
//! defaults. Every field is optional in the file.

use crate::error::{ThemerError, ThemerResult};
use crate::mode::{ModeClassifier, ProfileMap, DEFAULT_DARK_KEYWORDS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "konsole-themer";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Watched settings file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// File whose changes trigger a switch (KDE keeps the scheme in kdeglobals)
    #[serde(default = "default_watched_file")]
    pub file: PathBuf,

    /// Minimum spacing between two processed change events
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_watched_file() -> PathBuf {
    user_config_dir().join("kdeglobals")
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            file: default_watched_file(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Where the current colour scheme is read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppearanceConfig {
    #[serde(default = "default_reader")]
    pub reader: String,

    #[serde(default = "default_scheme_group")]
    pub group: String,

    #[serde(default = "default_scheme_key")]
    pub key: String,

    /// Scheme-name fragments treated as dark (case-insensitive)
    #[serde(default = "default_dark_keywords")]
    pub dark_keywords: Vec<String>,
}

fn default_reader() -> String {
    "kreadconfig6".to_string()
}

fn default_scheme_group() -> String {
    "General".to_string()
}

fn default_scheme_key() -> String {
    "ColorScheme".to_string()
}

fn default_dark_keywords() -> Vec<String> {
    DEFAULT_DARK_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            reader: default_reader(),
            group: default_scheme_group(),
            key: default_scheme_key(),
            dark_keywords: default_dark_keywords(),
        }
    }
}

/// Profile applied for each mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    #[serde(default = "default_light_profile")]
    pub light: String,

    #[serde(default = "default_dark_profile")]
    pub dark: String,
}

fn default_light_profile() -> String {
    "Light".to_string()
}

fn default_dark_profile() -> String {
    "Dark".to_string()
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            light: default_light_profile(),
            dark: default_dark_profile(),
        }
    }
}

/// How running terminal instances are found and addressed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Exact executable name matched by pgrep
    #[serde(default = "default_process_name")]
    pub process_name: String,

    #[serde(default = "default_qdbus")]
    pub qdbus: String,

    /// DBus service name is this prefix followed by the pid
    #[serde(default = "default_service_prefix")]
    pub service_prefix: String,

    #[serde(default = "default_sessions_path")]
    pub sessions_path: String,

    /// Budget for every single external call
    #[serde(default = "default_ipc_timeout")]
    pub ipc_timeout_secs: u64,
}

fn default_process_name() -> String {
    "konsole".to_string()
}

fn default_qdbus() -> String {
    "qdbus-qt6".to_string()
}

fn default_service_prefix() -> String {
    "org.kde.konsole-".to_string()
}

fn default_sessions_path() -> String {
    "/Sessions".to_string()
}

fn default_ipc_timeout() -> u64 {
    3
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            qdbus: default_qdbus(),
            service_prefix: default_service_prefix(),
            sessions_path: default_sessions_path(),
            ipc_timeout_secs: default_ipc_timeout(),
        }
    }
}

/// Where the default profile for new windows is persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultProfileConfig {
    #[serde(default = "default_writer")]
    pub writer: String,

    #[serde(default = "default_konsolerc")]
    pub file: PathBuf,

    #[serde(default = "default_entry_group")]
    pub group: String,

    #[serde(default = "default_entry_key")]
    pub key: String,

    /// Appended to the profile name, Konsole expects `Dark.profile`
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_writer() -> String {
    "kwriteconfig6".to_string()
}

fn default_konsolerc() -> PathBuf {
    user_config_dir().join("konsolerc")
}

fn default_entry_group() -> String {
    "Desktop Entry".to_string()
}

fn default_entry_key() -> String {
    "DefaultProfile".to_string()
}

fn default_suffix() -> String {
    ".profile".to_string()
}

impl Default for DefaultProfileConfig {
    fn default() -> Self {
        Self {
            writer: default_writer(),
            file: default_konsolerc(),
            group: default_entry_group(),
            key: default_entry_key(),
            suffix: default_suffix(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemerConfig {
    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub appearance: AppearanceConfig,

    #[serde(default)]
    pub profiles: ProfilesConfig,

    #[serde(default)]
    pub terminal: TerminalConfig,

    #[serde(default)]
    pub default_profile: DefaultProfileConfig,
}

impl ThemerConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        user_config_dir().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> ThemerResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                return Self::default().normalized().validated();
            }
            Err(source) => {
                return Err(ThemerError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = Self::parse(&content).map_err(|source| ThemerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        config.normalized().validated()
    }

    /// Parse TOML text without touching the filesystem
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Expand a leading `~/` in the configured paths
    pub fn normalized(mut self) -> Self {
        self.watch.file = expand_home(&self.watch.file);
        self.default_profile.file = expand_home(&self.default_profile.file);
        self
    }

    pub fn validate(&self) -> ThemerResult<()> {
        if self.terminal.ipc_timeout_secs == 0 {
            return Err(ThemerError::InvalidConfig(
                "terminal.ipc_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.profiles.light.trim().is_empty() || self.profiles.dark.trim().is_empty() {
            return Err(ThemerError::InvalidConfig(
                "profile names must not be empty".to_string(),
            ));
        }
        if self.watch.file.file_name().is_none() {
            return Err(ThemerError::InvalidConfig(format!(
                "watched path {} has no file name",
                self.watch.file.display()
            )));
        }
        match self.watch.file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Ok(()),
            _ => Err(ThemerError::InvalidConfig(format!(
                "watched path {} has no parent directory",
                self.watch.file.display()
            ))),
        }
    }

    fn validated(self) -> ThemerResult<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    pub fn ipc_timeout(&self) -> Duration {
        Duration::from_secs(self.terminal.ipc_timeout_secs)
    }

    pub fn classifier(&self) -> ModeClassifier {
        ModeClassifier::new(&self.appearance.dark_keywords)
    }

    pub fn profile_map(&self) -> ProfileMap {
        ProfileMap::new(self.profiles.light.clone(), self.profiles.dark.clone())
    }
}

fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"))
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
