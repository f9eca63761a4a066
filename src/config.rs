//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--start`, `--log-level`, etc.)
//! 2. `$DOCB_CONFIG` environment variable (path to config file)
//! 3. Project-local `.docb.toml` in the current working directory
//! 4. Global `~/.config/docb/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::service::local::{SortBy, StoreOptions};

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory served by the local document store.
    pub store_root: Option<String>,
    /// Store path opened at startup.
    pub start_path: Option<String>,
    /// Confirm before delete operations.
    pub confirm_delete: Option<bool>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
    /// Hand file and export links to the system opener.
    pub open_links: Option<bool>,
}

/// Document store settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL that export links are built on.
    pub export_base_url: Option<String>,
    /// Sort order: "name", "size", "modified".
    pub sort_by: Option<String>,
    /// Directories always listed first.
    pub dirs_first: Option<bool>,
    /// List dot-files.
    pub show_hidden: Option<bool>,
}

/// Log file settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// "off", "error", "warn", "info", "debug" or "trace".
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub tree_fg: Option<String>,
    pub tree_selected_bg: Option<String>,
    pub tree_selected_fg: Option<String>,
    pub tree_dir_fg: Option<String>,
    pub tree_file_fg: Option<String>,
    pub tree_marked_fg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
    pub dialog_border_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default export base URL.
pub const DEFAULT_EXPORT_BASE_URL: &str = "http://localhost:8888";
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path, which is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("DOCB_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".docb.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("docb").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
///
/// Config is read before the file logger exists, so stderr is the only sink.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                store_root: other
                    .general
                    .store_root
                    .clone()
                    .or(self.general.store_root),
                start_path: other
                    .general
                    .start_path
                    .clone()
                    .or(self.general.start_path),
                confirm_delete: other.general.confirm_delete.or(self.general.confirm_delete),
                mouse: other.general.mouse.or(self.general.mouse),
                open_links: other.general.open_links.or(self.general.open_links),
            },
            store: StoreConfig {
                export_base_url: other
                    .store
                    .export_base_url
                    .clone()
                    .or(self.store.export_base_url),
                sort_by: other.store.sort_by.clone().or(self.store.sort_by),
                dirs_first: other.store.dirs_first.or(self.store.dirs_first),
                show_hidden: other.store.show_hidden.or(self.store.show_hidden),
            },
            logging: LoggingConfig {
                level: other.logging.level.clone().or(self.logging.level),
                file: other.logging.file.clone().or(self.logging.file),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: match (&self.theme.custom, &other.theme.custom) {
                    (_, Some(o)) => Some(o.clone()),
                    (Some(s), None) => Some(s.clone()),
                    (None, None) => None,
                },
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        let paths = candidate_paths();
        for path in paths.iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    /// Directory served by the local store (defaults to the working directory).
    pub fn store_root(&self) -> PathBuf {
        self.general
            .store_root
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Store path opened at startup.
    pub fn start_path(&self) -> &str {
        self.general.start_path.as_deref().unwrap_or("/")
    }

    /// Whether to confirm before delete.
    pub fn confirm_delete(&self) -> bool {
        self.general.confirm_delete.unwrap_or(true)
    }

    /// Whether mouse support is enabled.
    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    /// Whether links are handed to the system opener.
    pub fn open_links(&self) -> bool {
        self.general.open_links.unwrap_or(true)
    }

    pub fn export_base_url(&self) -> &str {
        self.store
            .export_base_url
            .as_deref()
            .unwrap_or(DEFAULT_EXPORT_BASE_URL)
    }

    /// Sort mode: "name", "size", or "modified".
    pub fn sort_by(&self) -> &str {
        self.store.sort_by.as_deref().unwrap_or("name")
    }

    /// Whether directories are listed before files.
    pub fn dirs_first(&self) -> bool {
        self.store.dirs_first.unwrap_or(true)
    }

    /// Whether dot-files are listed.
    pub fn show_hidden(&self) -> bool {
        self.store.show_hidden.unwrap_or(false)
    }

    /// Options for the local document store.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            sort_by: SortBy::parse(self.sort_by()),
            dirs_first: self.dirs_first(),
            show_hidden: self.show_hidden(),
            export_base_url: self.export_base_url().to_string(),
        }
    }

    /// Log level name.
    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Log file path (defaults to `<cache dir>/docb/docb.log`).
    pub fn log_file(&self) -> PathBuf {
        if let Some(file) = self.logging.file.as_deref() {
            return expand_home(file);
        }
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("docb")
            .join("docb.log")
    }

    /// Theme scheme: "dark", "light", or "custom".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
