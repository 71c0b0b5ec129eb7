//! Link label settings and their on-disk store.
//!
//! Settings resolve in layers: built-in defaults, then the global settings
//! file, then a local `.mermaid-links.json`, then command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EDIT_LINK_TEXT: &str = "Edit";
pub const DEFAULT_FULLSCREEN_LINK_TEXT: &str = "Full Screen";

const APP_DIR: &str = "mermaid-links";
const SETTINGS_FILE: &str = "settings.json";
const LOCAL_SETTINGS_FILE: &str = ".mermaid-links.json";

/// Label text for the generated links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkSettings {
    pub edit_link_text: String,
    pub fullscreen_link_text: String,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            edit_link_text: DEFAULT_EDIT_LINK_TEXT.to_string(),
            fullscreen_link_text: DEFAULT_FULLSCREEN_LINK_TEXT.to_string(),
        }
    }
}

/// Partial settings from one layer. Unset fields fall through.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_link_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullscreen_link_text: Option<String>,
}

impl SettingsOverrides {
    /// Merge two layers; values set in `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            edit_link_text: other
                .edit_link_text
                .clone()
                .or_else(|| self.edit_link_text.clone()),
            fullscreen_link_text: other
                .fullscreen_link_text
                .clone()
                .or_else(|| self.fullscreen_link_text.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edit_link_text.is_none() && self.fullscreen_link_text.is_none()
    }

    /// Apply these overrides on top of the defaults.
    pub fn resolve(&self) -> LinkSettings {
        let defaults = LinkSettings::default();
        LinkSettings {
            edit_link_text: self
                .edit_link_text
                .clone()
                .unwrap_or(defaults.edit_link_text),
            fullscreen_link_text: self
                .fullscreen_link_text
                .clone()
                .unwrap_or(defaults.fullscreen_link_text),
        }
    }
}

/// Key-value persistence for link settings.
pub trait SettingsStore {
    /// Load stored overrides. A store with nothing saved yields empty overrides.
    fn load(&self) -> Result<SettingsOverrides>;

    fn save(&mut self, overrides: &SettingsOverrides) -> Result<()>;

    fn clear(&mut self) -> Result<()>;

    /// Stored overrides applied over the defaults.
    fn load_settings(&self) -> Result<LinkSettings> {
        Ok(self.load()?.resolve())
    }
}

/// Settings stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<SettingsOverrides> {
        if !self.path.exists() {
            return Ok(SettingsOverrides::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(SettingsOverrides::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings {}", self.path.display()))
    }

    fn save(&mut self, overrides: &SettingsOverrides) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings dir {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(overrides)?;
        fs::write(&self.path, format!("{json}\n"))
            .with_context(|| format!("Failed to write settings {}", self.path.display()))
    }

    fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// In-process store for hosts that keep settings elsewhere.
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    overrides: SettingsOverrides,
}

impl MemorySettingsStore {
    pub fn new(overrides: SettingsOverrides) -> Self {
        Self { overrides }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<SettingsOverrides> {
        Ok(self.overrides.clone())
    }

    fn save(&mut self, overrides: &SettingsOverrides) -> Result<()> {
        self.overrides = overrides.clone();
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.overrides = SettingsOverrides::default();
        Ok(())
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join(APP_DIR).join(SETTINGS_FILE);
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join(APP_DIR)
                .join(SETTINGS_FILE);
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join(APP_DIR).join(SETTINGS_FILE);
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join(APP_DIR)
                .join(SETTINGS_FILE);
        }
    }

    PathBuf::from(LOCAL_SETTINGS_FILE)
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(LOCAL_SETTINGS_FILE)
}

/// Read every layer and merge them, lowest priority first.
pub fn load_layered(stores: &[&dyn SettingsStore]) -> Result<SettingsOverrides> {
    stores
        .iter()
        .try_fold(SettingsOverrides::default(), |merged, store| {
            Ok(merged.union(&store.load()?))
        })
}
