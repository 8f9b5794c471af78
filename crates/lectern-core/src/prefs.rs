//! Persisted client preferences.
//!
//! Two scalar preferences survive restarts: the color theme and the list
//! view density. They are stored as a small JSON file written atomically
//! (temp file, flush, rename) so a crash mid-write never corrupts them.

use crate::error::{LecternError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Color theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// Book list view density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewDensity {
    Small,
    Medium,
    List,
}

impl Default for ViewDensity {
    fn default() -> Self {
        ViewDensity::Medium
    }
}

/// Persisted preferences.
///
/// `theme: None` means the user never chose one; the effective theme then
/// follows the system preference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub density: ViewDensity,
}

impl Preferences {
    /// Load preferences from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No preferences file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| LecternError::io_with_path(e, path))?;
        let prefs = serde_json::from_str(&contents).map_err(|e| LecternError::Json {
            message: format!("Failed to parse {}: {}", path.display(), e),
            source: Some(e),
        })?;
        Ok(prefs)
    }

    /// Persist preferences to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| LecternError::io_with_path(e, parent))?;
            }
        }

        let serialized = serde_json::to_string_pretty(self)?;
        let temp_path = temp_path_for(path);

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| LecternError::io_with_path(e, &temp_path))?;
            file.write_all(serialized.as_bytes())
                .map_err(|e| LecternError::io_with_path(e, &temp_path))?;
            file.sync_all()
                .map_err(|e| LecternError::io_with_path(e, &temp_path))?;
        }

        fs::rename(&temp_path, path).map_err(|e| LecternError::io_with_path(e, path))?;
        debug!("Wrote preferences to {}", path.display());
        Ok(())
    }

    /// Resolve the effective theme given the system preference.
    pub fn effective_theme(&self, system_prefers_dark: bool) -> Theme {
        self.theme.unwrap_or(if system_prefers_dark {
            Theme::Dark
        } else {
            Theme::Light
        })
    }

    /// Flip the theme and return the new value.
    pub fn toggle_theme(&mut self, system_prefers_dark: bool) -> Theme {
        let next = match self.effective_theme(system_prefers_dark) {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
        self.theme = Some(next);
        next
    }
}

/// Unique temp path next to the target so the rename stays on one
/// filesystem.
fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension(format!("json.{}.tmp", std::process::id()))
}
