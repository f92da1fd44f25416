//! Settings for locating the renderer and defaulting render parameters.
//!
//! Settings come from a TOML file (explicit path, or `seedrender/config.toml` under the
//! user's config directory) and fall back to built-in defaults. Command-line flags are
//! applied on top by the binary.

use crate::error::{DispatchError, Result};
use crate::request::{poll_interval, DisplayMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default executable names inside the renderer's `bin` directory.
pub const DEFAULT_CLI_EXECUTABLE: &str = "appleseed.cli";
pub const DEFAULT_STUDIO_EXECUTABLE: &str = "appleseed.studio";

/// Version substring of the first renderer build that accepts `--message-verbosity`.
pub const DEFAULT_VERBOSITY_MARKER: &str = "alpha-21";

const CONFIG_DIR_NAME: &str = "seedrender";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub renderer: RendererSettings,
    pub render: RenderDefaults,
}

/// Where the renderer lives and how it is probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Directory containing the renderer executables
    pub bin_dir: Option<PathBuf>,
    pub cli_executable: String,
    pub studio_executable: String,
    pub verbosity_marker: String,
    pub probe_timeout_secs: f64,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            bin_dir: None,
            cli_executable: DEFAULT_CLI_EXECUTABLE.to_string(),
            studio_executable: DEFAULT_STUDIO_EXECUTABLE.to_string(),
            verbosity_marker: DEFAULT_VERBOSITY_MARKER.to_string(),
            probe_timeout_secs: 5.0,
        }
    }
}

impl RendererSettings {
    /// Settings pointing at a specific `bin` directory, everything else default.
    pub fn with_bin_dir(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: Some(bin_dir.into()),
            ..Self::default()
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        poll_interval(self.probe_timeout_secs).unwrap_or(Duration::from_secs(5))
    }
}

/// Defaults applied to every render request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Working directory holding the scene file and the `render/` output folder
    pub project_dir: Option<PathBuf>,
    /// Worker threads passed to the renderer; `None` uses available parallelism
    pub threads: Option<usize>,
    /// Seconds between output polls
    pub refresh_secs: f64,
    pub image_extension: String,
    pub display_mode: DisplayMode,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            project_dir: None,
            threads: None,
            refresh_secs: 1.0,
            image_extension: ".png".to_string(),
            display_mode: DisplayMode::Cli,
        }
    }
}

impl RenderDefaults {
    /// Configured thread count, or the machine's available parallelism.
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

impl Settings {
    /// Load settings from `explicit`, else the user config file, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => {
                    log::debug!("Loading settings from {}", path.display());
                    Self::from_file(&path)?
                }
                _ => Self::default(),
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    /// `<config dir>/seedrender/config.toml`, when the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::file_error(format!("Cannot read settings {}", path.display()), e)
        })?;
        Self::from_toml(&text)
            .map_err(|e| DispatchError::config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| DispatchError::config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        poll_interval(self.render.refresh_secs)
            .map_err(|_| DispatchError::config("render.refresh_secs must be positive"))?;
        if self.render.threads == Some(0) {
            return Err(DispatchError::config("render.threads must be at least 1"));
        }
        if !self.render.image_extension.starts_with('.') || self.render.image_extension.len() < 2
        {
            return Err(DispatchError::config(format!(
                "render.image_extension must look like '.png', got '{}'",
                self.render.image_extension
            )));
        }
        if self.renderer.cli_executable.trim().is_empty()
            || self.renderer.studio_executable.trim().is_empty()
        {
            return Err(DispatchError::config("renderer executable names must not be empty"));
        }
        Ok(())
    }
}
