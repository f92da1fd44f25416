//! Locating the renderer binary.

use crate::config::RendererSettings;
use crate::error::{DispatchError, Result};
use crate::request::DisplayMode;
use std::path::{Path, PathBuf};

/// Resolve the executable for `mode` inside the configured `bin` directory.
///
/// CLI renders use the command-line executable; both GUI modes use the studio executable.
/// The platform executable suffix is appended when the configured name lacks it.
///
/// # Errors
/// * [`DispatchError::Config`] when no `bin` directory is set or it is not a directory
/// * [`DispatchError::RendererNotFound`] when the executable is not a file
pub fn resolve_executable(settings: &RendererSettings, mode: DisplayMode) -> Result<PathBuf> {
    let bin_dir = match settings.bin_dir.as_deref() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => {
            return Err(DispatchError::config(
                "The path to the renderer executable has not been specified",
            ))
        }
    };

    if !bin_dir.is_dir() {
        return Err(DispatchError::config(format!(
            "Renderer bin directory {} does not exist",
            bin_dir.display()
        )));
    }

    let name = if mode.is_gui() {
        &settings.studio_executable
    } else {
        &settings.cli_executable
    };

    let executable = bin_dir.join(with_exe_suffix(name));
    if !executable.is_file() {
        return Err(DispatchError::RendererNotFound { path: executable });
    }

    Ok(absolute(&executable))
}

fn with_exe_suffix(name: &str) -> String {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

// The process is started with its working directory set to the render folder, so a relative
// bin directory has to be pinned first.
fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
