//! Error types and handling infrastructure for seedrender.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. The binary layers `anyhow` on top for context at the edges.
//!
//! ## Taxonomy
//!
//! - **Configuration**: missing or invalid renderer location, bad settings
//! - **Export**: the scene description could not be produced
//! - **Launch**: output directory or renderer process could not be created
//! - **Transient decode**: the output image was caught mid-write; retried next tick
//! - **Exit without output**: the renderer stopped and never wrote an image
//!
//! User cancellation is not an error; it surfaces as
//! [`TerminalStatus::Cancelled`](crate::dispatch::TerminalStatus::Cancelled).

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for seedrender operations.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Settings or request values that prevent a render from being attempted
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The resolved renderer executable does not exist
    #[error("Renderer executable not found: {path}")]
    RendererNotFound { path: PathBuf },

    /// Upstream scene export failed; no process is launched
    #[error("Scene export failed for '{scene}': {message}")]
    ExportFailed { scene: String, message: String },

    /// The project or render output directory could not be created
    #[error("Output directory {path} cannot be created, check directory permissions")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to start the renderer process
    #[error("Failed to launch renderer {program}")]
    LaunchFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output image could not be decoded, usually because it is still being written
    #[error("Could not decode render result {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The renderer exited without ever producing the output image
    #[error("Renderer exited without writing {path}")]
    ProcessExitWithoutOutput { path: PathBuf },

    /// A render is already running on this driver or session
    #[error("A render is already in progress")]
    RenderInProgress,

    /// Invalid command line arguments or request parameters
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// File system related errors
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for seedrender operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// Create a Config error with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an ExportFailed error for the named scene
    pub fn export(scene: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExportFailed {
            scene: scene.into(),
            message: message.into(),
        }
    }

    /// Create a Decode error for the given image path
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// True for failures that are retried on the next poll tick instead of surfacing.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// True for failures raised before any renderer process was started.
    pub fn is_pre_launch(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::RendererNotFound { .. }
                | Self::ExportFailed { .. }
                | Self::InvalidArgument { .. }
        )
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        let message = match err.kind() {
            std::io::ErrorKind::NotFound => "File not found",
            std::io::ErrorKind::PermissionDenied => "Permission denied",
            _ => "IO operation failed",
        };
        Self::FileError {
            message: message.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let path = PathBuf::from("/projects/shot/render");

        let dir_err = DispatchError::OutputDirectory {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            dir_err.to_string(),
            "Output directory /projects/shot/render cannot be created, check directory permissions"
        );

        let export_err = DispatchError::export("shot", "missing camera");
        assert_eq!(
            export_err.to_string(),
            "Scene export failed for 'shot': missing camera"
        );

        let exit_err = DispatchError::ProcessExitWithoutOutput {
            path: PathBuf::from("out/shot_1.png"),
        };
        assert_eq!(exit_err.to_string(), "Renderer exited without writing out/shot_1.png");
    }

    #[test]
    fn test_transient_classification() {
        assert!(DispatchError::decode("a.png", "truncated").is_transient());
        assert!(!DispatchError::config("no bin dir").is_transient());
        assert!(!DispatchError::RenderInProgress.is_transient());
    }

    #[test]
    fn test_pre_launch_classification() {
        assert!(DispatchError::config("unset").is_pre_launch());
        assert!(DispatchError::export("shot", "boom").is_pre_launch());
        let launch = DispatchError::LaunchFailed {
            program: PathBuf::from("appleseed.cli"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(!launch.is_pre_launch());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: DispatchError = io_err.into();

        match err {
            DispatchError::FileError { message, .. } => {
                assert_eq!(message, "Permission denied");
            }
            _ => panic!("Expected FileError variant"),
        }
    }
}
