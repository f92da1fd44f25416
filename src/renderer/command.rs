//! Renderer invocation.
//!
//! CLI mode:
//! `<cli> <scene> -o <image> --threads <N> --continuous-saving [--message-verbosity fatal]`
//!
//! GUI modes:
//! `<studio> <scene> --render interactive|final`

use crate::request::{DisplayMode, RenderRequest};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Verbosity level passed when the renderer supports silencing its console.
pub const MESSAGE_VERBOSITY_LEVEL: &str = "fatal";

/// Fully built command line for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    program: PathBuf,
    args: Vec<OsString>,
    working_dir: PathBuf,
}

impl RenderCommand {
    /// Build the command line for `request`.
    ///
    /// `supports_verbosity` comes from the capability probe and only affects CLI mode.
    pub fn build(request: &RenderRequest, executable: &Path, supports_verbosity: bool) -> Self {
        let mut args: Vec<OsString> = vec![request.scene_file().as_os_str().to_owned()];

        match request.display_mode() {
            DisplayMode::Cli => {
                args.push("-o".into());
                args.push(request.output_image().as_os_str().to_owned());
                args.push("--threads".into());
                args.push(request.threads().get().to_string().into());
                args.push("--continuous-saving".into());
                if supports_verbosity {
                    args.push("--message-verbosity".into());
                    args.push(MESSAGE_VERBOSITY_LEVEL.into());
                }
            }
            DisplayMode::InteractiveGui => {
                args.push("--render".into());
                args.push("interactive".into());
            }
            DisplayMode::FinalGui => {
                args.push("--render".into());
                args.push("final".into());
            }
        }

        Self {
            program: executable.to_path_buf(),
            args,
            working_dir: request.output_dir().to_path_buf(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn has_arg(&self, arg: impl AsRef<OsStr>) -> bool {
        self.args.iter().any(|a| a.as_os_str() == arg.as_ref())
    }

    /// Tokio command ready to spawn. The child is killed if its handle is dropped.
    pub fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

impl std::fmt::Display for RenderCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
