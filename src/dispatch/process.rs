//! Renderer process handle.

use crate::error::{DispatchError, Result};
use crate::renderer::RenderCommand;
use std::path::{Path, PathBuf};
use tokio::process::Child;

/// Exit information of a finished renderer process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// What the dispatcher needs from a running renderer.
///
/// Implemented by [`RenderProcessHandle`] for real processes and by scripted fakes in tests.
pub trait RenderProcess: Send {
    /// OS process id, if still known.
    fn id(&self) -> Option<u32>;

    /// Non-blocking check for process exit.
    fn try_exit(&mut self) -> std::io::Result<Option<ProcessExit>>;

    /// Send a kill signal and return immediately.
    ///
    /// Fire-and-forget: callers ignore the result, never wait for the process to die and
    /// never escalate.
    fn start_kill(&mut self) -> std::io::Result<()>;
}

/// Exclusive owner of one renderer process for the duration of a render.
///
/// Dropping the handle kills a process that is still running.
#[derive(Debug)]
pub struct RenderProcessHandle {
    child: Child,
    program: PathBuf,
}

impl RenderProcessHandle {
    /// Start the process described by `command`.
    pub fn spawn(command: &RenderCommand) -> Result<Self> {
        let child = command
            .to_command()
            .spawn()
            .map_err(|source| DispatchError::LaunchFailed {
                program: command.program().to_path_buf(),
                source,
            })?;

        log::info!(
            "Started renderer {} (pid {})",
            command.program().display(),
            child
                .id()
                .map_or_else(|| "unknown".to_string(), |pid| pid.to_string())
        );

        Ok(Self {
            child,
            program: command.program().to_path_buf(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl RenderProcess for RenderProcessHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit(&mut self) -> std::io::Result<Option<ProcessExit>> {
        Ok(self
            .child
            .try_wait()?
            .map(|status| ProcessExit {
                code: status.code(),
            }))
    }

    fn start_kill(&mut self) -> std::io::Result<()> {
        self.child.start_kill()
    }
}
