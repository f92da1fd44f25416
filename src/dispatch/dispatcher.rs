//! Launching the renderer and running a render to completion.

use crate::config::RendererSettings;
use crate::dispatch::monitor::RenderMonitor;
use crate::dispatch::process::{RenderProcess, RenderProcessHandle};
use crate::dispatch::{CancelCheck, TerminalStatus};
use crate::error::{DispatchError, Result};
use crate::frame::FrameSink;
use crate::renderer::{resolve_executable, RenderCommand, VersionProbe};
use crate::request::{DisplayMode, RenderRequest};
use async_trait::async_trait;
use std::path::Path;

/// Something that can turn a request into a running renderer process.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    type Process: RenderProcess;

    async fn launch(&self, request: &RenderRequest) -> Result<Self::Process>;
}

/// Starts renderer processes according to [`RendererSettings`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    settings: RendererSettings,
}

impl Dispatcher {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Start the renderer for `request`.
    ///
    /// # Process
    /// 1. Resolve the executable for the request's display mode
    /// 2. Check the scene file exists
    /// 3. Create the output directory if absent and remove any earlier result for this frame
    /// 4. In CLI mode, probe the executable once for verbosity support
    /// 5. Build the command line and spawn it inside the output directory
    ///
    /// # Errors
    /// * [`DispatchError::Config`] / [`DispatchError::RendererNotFound`] for a bad renderer
    ///   location or a missing scene file
    /// * [`DispatchError::OutputDirectory`] when the output directory cannot be created
    /// * [`DispatchError::FileError`] when a previous output image cannot be removed
    /// * [`DispatchError::LaunchFailed`] when the OS refuses to start the process
    pub async fn launch(&self, request: &RenderRequest) -> Result<RenderProcessHandle> {
        let executable = resolve_executable(&self.settings, request.display_mode())?;
        let request = request.absolutize()?;

        if !request.scene_file().is_file() {
            return Err(DispatchError::config(format!(
                "Scene file {} does not exist",
                request.scene_file().display()
            )));
        }

        let output_dir = request.output_dir();
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| DispatchError::OutputDirectory {
                path: output_dir.to_path_buf(),
                source,
            })?;
        remove_previous_output(request.output_image()).await?;

        let supports_verbosity = if request.display_mode() == DisplayMode::Cli {
            let probe = VersionProbe::run(
                &executable,
                &self.settings.verbosity_marker,
                self.settings.probe_timeout(),
            )
            .await;
            log::debug!(
                "Renderer version {:?}, verbosity flag supported: {}",
                probe.banner,
                probe.supports_verbosity
            );
            probe.supports_verbosity
        } else {
            false
        };

        let command = RenderCommand::build(&request, &executable, supports_verbosity);
        log::info!("Launching: {command}");
        RenderProcessHandle::spawn(&command)
    }

    /// Launch and poll until the render reaches a terminal status.
    pub async fn render(
        &self,
        request: &RenderRequest,
        sink: &mut dyn FrameSink,
        cancel: &mut dyn CancelCheck,
    ) -> Result<TerminalStatus> {
        let process = self.launch(request).await?;
        Ok(poll_until_complete(process, request, sink, cancel).await)
    }
}

/// Delete an image left behind by an earlier render of the same frame.
///
/// The monitor treats any file at the output path as renderer output, so a stale image
/// would mask a renderer that never writes one.
async fn remove_previous_output(output: &Path) -> Result<()> {
    match tokio::fs::remove_file(output).await {
        Ok(()) => {
            log::debug!("Removed previous render result {}", output.display());
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(DispatchError::file_error(
            format!("cannot remove previous render result {}", output.display()),
            err,
        )),
    }
}

#[async_trait]
impl ProcessLauncher for Dispatcher {
    type Process = RenderProcessHandle;

    async fn launch(&self, request: &RenderRequest) -> Result<RenderProcessHandle> {
        Dispatcher::launch(self, request).await
    }
}

/// Poll `process` at the request's interval, feeding frames to `sink`, until it completes,
/// fails or is cancelled.
///
/// Decode failures while the process runs are never fatal. The process is consumed: it is
/// killed on cancellation and dropped when the function returns.
pub async fn poll_until_complete<P: RenderProcess>(
    process: P,
    request: &RenderRequest,
    sink: &mut dyn FrameSink,
    cancel: &mut dyn CancelCheck,
) -> TerminalStatus {
    RenderMonitor::new(process, request.output_image())
        .run(request.poll_interval(), sink, cancel)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::process::tests::ScriptedProcess;
    use crate::frame::tests::{write_png, RecordingSink};
    use tempfile::TempDir;

    fn request_in(dir: &std::path::Path) -> RenderRequest {
        RenderRequest::new(
            dir.join("scene.appleseed"),
            dir.join("render").join("scene_1.png"),
            DisplayMode::Cli,
            2,
            0.01,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn launch_without_bin_dir_is_config_error() {
        let temp = TempDir::new().unwrap();
        let dispatcher = Dispatcher::new(RendererSettings::default());
        let err = dispatcher.launch(&request_in(temp.path())).await.unwrap_err();
        assert!(matches!(err, DispatchError::Config { .. }));
        assert!(err.is_pre_launch());
    }

    #[tokio::test]
    async fn launch_with_missing_executable_is_not_found() {
        let temp = TempDir::new().unwrap();
        let dispatcher = Dispatcher::new(RendererSettings::with_bin_dir(temp.path()));
        let err = dispatcher.launch(&request_in(temp.path())).await.unwrap_err();
        assert!(matches!(err, DispatchError::RendererNotFound { .. }));
        // Nothing was created for a render that never started.
        assert!(!temp.path().join("render").exists());
    }

    #[tokio::test]
    async fn previous_output_is_removed_before_launch() {
        let temp = TempDir::new().unwrap();
        let stale = temp.path().join("scene_1.png");
        write_png(&stale, 8, 8);

        remove_previous_output(&stale).await.unwrap();
        assert!(!stale.exists());
        // Nothing to remove is fine.
        remove_previous_output(&stale).await.unwrap();

        let blocked = temp.path().join("scene_2.png");
        std::fs::create_dir(&blocked).unwrap();
        let err = remove_previous_output(&blocked).await.unwrap_err();
        assert!(matches!(err, DispatchError::FileError { .. }));
    }

    #[tokio::test]
    async fn poll_until_complete_uses_request_output() {
        let temp = TempDir::new().unwrap();
        let request = request_in(temp.path());
        std::fs::create_dir_all(request.output_dir()).unwrap();
        write_png(request.output_image(), 64, 64);

        let mut sink = RecordingSink::default();
        let status = poll_until_complete(
            ScriptedProcess::exiting_on(2),
            &request,
            &mut sink,
            &mut || false,
        )
        .await;

        assert_eq!(status, TerminalStatus::Completed);
        assert_eq!(sink.frames.len(), 2);
    }

    #[tokio::test]
    async fn poll_until_complete_reports_missing_output() {
        let temp = TempDir::new().unwrap();
        let request = request_in(temp.path());

        let mut sink = RecordingSink::default();
        let status = poll_until_complete(
            ScriptedProcess::exiting_on(3),
            &request,
            &mut sink,
            &mut || false,
        )
        .await;

        assert_eq!(status, TerminalStatus::Failed);
        assert!(sink.frames.is_empty());
    }
}
