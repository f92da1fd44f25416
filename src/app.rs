//! Application orchestration layer
//!
//! Coordinates export, the per-session lock and the dispatcher for a whole job, which may
//! span several animation frames. Per-process state lives in the dispatch module; this
//! layer only sequences frames and stops at the first frame that does not complete.

use crate::config::Settings;
use crate::dispatch::{CancelCheck, Dispatcher, ProcessLauncher, RenderSession, TerminalStatus};
use crate::error::{DispatchError, Result};
use crate::export::SceneExporter;
use crate::frame::FrameSink;
use crate::request::{DisplayMode, FrameRange, RenderLayout, RenderRequest};

/// One user-triggered render: a scene, a frame range and how to run the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub scene_name: String,
    pub layout: RenderLayout,
    pub frames: FrameRange,
    pub display_mode: DisplayMode,
    pub threads: usize,
    pub refresh_secs: f64,
    pub image_extension: String,
}

impl RenderJob {
    /// Job for `scene_name` using the defaults from `settings`.
    ///
    /// Fails when no project directory is configured.
    pub fn from_settings(scene_name: impl Into<String>, settings: &Settings) -> Result<Self> {
        let project_dir = settings
            .render
            .project_dir
            .clone()
            .ok_or_else(|| DispatchError::config("No project path has been specified"))?;

        Ok(Self {
            scene_name: scene_name.into(),
            layout: RenderLayout::new(project_dir),
            frames: FrameRange::single(1),
            display_mode: settings.render.display_mode,
            threads: settings.render.effective_threads(),
            refresh_secs: settings.render.refresh_secs,
            image_extension: settings.render.image_extension.clone(),
        })
    }

    /// Request for a single frame of this job.
    pub fn request_for(&self, frame: i64) -> Result<RenderRequest> {
        RenderRequest::new(
            self.layout.scene_file(&self.scene_name),
            self.layout.output_image(&self.scene_name, frame, &self.image_extension),
            self.display_mode,
            self.threads,
            self.refresh_secs,
        )
    }
}

/// How each rendered frame of a job ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub frames: Vec<(i64, TerminalStatus)>,
}

impl RenderSummary {
    pub fn all_completed(&self) -> bool {
        !self.frames.is_empty() && self.frames.iter().all(|(_, status)| status.is_success())
    }

    pub fn was_cancelled(&self) -> bool {
        self.frames
            .iter()
            .any(|(_, status)| *status == TerminalStatus::Cancelled)
    }

    /// First frame that failed, if any.
    pub fn first_failure(&self) -> Option<i64> {
        self.frames
            .iter()
            .find(|(_, status)| *status == TerminalStatus::Failed)
            .map(|(frame, _)| *frame)
    }
}

/// Application orchestrator - wires the exporter, session and launcher together
pub struct Application<L: ProcessLauncher = Dispatcher> {
    launcher: L,
    session: RenderSession,
    exporter: Box<dyn SceneExporter>,
}

impl Application<Dispatcher> {
    /// Application using the real renderer described by `settings`.
    pub fn new(settings: &Settings, exporter: Box<dyn SceneExporter>) -> Self {
        Self::with_launcher(
            Dispatcher::new(settings.renderer.clone()),
            RenderSession::new(),
            exporter,
        )
    }
}

impl<L: ProcessLauncher> Application<L> {
    pub fn with_launcher(
        launcher: L,
        session: RenderSession,
        exporter: Box<dyn SceneExporter>,
    ) -> Self {
        Self {
            launcher,
            session,
            exporter,
        }
    }

    pub fn session(&self) -> &RenderSession {
        &self.session
    }

    /// Render every frame of `job` in order.
    ///
    /// Per frame: prepare the layout, export the scene, launch and poll. Export and launch
    /// errors abort the job; a cancelled or failed frame ends it with the frames rendered so
    /// far. Failed renders are never retried.
    pub async fn render(
        &self,
        job: &RenderJob,
        sink: &mut dyn FrameSink,
        cancel: &mut dyn CancelCheck,
    ) -> Result<RenderSummary> {
        job.layout.prepare()?;
        let scene_file = job.layout.scene_file(&job.scene_name);

        let mut summary = RenderSummary::default();
        for frame in job.frames.iter() {
            log::info!(
                "Rendering {} frame {frame} ({})",
                job.scene_name,
                job.display_mode
            );

            self.exporter.export(&job.scene_name, &scene_file).await?;

            let request = job.request_for(frame)?;
            let status = self
                .session
                .render(&self.launcher, &request, sink, cancel)
                .await?;
            summary.frames.push((frame, status));

            match status {
                TerminalStatus::Completed => {
                    log::info!("Frame {frame} written to {}", request.output_image().display());
                }
                TerminalStatus::Cancelled => {
                    log::info!("Render cancelled at frame {frame}");
                    break;
                }
                TerminalStatus::Failed => {
                    log::error!(
                        "{}",
                        DispatchError::ProcessExitWithoutOutput {
                            path: request.output_image().to_path_buf()
                        }
                    );
                    break;
                }
            }
        }

        Ok(summary)
    }
}
