//! Render requests and the on-disk layout of a render.
//!
//! A [`RenderRequest`] is immutable once a render starts. [`RenderLayout`] decides where the
//! scene description and output images live inside a project directory, and [`FrameRange`]
//! drives animation renders one frame at a time.

use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Extension appended to scene description files.
pub const SCENE_EXTENSION: &str = ".appleseed";

/// Name of the output subdirectory inside a project directory.
pub const RENDER_SUBDIR: &str = "render";

/// Whether the renderer runs headless or inside its own GUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Headless command-line renderer with continuous saving
    #[default]
    Cli,
    /// Studio GUI in progressive (interactive) mode
    InteractiveGui,
    /// Studio GUI in final-frame mode
    FinalGui,
}

impl DisplayMode {
    pub fn is_gui(self) -> bool {
        !matches!(self, DisplayMode::Cli)
    }

    pub fn name(self) -> &'static str {
        match self {
            DisplayMode::Cli => "cli",
            DisplayMode::InteractiveGui => "interactive-gui",
            DisplayMode::FinalGui => "final-gui",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DisplayMode {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" => Ok(DisplayMode::Cli),
            "interactive" | "interactive-gui" | "progressive" => Ok(DisplayMode::InteractiveGui),
            "final" | "final-gui" => Ok(DisplayMode::FinalGui),
            other => Err(DispatchError::invalid_argument(format!(
                "unknown display mode '{other}' (expected cli, interactive or final)"
            ))),
        }
    }
}

/// Everything the dispatcher needs to run one renderer process.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    scene_file: PathBuf,
    output_image: PathBuf,
    display_mode: DisplayMode,
    threads: NonZeroUsize,
    poll_interval: Duration,
}

impl RenderRequest {
    /// Build a validated request.
    ///
    /// Fails with [`DispatchError::InvalidArgument`] when a path is empty, `threads` is zero,
    /// or `poll_interval_secs` is not a finite positive number.
    pub fn new(
        scene_file: impl Into<PathBuf>,
        output_image: impl Into<PathBuf>,
        display_mode: DisplayMode,
        threads: usize,
        poll_interval_secs: f64,
    ) -> Result<Self> {
        let scene_file = scene_file.into();
        let output_image = output_image.into();

        if scene_file.as_os_str().is_empty() {
            return Err(DispatchError::invalid_argument("scene file path is empty"));
        }
        if output_image.as_os_str().is_empty() {
            return Err(DispatchError::invalid_argument("output image path is empty"));
        }
        let threads = NonZeroUsize::new(threads)
            .ok_or_else(|| DispatchError::invalid_argument("thread count must be positive"))?;
        let poll_interval = poll_interval(poll_interval_secs)?;

        Ok(Self {
            scene_file,
            output_image,
            display_mode,
            threads,
            poll_interval,
        })
    }

    pub fn scene_file(&self) -> &Path {
        &self.scene_file
    }

    pub fn output_image(&self) -> &Path {
        &self.output_image
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn threads(&self) -> NonZeroUsize {
        self.threads
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Same request with relative scene and output paths anchored to the current directory.
    ///
    /// The renderer runs inside the output directory, so relative paths would otherwise be
    /// resolved against the wrong place.
    pub fn absolutize(&self) -> Result<Self> {
        if self.scene_file.is_absolute() && self.output_image.is_absolute() {
            return Ok(self.clone());
        }
        let cwd = std::env::current_dir()
            .map_err(|e| DispatchError::file_error("Cannot determine current directory", e))?;
        let anchor = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                cwd.join(path)
            }
        };
        Ok(Self {
            scene_file: anchor(&self.scene_file),
            output_image: anchor(&self.output_image),
            ..self.clone()
        })
    }

    /// Directory the output image is written into.
    pub fn output_dir(&self) -> &Path {
        match self.output_image.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Convert a refresh interval in seconds into a [`Duration`], rejecting non-positive values.
pub fn poll_interval(seconds: f64) -> Result<Duration> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(DispatchError::invalid_argument(format!(
            "poll interval must be a positive number of seconds, got {seconds}"
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Inclusive range of animation frames walked with a fixed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    start: i64,
    end: i64,
    step: u32,
}

impl FrameRange {
    pub fn new(start: i64, end: i64, step: u32) -> Result<Self> {
        if step == 0 {
            return Err(DispatchError::invalid_argument("frame step must be at least 1"));
        }
        if start > end {
            return Err(DispatchError::invalid_argument(format!(
                "frame range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end, step })
    }

    /// A range containing exactly one frame.
    pub fn single(frame: i64) -> Self {
        Self {
            start: frame,
            end: frame,
            step: 1,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Number of frames in the range, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        let steps = self.end.abs_diff(self.start) / u64::from(self.step);
        usize::try_from(steps)
            .ok()
            .and_then(|steps| steps.checked_add(1))
            .unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let end = self.end;
        (self.start..=end).step_by(self.step as usize)
    }
}

impl FromStr for FrameRange {
    type Err = DispatchError;

    /// Parses `N`, `START:END` or `START:END:STEP`.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| -> Result<i64> {
            part.trim().parse::<i64>().map_err(|_| {
                DispatchError::invalid_argument(format!("invalid frame number '{part}'"))
            })
        };

        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [frame] => Ok(FrameRange::single(parse(frame)?)),
            [start, end] => FrameRange::new(parse(start)?, parse(end)?, 1),
            [start, end, step] => {
                let step = step.trim().parse::<u32>().map_err(|_| {
                    DispatchError::invalid_argument(format!("invalid frame step '{step}'"))
                })?;
                FrameRange::new(parse(start)?, parse(end)?, step)
            }
            _ => Err(DispatchError::invalid_argument(format!(
                "invalid frame range '{s}' (expected N, START:END or START:END:STEP)"
            ))),
        }
    }
}

/// Per-render working directory: the scene file at the top, images under `render/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderLayout {
    project_dir: PathBuf,
}

impl RenderLayout {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn render_dir(&self) -> PathBuf {
        self.project_dir.join(RENDER_SUBDIR)
    }

    /// `<project>/<scene>.appleseed`, appending the extension only when missing.
    pub fn scene_file(&self, scene_name: &str) -> PathBuf {
        if scene_name.ends_with(SCENE_EXTENSION) {
            self.project_dir.join(scene_name)
        } else {
            self.project_dir.join(format!("{scene_name}{SCENE_EXTENSION}"))
        }
    }

    /// `<project>/render/<scene>_<frame><extension>`.
    pub fn output_image(&self, scene_name: &str, frame: i64, extension: &str) -> PathBuf {
        let stem = scene_name.strip_suffix(SCENE_EXTENSION).unwrap_or(scene_name);
        self.render_dir().join(format!("{stem}_{frame}{extension}"))
    }

    /// Create the project and render directories if they do not exist yet.
    pub fn prepare(&self) -> Result<()> {
        for dir in [self.project_dir.clone(), self.render_dir()] {
            std::fs::create_dir_all(&dir).map_err(|source| DispatchError::OutputDirectory {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
