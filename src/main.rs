//! seedrender - External Renderer Dispatcher
//!
//! Renders an appleseed project file with the external renderer and reports progress.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use seedrender::{
    Application, CancelFlag, DisplayMode, FrameRange, FrameSink, ProjectFileExporter,
    RenderFrame, RenderJob, Settings,
};
use std::path::PathBuf;

/// Host surface for the terminal: logs every frame update and status change.
#[derive(Default)]
struct LoggingSink {
    updates: u64,
}

impl FrameSink for LoggingSink {
    fn frame_available(&mut self, frame: &RenderFrame) {
        self.updates += 1;
        log::info!(
            "Frame update {} from {} ({}x{})",
            self.updates,
            frame.source().display(),
            frame.width(),
            frame.height()
        );
    }

    fn update_stats(&mut self, message: &str) {
        log::info!("Renderer: {message}");
    }
}

fn cli() -> Command {
    Command::new("seedrender")
        .version(seedrender::VERSION)
        .about("Render an appleseed project with the external renderer")
        .long_about(
            "seedrender launches the appleseed renderer on a project file, streams the \
             continuously-saved output image while it renders, and stops the renderer on Ctrl-C.",
        )
        .arg(
            Arg::new("scene")
                .help("Path to the .appleseed project file to render")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Settings file (defaults to <config dir>/seedrender/config.toml)"),
        )
        .arg(
            Arg::new("bin-dir")
                .long("bin-dir")
                .value_name("DIR")
                .help("Directory containing appleseed.cli / appleseed.studio"),
        )
        .arg(
            Arg::new("project-dir")
                .long("project-dir")
                .value_name("DIR")
                .help("Working directory for the scene file and render output"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .help("Render threads passed to the renderer"),
        )
        .arg(
            Arg::new("refresh")
                .long("refresh")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(f64))
                .help("Seconds between output polls"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("Display mode: cli, interactive or final"),
        )
        .arg(
            Arg::new("frame")
                .long("frame")
                .value_name("N")
                .value_parser(clap::value_parser!(i64))
                .conflicts_with("frames")
                .help("Single frame number to render"),
        )
        .arg(
            Arg::new("frames")
                .long("frames")
                .value_name("START:END[:STEP]")
                .help("Animation frame range to render"),
        )
        .arg(
            Arg::new("extension")
                .long("extension")
                .value_name(".EXT")
                .help("Output image extension, e.g. .png or .exr"),
        )
        .arg(
            Arg::new("print-config")
                .long("print-config")
                .action(ArgAction::SetTrue)
                .help("Print the effective settings as TOML and exit"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; RUST_LOG controls verbosity
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();

    let scene_path = PathBuf::from(
        matches
            .get_one::<String>("scene")
            .context("scene argument is required")?,
    );

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut settings = Settings::load(config_path.as_deref())?;

    if let Some(dir) = matches.get_one::<String>("bin-dir") {
        settings.renderer.bin_dir = Some(PathBuf::from(dir));
    }
    if let Some(dir) = matches.get_one::<String>("project-dir") {
        settings.render.project_dir = Some(PathBuf::from(dir));
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        settings.render.threads = Some(*threads);
    }
    if let Some(refresh) = matches.get_one::<f64>("refresh") {
        settings.render.refresh_secs = *refresh;
    }
    if let Some(mode) = matches.get_one::<String>("mode") {
        settings.render.display_mode = mode.parse::<DisplayMode>()?;
    }
    if let Some(ext) = matches.get_one::<String>("extension") {
        settings.render.image_extension = ext.clone();
    }
    settings.validate()?;

    if matches.get_flag("print-config") {
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    // Validate scene file exists
    if !scene_path.is_file() {
        anyhow::bail!("Scene file does not exist: {}", scene_path.display());
    }

    let scene_name = scene_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("scene file name is not valid UTF-8")?
        .to_string();

    // Without a configured project directory, render next to the scene file
    if settings.render.project_dir.is_none() {
        let parent = scene_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        settings.render.project_dir = Some(parent);
    }

    let mut job = RenderJob::from_settings(&scene_name, &settings)?;
    if let Some(frame) = matches.get_one::<i64>("frame") {
        job.frames = FrameRange::single(*frame);
    } else if let Some(range) = matches.get_one::<String>("frames") {
        job.frames = range.parse::<FrameRange>()?;
    }

    let app = Application::new(&settings, Box::new(ProjectFileExporter::new(&scene_path)));

    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping renderer");
            signal_flag.cancel();
        }
    });

    let mut sink = LoggingSink::default();
    let mut cancel_check = cancel.clone();
    let summary = app
        .render(&job, &mut sink, &mut cancel_check)
        .await
        .with_context(|| format!("Rendering {} failed", scene_path.display()))?;

    if let Some(frame) = summary.first_failure() {
        anyhow::bail!("Renderer produced no image for frame {frame}");
    }
    if summary.was_cancelled() {
        log::warn!("Render cancelled");
    } else {
        log::info!("Rendered {} frame(s)", summary.frames.len());
    }

    Ok(())
}
