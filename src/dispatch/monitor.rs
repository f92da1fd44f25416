//! Per-process poll state machine.
//!
//! Each tick runs, in order:
//!
//! 1. cancellation check: kill (once, best-effort) and finish as `Cancelled`
//! 2. liveness check: on exit, one final read of the output and finish as `Completed` when
//!    the image exists or `Failed` when it never appeared
//! 3. output read: decode the image if present and hand it to the sink; decode failures are
//!    transient while the process is alive and are retried on the next tick
//!
//! Decoding runs on the blocking pool but is awaited before the tick returns, so sink calls
//! never overlap even when a decode outlasts the poll interval.

use crate::dispatch::process::{ProcessExit, RenderProcess};
use crate::dispatch::{CancelCheck, TerminalStatus, TickOutcome};
use crate::error::{DispatchError, Result};
use crate::frame::{FrameSink, RenderFrame};
use std::path::{Path, PathBuf};
use std::time::Duration;

const STATUS_RENDERING: &str = "Rendering";
const STATUS_ERROR: &str = "Error";
const STATUS_CANCELLED: &str = "Cancelled";

/// Watches one renderer process and streams its output image to a [`FrameSink`].
#[derive(Debug)]
pub struct RenderMonitor<P> {
    process: P,
    output: PathBuf,
    ticks: u64,
    frames_delivered: u64,
    output_seen: bool,
    kill_sent: bool,
    finished: Option<TerminalStatus>,
}

impl<P: RenderProcess> RenderMonitor<P> {
    pub fn new(process: P, output: impl Into<PathBuf>) -> Self {
        Self {
            process,
            output: output.into(),
            ticks: 0,
            frames_delivered: 0,
            output_seen: false,
            kill_sent: false,
            finished: None,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    pub fn status(&self) -> Option<TerminalStatus> {
        self.finished
    }

    /// Run a single tick. Once finished, every further tick returns the same terminal status
    /// without touching the process or the sink.
    pub async fn poll_tick(
        &mut self,
        sink: &mut dyn FrameSink,
        cancel: &mut dyn CancelCheck,
    ) -> TickOutcome {
        if let Some(status) = self.finished {
            return TickOutcome::Finished(status);
        }
        self.ticks += 1;

        if cancel.cancel_requested() {
            log::info!("Render of {} cancelled", self.output.display());
            self.kill();
            sink.update_stats(STATUS_CANCELLED);
            return self.finish(TerminalStatus::Cancelled);
        }

        match self.process.try_exit() {
            Ok(Some(exit)) => {
                let status = self.final_read(exit, sink).await;
                return self.finish(status);
            }
            Ok(None) => {}
            Err(err) => {
                log::error!("Lost track of renderer process: {err}");
                self.kill();
                sink.update_stats(STATUS_ERROR);
                return self.finish(TerminalStatus::Failed);
            }
        }

        if !self.output.is_file() {
            log::trace!("Tick {}: {} not written yet", self.ticks, self.output.display());
            return TickOutcome::Waiting;
        }
        self.note_output(sink);

        match decode(&self.output).await {
            Ok(frame) => {
                self.deliver(&frame, sink);
                TickOutcome::FrameDelivered
            }
            Err(err) => {
                // Continuous saving rewrites the file in place; try again next tick.
                log::debug!("Tick {}: {err}", self.ticks);
                TickOutcome::Waiting
            }
        }
    }

    /// Tick until a terminal status, sleeping `interval` between ticks.
    pub async fn run(
        mut self,
        interval: Duration,
        sink: &mut dyn FrameSink,
        cancel: &mut dyn CancelCheck,
    ) -> TerminalStatus {
        loop {
            if let TickOutcome::Finished(status) = self.poll_tick(sink, cancel).await {
                return status;
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn final_read(&mut self, exit: ProcessExit, sink: &mut dyn FrameSink) -> TerminalStatus {
        if !exit.success() {
            log::warn!("Renderer exited with status {:?}", exit.code);
        }

        if !self.output.is_file() {
            let err = DispatchError::ProcessExitWithoutOutput {
                path: self.output.clone(),
            };
            log::error!("{err}");
            sink.update_stats(STATUS_ERROR);
            return TerminalStatus::Failed;
        }
        self.note_output(sink);

        match decode(&self.output).await {
            Ok(frame) => self.deliver(&frame, sink),
            Err(err) => {
                log::warn!("Final render result could not be loaded: {err}");
                sink.update_stats(STATUS_ERROR);
            }
        }
        TerminalStatus::Completed
    }

    fn note_output(&mut self, sink: &mut dyn FrameSink) {
        if !self.output_seen {
            self.output_seen = true;
            log::info!("Renderer output appeared at {}", self.output.display());
            sink.update_stats(STATUS_RENDERING);
        }
    }

    fn deliver(&mut self, frame: &RenderFrame, sink: &mut dyn FrameSink) {
        self.frames_delivered += 1;
        log::debug!(
            "Tick {}: frame update {} ({}x{})",
            self.ticks,
            self.frames_delivered,
            frame.width(),
            frame.height()
        );
        sink.frame_available(frame);
    }

    fn kill(&mut self) {
        if self.kill_sent {
            return;
        }
        self.kill_sent = true;
        if let Err(err) = self.process.start_kill() {
            log::debug!("Ignoring kill failure: {err}");
        }
    }

    fn finish(&mut self, status: TerminalStatus) -> TickOutcome {
        log::info!(
            "Render {} after {} ticks and {} frame updates",
            status,
            self.ticks,
            self.frames_delivered
        );
        self.finished = Some(status);
        TickOutcome::Finished(status)
    }
}

async fn decode(path: &Path) -> Result<RenderFrame> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || RenderFrame::load(&owned))
        .await
        .map_err(|e| DispatchError::decode(path, e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::process::tests::ScriptedProcess;
    use crate::frame::tests::{write_png, RecordingSink};
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn never() -> impl FnMut() -> bool {
        || false
    }

    #[tokio::test]
    async fn scenario_frame_then_exit_completes() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("frame_1.png");
        let mut monitor = RenderMonitor::new(ScriptedProcess::exiting_on(3), &output);
        let mut sink = RecordingSink::default();
        let mut cancel = never();

        // Tick 1: nothing on disk yet.
        assert_eq!(
            monitor.poll_tick(&mut sink, &mut cancel).await,
            TickOutcome::Waiting
        );
        assert!(sink.frames.is_empty());

        // Renderer writes its first partial image.
        write_png(&output, 64, 64);
        assert_eq!(
            monitor.poll_tick(&mut sink, &mut cancel).await,
            TickOutcome::FrameDelivered
        );
        assert_eq!(sink.frames.len(), 1);

        // Tick 3: process has exited, final read delivers once more.
        assert_eq!(
            monitor.poll_tick(&mut sink, &mut cancel).await,
            TickOutcome::Finished(TerminalStatus::Completed)
        );
        assert_eq!(sink.frames.len(), 2);
        assert_eq!(sink.frames[1].width(), 64);
        assert_eq!(sink.stats, vec![STATUS_RENDERING.to_string()]);
        assert_eq!(monitor.ticks(), 3);
    }

    #[tokio::test]
    async fn exit_without_output_fails() {
        let temp = TempDir::new().unwrap();
        let mut monitor =
            RenderMonitor::new(ScriptedProcess::exiting_on(1), temp.path().join("never.png"));
        let mut sink = RecordingSink::default();

        let outcome = monitor.poll_tick(&mut sink, &mut never()).await;
        assert_eq!(outcome, TickOutcome::Finished(TerminalStatus::Failed));
        assert!(sink.frames.is_empty());
        assert_eq!(sink.stats, vec![STATUS_ERROR.to_string()]);
    }

    #[tokio::test]
    async fn cancellation_kills_exactly_once() {
        let temp = TempDir::new().unwrap();
        let process = ScriptedProcess::running_forever();
        let kills = process.kill_counter();
        let mut monitor = RenderMonitor::new(process, temp.path().join("frame.png"));
        let mut sink = RecordingSink::default();

        let mut ticks = 0;
        let mut cancel = move || {
            ticks += 1;
            ticks >= 3
        };

        assert_eq!(monitor.poll_tick(&mut sink, &mut cancel).await, TickOutcome::Waiting);
        assert_eq!(monitor.poll_tick(&mut sink, &mut cancel).await, TickOutcome::Waiting);
        assert_eq!(
            monitor.poll_tick(&mut sink, &mut cancel).await,
            TickOutcome::Finished(TerminalStatus::Cancelled)
        );
        // Further ticks neither re-kill nor re-report.
        assert_eq!(
            monitor.poll_tick(&mut sink, &mut cancel).await,
            TickOutcome::Finished(TerminalStatus::Cancelled)
        );
        assert_eq!(kills.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.ticks(), 3);
        assert!(sink.frames.is_empty());
    }

    #[tokio::test]
    async fn cancellation_wins_over_exit() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("frame.png");
        write_png(&output, 8, 8);
        let mut monitor = RenderMonitor::new(ScriptedProcess::exiting_on(1), &output);
        let mut sink = RecordingSink::default();

        let outcome = monitor.poll_tick(&mut sink, &mut || true).await;
        assert_eq!(outcome, TickOutcome::Finished(TerminalStatus::Cancelled));
        assert!(sink.frames.is_empty());
    }

    #[tokio::test]
    async fn partial_write_is_swallowed_while_running() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("frame.png");
        let full = temp.path().join("full.png");
        write_png(&full, 16, 16);
        let bytes = std::fs::read(&full).unwrap();
        std::fs::write(&output, &bytes[..bytes.len() / 3]).unwrap();

        let mut monitor = RenderMonitor::new(ScriptedProcess::exiting_on(3), &output);
        let mut sink = RecordingSink::default();

        assert_eq!(monitor.poll_tick(&mut sink, &mut never()).await, TickOutcome::Waiting);
        assert!(sink.frames.is_empty());

        std::fs::write(&output, &bytes).unwrap();
        assert_eq!(
            monitor.poll_tick(&mut sink, &mut never()).await,
            TickOutcome::FrameDelivered
        );
        assert_eq!(
            monitor.poll_tick(&mut sink, &mut never()).await,
            TickOutcome::Finished(TerminalStatus::Completed)
        );
        assert_eq!(monitor.frames_delivered(), 2);
    }

    #[tokio::test]
    async fn corrupt_final_output_still_completes() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("frame.png");
        std::fs::write(&output, b"not an image").unwrap();

        let mut monitor = RenderMonitor::new(ScriptedProcess::exiting_on(1), &output);
        let mut sink = RecordingSink::default();

        let outcome = monitor.poll_tick(&mut sink, &mut never()).await;
        assert_eq!(outcome, TickOutcome::Finished(TerminalStatus::Completed));
        assert!(sink.frames.is_empty());
        assert_eq!(
            sink.stats,
            vec![STATUS_RENDERING.to_string(), STATUS_ERROR.to_string()]
        );
    }

    #[tokio::test]
    async fn wait_failure_is_terminal() {
        let temp = TempDir::new().unwrap();
        let mut process = ScriptedProcess::running_forever();
        process.fail_checks = true;
        let kills = process.kill_counter();
        let mut monitor = RenderMonitor::new(process, temp.path().join("frame.png"));
        let mut sink = RecordingSink::default();

        let outcome = monitor.poll_tick(&mut sink, &mut never()).await;
        assert_eq!(outcome, TickOutcome::Finished(TerminalStatus::Failed));
        assert_eq!(kills.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_loops_until_exit() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("frame.png");
        write_png(&output, 4, 4);

        let monitor = RenderMonitor::new(ScriptedProcess::exiting_on(4), &output);
        let mut sink = RecordingSink::default();
        let status = monitor
            .run(Duration::from_millis(5), &mut sink, &mut never())
            .await;

        assert_eq!(status, TerminalStatus::Completed);
        // Three live ticks plus the final read.
        assert_eq!(sink.frames.len(), 4);
    }
}
