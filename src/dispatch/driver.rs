//! Host-facing `start` / `poll_tick` adapter.
//!
//! Hosts that own their own event loop (an editor's render callback, a timer in a GUI) call
//! [`RenderDriver::start`] once and then [`RenderDriver::poll_tick`] on their own cadence,
//! using [`RenderDriver::poll_interval`] as a hint. The driver holds at most one running
//! process at a time.

use crate::dispatch::dispatcher::{Dispatcher, ProcessLauncher};
use crate::dispatch::monitor::RenderMonitor;
use crate::dispatch::process::RenderProcess;
use crate::dispatch::{CancelCheck, TickOutcome};
use crate::error::{DispatchError, Result};
use crate::frame::FrameSink;
use crate::request::RenderRequest;
use std::time::Duration;

struct ActiveRender<P> {
    request: RenderRequest,
    monitor: RenderMonitor<P>,
}

/// Drives one render at a time on behalf of a host.
pub struct RenderDriver<L: ProcessLauncher = Dispatcher> {
    launcher: L,
    active: Option<ActiveRender<L::Process>>,
}

impl<L: ProcessLauncher> RenderDriver<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            active: None,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Request being rendered, if any.
    pub fn active_request(&self) -> Option<&RenderRequest> {
        self.active.as_ref().map(|active| &active.request)
    }

    /// OS id of the running renderer, if any.
    pub fn active_pid(&self) -> Option<u32> {
        self.active
            .as_ref()
            .and_then(|active| active.monitor.process().id())
    }

    /// Suggested delay between ticks for the active render.
    pub fn poll_interval(&self) -> Option<Duration> {
        self.active
            .as_ref()
            .map(|active| active.request.poll_interval())
    }

    /// Launch the renderer for `request`.
    ///
    /// Fails with [`DispatchError::RenderInProgress`] while a previous render is still
    /// active; the running process is left untouched.
    pub async fn start(&mut self, request: RenderRequest) -> Result<()> {
        if self.active.is_some() {
            return Err(DispatchError::RenderInProgress);
        }

        let process = self.launcher.launch(&request).await?;
        let monitor = RenderMonitor::new(process, request.output_image());
        self.active = Some(ActiveRender { request, monitor });
        Ok(())
    }

    /// Advance the active render by one tick.
    ///
    /// On a terminal outcome the driver becomes idle and can be started again.
    pub async fn poll_tick(
        &mut self,
        sink: &mut dyn FrameSink,
        cancel: &mut dyn CancelCheck,
    ) -> Result<TickOutcome> {
        let Some(active) = self.active.as_mut() else {
            return Err(DispatchError::other("no render in progress"));
        };

        let outcome = active.monitor.poll_tick(sink, cancel).await;
        if matches!(outcome, TickOutcome::Finished(_)) {
            self.active = None;
        }
        Ok(outcome)
    }
}
