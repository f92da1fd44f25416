//! Per-session render lock.
//!
//! A host session hands the same [`RenderSession`] to every render trigger. The session's
//! gate serialises the whole launch-and-poll sequence, so re-entrant triggers queue up
//! behind the running render instead of starting a second renderer.

use crate::dispatch::dispatcher::{poll_until_complete, ProcessLauncher};
use crate::dispatch::process::RenderProcess;
use crate::dispatch::{CancelCheck, TerminalStatus};
use crate::error::Result;
use crate::frame::FrameSink;
use crate::request::RenderRequest;
use parking_lot::Mutex;
use std::sync::Arc;

/// Observable state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Process id of the renderer currently running under this session
    pub active_pid: Option<u32>,
    /// How the most recent render ended
    pub last_status: Option<TerminalStatus>,
    /// Number of renderer processes launched through this session
    pub renders_started: u64,
}

#[derive(Default)]
struct SessionInner {
    gate: tokio::sync::Mutex<()>,
    state: Mutex<SessionState>,
}

/// Cloneable handle to a session's render lock.
#[derive(Clone, Default)]
pub struct RenderSession {
    inner: Arc<SessionInner>,
}

impl RenderSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.lock().clone()
    }

    /// True while a render holds the session gate.
    pub fn is_busy(&self) -> bool {
        self.inner.gate.try_lock().is_err()
    }

    /// Launch and poll `request` while holding the session gate.
    ///
    /// Waits for any render already running under this session. Launch failures are
    /// returned as errors and leave `last_status` unchanged.
    pub async fn render<L: ProcessLauncher>(
        &self,
        launcher: &L,
        request: &RenderRequest,
        sink: &mut dyn FrameSink,
        cancel: &mut dyn CancelCheck,
    ) -> Result<TerminalStatus> {
        let _gate = self.inner.gate.lock().await;

        let process = launcher.launch(request).await?;
        {
            let mut state = self.inner.state.lock();
            state.active_pid = process.id();
            state.renders_started += 1;
        }

        let status = poll_until_complete(process, request, sink, cancel).await;

        let mut state = self.inner.state.lock();
        state.active_pid = None;
        state.last_status = Some(status);
        Ok(status)
    }
}
