//! Render dispatch: launching the renderer, watching it, and surfacing its output.
//!
//! The pieces, bottom-up:
//!
//! - [`process`] - the OS process seam ([`RenderProcess`]) and the tokio-backed handle
//! - [`monitor`] - the per-process tick state machine ([`RenderMonitor`])
//! - [`dispatcher`] - [`Dispatcher::launch`] and [`poll_until_complete`]
//! - [`driver`] - `start` / `poll_tick` adapter for hosts that own the event loop
//! - [`session`] - per-session lock serialising render entry points
//!
//! Scheduling is cooperative: the caller drives ticks, each tick checks cancellation first,
//! then process liveness, then the output file. Cancellation latency is therefore bounded by
//! one poll interval.

pub mod dispatcher;
pub mod driver;
pub mod monitor;
pub mod process;
pub mod session;

pub use dispatcher::{poll_until_complete, Dispatcher, ProcessLauncher};
pub use driver::RenderDriver;
pub use monitor::RenderMonitor;
pub use process::{ProcessExit, RenderProcess, RenderProcessHandle};
pub use session::{RenderSession, SessionState};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How a render ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalStatus {
    /// The renderer exited and its output image exists
    Completed,
    /// The caller asked to stop; the renderer was sent a kill signal
    Cancelled,
    /// The renderer exited (or could not be watched) without producing output
    Failed,
}

impl TerminalStatus {
    pub fn is_success(self) -> bool {
        matches!(self, TerminalStatus::Completed)
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminalStatus::Completed => "completed",
            TerminalStatus::Cancelled => "cancelled",
            TerminalStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a single poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing new: no output yet, or the output was mid-write
    Waiting,
    /// A decoded frame was handed to the sink
    FrameDelivered,
    /// The render reached a terminal state; further ticks repeat it
    Finished(TerminalStatus),
}

/// Cooperative cancellation predicate, queried once at the start of every tick.
pub trait CancelCheck {
    fn cancel_requested(&mut self) -> bool;
}

impl<F> CancelCheck for F
where
    F: FnMut() -> bool,
{
    fn cancel_requested(&mut self) -> bool {
        self()
    }
}

/// Shared cancellation flag, cheap to clone into signal handlers or UI threads.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CancelCheck for CancelFlag {
    fn cancel_requested(&mut self) -> bool {
        self.is_cancelled()
    }
}
