//! # seedrender - External Renderer Dispatcher
//!
//! Launches an appleseed-style renderer on an exported scene description, watches the
//! process, and streams the continuously-saved output image back to a host surface while
//! honouring cooperative cancellation.
//!
//! ## Features
//!
//! - **Capability probing**: one `-v` run per launch decides whether the renderer can be
//!   silenced with `--message-verbosity`
//! - **Incremental results**: partial images are decoded on every poll tick; half-written
//!   files are retried, never fatal
//! - **Cooperative cancellation**: checked first on every tick, fire-and-forget kill
//! - **Session lock**: re-entrant render triggers queue instead of racing
//! - **Animation**: frame ranges with a validated step
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - TOML settings for the renderer location and render defaults
//! - [`request`] - Render requests, display modes, frame ranges and output layout
//! - [`frame`] - Decoded render results and the host sink trait
//! - [`renderer`] - Executable resolution, capability probe, command construction
//! - [`export`] - Scene export collaborator
//! - [`dispatch`] - Process lifecycle, polling, driver and session lock
//! - [`app`] - Job orchestration across frames

// Core modules
pub mod config;
pub mod error;
pub mod request;

// Renderer integration
pub mod frame;
pub mod renderer;

// Core components
pub mod app;
pub mod dispatch;
pub mod export;

// Re-export commonly used types for convenience
pub use error::{DispatchError, Result};

// Public API surface for external usage
pub use app::{Application, RenderJob, RenderSummary};
pub use config::Settings;
pub use dispatch::{
    poll_until_complete, CancelCheck, CancelFlag, Dispatcher, RenderDriver, RenderSession,
    TerminalStatus, TickOutcome,
};
pub use export::{ProjectFileExporter, SceneExporter};
pub use frame::{FrameSink, RenderFrame};
pub use request::{DisplayMode, FrameRange, RenderLayout, RenderRequest};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
