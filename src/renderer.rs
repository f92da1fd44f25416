//! Everything specific to the external renderer executable.
//!
//! - [`executable`] - resolving the binary for a display mode inside the `bin` directory
//! - [`probe`] - one-shot `-v` capability probe
//! - [`command`] - building the invocation from a request

pub mod command;
pub mod executable;
pub mod probe;

pub use command::{RenderCommand, MESSAGE_VERBOSITY_LEVEL};
pub use executable::resolve_executable;
pub use probe::{probe_verbosity_support, VersionProbe};
