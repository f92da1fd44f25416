//! Renderer capability probe.
//!
//! Newer renderer builds accept `--message-verbosity`, older ones abort on it. The only
//! reliable signal is the version banner printed by `-v`, so each launch runs the executable
//! once with that flag and looks for a known marker in the combined output.
//!
//! The probe fails soft: a missing binary, a crash, a hang past the timeout or unreadable
//! output all mean "unsupported" and the render proceeds without the flag.

use bstr::ByteSlice;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Flag that makes the renderer print its version.
pub const VERSION_FLAG: &str = "-v";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of running the executable with [`VERSION_FLAG`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionProbe {
    /// First non-empty line of the combined output, when the probe ran at all
    pub banner: Option<String>,
    /// Whether the output contained the verbosity marker
    pub supports_verbosity: bool,
}

impl VersionProbe {
    /// Run `executable -v` and inspect stdout followed by stderr for `marker`.
    pub async fn run(executable: &Path, marker: &str, timeout: Duration) -> Self {
        let mut command = Command::new(executable);
        command
            .arg(VERSION_FLAG)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                log::debug!("Version probe of {} failed: {err}", executable.display());
                return Self::default();
            }
            Err(_) => {
                log::warn!(
                    "Version probe of {} timed out after {:?}",
                    executable.display(),
                    timeout
                );
                return Self::default();
            }
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        Self::from_output(&combined, marker)
    }

    /// Inspect raw probe output. Bytes that are not valid text are tolerated.
    pub fn from_output(output: &[u8], marker: &str) -> Self {
        let banner = output
            .lines()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
            .map(|line| line.to_str_lossy().into_owned());
        let supports_verbosity = !marker.is_empty() && output.contains_str(marker);

        Self {
            banner,
            supports_verbosity,
        }
    }
}

/// Whether `executable` understands the verbosity-silencing flag.
pub async fn probe_verbosity_support(executable: &Path, marker: &str) -> bool {
    VersionProbe::run(executable, marker, DEFAULT_TIMEOUT)
        .await
        .supports_verbosity
}
