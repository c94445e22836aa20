//! Error taxonomy shared by the sync engine, the terminal and the orchestrator.
//!
//! Every variant is recoverable: callers report it inline in the transcript
//! or leave their previous state untouched. Only startup turns errors fatal,
//! and that happens in the binary through `anyhow`.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors produced by the core.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// A directory or file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The shell subprocess could not be started.
    #[error("failed to launch {shell}: {source}")]
    Launch {
        shell: String,
        #[source]
        source: io::Error,
    },

    /// The shell subprocess ended with a non-success outcome.
    #[error("{0}")]
    ProcessExit(ExitOutcome),
}

impl ShellError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn launch(shell: impl Into<String>, source: io::Error) -> Self {
        Self::Launch {
            shell: shell.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;

/// How a shell process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Code(i32),
    Signal(i32),
    /// The platform reported neither an exit code nor a signal.
    Unknown,
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }

    /// Turn a non-success outcome into a [`ShellError::ProcessExit`].
    pub fn into_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ShellError::ProcessExit(self))
        }
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            return ExitOutcome::Success;
        }
        if let Some(code) = status.code() {
            return ExitOutcome::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitOutcome::Signal(signal);
            }
        }
        ExitOutcome::Unknown
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Success => write!(f, "exit status 0"),
            ExitOutcome::Code(code) => write!(f, "exit status {}", code),
            ExitOutcome::Signal(signal) => match signal_name(*signal) {
                Some(name) => write!(f, "signal: {}", name),
                None => write!(f, "signal: {}", signal),
            },
            ExitOutcome::Unknown => write!(f, "exit status unknown"),
        }
    }
}

#[cfg(unix)]
fn signal_name(signal: i32) -> Option<&'static str> {
    nix::sys::signal::Signal::try_from(signal)
        .ok()
        .map(|sig| sig.as_str())
}

#[cfg(not(unix))]
fn signal_name(_signal: i32) -> Option<&'static str> {
    None
}
