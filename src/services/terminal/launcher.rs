//! Process launcher seam.
//!
//! The session manager only needs three things from the OS: spawn a shell
//! with two readable output streams, interrupt it, and wait for it. The real
//! implementation is [`ShellLauncher`] over `tokio::process`; tests plug in
//! fakes backed by in-memory pipes.

use crate::error::{ExitOutcome, Result, ShellError};
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

/// Everything needed to start one shell run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub shell: String,
    pub login_flag: String,
    pub exec_flag: String,
    pub script: String,
    pub working_dir: PathBuf,
}

impl LaunchRequest {
    /// Arguments passed to the shell binary.
    pub fn args(&self) -> Vec<&str> {
        let mut args = Vec::with_capacity(3);
        if !self.login_flag.is_empty() {
            args.push(self.login_flag.as_str());
        }
        args.push(self.exec_flag.as_str());
        args.push(self.script.as_str());
        args
    }
}

/// Wrap `command` so the user's interactive rc file is sourced first.
///
/// The rc file is derived from the shell's basename (`~/.bashrc`, `~/.zshrc`)
/// and only sourced when readable.
pub fn build_script(command: &str, source_rc: bool) -> String {
    if !source_rc {
        return command.to_string();
    }
    format!(
        r#"[ -r "$HOME/.$(basename "$SHELL")rc" ] && . "$HOME/.$(basename "$SHELL")rc"; {}"#,
        command
    )
}

pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// A freshly spawned process and its output streams.
pub struct LaunchedProcess {
    pub handle: Arc<dyn ProcessHandle>,
    pub stdout: OutputStream,
    pub stderr: OutputStream,
}

#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// OS process id, if there is one.
    fn id(&self) -> Option<u32>;

    /// Best-effort interrupt. Returns as soon as the signal is sent.
    fn interrupt(&self) -> io::Result<()>;

    /// Wait for the process to terminate.
    async fn wait(&self) -> io::Result<ExitOutcome>;
}

pub trait ProcessLauncher: Send + Sync {
    /// Start a process. Must be called from within a tokio runtime context.
    fn spawn(&self, request: &LaunchRequest) -> Result<LaunchedProcess>;
}

/// Launches the real shell through `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLauncher;

impl ProcessLauncher for ShellLauncher {
    fn spawn(&self, request: &LaunchRequest) -> Result<LaunchedProcess> {
        let mut cmd = Command::new(&request.shell);
        cmd.args(request.args())
            .current_dir(&request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so an interrupt reaches the whole pipeline and
        // not only the wrapping shell.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| ShellError::launch(&request.shell, e))?;

        let missing = || {
            ShellError::launch(
                &request.shell,
                io::Error::new(io::ErrorKind::BrokenPipe, "output pipe not captured"),
            )
        };
        let stdout = child.stdout.take().ok_or_else(missing)?;
        let stderr = child.stderr.take().ok_or_else(missing)?;

        tracing::debug!(
            "Spawned {} (pid {:?}) in {:?}",
            request.shell,
            child.id(),
            request.working_dir
        );

        Ok(LaunchedProcess {
            handle: Arc::new(ChildHandle::new(child)),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        })
    }
}

struct ChildHandle {
    pid: Option<u32>,
    child: tokio::sync::Mutex<Child>,
    reaped: AtomicBool,
}

impl ChildHandle {
    fn new(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: tokio::sync::Mutex::new(child),
            reaped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ProcessHandle for ChildHandle {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn interrupt(&self) -> io::Result<()> {
        if self.reaped.load(Ordering::SeqCst) {
            return Ok(());
        }
        let Some(pid) = self.pid else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let raw = i32::try_from(pid)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            killpg(Pid::from_raw(raw), Signal::SIGINT).map_err(io::Error::from)
        }

        #[cfg(not(unix))]
        {
            let _ = pid;
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "interrupt is only supported on unix",
            ))
        }
    }

    async fn wait(&self) -> io::Result<ExitOutcome> {
        let status = self.child.lock().await.wait().await?;
        self.reaped.store(true, Ordering::SeqCst);
        Ok(ExitOutcome::from(status))
    }
}
