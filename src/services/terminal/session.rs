//! Shell sessions and their output drains.
//!
//! Every dispatched command runs in its own shell process. At most one
//! session is current; starting another one bumps a generation counter, and
//! the drain tasks of older generations notice on their next append and stop
//! without writing anything. The counter is bumped and checked while holding
//! the transcript lock, so once a new session has started no byte of older
//! output can reach the transcript.
//!
//! Signals are fire-and-forget. A superseded process may take a moment to
//! die; its output is simply ignored in the meantime.

use super::launcher::{
    build_script, LaunchRequest, LaunchedProcess, OutputStream, ProcessHandle, ProcessLauncher,
};
use super::TranscriptSink;
use crate::config::TerminalConfig;
use crate::environment::Environment;
use crate::error::{Result, ShellError};
use crate::primitives::stream_filter::ChunkDecoder;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;

/// Lifecycle of one session.
///
/// `Draining` means standard output has ended and the process result is
/// being collected; the prompt follows once it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Starting,
    Running,
    Draining,
    Superseded,
    Exited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub shell: String,
    pub login_flag: String,
    pub exec_flag: String,
    pub source_rc: bool,
    /// Text appended after every finished command
    pub prompt: String,
    pub read_chunk_size: usize,
}

impl SessionSettings {
    pub fn new(config: &TerminalConfig, env: &Environment) -> Self {
        Self {
            shell: config.shell.clone().unwrap_or_else(|| env.shell.clone()),
            login_flag: config.login_flag.clone(),
            exec_flag: config.exec_flag.clone(),
            source_rc: config.source_rc,
            prompt: config.prompt.clone(),
            read_chunk_size: config.read_chunk_size.max(1),
        }
    }
}

struct ActiveSession {
    generation: u64,
    handle: Option<Arc<dyn ProcessHandle>>,
    status: Arc<Mutex<SessionStatus>>,
}

/// State shared between the manager and the drain tasks of one session.
#[derive(Clone)]
struct SessionContext {
    generation: u64,
    current: Arc<AtomicU64>,
    transcript: Arc<dyn TranscriptSink>,
    status: Arc<Mutex<SessionStatus>>,
    prompt: Arc<str>,
    chunk_size: usize,
}

impl SessionContext {
    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    fn set_status(&self, status: SessionStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn mark_exited(&self) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status != SessionStatus::Superseded {
            *status = SessionStatus::Exited;
        }
    }

    /// Append `text` if this session is still current. Returns false once the
    /// session has been superseded.
    fn append_if_current(&self, text: &str) -> bool {
        let mut current = false;
        self.transcript.with_transcript(&mut |buffer| {
            current = self.is_current();
            if current {
                buffer.append(text);
            }
        });
        current
    }

    /// Append `message` (if any) and then the prompt, starting the prompt on
    /// its own line.
    fn finish_with_prompt(&self, message: Option<String>) -> bool {
        let mut current = false;
        self.transcript.with_transcript(&mut |buffer| {
            current = self.is_current();
            if !current {
                return;
            }
            if let Some(message) = &message {
                buffer.append(message);
            }
            if !buffer.is_empty() && !buffer.text().ends_with('\n') {
                buffer.append("\n");
            }
            buffer.append(&self.prompt);
        });
        current
    }
}

pub struct SessionManager {
    launcher: Arc<dyn ProcessLauncher>,
    runtime: Handle,
    transcript: Arc<dyn TranscriptSink>,
    settings: SessionSettings,
    generation: Arc<AtomicU64>,
    current: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        runtime: Handle,
        transcript: Arc<dyn TranscriptSink>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            launcher,
            runtime,
            transcript,
            settings,
            generation: Arc::new(AtomicU64::new(0)),
            current: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Generation of the current session; 0 before the first start.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SessionStatus {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(session) => *session.status.lock().unwrap_or_else(PoisonError::into_inner),
            None => SessionStatus::Idle,
        }
    }

    /// Interrupt the running session, if any, then start `command`.
    pub fn supersede(&self, working_dir: &Path, command: &str) -> Result<u64> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.take() {
            Self::retire(previous);
        }
        self.start_locked(&mut current, working_dir, command)
    }

    /// Start `command` in a new shell in `working_dir`.
    ///
    /// Output of any earlier session stops being appended, but no signal is
    /// sent to it; use [`supersede`](Self::supersede) for that. A launch
    /// failure is reported in the transcript, followed by a fresh prompt.
    pub fn start(&self, working_dir: &Path, command: &str) -> Result<u64> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.take() {
            let mut status = previous.status.lock().unwrap_or_else(PoisonError::into_inner);
            if matches!(
                *status,
                SessionStatus::Starting | SessionStatus::Running | SessionStatus::Draining
            ) {
                *status = SessionStatus::Superseded;
            }
        }
        self.start_locked(&mut current, working_dir, command)
    }

    /// Best-effort interrupt of the current session. Used on shutdown.
    pub fn interrupt(&self) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = current.as_ref().and_then(|s| s.handle.as_ref()) {
            if let Err(e) = handle.interrupt() {
                tracing::warn!("Failed to interrupt shell (pid {:?}): {}", handle.id(), e);
            }
        }
    }

    fn retire(previous: ActiveSession) {
        let mut status = previous.status.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(
            *status,
            SessionStatus::Starting | SessionStatus::Running | SessionStatus::Draining
        ) {
            return;
        }
        *status = SessionStatus::Superseded;
        drop(status);

        if let Some(handle) = previous.handle {
            tracing::info!(
                "Superseding session {} (pid {:?})",
                previous.generation,
                handle.id()
            );
            if let Err(e) = handle.interrupt() {
                tracing::warn!("Failed to interrupt shell (pid {:?}): {}", handle.id(), e);
            }
        }
    }

    fn start_locked(
        &self,
        current: &mut Option<ActiveSession>,
        working_dir: &Path,
        command: &str,
    ) -> Result<u64> {
        // Bump inside the transcript critical section so no stale append can
        // land after this point.
        let mut generation = 0;
        self.transcript.with_transcript(&mut |_| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        });

        let status = Arc::new(Mutex::new(SessionStatus::Starting));
        let ctx = SessionContext {
            generation,
            current: self.generation.clone(),
            transcript: self.transcript.clone(),
            status: status.clone(),
            prompt: Arc::from(self.settings.prompt.as_str()),
            chunk_size: self.settings.read_chunk_size,
        };

        let request = LaunchRequest {
            shell: self.settings.shell.clone(),
            login_flag: self.settings.login_flag.clone(),
            exec_flag: self.settings.exec_flag.clone(),
            script: build_script(command, self.settings.source_rc),
            working_dir: working_dir.to_path_buf(),
        };

        let launched = {
            let _guard = self.runtime.enter();
            self.launcher.spawn(&request)
        };

        let LaunchedProcess {
            handle,
            stdout,
            stderr,
        } = match launched {
            Ok(launched) => launched,
            Err(e) => {
                tracing::error!("Failed to start {:?}: {}", command, e);
                ctx.set_status(SessionStatus::Idle);
                ctx.finish_with_prompt(Some(format!("err: {}\n", e)));
                *current = Some(ActiveSession {
                    generation,
                    handle: None,
                    status,
                });
                return Err(e);
            }
        };

        tracing::info!(
            "Session {} started (pid {:?}): {:?} in {:?}",
            generation,
            handle.id(),
            command,
            working_dir
        );
        ctx.set_status(SessionStatus::Running);

        self.runtime.spawn(drain_stderr(stderr, ctx.clone()));
        self.runtime
            .spawn(drain_stdout(stdout, handle.clone(), ctx));

        *current = Some(ActiveSession {
            generation,
            handle: Some(handle),
            status,
        });
        Ok(generation)
    }
}

/// Read `stream` to its end, appending filtered chunks while the session is
/// current. Returns false if the session was superseded.
async fn drain(mut stream: OutputStream, ctx: &SessionContext, name: &str) -> bool {
    let mut chunk = vec![0u8; ctx.chunk_size];
    let mut decoder = ChunkDecoder::new();

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("Session {} {} read failed: {}", ctx.generation, name, e);
                break;
            }
        };
        let text = decoder.filter(&chunk[..n]);
        if !ctx.append_if_current(&text) {
            tracing::debug!("Session {} {} superseded, dropping output", ctx.generation, name);
            return false;
        }
    }

    let tail = decoder.finish();
    ctx.append_if_current(&tail)
}

async fn drain_stderr(stream: OutputStream, ctx: SessionContext) {
    drain(stream, &ctx, "stderr").await;
}

async fn drain_stdout(stream: OutputStream, handle: Arc<dyn ProcessHandle>, ctx: SessionContext) {
    if !drain(stream, &ctx, "stdout").await {
        return;
    }

    ctx.set_status(SessionStatus::Draining);
    let message = match handle.wait().await {
        Ok(outcome) => {
            tracing::info!("Session {} exited: {}", ctx.generation, outcome);
            outcome
                .into_result()
                .err()
                .map(|e: ShellError| format!("{}\n", e))
        }
        Err(e) => {
            tracing::warn!("Session {} wait failed: {}", ctx.generation, e);
            Some(format!("err: {}\n", e))
        }
    };

    ctx.mark_exited();
    ctx.finish_with_prompt(message);
}
