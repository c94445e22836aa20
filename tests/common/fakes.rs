// In-memory stand-ins for the process launcher and the filesystem

use async_trait::async_trait;
use nerved::error::{ExitOutcome, Result, ShellError};
use nerved::model::filesystem::{DirEntry, FileSystem, StdFileSystem};
use nerved::services::terminal::{LaunchRequest, LaunchedProcess, ProcessHandle, ProcessLauncher};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

pub struct FakeHandle {
    exit: tokio::sync::Mutex<Option<oneshot::Receiver<ExitOutcome>>>,
    pub interrupts: AtomicUsize,
}

impl FakeHandle {
    pub fn interrupt_count(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessHandle for FakeHandle {
    fn id(&self) -> Option<u32> {
        None
    }

    fn interrupt(&self) -> io::Result<()> {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wait(&self) -> io::Result<ExitOutcome> {
        let rx = self.exit.lock().await.take();
        match rx {
            Some(rx) => Ok(rx.await.unwrap_or(ExitOutcome::Unknown)),
            None => Ok(ExitOutcome::Unknown),
        }
    }
}

/// Test-side ends of one fake process.
pub struct FakeProcess {
    pub request: LaunchRequest,
    pub handle: Arc<FakeHandle>,
    stdout: Option<DuplexStream>,
    stderr: Option<DuplexStream>,
    exit: Option<oneshot::Sender<ExitOutcome>>,
}

impl FakeProcess {
    pub fn write_stdout(&mut self, rt: &Runtime, bytes: &[u8]) {
        if let Some(stdout) = self.stdout.as_mut() {
            rt.block_on(stdout.write_all(bytes)).unwrap();
        }
    }

    pub fn write_stderr(&mut self, rt: &Runtime, bytes: &[u8]) {
        if let Some(stderr) = self.stderr.as_mut() {
            rt.block_on(stderr.write_all(bytes)).unwrap();
        }
    }

    /// Close both streams and report `outcome` from `wait`.
    pub fn exit(&mut self, outcome: ExitOutcome) {
        self.stdout.take();
        self.stderr.take();
        if let Some(exit) = self.exit.take() {
            let _ = exit.send(outcome);
        }
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    spawned: Mutex<Vec<FakeProcess>>,
    launches: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeLauncher {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// The oldest process not yet taken.
    pub fn take(&self) -> FakeProcess {
        let mut spawned = self.spawned.lock().unwrap();
        assert!(!spawned.is_empty(), "no process was launched");
        spawned.remove(0)
    }
}

impl ProcessLauncher for FakeLauncher {
    fn spawn(&self, request: &LaunchRequest) -> Result<LaunchedProcess> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ShellError::launch(
                &request.shell,
                io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            ));
        }

        let (out_tx, out_rx) = tokio::io::duplex(64 * 1024);
        let (err_tx, err_rx) = tokio::io::duplex(64 * 1024);
        let (exit_tx, exit_rx) = oneshot::channel();
        let handle = Arc::new(FakeHandle {
            exit: tokio::sync::Mutex::new(Some(exit_rx)),
            interrupts: AtomicUsize::new(0),
        });

        self.spawned.lock().unwrap().push(FakeProcess {
            request: request.clone(),
            handle: handle.clone(),
            stdout: Some(out_tx),
            stderr: Some(err_tx),
            exit: Some(exit_tx),
        });

        Ok(LaunchedProcess {
            handle,
            stdout: Box::new(out_rx),
            stderr: Box::new(err_rx),
        })
    }
}

/// Real filesystem whose writes can be made to fail and are counted.
#[derive(Default)]
pub struct FlakyFs {
    pub fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyFs {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl FileSystem for FlakyFs {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        StdFileSystem.read_file(path)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Permission denied",
            ));
        }
        StdFileSystem.write_file(path, data)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        StdFileSystem.read_dir(path)
    }
}
