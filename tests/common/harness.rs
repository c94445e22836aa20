// Test harness: a ShellApp rooted in a temp directory with fake collaborators

use super::fakes::{FakeLauncher, FlakyFs};
use nerved::app::ShellApp;
use nerved::config::Config;
use nerved::environment::Environment;
use nerved::model::filesystem::FileSystem;
use nerved::services::terminal::ProcessLauncher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::runtime::Runtime;

pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

/// Poll `cond` for up to five seconds.
pub fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {}", what);
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.terminal.shell = Some("sh".to_string());
    config.terminal.login_flag = String::new();
    config.terminal.source_rc = false;
    config
}

pub struct TestWorkspace {
    pub app: Arc<ShellApp>,
    pub launcher: Arc<FakeLauncher>,
    pub fs: Arc<FlakyFs>,
    pub runtime: Runtime,
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Workspace over a temp dir containing `files` (name, content).
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self::build(files, test_config(), None)
    }

    /// Same, but launching real processes.
    pub fn with_launcher(
        files: &[(&str, &str)],
        config: Config,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self::build(files, config, Some(launcher))
    }

    fn build(
        files: &[(&str, &str)],
        config: Config,
        launcher: Option<Arc<dyn ProcessLauncher>>,
    ) -> Self {
        super::tracing::init_tracing_from_env();

        let temp_dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = temp_dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }

        let runtime = runtime();
        let fake = Arc::new(FakeLauncher::default());
        let launcher = launcher.unwrap_or_else(|| fake.clone() as Arc<dyn ProcessLauncher>);
        let fs = Arc::new(FlakyFs::default());
        let env = Environment::from_vars(
            Some(temp_dir.path().to_string_lossy().into_owned()),
            Some("sh".to_string()),
        );

        let app = ShellApp::new(
            config,
            env,
            temp_dir.path().to_path_buf(),
            fs.clone() as Arc<dyn FileSystem>,
            launcher,
            runtime.handle().clone(),
        )
        .unwrap();

        Self {
            app: Arc::new(app),
            launcher: fake,
            fs,
            runtime,
            temp_dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap()
    }

    pub fn write(&self, name: &str, content: &str) {
        std::fs::write(self.path(name), content).unwrap();
    }

    /// Index of `name` in the current listing.
    pub fn index_of(&self, name: &str) -> usize {
        self.app
            .listing()
            .names()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("{} not in listing", name))
    }

    pub fn wait_for_transcript(&self, needle: &str) {
        let app = self.app.clone();
        wait_until(&format!("transcript containing {:?}", needle), move || {
            app.transcript_text().contains(needle)
        });
    }
}

impl Drop for TestWorkspace {
    fn drop(&mut self) {
        self.app.shutdown();
    }
}
