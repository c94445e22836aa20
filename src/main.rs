use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use nerved::app::ShellApp;
use nerved::config::Config;
use nerved::environment::Environment;
use nerved::model::filesystem::StdFileSystem;
use nerved::services::terminal::ShellLauncher;
use nerved::services::time_source::RealTimeSource;
use nerved::services::{log_dirs, tracing_setup};
use nerved::view::{parse_input, InputEvent, StdioSurface};
use std::io::{self, BufRead, Stdout};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const RENDER_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "nerved")]
#[command(about = "File browser, self-saving text buffer and embedded shell transcript", long_about = None)]
#[command(version)]
struct Args {
    /// File to open in the editor buffer, relative to the start directory
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Start directory (defaults to the working directory)
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log file (defaults to the per-process file in the state directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn load_config(args: &Args) -> AnyhowResult<Config> {
    match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn init_logging(args: &Args) {
    let log_path = args.log_file.clone().unwrap_or_else(log_dirs::log_file_path);
    if let Err(e) = tracing_setup::init_global(&log_path) {
        eprintln!("Warning: could not open log file {}: {}", log_path.display(), e);
        return;
    }
    log_dirs::cleanup_stale_logs();
}

type SharedSurface = Arc<Mutex<StdioSurface<Stdout>>>;

/// Print transcript output as it arrives until `stop` is set.
fn spawn_renderer(
    app: Arc<ShellApp>,
    surface: SharedSurface,
    stop: Arc<AtomicBool>,
) -> io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("nerved-render".to_string())
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                {
                    let mut surface = surface.lock().unwrap_or_else(PoisonError::into_inner);
                    app.render(&mut *surface);
                }
                std::thread::sleep(RENDER_INTERVAL);
            }
        })
}

fn handle_event(app: &ShellApp, surface: &SharedSurface, event: InputEvent) -> io::Result<bool> {
    let mut surface = surface.lock().unwrap_or_else(PoisonError::into_inner);
    match event {
        InputEvent::Keys(text) => {
            let range = app.type_text(&text);
            surface.input_echoed(range);
        }
        InputEvent::ShowListing => surface.write_listing(&app.view())?,
        InputEvent::ShowEditor => surface.write_editor(&app.view())?,
        InputEvent::Activate(index) => {
            // Failures are reported in the transcript.
            let _ = app.activate(index);
        }
        InputEvent::ReplaceEditor(text) => app.edit_editor(|editor| {
            editor.replace_all(text);
            editor.move_caret_to_end();
        }),
        InputEvent::Quit => return Ok(false),
    }
    Ok(true)
}

fn run_stdio(app: &Arc<ShellApp>) -> AnyhowResult<()> {
    let surface: SharedSurface = Arc::new(Mutex::new(StdioSurface::new(io::stdout())));
    let stop = Arc::new(AtomicBool::new(false));
    let renderer = spawn_renderer(app.clone(), surface.clone(), stop.clone())
        .context("Failed to start render thread")?;

    let stdin = io::stdin();
    let mut line = String::new();
    let result = loop {
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => break Err(anyhow::Error::new(e).context("Failed to read input")),
        }
        match handle_event(app, &surface, parse_input(&line)) {
            Ok(true) => {}
            Ok(false) => break Ok(()),
            Err(e) => break Err(anyhow::Error::new(e).context("Failed to write output")),
        }
    };

    stop.store(true, Ordering::SeqCst);
    if renderer.join().is_err() {
        tracing::error!("Render thread panicked");
    }
    let mut surface = surface.lock().unwrap_or_else(PoisonError::into_inner);
    app.render(&mut *surface);
    result
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.dump_config {
        println!("{}", config.to_json_pretty().context("Failed to serialize config")?);
        return Ok(());
    }

    init_logging(&args);

    let env = Environment::from_env();
    let start_dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read the working directory")?,
    };
    let initial_dir = env
        .initial_dir(&start_dir)
        .with_context(|| format!("Failed to resolve start directory {}", start_dir.display()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("nerved-io")
        .build()
        .context("Failed to start the async runtime")?;

    let app = Arc::new(
        ShellApp::new(
            config,
            env,
            initial_dir,
            Arc::new(StdFileSystem),
            Arc::new(ShellLauncher),
            runtime.handle().clone(),
        )
        .context("Failed to initialize workspace")?,
    );

    if let Some(file) = &args.file {
        // Reported in the transcript on failure.
        let _ = app.open_file(file);
    }

    app.start_sync_loop(RealTimeSource::shared())
        .context("Failed to start the sync loop")?;

    let result = run_stdio(&app);

    app.shutdown();
    // One last pass so edits from the final moments reach the disk.
    app.reconcile_tick();
    runtime.shutdown_timeout(Duration::from_millis(500));

    if let Err(e) = &result {
        tracing::error!("Exiting with error: {:#}", e);
    }
    result
}
