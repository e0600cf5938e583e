use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use madboard::config::{Overrides, Settings};
use madboard::{events, report, ui, ApiClient, App, RunBackend};

#[derive(Parser, Debug)]
#[command(name = "madboard")]
#[command(about = "Terminal dashboard for monitoring simulation runs")]
struct Args {
    /// Base URL of the run service
    #[arg(short, long)]
    url: Option<String>,

    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Refresh interval for unfinished runs (e.g., "10s", "500ms")
    #[arg(short, long)]
    refresh: Option<String>,

    /// Process to open on start (required with --export and --download)
    #[arg(short, long)]
    process: Option<String>,

    /// Export the process's runs to a JSON file and exit
    #[arg(short, long, requires = "process", conflicts_with = "download")]
    export: Option<PathBuf>,

    /// Download a run file given as RUN/FILE and exit
    #[arg(short, long, requires = "process", value_name = "RUN/FILE")]
    download: Option<String>,

    /// Where to write the downloaded file (defaults to its file name)
    #[arg(short, long, requires = "download")]
    output: Option<PathBuf>,

    /// Write logs to this file while the TUI is running
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let interactive = args.export.is_none() && args.download.is_none();
    init_logging(interactive, args.log_file.as_deref())?;

    let overrides = Overrides {
        api_url: args.url.clone(),
        refresh: args.refresh.clone(),
    };
    let settings = Settings::load(args.config.as_deref(), &overrides)?;

    let client = ApiClient::builder()
        .endpoint(settings.api_url.clone())
        .timeout(settings.request_timeout)
        .build()
        .with_context(|| format!("Invalid API URL: {}", settings.api_url))?;
    info!(endpoint = %client.endpoint(), refresh = ?settings.refresh, "Starting");

    let rt = Runtime::new()?;

    // Handle export mode (non-interactive)
    if let (Some(export_path), Some(process)) = (&args.export, &args.process) {
        return rt.block_on(export_to_file(&client, process, export_path));
    }

    // Handle download mode (non-interactive)
    if let (Some(target), Some(process)) = (&args.download, &args.process) {
        return rt.block_on(download_to_file(&client, process, target, args.output.as_deref()));
    }

    // The runtime keeps running the background fetches while the TUI owns
    // the main thread
    run_tui(&rt, Arc::new(client), &settings, args.process)
}

/// Install the tracing subscriber for the current mode.
fn init_logging(interactive: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (interactive, log_file) {
        (_, Some(path)) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow!(e))
        }
        // Anything written to the terminal would corrupt the TUI
        (true, None) => builder.with_writer(io::sink).try_init().map_err(|e| anyhow!(e)),
        (false, None) => builder.with_writer(io::stderr).try_init().map_err(|e| anyhow!(e)),
    }
}

/// Run the TUI against the given backend
fn run_tui(
    rt: &Runtime,
    backend: Arc<dyn RunBackend>,
    settings: &Settings,
    process: Option<String>,
) -> Result<()> {
    // Query the background before raw mode takes over the terminal
    let theme = ui::Theme::auto_detect();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let terminal_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(terminal_backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    // Create app and load initial data
    let mut app = App::with_backend(backend, rt.handle().clone(), settings.refresh, theme);
    app.catalog.load();
    if let Some(process) = process {
        app.select_process(process);
    }

    // Run the main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        // Pick up whatever the background fetches delivered
        app.update();

        // Draw UI
        terminal.draw(|frame| {
            let area = frame.area();

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(
                    0,
                    (area.height / 2).saturating_sub(2),
                    area.width,
                    5.min(area.height),
                );
                frame.render_widget(paragraph, centered);
                return;
            }

            ui::render(frame, app, area);
        })?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => {
                    // Content starts after header (1) + tabs (1) + block border (1)
                    events::handle_mouse_event(app, mouse, 3);
                }
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Fetch all runs of a process once and write the JSON report
async fn export_to_file(client: &ApiClient, process: &str, export_path: &Path) -> Result<()> {
    let runs = client
        .list_runs(process)
        .await
        .with_context(|| format!("Failed to fetch runs of {}", process))?;

    let report = report::process_report(process, &runs);
    report::write_report(&report, export_path)?;

    println!("Exported {} runs of {} to: {}", runs.len(), process, export_path.display());
    Ok(())
}

/// Download one run file, given as `RUN/FILE`
async fn download_to_file(
    client: &ApiClient,
    process: &str,
    target: &str,
    output: Option<&Path>,
) -> Result<()> {
    let (run, file) = target
        .split_once('/')
        .filter(|(run, file)| !run.is_empty() && !file.is_empty())
        .ok_or_else(|| anyhow!("Expected RUN/FILE, got {}", target))?;

    let bytes = client
        .download_file(process, run, file)
        .await
        .with_context(|| format!("Failed to download {} of {}/{}", file, process, run))?;

    let path = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(file));
    std::fs::write(&path, &bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Downloaded {} bytes to: {}", bytes.len(), path.display());
    Ok(())
}
