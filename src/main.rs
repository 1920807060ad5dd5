use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use speedread::{
    app::App,
    app_dirs::AppDirs,
    clipboard::{ClipboardSource, StaticText, SystemClipboard},
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    settings::FileSettingsStore,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 100;

/// read the clipboard one word at a time
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Shows the text on the clipboard one word at a time at an adjustable speed, highlighting the current word in the full text."
)]
pub struct Cli {
    /// words per second for this run (the saved speed is left untouched)
    #[clap(short = 's', long, value_parser = parse_speed)]
    speed: Option<f64>,

    /// settings file to use instead of the per-user config file
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// read this text instead of the clipboard
    #[clap(short = 't', long)]
    text: Option<String>,

    /// where to write the log
    #[clap(long)]
    log_file: Option<PathBuf>,
}

fn parse_speed(s: &str) -> Result<f64, String> {
    let speed: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(format!("speed must be positive, got {speed}"))
    }
}

impl Cli {
    fn settings_store(&self) -> FileSettingsStore {
        match &self.config {
            Some(path) => FileSettingsStore::with_path(path),
            None => FileSettingsStore::new(),
        }
    }

    fn clipboard(&self) -> Box<dyn ClipboardSource> {
        match &self.text {
            Some(text) => Box::new(StaticText::new(text.clone())),
            None => Box::new(SystemClipboard::new()),
        }
    }
}

fn init_logging(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_env("SPEEDREAD_LOG")
        .unwrap_or_else(|_| EnvFilter::new("speedread=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let log_path = cli.log_file.clone().unwrap_or_else(AppDirs::log_path);
    if let Err(e) = init_logging(&log_path) {
        eprintln!("logging disabled, cannot open {}: {e}", log_path.display());
    }
    info!("speedread v{} starting", env!("CARGO_PKG_VERSION"));

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut app = App::new(
        Box::new(cli.settings_store()),
        cli.clipboard(),
        runner.sender(),
    );
    if let Some(speed) = cli.speed {
        app.override_speed(speed)?;
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &runner, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("speedread exiting");
    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    runner: &Runner<CrosstermEventSource, FixedTicker>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(app, f))?;
        if !app.handle_event(runner.step()) {
            break;
        }
    }
    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use speedread::runtime::{AppEventSource, TestEventSource};

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["speedread"]);

        assert_eq!(cli.speed, None);
        assert_eq!(cli.config, None);
        assert_eq!(cli.text, None);
        assert_eq!(cli.log_file, None);
    }

    #[test]
    fn test_cli_speed() {
        let cli = Cli::parse_from(["speedread", "-s", "6.5"]);
        assert_eq!(cli.speed, Some(6.5));

        let cli = Cli::parse_from(["speedread", "--speed", "12"]);
        assert_eq!(cli.speed, Some(12.0));
    }

    #[test]
    fn test_cli_rejects_non_positive_speed() {
        assert!(Cli::try_parse_from(["speedread", "--speed", "0"]).is_err());
        assert!(Cli::try_parse_from(["speedread", "--speed", "-3"]).is_err());
        assert!(Cli::try_parse_from(["speedread", "--speed", "fast"]).is_err());
    }

    #[test]
    fn test_cli_text_and_config() {
        let cli = Cli::parse_from(["speedread", "-t", "hello world", "-c", "/tmp/sr.json"]);
        assert_eq!(cli.text.as_deref(), Some("hello world"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sr.json")));
        assert_eq!(cli.clipboard().paste(), "hello world");
    }

    #[test]
    fn test_ui_function_renders() {
        use ratatui::{backend::TestBackend, Terminal};

        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "speedread".to_string(),
            "--text".to_string(),
            "test words".to_string(),
            "--config".to_string(),
            dir.path().join("config.json").display().to_string(),
        ]);
        let source = TestEventSource::new();
        let mut app = App::new(Box::new(cli.settings_store()), cli.clipboard(), source.sender());
        app.start_reveal();

        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(&app, f)).unwrap();

        let buffer = terminal.backend().buffer();
        let content: String = buffer.content.iter().map(|c| c.symbol()).collect();
        assert!(content.contains("test words"));
    }
}
