use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ctfsim::config::{self, get_settings, Simulator};
use ctfsim::core::context::DesktopContext;
use ctfsim::core::store::JsonFileStore;
use ctfsim::core::vfs::VirtualFs;
use ctfsim::ui::Term;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Desktop,
    Phone,
}

impl From<Mode> for Simulator {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Desktop => Simulator::Desktop,
            Mode::Phone => Simulator::Phone,
        }
    }
}

/// Terminal capture-the-flag simulators.
#[derive(Debug, Parser)]
#[command(name = "ctfsim", version, about)]
struct Cli {
    /// Which simulator to start; defaults to the one saved in settings.
    #[arg(value_enum)]
    simulator: Option<Mode>,

    /// Directory holding fs.json, settings.json and the log file.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Delete the persisted file system before starting.
    #[arg(long)]
    reset: bool,

    /// Color theme, saved for later runs.
    #[arg(long, value_name = "NAME")]
    theme: Option<String>,
}

// ── Terminal setup / teardown ─────────────────────────────────────────────────

fn init_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(ratatui::Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn init_logging() -> Result<()> {
    let path = config::data_dir().join(config::log_file_name());
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env("CTFSIM_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

// ── Main application ──────────────────────────────────────────────────────────

fn run(terminal: &mut Term, simulator: Simulator) -> Result<()> {
    match simulator {
        Simulator::Desktop => {
            let store = JsonFileStore::open(config::store_file()).context("opening file system store")?;
            let mut ctx = DesktopContext::new(VirtualFs::new(store)).context("initializing desktop")?;
            ctfsim::desktop::desktop_mode(terminal, &mut ctx)
        }
        Simulator::Phone => ctfsim::phone::phone_mode(terminal),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(dir) = cli.data_dir {
        config::set_data_dir(dir);
    }
    init_logging()?;
    config::reload_settings();

    if let Some(theme) = &cli.theme {
        if !config::is_known_theme(theme) {
            let names: Vec<&str> = config::THEMES.iter().map(|(n, _)| *n).collect();
            anyhow::bail!("unknown theme '{theme}', expected one of: {}", names.join(", "));
        }
        config::update_settings(|s| s.theme = theme.clone());
        config::persist_settings();
    }

    if cli.reset {
        let store = config::store_file();
        if store.exists() {
            std::fs::remove_file(&store)
                .with_context(|| format!("removing {}", store.display()))?;
            tracing::info!(path = %store.display(), "persisted file system reset");
        }
    }

    let simulator = cli
        .simulator
        .map(Simulator::from)
        .unwrap_or(get_settings().default_simulator);
    tracing::info!(?simulator, "starting");

    let mut terminal = init_terminal()?;

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        run(&mut terminal, simulator)
    }));

    // Always restore terminal
    restore_terminal(&mut terminal).ok();
    print!("{}", crossterm::terminal::Clear(crossterm::terminal::ClearType::All));

    finish(result, &config::data_dir().join(config::log_file_name()))
}

/// Map the simulator outcome to the process result. A caught panic becomes an
/// error so the exit status is non-zero.
fn finish(result: std::thread::Result<Result<()>>, log: &Path) -> Result<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "simulator exited with an error");
            Err(e)
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(%reason, "simulator panicked");
            anyhow::bail!("ctfsim crashed ({reason}), see {}", log.display())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_exit_is_ok() {
        assert!(finish(Ok(Ok(())), Path::new("ctfsim.log")).is_ok());
    }

    #[test]
    fn panic_turns_into_error_naming_the_log() {
        let caught = std::panic::catch_unwind(|| -> Result<()> { panic!("boom") });
        let err = finish(caught, Path::new("/tmp/ctfsim.log")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("boom"));
        assert!(msg.contains("/tmp/ctfsim.log"));
    }

    #[test]
    fn run_error_is_passed_through() {
        let err = finish(Ok(Err(anyhow::anyhow!("store missing"))), Path::new("x.log")).unwrap_err();
        assert_eq!(err.to_string(), "store missing");
    }
}
