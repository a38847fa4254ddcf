//! PageLock - command line host
//!
//! Restores a browser session from a layout, then runs one command against
//! it. The lock record lives in the data directory, so it survives between
//! invocations:
//!   pagelock lock --window 2
//!   pagelock status
//!   pagelock probe --event keydown
//!   pagelock unlock
//!   pagelock config --save

use anyhow::Context;
use clap::{Parser, Subcommand};
use pagelock_app::{Session, SessionLayout};
use pagelock_core::config::TOGGLE_COMMAND;
use pagelock_core::{
    init_logging, LogConfig, LogFormat, PageLockConfig, Sender, TabId, WindowId,
};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "pagelock")]
#[command(about = "Lock every tab of a browser window against user input")]
struct Args {
    /// Data directory holding config.json and the storage file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Session layout file (JSON) describing windows and tabs
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Log at debug level, with source locations
    #[arg(short, long)]
    verbose: bool,

    /// Log output format: pretty, compact or json
    #[arg(long, default_value = "compact")]
    log_format: LogFormat,

    /// Tracing filter directives, e.g. "pagelock_agent=debug"
    #[arg(long)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the lock record and the state of every tab
    Status,
    /// Lock a window (the last-focused one by default)
    Lock {
        #[arg(long)]
        window: Option<i64>,
    },
    /// Unlock whatever is locked
    Unlock,
    /// Press the toggle-lock shortcut
    Toggle {
        /// Focus this window first
        #[arg(long)]
        window: Option<i64>,
    },
    /// Open the control panel
    Panel {
        /// Focus this window first
        #[arg(long)]
        window: Option<i64>,
        /// Flip the switch once loaded
        #[arg(long)]
        flip: bool,
    },
    /// Send a raw JSON message to the coordinator and print the reply
    Send {
        message: String,
        /// Send on behalf of this tab
        #[arg(long)]
        tab: Option<i64>,
    },
    /// Produce one input event in every loaded tab and report what got through
    Probe {
        #[arg(long, default_value = "click")]
        event: String,
    },
    /// Print the effective configuration
    Config {
        /// Write it to config.json in the data directory
        #[arg(long)]
        save: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| PageLockConfig::default().data_dir);
    let mut config = PageLockConfig::load(&PageLockConfig::config_path(&data_dir));
    config.data_dir = data_dir;

    init_logging(log_config(&args, &config));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(args, config))
}

fn log_config(args: &Args, config: &PageLockConfig) -> LogConfig {
    let mut log = if args.verbose {
        LogConfig::debug()
    } else {
        LogConfig {
            level: config.log_level.parse().unwrap_or(Level::INFO),
            ..LogConfig::default()
        }
    };
    log.format = args.log_format;
    match &args.log_filter {
        Some(filter) => log.with_filter(filter.clone()),
        None => log,
    }
}

async fn run(args: Args, config: PageLockConfig) -> anyhow::Result<()> {
    let layout = match &args.layout {
        Some(path) => SessionLayout::load(path)?,
        None => SessionLayout::default(),
    };

    let session = Session::open(config)
        .await
        .context("Failed to open session")?;
    session.restore(&layout).await?;

    match args.command {
        Command::Status => {}
        Command::Lock { window } => {
            session.set_locked(true, window.map(WindowId)).await?;
        }
        Command::Unlock => {
            session.set_locked(false, None).await?;
        }
        Command::Toggle { window } => {
            focus(&session, window)?;
            session.shortcut(TOGGLE_COMMAND).await?;
        }
        Command::Panel { window, flip } => {
            focus(&session, window)?;
            let panel = session.open_panel().await;
            if flip {
                let next = !panel.view().checked;
                panel.toggle(next).await?;
                tokio::task::yield_now().await;
            }
            println!("{}", panel.view());
            panel.unmount();
            return Ok(());
        }
        Command::Send { message, tab } => {
            let message: serde_json::Value =
                serde_json::from_str(&message).context("Message is not valid JSON")?;
            let sender = match tab {
                Some(id) => Sender::tab(
                    session
                        .browser()
                        .tab(TabId(id))
                        .with_context(|| format!("No tab {}", id))?,
                ),
                None => Sender::extension(),
            };
            match session.send_raw(&message, sender).await? {
                Some(reply) => println!("{}", serde_json::to_string_pretty(&reply)?),
                None => println!("(unhandled)"),
            }
            return Ok(());
        }
        Command::Probe { event } => {
            for window_id in session.browser().windows() {
                for tab in session.browser().tabs_of(window_id) {
                    let label = tab.url.as_ref().map(|u| u.as_str()).unwrap_or("-");
                    match session.browser().send_input(tab.id, &event) {
                        Ok(outcome) if outcome.reached_page => {
                            println!("window {} tab {} {}: reached page", window_id, tab.id, label)
                        }
                        Ok(_) => println!("window {} tab {} {}: blocked", window_id, tab.id, label),
                        Err(e) => println!("window {} tab {} {}: {}", window_id, tab.id, label, e),
                    }
                }
            }
            return Ok(());
        }
        Command::Config { save } => return show_config(session.config(), save),
    }

    print_status(&session).await
}

fn show_config(config: &PageLockConfig, save: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if save {
        let path = PageLockConfig::config_path(&config.data_dir);
        config
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Saved {}", path.display());
    }
    Ok(())
}

fn focus(session: &Session, window: Option<i64>) -> anyhow::Result<()> {
    if let Some(id) = window {
        session.browser().focus(WindowId(id))?;
    }
    Ok(())
}

async fn print_status(session: &Session) -> anyhow::Result<()> {
    let report = session.state(None).await?;
    println!("{}", serde_json::to_string(&report.state)?);

    let browser = session.browser();
    for window_id in browser.windows() {
        let focused = if browser.focused_window() == Some(window_id) {
            " (focused)"
        } else {
            ""
        };
        let locked = report.state.locks_window(window_id);
        println!(
            "window {}{}: {}",
            window_id,
            focused,
            if locked { "locked" } else { "unlocked" }
        );
        for tab in browser.tabs_of(window_id) {
            let badge = browser.badge(tab.id).unwrap_or_default();
            println!(
                "  tab {} {} badge={:?} blocked={}",
                tab.id,
                tab.url.as_ref().map(|u| u.as_str()).unwrap_or("-"),
                badge.text,
                browser.is_blocked(tab.id)
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_log_config_from_flags() {
        let config = PageLockConfig::default();

        let log = log_config(&parse(&["pagelock", "status"]), &config);
        assert_eq!(log.level, Level::INFO);
        assert_eq!(log.format, LogFormat::Compact);
        assert_eq!(log.filter, None);

        let args = parse(&[
            "pagelock",
            "-v",
            "--log-format",
            "json",
            "--log-filter",
            "pagelock_agent=trace",
            "status",
        ]);
        let log = log_config(&args, &config);
        assert_eq!(log.level, Level::DEBUG);
        assert!(log.include_location);
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.filter.as_deref(), Some("pagelock_agent=trace"));
    }

    #[test]
    fn test_log_level_from_config() {
        let config = PageLockConfig {
            log_level: "warn".to_string(),
            ..Default::default()
        };
        let log = log_config(&parse(&["pagelock", "status"]), &config);
        assert_eq!(log.level, Level::WARN);
    }

    #[test]
    fn test_config_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = PageLockConfig::with_data_dir(dir.path());
        show_config(&config, true).unwrap();

        let path = PageLockConfig::config_path(dir.path());
        assert_eq!(PageLockConfig::load(&path).data_dir, dir.path());
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        assert!(Args::try_parse_from(["pagelock", "--log-format", "xml", "status"]).is_err());
    }
}
