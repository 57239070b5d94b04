//! Northern dashboard poller
//!
//! Headless front end for the Northern operational dashboard: loads tabs from
//! the Northern API, keeps visited tabs fresh in the background, and prints a
//! one-line summary per tab.
//!
//! ## Usage
//!
//! ```bash
//! # Poll the active tab (and every tab you switch to) until Ctrl-C
//! northern-dash --api-base http://localhost:8080/api watch
//!
//! # Load two tabs once and exit
//! northern-dash once --tab activity --tab tasks
//!
//! # Show or clear the persisted active tab and session id
//! northern-dash prefs --clear
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use northern_client::{ClientError, HttpBackend, source_names};
use northern_core::{DashboardConfig, LogGuard, NorthernError, TabKey, TabState, init_logging};
use northern_dashboard::{
    Dashboard, FilePrefsStore, LoadOptions, MemoryPrefsStore, PollScheduler, PrefsStore,
    clear_prefs, load_prefs,
};

/// Northern operational dashboard poller
#[derive(Parser, Debug)]
#[command(name = "northern-dash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.northern/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.northern/dashboard.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Keep prefs in memory only
    #[arg(long)]
    no_persist: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the active tab and keep visited tabs fresh until Ctrl-C
    Watch {
        /// Switch to this tab first
        #[arg(long)]
        tab: Option<TabKey>,

        /// Poll interval (e.g. "15s", "1m")
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },

    /// Load tabs once and print their state
    Once {
        /// Tabs to load (defaults to the active tab)
        #[arg(long = "tab")]
        tabs: Vec<TabKey>,

        /// Print the full dashboard snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tabs and their sources
    Tabs,

    /// Print or clear persisted prefs
    Prefs {
        /// Remove the stored active tab and session id
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("northern-dash error: {:#}", e);
            eprintln!("Error: {:#}", e);
            let core = e.downcast_ref::<NorthernError>();
            if let Some(hint) = core.and_then(|e| e.guidance()) {
                eprintln!("Hint: {}", hint);
            } else if let Some(client) = e.downcast_ref::<ClientError>() {
                eprintln!("Hint: {}", client.friendly_message());
            }
            // EX_CONFIG from sysexits.h
            if core.is_some_and(|e| e.is_config_error()) {
                ExitCode::from(78)
            } else {
                ExitCode::from(1)
            }
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> northern_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

fn load_config(cli: &Cli) -> anyhow::Result<DashboardConfig> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load_from(path)?,
        None => DashboardConfig::load()?,
    };
    if let Some(base) = &cli.api_base {
        config = config.with_api_base(base.clone());
        config.validate()?;
    }
    Ok(config)
}

fn prefs_store(cli: &Cli, config: &DashboardConfig) -> anyhow::Result<Arc<dyn PrefsStore>> {
    if cli.no_persist {
        return Ok(Arc::new(MemoryPrefsStore::new()));
    }
    let path = config.prefs_path()?;
    Ok(Arc::new(FilePrefsStore::new(path)))
}

fn build_dashboard(config: DashboardConfig, prefs: Arc<dyn PrefsStore>) -> anyhow::Result<Dashboard> {
    if !config.is_active() {
        bail!("dashboard is disabled or has no api_base; set one in the config file or pass --api-base");
    }
    let backend = HttpBackend::from_config(&config).context("failed to create API client")?;
    Ok(Dashboard::new(config, Arc::new(backend), prefs))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(&cli)?;

    match &cli.command {
        Command::Tabs => {
            print_tabs();
            Ok(ExitCode::SUCCESS)
        }
        Command::Prefs { clear } => {
            let prefs = prefs_store(&cli, &config)?;
            if *clear {
                clear_prefs(prefs.as_ref());
                info!("cleared dashboard prefs");
            }
            let stored = load_prefs(prefs.as_ref());
            println!(
                "active tab: {}",
                stored.active_tab.map_or("(none)", |tab| tab.as_str())
            );
            println!(
                "session id: {}",
                stored.session_id.as_deref().unwrap_or("(none)")
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Once { tabs, json } => {
            let prefs = prefs_store(&cli, &config)?;
            let dashboard = build_dashboard(config, prefs)?;
            run_once(&dashboard, tabs, *json).await
        }
        Command::Watch { tab, interval } => {
            let mut config = config;
            if let Some(interval) = interval {
                config = config.with_poll_interval(*interval);
                config.validate()?;
            }
            let prefs = prefs_store(&cli, &config)?;
            let dashboard = build_dashboard(config, prefs)?;
            run_watch(&dashboard, *tab).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_tabs() {
    for tab in TabKey::ALL {
        let scope = if tab.requires_session() { " (session)" } else { "" };
        println!("{}{}", tab, scope);
        for name in source_names(tab) {
            println!("  {}", name);
        }
    }
}

async fn run_once(dashboard: &Dashboard, tabs: &[TabKey], json: bool) -> anyhow::Result<ExitCode> {
    let targets = if tabs.is_empty() {
        vec![dashboard.active_tab()]
    } else {
        tabs.to_vec()
    };

    let max_age = stale_after(dashboard);
    let mut failed_entirely = 0;
    for tab in &targets {
        let state = dashboard.load_tab(*tab, LoadOptions::forced()).await;
        match &state {
            Some(state) if state.last_updated_at.is_some() => {}
            _ => failed_entirely += 1,
        }
        if !json {
            print_summary(*tab, &state.unwrap_or_default(), max_age);
        }
    }

    if json {
        let snapshot = dashboard.snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    dashboard.shutdown();

    if failed_entirely == targets.len() {
        error!(tabs = targets.len(), "every tab load failed");
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_watch(dashboard: &Dashboard, tab: Option<TabKey>) -> anyhow::Result<()> {
    let first = match tab {
        Some(tab) => dashboard.set_active_tab(tab).await,
        None => {
            let tab = dashboard.active_tab();
            dashboard.load_tab(tab, LoadOptions::forced()).await
        }
    };
    let max_age = stale_after(dashboard);
    print_summary(dashboard.active_tab(), &first.unwrap_or_default(), max_age);

    let period = dashboard.config().poll_interval;
    let poller = PollScheduler::new(dashboard.clone()).start();
    info!(
        interval = %humantime::format_duration(period),
        "watching dashboard, press Ctrl-C to stop"
    );

    // Summaries trail each poll round by half an interval.
    let mut report = tokio::time::interval_at(
        tokio::time::Instant::now() + period + period / 2,
        period,
    );

    loop {
        tokio::select! {
            _ = report.tick() => {
                for tab in dashboard.visited() {
                    print_summary(tab, &dashboard.tab_state(tab), max_age);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    poller.stop();
    dashboard.shutdown();
    info!("stopped watching");
    Ok(())
}

/// A tab that missed two poll rounds is reported as stale.
fn stale_after(dashboard: &Dashboard) -> Duration {
    dashboard.config().poll_interval * 2
}

fn print_summary(tab: TabKey, state: &TabState, max_age: Duration) {
    println!("{}", summary_line(tab, state, max_age));
}

fn summary_line(tab: TabKey, state: &TabState, max_age: Duration) -> String {
    let names = source_names(tab);
    let present = names.iter().filter(|name| state.source(name).is_some()).count();
    let updated = match state.last_updated_at {
        Some(at) if state.is_stale(max_age) => {
            format!("{} (stale)", at.with_timezone(&Local).format("%H:%M:%S"))
        }
        Some(at) => at.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "never".to_string(),
    };

    format!(
        "{:<9} {}/{} sources  updated {}  {}",
        tab,
        present,
        names.len(),
        updated,
        state.error.as_deref().unwrap_or("ok")
    )
}
