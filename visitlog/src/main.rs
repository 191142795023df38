//! visitlog - report page visits and manage the local visit buffer
//!
//! This tool provides commands for:
//! - Reporting one page visit described on the command line
//! - Checking configuration, the selected delivery strategy and buffer state
//! - Dumping or clearing the buffered visits of an origin
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/visitlog/visits.db (~/.local/share/visitlog/visits.db)
//! - Logs: $XDG_STATE_HOME/visitlog/visitlog.log (~/.local/state/visitlog/visitlog.log)
//! - Config: $XDG_CONFIG_HOME/visitlog/config.toml (~/.config/visitlog/config.toml)

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use visitlog_core::buffer::{VisitBuffer, MAX_BUFFERED_VISITS};
use visitlog_core::context::PageSnapshot;
use visitlog_core::delivery::DeliveryStrategy;
use visitlog_core::lifecycle::{report_on_load, PageLifecycle};
use visitlog_core::logging::LogTarget;
use visitlog_core::storage::{
    origin_scope_for, tab_scope, Database, KeyValueStore, MemoryStore, ScopedStore,
};
use visitlog_core::{Config, Dimensions, ReportOutcome, VisitReporter};

#[derive(Parser)]
#[command(name = "visitlog")]
#[command(about = "Report page visits and manage buffered visits")]
#[command(version)]
struct Args {
    /// Mirror logs to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report one page visit
    Report(ReportArgs),

    /// Show configuration, delivery strategy and buffer state
    Status {
        /// Page URL whose origin buffer to inspect
        #[arg(long)]
        origin: Option<String>,
    },

    /// Print the buffered visits of an origin as JSON
    Dump {
        /// Any URL of the origin
        #[arg(long)]
        origin: String,
    },

    /// Remove the buffered visits of an origin
    Clear {
        /// Any URL of the origin
        #[arg(long)]
        origin: String,
    },
}

#[derive(ClapArgs)]
struct ReportArgs {
    /// Full page URL
    #[arg(long)]
    url: String,

    #[arg(long)]
    title: Option<String>,

    /// Referring page (empty or absent: "direct")
    #[arg(long)]
    referrer: Option<String>,

    #[arg(long)]
    user_agent: Option<String>,

    #[arg(long)]
    language: Option<String>,

    /// Screen size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_dimensions)]
    screen: Option<Dimensions>,

    /// Viewport size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_dimensions)]
    viewport: Option<Dimensions>,

    /// Persist the session id under this tab name (default: new session per run)
    #[arg(long)]
    tab: Option<String>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

fn parse_dimensions(raw: &str) -> std::result::Result<Dimensions, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", raw))?;
    let width = w
        .trim()
        .parse()
        .map_err(|e| format!("invalid width {:?}: {}", w, e))?;
    let height = h
        .trim()
        .parse()
        .map_err(|e| format!("invalid height {:?}: {}", h, e))?;
    Ok(Dimensions::new(width, height))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let target = if args.verbose {
        LogTarget::FileAndStderr
    } else {
        LogTarget::File
    };
    let _log_guard = visitlog_core::logging::init(&config.logging, target)
        .context("failed to initialize logging")?;

    match args.command {
        Command::Report(report) => cmd_report(&config, report),
        Command::Status { origin } => cmd_status(&config, origin.as_deref()),
        Command::Dump { origin } => cmd_dump(&origin),
        Command::Clear { origin } => cmd_clear(&origin),
    }
}

fn open_database() -> Result<Arc<Database>> {
    let db_path = Config::database_path();
    tracing::debug!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;
    Ok(Arc::new(db))
}

fn origin_buffer(db: &Arc<Database>, origin_url: &str) -> Result<VisitBuffer> {
    let scope = origin_scope_for(origin_url)?;
    Ok(VisitBuffer::new(Arc::new(ScopedStore::new(db.clone(), scope))))
}

fn cmd_report(config: &Config, args: ReportArgs) -> Result<()> {
    let db = open_database()?;
    let origin_scope = origin_scope_for(&args.url)?;
    let origin: Arc<dyn KeyValueStore> = Arc::new(ScopedStore::new(db.clone(), origin_scope));
    let tab: Arc<dyn KeyValueStore> = match &args.tab {
        Some(name) => Arc::new(ScopedStore::new(db.clone(), tab_scope(name))),
        None => Arc::new(MemoryStore::new()),
    };

    let page = PageSnapshot {
        url: Some(args.url.clone()),
        title: args.title,
        referrer: args.referrer,
        user_agent: args.user_agent,
        language: args.language,
        screen: args.screen,
        viewport: args.viewport,
    };

    let reporter = VisitReporter::new(config.reporter.clone(), Arc::new(page), tab, origin)
        .context("failed to create reporter")?;

    tracing::info!(url = %args.url, strategy = %reporter.strategy(), "Reporting visit");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create runtime")?;

    let outcome = runtime.block_on(async {
        let lifecycle = PageLifecycle::loaded();
        report_on_load(reporter, lifecycle.subscribe()).await
    })??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}

fn print_outcome(outcome: &ReportOutcome) {
    match outcome {
        ReportOutcome::Delivered { target, status } => {
            println!("Delivered to {} (HTTP {})", target, status);
        }
        ReportOutcome::Buffered {
            fallback_from,
            len,
            batch_upload_requested,
        } => {
            if let Some(target) = fallback_from {
                println!("Delivery to {} failed; visit buffered locally", target);
            } else {
                println!("Visit buffered locally");
            }
            println!("Buffered visits: {}", len);
            if *batch_upload_requested {
                println!("Batch upload requested (not implemented; buffer kept)");
            }
        }
        ReportOutcome::Dropped {
            fallback_from,
            reason,
        } => {
            if let Some(target) = fallback_from {
                println!("Delivery to {} failed", target);
            }
            println!("Visit dropped: {}", reason);
        }
    }
}

fn cmd_status(config: &Config, origin: Option<&str>) -> Result<()> {
    println!("visitlog Configuration");
    println!("======================");
    println!();

    let reporter = &config.reporter;

    println!("Strategy:        {}", DeliveryStrategy::select(reporter));
    println!(
        "Logtail Token:   {}",
        if reporter.token().is_some() {
            "<set>"
        } else {
            "<not set>"
        }
    );
    println!(
        "Custom API URL:  {}",
        reporter.custom_url().unwrap_or("<not set>")
    );
    println!("Endpoint:        {}", reporter.logtail_endpoint);
    println!(
        "Timeout:         {}",
        reporter
            .timeout_secs
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "none".to_string())
    );
    if reporter.use_github_gist {
        println!("GitHub Gist:     requested (not implemented, ignored)");
    }
    println!("Config File:     {}", Config::config_path().display());
    println!("Database:        {}", Config::database_path().display());

    if let Err(e) = reporter.validate() {
        println!();
        println!("Config problem: {}", e);
    }

    let Some(origin) = origin else {
        return Ok(());
    };

    println!();
    let db_path = Config::database_path();
    if !db_path.exists() {
        println!("No visits buffered yet (database not found)");
        return Ok(());
    }

    let db = open_database()?;
    let buffer = origin_buffer(&db, origin)?;
    let records = buffer.records().context("failed to read buffered visits")?;

    println!("Origin:          {}", origin_scope_for(origin)?);
    println!("Buffered:        {} / {}", records.len(), MAX_BUFFERED_VISITS);
    println!(
        "Last Updated:    {}",
        buffer
            .last_updated()?
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    );

    Ok(())
}

fn cmd_dump(origin: &str) -> Result<()> {
    let db = open_database()?;
    let records = origin_buffer(&db, origin)?
        .records()
        .context("failed to read buffered visits")?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn cmd_clear(origin: &str) -> Result<()> {
    let db = open_database()?;
    let buffer = origin_buffer(&db, origin)?;

    // A corrupt buffer can still be cleared
    let count = buffer.len().unwrap_or(0);
    buffer.clear().context("failed to clear buffered visits")?;

    tracing::info!(origin, cleared = count, "Cleared buffered visits");
    println!("Cleared {} buffered visit(s)", count);
    Ok(())
}
