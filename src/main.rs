//! fdex CLI: background filesystem indexer and interactive search front-end.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fdex::attributes::platform_probe;
use fdex::blacklist::Blacklist;
use fdex::config::Config;
use fdex::scanner::Scanner;
use fdex::scheduler::Scheduler;
use fdex::shutdown::ShutdownCoordinator;
use fdex::store::IndexStore;
use fdex::{search, snapshot};

/// Background filesystem indexer and interactive search engine.
#[derive(Parser)]
#[command(name = "fdex")]
#[command(about = "Index directories in the background and search them instantly.")]
struct Cli {
    /// Roots to index. Defaults to `/` when none are given (non-Windows only).
    #[arg(value_name = "ROOT")]
    roots: Vec<PathBuf>,

    /// Override the on-disk snapshot location.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Verbose logging.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load the snapshot, run a single search, print results, and exit.
    Query {
        query: String,
        /// Skip the Scanner pass; search the loaded snapshot as-is.
        #[arg(long)]
        no_scan: bool,
        #[arg(long, default_value = "1000")]
        deadline_ms: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    fdex::logging::setup_logging(cli.verbose);

    let mut config = Config::load(&std::env::current_dir()?);
    if let Some(path) = &cli.snapshot {
        config.snapshot_path = path.clone();
    }

    let roots: Vec<PathBuf> = if cli.roots.is_empty() {
        default_roots(&config)?
    } else {
        cli.roots
    };

    match cli.command {
        Some(Command::Query { query, no_scan, deadline_ms }) => {
            run_query(&config, &roots, &query, no_scan, Duration::from_millis(deadline_ms))
        }
        None => run_daemon(&config, &roots),
    }
}

fn default_roots(config: &Config) -> Result<Vec<PathBuf>> {
    if cfg!(windows) || config.scan_root_on_unsupported_os {
        Ok(vec![PathBuf::from("/")])
    } else {
        anyhow::bail!("no root given and scanning the filesystem root is disabled by configuration")
    }
}

fn build_scanner(config: &Config, store: &Arc<IndexStore>) -> (Arc<Scanner>, Arc<Blacklist>) {
    let blacklist = Arc::new(Blacklist::new(&config.blacklist));
    let scanner = Arc::new(Scanner::new(
        Arc::clone(store),
        Arc::clone(&blacklist),
        Arc::from(platform_probe()),
        config.max_scanner_workers,
        config.hash_size_limit_bytes,
    ));
    (scanner, blacklist)
}

fn run_daemon(config: &Config, roots: &[PathBuf]) -> Result<()> {
    let store = Arc::new(IndexStore::new());
    snapshot::load(&config.snapshot_path, &store).context("load snapshot")?;

    let (scanner, blacklist) = build_scanner(config, &store);
    let shutdown = Arc::new(ShutdownCoordinator::new());
    let scheduler = Scheduler::new(
        Arc::clone(&store),
        blacklist,
        Arc::clone(&scanner),
        config.snapshot_path.clone(),
        Arc::clone(&shutdown),
        fdex::config::DEFAULT_GC_WORKERS,
    );

    let volumes: Vec<String> = roots.iter().map(|r| r.to_string_lossy().to_string()).collect();
    for root in roots {
        scanner.enumerate(root);
    }
    scheduler.start(volumes);
    log::info!("fdex daemon running against {} root(s)", roots.len());

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("install Ctrl-C handler")?;
    }
    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(250));
    }

    log::info!("shutting down, draining in-flight persistence");
    scheduler.stop();
    if let Err(e) = snapshot::store(&config.snapshot_path, &store, &shutdown) {
        log::warn!("final snapshot persist failed: {e}");
    }
    shutdown.wait();
    Ok(())
}

fn run_query(config: &Config, roots: &[PathBuf], query: &str, no_scan: bool, deadline: Duration) -> Result<()> {
    let store = Arc::new(IndexStore::new());
    snapshot::load(&config.snapshot_path, &store).context("load snapshot")?;

    if !no_scan {
        let (scanner, _blacklist) = build_scanner(config, &store);
        for root in roots {
            scanner.enumerate(root);
        }
    }

    let started = Instant::now();
    let results = search::search(&store, query, deadline, config.max_search_workers, config.max_results);
    log::debug!("search for {query:?} took {:?}, {} hits", started.elapsed(), results.len());

    for record in &results {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}
