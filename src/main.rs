//! Skew engine CLI: streaming correlation engine and batch bootstrap
//! analyzer, parameterized by mode rather than split into separate
//! binaries (spec §5 Concurrency & Resource Model).

use anyhow::{Context, Result};
use chrono::{Timelike, Utc};
use clap::{Parser, Subcommand};
use skew_engine::bootstrap::{self, BootstrapOptions, Report};
use skew_engine::config::EngineConfig;
use skew_engine::engine::Engine;
use skew_engine::metrics::start_metrics_server;
use skew_engine::reference::ReferenceRegistry;
use skew_engine::stats::SkimmerStats;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the streaming correlation engine, reading `topic|frame` pairs
    /// from stdin (spec §1: the publish/subscribe transport itself is out
    /// of scope; this is the opaque byte-frame source's simplest stand-in).
    Stream {
        /// Path to the reference registry file (§4.2).
        #[arg(short = 'r', long)]
        reference_file: Option<PathBuf>,

        /// Enable the Prometheus metrics server.
        #[arg(short = 'u', long)]
        metrics: bool,

        /// Port for the metrics server.
        #[arg(short = 'p', long, default_value_t = 9091)]
        metrics_port: u16,

        /// Print a stats summary every N seconds (0 disables).
        #[arg(short = 'd', long, default_value_t = 60)]
        stats_interval: u64,
    },

    /// Run the two-pass batch bootstrap analyzer over a historical CSV
    /// archive (spec §4.8).
    Bootstrap {
        /// Path to the historical CSV archive.
        #[arg(short = 'f', long)]
        archive_file: PathBuf,

        /// Path to the initial anchor reference file.
        #[arg(short = 'r', long)]
        anchor_file: PathBuf,

        /// Where to write the regenerated reference file.
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,

        /// Minimum qualified-spot count to appear in the regenerated
        /// reference file, overriding the config default.
        #[arg(short = 'n', long)]
        min_ref_spots: Option<u32>,

        /// Restrict the final report to one callsign.
        #[arg(short = 't', long)]
        target: Option<String>,

        /// Sort the report best-deviation-first.
        #[arg(short = 's', long, conflicts_with = "worst_first")]
        sort: bool,

        /// Sort the report worst-deviation-first. (The original CLI used
        /// `-h` for this; clap reserves that short flag for `--help`.)
        #[arg(short = 'w', long = "worst-first")]
        worst_first: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = EngineConfig::load()?;
    config.validate()?;

    match args.command {
        Command::Stream {
            reference_file,
            metrics,
            metrics_port,
            stats_interval,
        } => run_stream(config, reference_file, metrics, metrics_port, stats_interval).await,
        bootstrap_args @ Command::Bootstrap { .. } => run_bootstrap(config, bootstrap_args),
    }
}

async fn run_stream(
    config: EngineConfig,
    reference_file: Option<PathBuf>,
    metrics: bool,
    metrics_port: u16,
    stats_interval: u64,
) -> Result<()> {
    let registry = match &reference_file {
        Some(path) => ReferenceRegistry::load(path, config.max_ref)
            .with_context(|| format!("failed to load reference file: {}", path.display()))?,
        None => {
            warn!("no reference file given; starting with an empty reference registry");
            ReferenceRegistry::empty()
        }
    };
    info!(size = registry.len(), "loaded reference registry");

    let stats = Arc::new(SkimmerStats::new());

    if metrics {
        let stats_for_metrics = Arc::clone(&stats);
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(metrics_port, stats_for_metrics).await {
                error!("failed to start metrics server: {}", e);
            }
        });
    }

    if stats_interval > 0 {
        let stats_for_printer = Arc::clone(&stats);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(stats_interval));
            loop {
                interval.tick().await;
                println!("\n{}", stats_for_printer.summary());
            }
        });
    }

    let max_ref = config.max_ref;
    let mut engine = Engine::new(config, registry, Arc::clone(&stats));

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    // Drives both the activity sweep (§4.6) and the daily reference
    // refresh (§4.2); each only actually fires on its own schedule, `due`/
    // `should_refresh` gate that, so ticking faster than either cadence is
    // harmless.
    let mut maintenance_tick = tokio::time::interval(std::time::Duration::from_secs(5));

    info!("skew engine streaming, reading topic|frame pairs from stdin");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("error reading stdin")? else {
                    break;
                };
                let Some((topic, frame)) = line.split_once('|') else {
                    continue;
                };
                let now = now_epoch_secs();
                engine.handle_frame(topic, frame, now);
            }
            _ = maintenance_tick.tick() => {
                let now = now_epoch_secs();
                let wall = Utc::now();
                let reference_file = &reference_file;
                engine.run_maintenance(
                    now,
                    now / 86_400,
                    wall.hour(),
                    wall.minute(),
                    || reference_file.as_ref().and_then(|path| {
                        ReferenceRegistry::load(path, max_ref)
                            .inspect_err(|e| error!(error = %e, "failed to reload reference file"))
                            .ok()
                    }),
                );
            }
        }
    }

    println!("\n{}", stats.summary());
    Ok(())
}

fn run_bootstrap(mut config: EngineConfig, args: Command) -> Result<()> {
    let Command::Bootstrap {
        archive_file,
        anchor_file,
        output_file,
        min_ref_spots,
        target,
        sort,
        worst_first,
    } = args
    else {
        unreachable!("run_bootstrap is only called with Command::Bootstrap")
    };

    if let Some(n) = min_ref_spots {
        config.min_ref_spots = n;
    }

    let anchors = ReferenceRegistry::load(&anchor_file, config.max_ref)
        .with_context(|| format!("failed to load anchor file: {}", anchor_file.display()))?;

    let archive_content = fs::read_to_string(&archive_file)
        .with_context(|| format!("failed to read archive file: {}", archive_file.display()))?;

    let mut records = Vec::new();
    for (lineno, line) in archive_content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match bootstrap::parse_csv_line(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(lineno, error = %e, "skipping malformed archive line"),
        }
    }
    info!(count = records.len(), "parsed archive records");

    let (table, reference_file) = bootstrap::run_two_pass(&records, &anchors, &config);

    if let Some(path) = output_file {
        fs::write(&path, &reference_file)
            .with_context(|| format!("failed to write reference file: {}", path.display()))?;
        info!(path = %path.display(), "wrote regenerated reference file");
    }

    let options = BootstrapOptions {
        target,
        sort_worst_first: if worst_first {
            Some(true)
        } else if sort {
            Some(false)
        } else {
            None
        },
    };
    let report = Report::from_table(&table, &options);
    println!("{}", report.render_table());

    Ok(())
}

fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
