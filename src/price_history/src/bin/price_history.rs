use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use price_feed::io::{json::JsonSeriesSink, sink::SeriesSink};
use price_history::{
    config::{self, CONFIG_ENV, DEFAULT_CONFIG_PATH, TrackerConfig},
    reconstruct::rebuild,
    scheduler::IngestionScheduler,
    store::SnapshotStore,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Price History CLI")]
struct Cli {
    /// Config file; falls back to $PRICE_HISTORY_CONFIG, then ./price_history.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write a starter config with the stock CoinMarketCap sources.
    Init,
    /// Run ingestion cycles on the configured schedule until Ctrl-C.
    Run,
    /// Run exactly one ingestion cycle and print its report.
    Once,
    /// Rebuild series from the store and export them without fetching.
    Rebuild {
        /// Export directory; defaults to `output_dir` from the config.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load(path: &Path) -> Result<TrackerConfig> {
    config::load_config_path(path).with_context(|| format!("load config {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = shared_utils::env::path_from_arg_or_env(cli.config, CONFIG_ENV)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    match cli.cmd {
        Cmd::Init => {
            if config::write_default_config(&config_path)? {
                info!(path = %config_path.display(), "wrote default config");
            } else {
                warn!(path = %config_path.display(), "config already exists; left untouched");
            }
        }
        Cmd::Run => {
            let cfg = load(&config_path)?;
            let mut trigger = cfg.schedule.to_trigger()?;
            let sink = JsonSeriesSink::new(&cfg.output_dir);
            let scheduler = IngestionScheduler::from_config(&cfg, sink)?;

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "cannot listen for Ctrl-C; running until killed");
                    std::future::pending::<()>().await;
                }
            };
            let cycles = scheduler.run(&mut *trigger, shutdown).await;
            info!(cycles, "scheduler stopped");
        }
        Cmd::Once => {
            let cfg = load(&config_path)?;
            let sink = JsonSeriesSink::new(&cfg.output_dir);
            let scheduler = IngestionScheduler::from_config(&cfg, sink)?;
            let report = scheduler.run_cycle().await;
            println!(
                "attempted {} | appended {} | no data {} | failed {} | rejected {}",
                report.attempted,
                report.appended,
                report.no_data,
                report.acquisition_failures + report.append_failures,
                report.rejected
            );
            info!(
                attempted = report.attempted,
                appended = report.appended,
                no_data = report.no_data,
                acquisition_failures = report.acquisition_failures,
                rejected = report.rejected,
                append_failures = report.append_failures,
                sink_failed = report.sink_failed,
                "cycle complete"
            );
        }
        Cmd::Rebuild { out } => {
            let cfg = load(&config_path)?;
            let store = SnapshotStore::new(&cfg.store_path);
            let recon = tokio::task::spawn_blocking(move || rebuild(&store))
                .await
                .context("rebuild task")??;
            for series in recon.series.values() {
                println!("{:<20} {:<24} {:>6} points", series.entity, series.source, series.len());
            }
            println!("{} record(s) skipped", recon.skipped_count());

            let sink = JsonSeriesSink::new(out.unwrap_or(cfg.output_dir));
            let written = sink.write(&recon.series).await?;
            info!(
                series = recon.series.len(),
                points = recon.point_count(),
                skipped = recon.skipped_count(),
                files = written.len(),
                dir = %sink.dir().display(),
                "export complete"
            );
        }
    }

    Ok(())
}
