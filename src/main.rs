//! Inference worker pool daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                     WORKER POOL                      │
//!                     │                                                      │
//!   execute(task) ────┼─▶ executor ──▶ acquire ──▶ least_conn ──┐            │
//!                     │      ▲            (registry lock)        │            │
//!                     │      │                                   ▼            │
//!   TaskResult  ◀─────┼── retry / ◀── circuit ◀── transport ◀── lease ───────┼──▶ Worker
//!                     │   fallback     breaker      (no lock)                 │
//!                     │                                                      │
//!                     │  ┌────────────────────────────────────────────────┐  │
//!                     │  │ health monitor · config watcher · metrics      │  │
//!                     │  └────────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use inference_pool::config::watcher::ConfigWatcher;
use inference_pool::config::{load_config, FileSource, PoolConfig};
use inference_pool::lifecycle::signals;
use inference_pool::load_balancer::descriptor::descriptors_from_raw;
use inference_pool::observability::{logging, metrics};
use inference_pool::{HttpTransport, WorkerPool};

#[derive(Parser)]
#[command(name = "inference-pool")]
#[command(about = "Load-balanced, failure-isolating pool of remote inference workers", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "pool.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pool until interrupted, reloading on config change or SIGHUP
    Run {
        /// Seconds between pool statistics log lines.
        #[arg(long, default_value_t = 60)]
        stats_interval: u64,
    },
    /// Execute a single task and print the JSON result
    Exec {
        /// Task kind: analysis, batch_embedding or knowledge_processing.
        #[arg(long)]
        task_type: String,
        /// Task data as a JSON object.
        #[arg(long, default_value = "{}")]
        data: String,
    },
    /// Validate the configuration and list the workers it defines
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    logging::init_tracing(&config.observability);

    match cli.command {
        Commands::Run { stats_interval } => run(cli.config, config, stats_interval).await,
        Commands::Exec { task_type, data } => exec(cli.config, config, &task_type, &data).await,
        Commands::Check => check(&config),
    }
}

fn build_pool(
    path: PathBuf,
    config: &PoolConfig,
) -> Result<WorkerPool, Box<dyn std::error::Error>> {
    let transport = HttpTransport::new(&config.timeouts, &config.health_check)?;
    let pool = WorkerPool::new(Arc::new(FileSource::new(path)), Arc::new(transport))?;
    Ok(pool)
}

async fn run(
    path: PathBuf,
    config: PoolConfig,
    stats_interval: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("inference-pool v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let pool = build_pool(path.clone(), &config)?;
    let stats = pool.get_pool_stats();
    tracing::info!(
        workers = stats.total_workers,
        max_attempts = config.retries.max_attempts,
        failure_threshold = config.circuit_breaker.failure_threshold,
        "Configuration loaded"
    );

    pool.start_health_monitor(config.health_check.clone()).await;

    let (watcher, mut reload_rx) = ConfigWatcher::new(&path);
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "Config watching unavailable, SIGHUP reload only");
            None
        }
    };
    let (sighup_tx, mut sighup_rx) = mpsc::unbounded_channel();
    signals::forward_reload_signals(sighup_tx);

    let mut stats_ticker = tokio::time::interval(Duration::from_secs(stats_interval.max(1)));
    let shutdown = signals::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(()) = reload_rx.recv() => reload(&pool),
            Some(()) = sighup_rx.recv() => reload(&pool),
            _ = stats_ticker.tick() => {
                let stats = pool.get_pool_stats();
                tracing::info!(
                    total_workers = stats.total_workers,
                    healthy_workers = stats.healthy_workers,
                    total_tasks_processed = stats.total_tasks_processed,
                    active_tasks = stats.active_tasks,
                    success_rate = stats.success_rate,
                    "Pool stats"
                );
            }
        }
    }

    pool.stop_health_monitor().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn reload(pool: &WorkerPool) {
    // Failures are logged by the pool; the old workers stay in service.
    let _ = pool.reload_config();
}

async fn exec(
    path: PathBuf,
    config: PoolConfig,
    task_type: &str,
    data: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let data: serde_json::Value = serde_json::from_str(data)?;
    let pool = build_pool(path, &config)?;
    let result = pool.execute_raw(task_type, data).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn check(config: &PoolConfig) -> Result<(), Box<dyn std::error::Error>> {
    let descriptors = descriptors_from_raw(&config.workers);
    println!(
        "{} of {} worker entries usable",
        descriptors.len(),
        config.workers.len()
    );
    println!("{}", serde_json::to_string_pretty(&descriptors)?);
    Ok(())
}
