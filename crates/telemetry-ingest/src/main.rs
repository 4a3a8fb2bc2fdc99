// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Telemetry Ingest CLI
//!
//! Reads `key=value` telemetry messages and persists them in batches.
//!
//! # Usage
//!
//! ```bash
//! # Ingest lines from stdin ("topic<TAB>payload" or just "payload")
//! telemetry-ingest --store telemetry.db < capture.log
//!
//! # Listen for UDP datagrams on the configured bus address
//! telemetry-ingest --config ingest.yaml --source udp --port 5555
//!
//! # Inspect what was stored
//! telemetry-ingest --store telemetry.db count
//! telemetry-ingest --store telemetry.db tail -n 20
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use telemetry_ingest::{
    Config, DocumentStore, IngestPipeline, LineSource, MemoryStore, MessageSource, SqliteStore,
    TopicFilter, UdpSource,
};
use tokio::sync::oneshot;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SourceKind {
    /// One message per line on stdin
    Stdin,
    /// One message per datagram on the bus address
    Udp,
}

#[derive(Parser, Debug)]
#[command(name = "telemetry-ingest")]
#[command(about = "Telemetry ingestion - key=value messages to batched document store writes", long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store connection string (SQLite file)
    #[arg(short, long)]
    store: Option<String>,

    /// Database name
    #[arg(long)]
    database: Option<String>,

    /// Collection name
    #[arg(long)]
    collection: Option<String>,

    /// Number of flush workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Records per bulk write
    #[arg(long)]
    bulk_size: Option<usize>,

    /// Seconds between flushes
    #[arg(long)]
    flush_interval: Option<f64>,

    /// Intake queue capacity
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Subscribed topics, comma separated (`+` and `#` wildcards)
    #[arg(short, long, value_delimiter = ',')]
    topics: Option<Vec<String>>,

    /// Bus host to bind (UDP source)
    #[arg(long)]
    host: Option<String>,

    /// Bus port to bind (UDP source)
    #[arg(short, long)]
    port: Option<u16>,

    /// Message source
    #[arg(long, value_enum, default_value_t = SourceKind::Stdin)]
    source: SourceKind,

    /// Use the in-memory store (for testing without a database)
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Ingest messages until the source ends or Ctrl+C (default)
    Run,
    /// Show the number of stored documents
    Count,
    /// Show the most recently stored documents
    Tail {
        /// Number of documents
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&args, config).await,
        Commands::Count => {
            let store = open_store(&config)?;
            println!("Documents stored in {}: {}", store.table(), store.count()?);
            Ok(())
        }
        Commands::Tail { limit } => {
            let store = open_store(&config)?;
            for doc in store.tail(limit)? {
                println!(
                    "  id={}, captured_at={}, {}",
                    doc.id,
                    doc.captured_at.as_deref().unwrap_or("-"),
                    serde_json::to_string(&doc.body)?
                );
            }
            Ok(())
        }
    }
}

/// File config (or defaults) with command-line overrides applied.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(store) = &args.store {
        config.store.uri = store.clone();
    }
    if let Some(database) = &args.database {
        config.store.database = database.clone();
    }
    if let Some(collection) = &args.collection {
        config.store.collection = collection.clone();
    }
    if let Some(workers) = args.workers {
        config.flush.workers = workers;
    }
    if let Some(bulk_size) = args.bulk_size {
        config.flush.bulk_size = bulk_size;
    }
    if let Some(interval) = args.flush_interval {
        config.flush.flush_interval_secs = interval;
    }
    if let Some(capacity) = args.queue_capacity {
        config.intake.queue_capacity = capacity;
    }
    if let Some(topics) = &args.topics {
        config.bus.topics = topics.clone();
    }
    if let Some(host) = &args.host {
        config.bus.host = host.clone();
    }
    if let Some(port) = args.port {
        config.bus.port = port;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::new(
        &config.store.uri,
        &config.store.database,
        &config.store.collection,
    )
    .with_context(|| format!("failed to open store {}", config.store.uri))
}

async fn run(args: &Args, config: Config) -> Result<()> {
    let store: Arc<dyn DocumentStore> = if args.mock {
        tracing::info!("Running with in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(open_store(&config)?)
    };

    tracing::info!("Telemetry ingest starting...");
    tracing::info!("  Store: {}", store.describe());
    tracing::info!("  Topics: {}", config.bus.topics.join(", "));
    tracing::info!(
        "  Workers: {}, bulk size: {}, flush interval: {}s",
        config.flush.workers,
        config.flush.bulk_size,
        config.flush.flush_interval_secs
    );

    let filter = TopicFilter::new(config.bus.topics.clone());
    let default_topic = config.bus.default_topic.clone();
    let mut source: Box<dyn MessageSource + Send> = match args.source {
        SourceKind::Stdin => Box::new(LineSource::new(
            BufReader::new(io::stdin()),
            filter,
            default_topic,
        )),
        SourceKind::Udp => Box::new(UdpSource::bind(&config.bus.address(), filter, default_topic)?),
    };

    let mut pipeline = IngestPipeline::new(config)?;
    pipeline
        .start(store)
        .context("failed to start flush workers")?;

    let door = pipeline.front_door();
    let token = pipeline.token();
    let (done_tx, done_rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("message-source".to_string())
        .spawn(move || {
            let _ = done_tx.send(source.run(&door, &token));
        })
        .context("failed to spawn source thread")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        finished = done_rx => match finished {
            Ok(Ok(delivered)) => tracing::info!(delivered, "message source finished"),
            Ok(Err(e)) => tracing::error!(error = %e, "message source failed"),
            Err(_) => tracing::error!("message source thread exited without a result"),
        },
    }

    // Let a polling source notice the token before the workers stop
    pipeline.token().cancel();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let summary = tokio::task::spawn_blocking(move || pipeline.shutdown())
        .await
        .context("shutdown task failed")?;

    let stats = summary.stats;
    tracing::info!(
        "Shutdown complete: offered={}, written={}, write_failed={}, dropped_empty={}, \
         dropped_oversized={}, dropped_malformed={}, dropped_overflow={}, abandoned={}",
        stats.offered,
        stats.written,
        stats.write_failed,
        stats.dropped_empty,
        stats.dropped_oversized,
        stats.dropped_malformed,
        stats.dropped_overflow,
        stats.abandoned
    );

    let connected = summary.workers.iter().filter(|w| w.connected).count();
    if connected == 0 {
        bail!("no flush worker could connect to the store");
    }
    Ok(())
}
