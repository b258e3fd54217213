/// `RatioCrab` - Engagement-ratio markers for social timelines
///
/// Copyright (C) 2026 Daniel Freiermuth
///
/// This program is free software: you can redistribute it and/or modify
/// it under the terms of the GNU General Public License as published by
/// the Free Software Foundation, either version 3 of the License, or
/// (at your option) any later version.
///
/// This program is distributed in the hope that it will be useful,
/// but WITHOUT ANY WARRANTY; without even the implied warranty of
/// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
/// GNU General Public License for more details.
///
/// You should have received a copy of the GNU General Public License
/// along with this program.  If not, see <https://www.gnu.org/licenses/>.
use anyhow::Context as _;
use clap::Parser;
use ratiocrab::app::notify::{change_channel, ChangeNotifier, ChangeSource};
use ratiocrab::app::sink::PresentationSink;
use ratiocrab::app::Coordinator;
use ratiocrab::config::{GlobalConfig, StyleConfig};
use ratiocrab::core::{JsonFileStorage, MemoryStorage, Storage, SystemClock};
use ratiocrab::page::{PageSnapshot, PostKey};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(name = "ratiocrab")]
#[command(author = "RatioCrab Team")]
#[command(version = VERSION)]
#[command(about = "Score the posts of captured timeline pages by engagement ratio", long_about = None)]
struct Args {
    /// Page snapshots, replayed in order as successive page changes
    #[arg(value_name = "SNAPSHOT", required = true)]
    snapshots: Vec<PathBuf>,

    /// Config file to use instead of the one in the config directory
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Storage file for the learned history
    #[arg(long, value_name = "FILE", conflicts_with = "ephemeral")]
    storage: Option<PathBuf>,

    /// Keep the learned history in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Delay between two replayed snapshots
    #[arg(long, value_name = "MS", default_value_t = 600)]
    interval_ms: u64,

    /// Print a summary of the learned history when done
    #[arg(long)]
    stats: bool,
}

/// Prints every border change to stdout.
struct ConsoleSink {
    style: StyleConfig,
}

impl PresentationSink for ConsoleSink {
    fn install_styles(&mut self, css: &str) -> anyhow::Result<()> {
        tracing::debug!("Installing styles:\n{css}");
        Ok(())
    }

    fn apply_color(&mut self, post: &PostKey, color: &str) -> anyhow::Result<()> {
        println!("{post}: border {}", self.style.border(color));
        Ok(())
    }

    fn clear_color(&mut self, post: &PostKey) -> anyhow::Result<()> {
        println!("{post}: border cleared");
        Ok(())
    }
}

/// Swaps in the next snapshot every `interval` and reports it as a change.
struct SnapshotReplay {
    current: Arc<Mutex<PageSnapshot>>,
    upcoming: Vec<PageSnapshot>,
    interval: Duration,
}

impl ChangeSource for SnapshotReplay {
    fn subscribe(&mut self, notifier: ChangeNotifier) {
        let current = Arc::clone(&self.current);
        let upcoming = std::mem::take(&mut self.upcoming);
        let interval = self.interval;

        tokio::spawn(async move {
            for snapshot in upcoming {
                tokio::time::sleep(interval).await;
                tracing::info!("Page changed to {}", snapshot.path);
                *current.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
                if !notifier.notify() {
                    break;
                }
            }
        });
    }
}

fn open_storage(args: &Args) -> anyhow::Result<Arc<dyn Storage>> {
    if args.ephemeral {
        tracing::info!("Keeping learned ratios in memory only");
        return Ok(Arc::new(MemoryStorage::new()));
    }
    let path = args
        .storage
        .clone()
        .or_else(JsonFileStorage::default_path)
        .context("Could not determine data directory")?;
    tracing::info!("Using storage file {}", path.display());
    Ok(Arc::new(JsonFileStorage::new(path)))
}

async fn replay(
    config: GlobalConfig,
    storage: Arc<dyn Storage>,
    snapshots: Vec<PageSnapshot>,
    interval: Duration,
    print_stats: bool,
) -> anyhow::Result<()> {
    let mut snapshots = snapshots.into_iter();
    let first = snapshots.next().context("No page snapshot given")?;
    let current = Arc::new(Mutex::new(first));

    let sink = ConsoleSink {
        style: config.style.clone(),
    };
    let mut coordinator = Coordinator::new(&config, storage, sink, Arc::new(SystemClock))?;

    let (notifier, feed) = change_channel();
    let mut source = SnapshotReplay {
        current: Arc::clone(&current),
        upcoming: snapshots.collect(),
        interval,
    };
    source.subscribe(notifier);

    coordinator
        .run(feed, || {
            current
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        })
        .await;

    if print_stats {
        let stats = coordinator.history().stats();
        println!(
            "history: {} observations ({} finite), min {:?}, median {:?}, max {:?}",
            stats.count, stats.finite, stats.min, stats.median, stats.max
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG environment variable to override (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("RatioCrab starting up (version {VERSION})");

    #[cfg(feature = "cpu-profiling")]
    {
        tracing::info!("CPU profiling enabled with Tracy - run Tracy profiler to connect");
    }

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GlobalConfig::load_from(path)?,
        None => GlobalConfig::load(),
    };
    let storage = open_storage(&args)?;
    let snapshots = args
        .snapshots
        .iter()
        .map(|path| PageSnapshot::from_file(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(replay(
        config,
        storage,
        snapshots,
        Duration::from_millis(args.interval_ms),
        args.stats,
    ))
}
