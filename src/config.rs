//! Runtime configuration shared by the binaries

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::source::{DataSource, DemoSource, JsonFileSource};
use crate::store::{FileStore, KeyValueStore, MemoryStore};

/// Seed used when none is given, so demo numbers are stable between runs
pub const DEFAULT_SEED: u64 = 2024;

#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    /// Seconds between live update ticks
    #[arg(long, default_value = "120")]
    pub tick_secs: u64,

    /// Seconds between full data reloads
    #[arg(long, default_value = "300")]
    pub reload_secs: u64,

    /// Simulated fetch latency in milliseconds
    #[arg(long, default_value = "500")]
    pub fetch_delay_ms: u64,

    /// Quiet period after the last keystroke before a search runs
    #[arg(long, default_value = "500")]
    pub search_debounce_ms: u64,

    /// JSON dataset to load instead of the built-in demo data
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Random seed for demo data and live updates
    #[arg(long)]
    pub seed: Option<u64>,

    /// File the recent-searches list is kept in (in-memory when absent)
    #[arg(long)]
    pub recent_searches: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub tick_every: Duration,
    pub reload_every: Duration,
    pub fetch_delay: Duration,
    pub search_debounce: Duration,
    pub dataset: Option<PathBuf>,
    pub seed: Option<u64>,
    pub recent_searches: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tick_every: Duration::from_secs(120),
            reload_every: Duration::from_secs(300),
            fetch_delay: Duration::from_millis(500),
            search_debounce: Duration::from_millis(500),
            dataset: None,
            seed: None,
            recent_searches: None,
        }
    }
}

impl From<&DashboardArgs> for DashboardConfig {
    fn from(args: &DashboardArgs) -> Self {
        Self {
            tick_every: Duration::from_secs(args.tick_secs.max(1)),
            reload_every: Duration::from_secs(args.reload_secs.max(1)),
            fetch_delay: Duration::from_millis(args.fetch_delay_ms),
            search_debounce: Duration::from_millis(args.search_debounce_ms),
            dataset: args.dataset.clone(),
            seed: args.seed,
            recent_searches: args.recent_searches.clone(),
        }
    }
}

impl DashboardConfig {
    pub fn data_source(&self) -> Arc<dyn DataSource> {
        match &self.dataset {
            Some(path) => Arc::new(JsonFileSource::new(path)),
            None => Arc::new(DemoSource::new(self.seed.unwrap_or(DEFAULT_SEED))),
        }
    }

    pub fn store(&self) -> Box<dyn KeyValueStore> {
        match &self.recent_searches {
            Some(path) => Box::new(FileStore::new(path)),
            None => Box::new(MemoryStore::default()),
        }
    }
}
