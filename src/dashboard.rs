//! Owned dashboard state and its timers
//!
//! `DashboardSession` is the only holder of the current snapshot, scope,
//! role and drill-down. Every other module is a pure function over values
//! it hands out. The snapshot is replaced wholesale on each fetch or tick.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::drilldown::{self, DrillDown, DrilldownData, ResultTab, Stage};
use crate::error::{DashboardError, Result};
use crate::models::{KpiGroup, OperationalGroup, OrganizationalUnit, Role, Scope, Snapshot};
use crate::scope::{self, filter_by_scope};
use crate::search::{filter_by_search, RecentSearch, RecentSearches, SearchKind};
use crate::simulator::simulate_tick;
use crate::source::{fetch_snapshot, DataSource};
use crate::store::KeyValueStore;

pub type SharedSession = Arc<RwLock<DashboardSession>>;

/// Selector entry: a region and its branches
#[derive(Debug, Clone, Serialize)]
pub struct ScopeOption {
    pub region: OrganizationalUnit,
    pub branches: Vec<OrganizationalUnit>,
}

/// What the KPI screen renders
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub role: Role,
    pub scope: Scope,
    pub scope_options: Vec<ScopeOption>,
    pub search_term: String,
    pub groups: Vec<KpiGroup>,
    pub fallbacks: Vec<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub struct DashboardSession {
    config: DashboardConfig,
    source: Arc<dyn DataSource>,
    store: Box<dyn KeyValueStore>,
    rng: StdRng,
    snapshot: Option<Arc<Snapshot>>,
    role: Role,
    scope: Scope,
    search_term: String,
    drilldown: DrillDown,
    recent: RecentSearches,
    last_error: Option<String>,
    ticks: u64,
}

impl DashboardSession {
    pub fn new(
        config: DashboardConfig,
        source: Arc<dyn DataSource>,
        store: Box<dyn KeyValueStore>,
        role: Role,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let recent = RecentSearches::load(store.as_ref());
        Self {
            config,
            source,
            store,
            rng,
            snapshot: None,
            role,
            scope: Scope::All,
            search_term: String::new(),
            drilldown: DrillDown::default(),
            recent,
            last_error: None,
            ticks: 0,
        }
    }

    pub fn from_config(config: DashboardConfig, role: Role) -> Self {
        let source = config.data_source();
        let store = config.store();
        Self::new(config, source, store, role)
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn source(&self) -> Arc<dyn DataSource> {
        self.source.clone()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn recent_searches(&self) -> &[RecentSearch] {
        self.recent.entries()
    }

    pub fn drilldown_stage(&self) -> Stage {
        self.drilldown.stage()
    }

    /// Fetch and apply in one step. Holds `&mut self` across the fetch delay.
    pub async fn reload(&mut self) -> Result<()> {
        let result = fetch_snapshot(self.source.as_ref(), self.config.fetch_delay).await;
        self.apply_fetch(result)
    }

    /// A failed fetch keeps the previous snapshot and records one message
    pub fn apply_fetch(&mut self, result: Result<Snapshot>) -> Result<()> {
        match result {
            Ok(snapshot) => {
                info!(
                    "Loaded snapshot with {} KPI groups at {}",
                    snapshot.groups.len(),
                    snapshot.generated_at
                );
                self.snapshot = Some(Arc::new(snapshot));
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Fetch failed, keeping previous snapshot: {}", e);
                self.last_error = Some(format!("Unable to refresh dashboard data: {}", e));
                Err(e)
            }
        }
    }

    /// One live update; a no-op until the first snapshot arrives
    pub fn tick(&mut self) {
        let Some(current) = self.snapshot.as_ref() else {
            debug!("Skipping tick, no snapshot loaded");
            return;
        };
        let next = simulate_tick(current, &mut self.rng, Utc::now());
        self.snapshot = Some(Arc::new(next));
        self.ticks += 1;
        debug!("Applied tick {}", self.ticks);
    }

    pub fn set_role(&mut self, role: Role) {
        if role != self.role {
            info!("Role changed to {}", role.label());
            self.role = role;
            self.scope = Scope::All;
            self.drilldown.close();
        }
    }

    /// Branch users keep their own branch regardless of the stored scope.
    /// An open drill-down is reopened under the new scope.
    pub fn set_scope(&mut self, scope: Scope) -> Result<()> {
        if !self.role.shows_scope_selector() {
            debug!("Scope change ignored for branch user");
            self.scope = scope;
            return Ok(());
        }
        if let Some(snapshot) = &self.snapshot {
            scope::validate_scope(snapshot, &scope)?;
        }
        self.scope = scope;

        if let Some(view) = self.drilldown.view().cloned() {
            if let Some(snapshot) = self.snapshot.clone() {
                self.open_view(&snapshot, &view.kpi_id);
                self.drilldown.set_tab(view.active_result_tab)?;
            }
        }
        Ok(())
    }

    pub fn apply_search(&mut self, term: &str) {
        self.search_term = term.trim().to_string();
        if self.search_term.is_empty() {
            return;
        }
        self.recent.record(SearchKind::Kpi, &self.search_term);
        if let Err(e) = self.recent.save(self.store.as_mut()) {
            warn!("Could not persist recent searches: {}", e);
        }
    }

    pub fn clear_recent_searches(&mut self) -> Result<()> {
        self.recent.clear();
        self.recent.save(self.store.as_mut())
    }

    pub fn view(&self) -> DashboardView {
        let effective = scope::effective_scope(&self.scope, &self.role);
        let (groups, fallbacks, scope_options) = match &self.snapshot {
            Some(snapshot) => {
                let scoped = filter_by_scope(&snapshot.groups, &self.scope, &self.role);
                let options = scope::scope_options(snapshot, &self.role)
                    .into_iter()
                    .map(|(region, branches)| ScopeOption { region, branches })
                    .collect();
                (filter_by_search(&scoped.groups, &self.search_term), scoped.fallbacks, options)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        DashboardView {
            role: self.role.clone(),
            scope: effective,
            scope_options,
            search_term: self.search_term.clone(),
            groups,
            fallbacks,
            generated_at: self.snapshot.as_ref().map(|s| s.generated_at),
            last_error: self.last_error.clone(),
        }
    }

    pub fn operational(&self) -> Vec<OperationalGroup> {
        match &self.snapshot {
            Some(snapshot) => filter_by_search(&snapshot.operational, &self.search_term),
            None => Vec::new(),
        }
    }

    fn current(&self) -> Result<Arc<Snapshot>> {
        self.snapshot.clone().ok_or(DashboardError::NoSnapshot)
    }

    pub fn open_drilldown(&mut self, kpi_id: &str) -> Result<DrilldownData> {
        let snapshot = self.current()?;
        if snapshot.find_kpi(kpi_id).is_none() {
            return Err(DashboardError::UnknownKpi(kpi_id.to_string()));
        }
        let view = self.open_view(&snapshot, kpi_id);
        drilldown::resolve(&snapshot, view)
    }

    fn open_view(&mut self, snapshot: &Snapshot, kpi_id: &str) -> &drilldown::DrillDownView {
        let scope = scope::effective_scope(&self.scope, &self.role);
        let region = scope.region_id().and_then(|id| snapshot.find_unit(id)).cloned();
        self.drilldown.open_scoped(&self.role, kpi_id, scope, region)
    }

    pub fn select_region(&mut self, region_id: &str) -> Result<DrilldownData> {
        let snapshot = self.current()?;
        let region = snapshot
            .find_unit(region_id)
            .cloned()
            .ok_or_else(|| DashboardError::UnknownUnit(region_id.to_string()))?;
        self.drilldown.select_region(region)?;
        self.drilldown_data()?.ok_or(DashboardError::DrilldownClosed)
    }

    pub fn drilldown_back(&mut self) -> Stage {
        self.drilldown.back()
    }

    pub fn close_drilldown(&mut self) {
        self.drilldown.close();
    }

    pub fn set_result_tab(&mut self, tab: ResultTab) -> Result<()> {
        self.drilldown.set_tab(tab)
    }

    /// Rows for the open drill-down against the current snapshot
    pub fn drilldown_data(&self) -> Result<Option<DrilldownData>> {
        let Some(view) = self.drilldown.view() else {
            return Ok(None);
        };
        let snapshot = self.current()?;
        drilldown::resolve(&snapshot, view).map(Some)
    }
}

/// Fetch without holding the session lock during the delay
pub async fn reload_shared(session: &SharedSession) -> Result<()> {
    let (source, delay) = {
        let guard = session.read().await;
        (guard.source(), guard.config().fetch_delay)
    };
    let result = fetch_snapshot(source.as_ref(), delay).await;
    session.write().await.apply_fetch(result)
}

/// Interval tasks owned by a view; both stop when this is dropped
pub struct TimerHandles {
    tick: JoinHandle<()>,
    reload: JoinHandle<()>,
}

impl TimerHandles {
    pub fn shutdown(&self) {
        self.tick.abort();
        self.reload.abort();
    }
}

impl Drop for TimerHandles {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn spawn_timers(
    session: SharedSession,
    tick_every: Duration,
    reload_every: Duration,
) -> TimerHandles {
    info!(
        "Starting timers: tick every {:?}, reload every {:?}",
        tick_every, reload_every
    );

    let tick_session = session.clone();
    let tick = tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + tick_every, tick_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            tick_session.write().await.tick();
        }
    });

    let reload = tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + reload_every, reload_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            // Errors are already recorded on the session.
            let _ = reload_shared(&session).await;
        }
    });

    TimerHandles { tick, reload }
}

/// Runs a search only after the term has been stable for the debounce period
pub struct SearchDebouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: Mutex::new(None) }
    }

    /// Replaces any search still waiting out its delay
    pub fn submit(&self, session: SharedSession, term: String) {
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            session.write().await.apply_search(&term);
        });
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(task) = pending.take() {
                task.abort();
            }
        }
    }
}
