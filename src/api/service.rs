//! Shared dashboard state behind the REST handlers
//!
//! Wraps one `DashboardSession` with its timers and search debouncer. The
//! session lock is never held across a simulated fetch delay.

use std::sync::Mutex;
use tracing::info;

use crate::dashboard::{
    reload_shared, spawn_timers, DashboardSession, DashboardView, SearchDebouncer, SharedSession,
    TimerHandles,
};
use crate::drilldown::{DrilldownData, ResultTab, Stage};
use crate::error::Result;
use crate::models::{OperationalGroup, Role, Scope};
use crate::search::RecentSearch;

pub struct DashboardService {
    session: SharedSession,
    debouncer: SearchDebouncer,
    timers: Mutex<Option<TimerHandles>>,
}

impl DashboardService {
    pub fn new(session: DashboardSession) -> Self {
        let debouncer = SearchDebouncer::new(session.config().search_debounce);
        Self {
            session: session.into_shared(),
            debouncer,
            timers: Mutex::new(None),
        }
    }

    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    /// Initial load, then live ticks and periodic reloads
    pub async fn start(&self) -> Result<()> {
        let loaded = reload_shared(&self.session).await;
        let (tick_every, reload_every) = {
            let session = self.session.read().await;
            (session.config().tick_every, session.config().reload_every)
        };
        let handles = spawn_timers(self.session.clone(), tick_every, reload_every);
        if let Ok(mut timers) = self.timers.lock() {
            *timers = Some(handles);
        }
        loaded
    }

    pub fn stop(&self) {
        if let Ok(mut timers) = self.timers.lock() {
            if timers.take().is_some() {
                info!("Dashboard timers stopped");
            }
        }
    }

    pub async fn view(&self) -> DashboardView {
        self.session.read().await.view()
    }

    pub async fn operational(&self) -> Vec<OperationalGroup> {
        self.session.read().await.operational()
    }

    pub async fn set_scope(&self, scope: Scope) -> Result<DashboardView> {
        let mut session = self.session.write().await;
        session.set_scope(scope)?;
        Ok(session.view())
    }

    pub async fn set_role(&self, role: Role) -> DashboardView {
        let mut session = self.session.write().await;
        session.set_role(role);
        session.view()
    }

    pub fn search(&self, term: String) {
        self.debouncer.submit(self.session.clone(), term);
    }

    pub async fn recent_searches(&self) -> Vec<RecentSearch> {
        self.session.read().await.recent_searches().to_vec()
    }

    pub async fn clear_recent_searches(&self) -> Result<()> {
        self.session.write().await.clear_recent_searches()
    }

    /// Manual refresh runs one live update immediately
    pub async fn refresh(&self) -> DashboardView {
        let mut session = self.session.write().await;
        session.tick();
        session.view()
    }

    pub async fn reload(&self) -> Result<DashboardView> {
        reload_shared(&self.session).await?;
        Ok(self.view().await)
    }

    pub async fn drilldown(&self) -> Result<Option<DrilldownData>> {
        self.session.read().await.drilldown_data()
    }

    pub async fn open_drilldown(&self, kpi_id: &str) -> Result<DrilldownData> {
        self.session.write().await.open_drilldown(kpi_id)
    }

    pub async fn select_region(&self, region_id: &str) -> Result<DrilldownData> {
        self.session.write().await.select_region(region_id)
    }

    pub async fn back(&self) -> Result<Option<DrilldownData>> {
        let mut session = self.session.write().await;
        match session.drilldown_back() {
            Stage::Closed => Ok(None),
            _ => session.drilldown_data(),
        }
    }

    pub async fn set_tab(&self, tab: ResultTab) -> Result<Option<DrilldownData>> {
        let mut session = self.session.write().await;
        session.set_result_tab(tab)?;
        session.drilldown_data()
    }

    pub async fn close_drilldown(&self) {
        self.session.write().await.close_drilldown();
    }
}
