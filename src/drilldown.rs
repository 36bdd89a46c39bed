//! KPI drill-down navigation
//!
//! `DrillDown` tracks which KPI breakdown is open and at which level.
//!
//! ```text
//! Closed --open--> RegionView --select_region--> BranchView
//!   ^                  |  ^                          |
//!   |                  |  +----------back------------+
//!   +------back/close--+
//! Closed --open--> UnitTypeView --back/close--> Closed
//! ```
//!
//! The layout opened for a KPI comes from `kpi_catalog`. A view opened
//! under a region scope starts in `BranchView` on that region, and `back`
//! from there closes. `resolve` is the single place that turns a view into
//! the rows handed to a renderer.

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::kpi_catalog;
use crate::models::{
    ComparisonPolicy, OrganizationalUnit, Role, Scope, Snapshot, UnitKind, UnitMetric,
};
use crate::ranking::{rank, sort_best_first, Ranking};
use crate::scope;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DrilldownKind {
    Region,
    Branch,
    VehicleType,
    RouteType,
    Transporter,
    Order,
}

impl DrilldownKind {
    pub fn unit_kind(&self) -> UnitKind {
        match self {
            DrilldownKind::Region => UnitKind::Region,
            DrilldownKind::Branch => UnitKind::Branch,
            DrilldownKind::VehicleType => UnitKind::VehicleType,
            DrilldownKind::RouteType => UnitKind::RouteType,
            DrilldownKind::Transporter => UnitKind::Transporter,
            DrilldownKind::Order => UnitKind::Order,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            DrilldownKind::Region => Stage::RegionView,
            DrilldownKind::Branch => Stage::BranchView,
            _ => Stage::UnitTypeView,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DrilldownKind::Region => "Region",
            DrilldownKind::Branch => "Branch",
            DrilldownKind::VehicleType => "Vehicle Type",
            DrilldownKind::RouteType => "Route Type",
            DrilldownKind::Transporter => "Transporter",
            DrilldownKind::Order => "Order",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ResultTab {
    #[default]
    Top,
    Worst,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DrillDownView {
    pub kpi_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_region: Option<OrganizationalUnit>,
    pub active_result_tab: ResultTab,
    pub drilldown_kind: DrilldownKind,
    /// Effective scope the view was opened under
    #[serde(default)]
    pub scope: Scope,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Closed,
    RegionView,
    BranchView,
    UnitTypeView,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrillDown {
    view: Option<DrillDownView>,
}

impl DrillDown {
    pub fn view(&self) -> Option<&DrillDownView> {
        self.view.as_ref()
    }

    pub fn stage(&self) -> Stage {
        self.view
            .as_ref()
            .map(|view| view.drilldown_kind.stage())
            .unwrap_or(Stage::Closed)
    }

    /// Opens from any stage; the result tab always starts on `Top`
    pub fn open(&mut self, role: &Role, kpi_id: &str) -> &DrillDownView {
        self.open_scoped(role, kpi_id, Scope::All, None)
    }

    /// Opens under `scope`. A geographic layout with `region` given skips
    /// the region list and shows that region's branches.
    pub fn open_scoped(
        &mut self,
        role: &Role,
        kpi_id: &str,
        scope: Scope,
        region: Option<OrganizationalUnit>,
    ) -> &DrillDownView {
        let mut kind = kpi_catalog::drilldown_kind(role, kpi_id);
        let selected_region = match region {
            Some(region) if kind == DrilldownKind::Region && region.kind == UnitKind::Region => {
                kind = DrilldownKind::Branch;
                Some(region)
            }
            _ => None,
        };
        tracing::debug!("Opening {} drill-down for {}", kind.label(), kpi_id);
        self.view.insert(DrillDownView {
            kpi_id: kpi_id.to_string(),
            selected_region,
            active_result_tab: ResultTab::Top,
            drilldown_kind: kind,
            scope,
        })
    }

    pub fn select_region(&mut self, region: OrganizationalUnit) -> Result<()> {
        let stage = self.stage();
        let Some(view) = self.view.as_mut() else {
            return Err(DashboardError::DrilldownClosed);
        };
        if stage != Stage::RegionView {
            return Err(DashboardError::InvalidTransition { action: "select a region", stage });
        }
        if region.kind != UnitKind::Region {
            return Err(DashboardError::UnknownUnit(region.id));
        }
        view.selected_region = Some(region);
        view.drilldown_kind = DrilldownKind::Branch;
        Ok(())
    }

    /// Steps back one level; past the first level the drill-down closes
    pub fn back(&mut self) -> Stage {
        match self.stage() {
            Stage::BranchView => {
                // A region taken from the scope has no region list to return to.
                let scoped = self.view.as_ref().is_some_and(|v| v.scope.region_id().is_some());
                if scoped {
                    self.view = None;
                } else if let Some(view) = self.view.as_mut() {
                    view.selected_region = None;
                    view.drilldown_kind = DrilldownKind::Region;
                }
            }
            Stage::RegionView | Stage::UnitTypeView => self.view = None,
            Stage::Closed => {}
        }
        self.stage()
    }

    pub fn close(&mut self) {
        self.view = None;
    }

    pub fn set_tab(&mut self, tab: ResultTab) -> Result<()> {
        let view = self.view.as_mut().ok_or(DashboardError::DrilldownClosed)?;
        view.active_result_tab = tab;
        Ok(())
    }
}

/// Everything a renderer needs for the open drill-down
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DrilldownData {
    pub view: DrillDownView,
    pub stage: Stage,
    pub kpi_name: String,
    pub policy: ComparisonPolicy,
    /// All rows for the level, best first
    pub rows: Vec<UnitMetric>,
    pub ranking: Ranking,
}

impl DrilldownData {
    pub fn active_rows(&self) -> &[UnitMetric] {
        match self.view.active_result_tab {
            ResultTab::Top => &self.ranking.top,
            ResultTab::Worst => &self.ranking.worst,
        }
    }
}

/// Breakdown rows for the level a view is showing.
///
/// Branch rows narrow to the scoped branch when the scope names one.
/// Vehicle, route, transporter and order rows have no region of their own,
/// so they are scaled by the same share the KPI card gets under the scope.
pub fn rows_for(snapshot: &Snapshot, view: &DrillDownView) -> Vec<UnitMetric> {
    let Some(rows) = snapshot.breakdowns.get(&view.kpi_id) else {
        return Vec::new();
    };
    let unit_kind = view.drilldown_kind.unit_kind();
    let parent = match view.drilldown_kind {
        DrilldownKind::Branch => view.selected_region.as_ref().map(|r| r.id.as_str()),
        _ => None,
    };
    let branch = match (&view.drilldown_kind, &view.scope) {
        (DrilldownKind::Branch, Scope::RegionBranch { branch_id: Some(branch_id), .. }) => {
            Some(branch_id.as_str())
        }
        _ => None,
    };

    let level: Vec<UnitMetric> = rows
        .iter()
        .filter(|row| row.unit.kind == unit_kind)
        .filter(|row| parent.is_none() || row.unit.parent_id.as_deref() == parent)
        .filter(|row| branch.map_or(true, |id| row.unit.id == id))
        .cloned()
        .collect();

    match view.drilldown_kind {
        DrilldownKind::Region | DrilldownKind::Branch => level,
        _ => match snapshot.find_kpi(&view.kpi_id) {
            Some((_, kpi)) => scope::scale_rows(kpi, &view.scope, level),
            None => level,
        },
    }
}

pub fn resolve(snapshot: &Snapshot, view: &DrillDownView) -> Result<DrilldownData> {
    let (group, kpi) = snapshot
        .find_kpi(&view.kpi_id)
        .ok_or_else(|| DashboardError::UnknownKpi(view.kpi_id.clone()))?;
    let policy = group.comparison_policy;
    let rows = rows_for(snapshot, view);

    Ok(DrilldownData {
        view: view.clone(),
        stage: view.drilldown_kind.stage(),
        kpi_name: kpi.name.clone(),
        policy,
        ranking: rank(&rows, policy),
        rows: sort_best_first(&rows, policy),
    })
}
