//! Projects the metrics tree down to the values visible for a scope and role
//!
//! Region scope substitutes each KPI's regional figure. Branch scope has no
//! real branch-level data behind it: it takes the region figure and applies
//! a fixed branch share (`BRANCH_SHARE`). This is an approximation kept for
//! parity with the dashboard's demo numbers, not an aggregation.

use serde::Serialize;

use crate::error::DashboardError;
use crate::models::{
    KpiGroup, MetricRecord, OrganizationalUnit, Role, Scope, Snapshot, UnitKind, UnitMetric,
};

/// Share of a region's figure attributed to a single branch
pub const BRANCH_SHARE: f64 = 0.3;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScopedMetrics {
    /// Scope actually applied after role overrides
    pub scope: Scope,
    pub groups: Vec<KpiGroup>,
    /// KPI ids that had no figure for the scoped region and kept their aggregate value
    pub fallbacks: Vec<String>,
}

/// Branch users always see their own branch, whatever was requested
pub fn effective_scope(scope: &Scope, role: &Role) -> Scope {
    match role {
        Role::BranchUser { region_id, branch_id } => Scope::RegionBranch {
            region_id: region_id.clone(),
            branch_id: Some(branch_id.clone()),
        },
        Role::Cxo | Role::CompanyUser => scope.clone(),
    }
}

pub fn filter_by_scope(groups: &[KpiGroup], scope: &Scope, role: &Role) -> ScopedMetrics {
    let scope = effective_scope(scope, role);
    let mut fallbacks = Vec::new();

    let groups = match &scope {
        Scope::All => groups.to_vec(),
        Scope::Region { region_id } => scope_groups(groups, region_id, 1.0, &mut fallbacks),
        Scope::RegionBranch { region_id, .. } => {
            scope_groups(groups, region_id, BRANCH_SHARE, &mut fallbacks)
        }
    };

    ScopedMetrics { scope, groups, fallbacks }
}

fn scope_groups(
    groups: &[KpiGroup],
    region_id: &str,
    share: f64,
    fallbacks: &mut Vec<String>,
) -> Vec<KpiGroup> {
    groups
        .iter()
        .map(|group| KpiGroup {
            kpis: group
                .kpis
                .iter()
                .map(|kpi| match scope_record(kpi, region_id, share) {
                    Some(scoped) => scoped,
                    None => {
                        fallbacks.push(kpi.id.clone());
                        kpi.clone()
                    }
                })
                .collect(),
            ..group.clone()
        })
        .collect()
}

/// Always derived from the breakdown, never from `value`, so re-scoping is stable.
fn scope_record(kpi: &MetricRecord, region_id: &str, share: f64) -> Option<MetricRecord> {
    let figure = kpi.regional.get(region_id)?;
    Some(MetricRecord {
        value: figure.value * share,
        budget: figure.budget.or(kpi.budget),
        ..kpi.clone()
    })
}

/// Scoped card value over the aggregate value. 1.0 for `All` and for KPIs
/// that fall back to their aggregate under the scope.
pub fn scope_share(kpi: &MetricRecord, scope: &Scope) -> f64 {
    let share = match scope {
        Scope::All => return 1.0,
        Scope::Region { .. } => 1.0,
        Scope::RegionBranch { .. } => BRANCH_SHARE,
    };
    let Some(figure) = scope.region_id().and_then(|id| kpi.regional.get(id)) else {
        return 1.0;
    };
    if !kpi.value.is_finite() || kpi.value == 0.0 {
        return 1.0;
    }
    figure.value * share / kpi.value
}

/// Applies `scope_share` to breakdown rows that carry no region of their own
pub fn scale_rows(kpi: &MetricRecord, scope: &Scope, rows: Vec<UnitMetric>) -> Vec<UnitMetric> {
    let factor = scope_share(kpi, scope);
    if factor == 1.0 {
        return rows;
    }
    let count_like = kpi.is_count_like();
    rows.into_iter()
        .map(|row| {
            let value = row.value * factor;
            UnitMetric {
                value: if count_like { value.round().max(1.0) } else { value },
                budget: row.budget.map(|b| b * factor),
                ..row
            }
        })
        .collect()
}

/// Regions and branches a viewer may pick from; empty for branch users
pub fn scope_options(
    snapshot: &Snapshot,
    role: &Role,
) -> Vec<(OrganizationalUnit, Vec<OrganizationalUnit>)> {
    if !role.shows_scope_selector() {
        return Vec::new();
    }
    snapshot
        .regions()
        .map(|region| (region.clone(), snapshot.branches_of(&region.id).cloned().collect()))
        .collect()
}

/// Checks that a requested scope names units present in the snapshot
pub fn validate_scope(snapshot: &Snapshot, scope: &Scope) -> Result<(), DashboardError> {
    let Some(region_id) = scope.region_id() else {
        return Ok(());
    };
    match snapshot.find_unit(region_id) {
        Some(unit) if unit.kind == UnitKind::Region => {}
        _ => return Err(DashboardError::UnknownUnit(region_id.to_string())),
    }
    if let Scope::RegionBranch { branch_id: Some(branch_id), .. } = scope {
        let belongs = snapshot.branches_of(region_id).any(|b| &b.id == branch_id);
        if !belongs {
            return Err(DashboardError::UnknownUnit(branch_id.clone()));
        }
    }
    Ok(())
}
