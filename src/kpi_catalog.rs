//! KPI drill-down lookup table
//! Maps a KPI id and the viewer's role class to the breakdown opened on click

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::drilldown::DrilldownKind;
use crate::models::Role;

pub const FREIGHT_COST_PER_KM: &str = "freight_cost_per_km";
pub const FREIGHT_BUDGET_ACTUAL: &str = "freight_budget_actual";
pub const VEHICLE_UTILIZATION: &str = "vehicle_utilization";
pub const AVG_TRANSIT_DAYS: &str = "avg_transit_days";
pub const OTIF: &str = "otif";
pub const PLACEMENT_EFFICIENCY: &str = "placement_efficiency";
pub const UNASSIGNED_ORDERS: &str = "unassigned_orders";

/// Company-wide roles share one drill-down layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleClass {
    Company,
    Branch,
}

impl From<&Role> for RoleClass {
    fn from(role: &Role) -> Self {
        match role {
            Role::Cxo | Role::CompanyUser => RoleClass::Company,
            Role::BranchUser { .. } => RoleClass::Branch,
        }
    }
}

/// Drill-down kind per role class: (company, branch)
pub static DRILLDOWN_KINDS: LazyLock<HashMap<&'static str, (DrilldownKind, DrilldownKind)>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();

        // Geographic KPIs
        m.insert(FREIGHT_COST_PER_KM, (DrilldownKind::Region, DrilldownKind::VehicleType));
        m.insert(FREIGHT_BUDGET_ACTUAL, (DrilldownKind::Region, DrilldownKind::RouteType));
        m.insert(VEHICLE_UTILIZATION, (DrilldownKind::Region, DrilldownKind::VehicleType));
        m.insert(AVG_TRANSIT_DAYS, (DrilldownKind::Region, DrilldownKind::RouteType));

        // Operational KPIs break down by transporter at every level
        m.insert(OTIF, (DrilldownKind::Transporter, DrilldownKind::Transporter));
        m.insert(PLACEMENT_EFFICIENCY, (DrilldownKind::Transporter, DrilldownKind::Transporter));

        m.insert(UNASSIGNED_ORDERS, (DrilldownKind::Order, DrilldownKind::Order));

        m
    });

fn default_kind(class: RoleClass) -> DrilldownKind {
    match class {
        RoleClass::Company => DrilldownKind::Region,
        RoleClass::Branch => DrilldownKind::VehicleType,
    }
}

/// Falls back to the role's default layout for unlisted KPIs
pub fn drilldown_kind(role: &Role, kpi_id: &str) -> DrilldownKind {
    let class = RoleClass::from(role);
    match DRILLDOWN_KINDS.get(kpi_id) {
        Some((company, branch)) => match class {
            RoleClass::Company => *company,
            RoleClass::Branch => *branch,
        },
        None => default_kind(class),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch_user() -> Role {
        Role::BranchUser { region_id: "north".into(), branch_id: "north-1".into() }
    }

    #[test]
    fn test_company_roles_share_layout() {
        for kpi in [FREIGHT_COST_PER_KM, OTIF, UNASSIGNED_ORDERS] {
            assert_eq!(drilldown_kind(&Role::Cxo, kpi), drilldown_kind(&Role::CompanyUser, kpi));
        }
        assert_eq!(drilldown_kind(&Role::Cxo, FREIGHT_BUDGET_ACTUAL), DrilldownKind::Region);
        assert_eq!(drilldown_kind(&Role::Cxo, PLACEMENT_EFFICIENCY), DrilldownKind::Transporter);
    }

    #[test]
    fn test_branch_role_never_gets_geography() {
        let role = branch_user();
        for kpi in DRILLDOWN_KINDS.keys() {
            let kind = drilldown_kind(&role, kpi);
            assert!(kind != DrilldownKind::Region && kind != DrilldownKind::Branch, "{kpi}");
        }
        assert_eq!(drilldown_kind(&role, FREIGHT_BUDGET_ACTUAL), DrilldownKind::RouteType);
    }

    #[test]
    fn test_unknown_kpi_uses_role_default() {
        assert_eq!(drilldown_kind(&Role::CompanyUser, "dock_dwell"), DrilldownKind::Region);
        assert_eq!(drilldown_kind(&branch_user(), "dock_dwell"), DrilldownKind::VehicleType);
    }
}
