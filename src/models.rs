use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Missing figures load as NaN and display as "N/A"
fn missing_value() -> f64 {
    f64::NAN
}

/// Accepts `null`, which is also how serde_json writes NaN
fn nullable_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Measurement unit of a KPI value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MetricUnit {
    Percent,
    Currency,
    Days,
    #[default]
    Count,
}

/// Coarse performance classification shown next to a KPI card
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PerformanceTag {
    Good,
    #[default]
    Average,
    Poor,
}

impl From<&str> for PerformanceTag {
    fn from(s: &str) -> Self {
        match s {
            "good" => PerformanceTag::Good,
            "poor" => PerformanceTag::Poor,
            _ => PerformanceTag::Average, // default
        }
    }
}

/// Region-specific figure for a KPI
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegionFigure {
    #[serde(default = "missing_value", deserialize_with = "nullable_value")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

/// A single KPI value for one snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub id: String,
    pub name: String,
    #[serde(default = "missing_value", deserialize_with = "nullable_value")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default)]
    pub unit: MetricUnit,
    #[serde(default)]
    pub performance_tag: PerformanceTag,
    /// Per-region breakdown keyed by region id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub regional: BTreeMap<String, RegionFigure>,
}

impl MetricRecord {
    pub fn is_count_like(&self) -> bool {
        self.unit == MetricUnit::Count
    }
}

/// Kind of organizational unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum UnitKind {
    Region,
    Branch,
    VehicleType,
    RouteType,
    Transporter,
    Order,
}

/// Region, branch, or an operational breakdown bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
    pub kind: UnitKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// One row of a drill-down table: a unit and its figure for a KPI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitMetric {
    pub unit: OrganizationalUnit,
    #[serde(default = "missing_value", deserialize_with = "nullable_value")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

impl UnitMetric {
    /// Value relative to budget when a positive budget exists
    pub fn budget_ratio(&self) -> Option<f64> {
        match self.budget {
            Some(b) if b > 0.0 => Some(self.value / b),
            _ => None,
        }
    }
}

/// Whether lower or higher values are better for a KPI family
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonPolicy {
    LowerIsBetter,
    HigherIsBetter,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiGroup {
    pub id: String,
    pub title: String,
    pub kpis: Vec<MetricRecord>,
    pub comparison_policy: ComparisonPolicy,
}

/// Status of an operational card
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CardStatus {
    Normal,
    Attention,
    Critical,
}

/// Card family, selects the status thresholds applied after each tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CardFamily {
    PendingOrders,
    Delays,
    Exceptions,
    /// Informational counters, never reclassified
    Volume,
}

/// How the simulator perturbs a card count
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DeltaMode {
    /// Uniform +/-5% of the current count
    Percent,
    /// Uniform integer step in [-2, 2]
    Step,
}

/// Counter shown on the operational view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationalCard {
    pub id: String,
    pub name: String,
    pub count: u32,
    pub status: CardStatus,
    pub trend: i32,
    pub family: CardFamily,
    pub delta_mode: DeltaMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationalGroup {
    pub id: String,
    pub title: String,
    pub cards: Vec<OperationalCard>,
}

/// Immutable point-in-time copy of the full metrics tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub groups: Vec<KpiGroup>,
    pub units: Vec<OrganizationalUnit>,
    /// Drill-down rows keyed by KPI id
    #[serde(default)]
    pub breakdowns: BTreeMap<String, Vec<UnitMetric>>,
    #[serde(default)]
    pub operational: Vec<OperationalGroup>,
}

impl Snapshot {
    pub fn find_kpi(&self, kpi_id: &str) -> Option<(&KpiGroup, &MetricRecord)> {
        self.groups
            .iter()
            .find_map(|g| g.kpis.iter().find(|k| k.id == kpi_id).map(|k| (g, k)))
    }

    pub fn find_unit(&self, unit_id: &str) -> Option<&OrganizationalUnit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    pub fn regions(&self) -> impl Iterator<Item = &OrganizationalUnit> {
        self.units.iter().filter(|u| u.kind == UnitKind::Region)
    }

    pub fn branches_of<'a>(
        &'a self,
        region_id: &'a str,
    ) -> impl Iterator<Item = &'a OrganizationalUnit> {
        self.units.iter().filter(move |u| {
            u.kind == UnitKind::Branch && u.parent_id.as_deref() == Some(region_id)
        })
    }
}

/// Raw payload supplied by a data source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub groups: Vec<KpiGroup>,
    pub units: Vec<OrganizationalUnit>,
    #[serde(default)]
    pub breakdowns: BTreeMap<String, Vec<UnitMetric>>,
    #[serde(default)]
    pub operational: Vec<OperationalGroup>,
}

impl Dataset {
    pub fn into_snapshot(self, generated_at: DateTime<Utc>) -> Snapshot {
        Snapshot {
            generated_at,
            groups: self.groups,
            units: self.units,
            breakdowns: self.breakdowns,
            operational: self.operational,
        }
    }
}

/// Organizational granularity at which metrics are viewed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Scope {
    #[default]
    All,
    #[serde(rename_all = "camelCase")]
    Region { region_id: String },
    #[serde(rename_all = "camelCase")]
    RegionBranch {
        region_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_id: Option<String>,
    },
}

impl Scope {
    pub fn region_id(&self) -> Option<&str> {
        match self {
            Scope::All => None,
            Scope::Region { region_id } | Scope::RegionBranch { region_id, .. } => Some(region_id),
        }
    }
}

/// Viewer role, advisory only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role")]
pub enum Role {
    #[serde(rename = "CXO")]
    Cxo,
    CompanyUser,
    #[serde(rename_all = "camelCase")]
    BranchUser { region_id: String, branch_id: String },
}

impl Role {
    /// Branch users never get the region/branch selector
    pub fn shows_scope_selector(&self) -> bool {
        !matches!(self, Role::BranchUser { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Cxo => "CXO",
            Role::CompanyUser => "Company User",
            Role::BranchUser { .. } => "Branch User",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_wire_format() {
        let scope: Scope =
            serde_json::from_str(r#"{"mode":"region-branch","regionId":"north"}"#).unwrap();
        assert_eq!(
            scope,
            Scope::RegionBranch { region_id: "north".into(), branch_id: None }
        );

        let all: Scope = serde_json::from_str(r#"{"mode":"all"}"#).unwrap();
        assert_eq!(all, Scope::All);
        assert_eq!(all.region_id(), None);
    }

    #[test]
    fn test_role_wire_format() {
        let role: Role = serde_json::from_str(r#"{"role":"CXO"}"#).unwrap();
        assert_eq!(role, Role::Cxo);

        let branch: Role = serde_json::from_str(
            r#"{"role":"BranchUser","regionId":"north","branchId":"north-1"}"#,
        )
        .unwrap();
        assert!(!branch.shows_scope_selector());
        assert_eq!(branch.label(), "Branch User");
    }

    #[test]
    fn test_budget_ratio_ignores_zero_budget() {
        let unit = OrganizationalUnit {
            id: "r".into(),
            name: "R".into(),
            kind: UnitKind::Region,
            parent_id: None,
        };
        let row = UnitMetric { unit: unit.clone(), value: 10.0, budget: Some(0.0) };
        assert_eq!(row.budget_ratio(), None);

        let row = UnitMetric { unit, value: 10.0, budget: Some(20.0) };
        assert_eq!(row.budget_ratio(), Some(0.5));
    }

    #[test]
    fn test_unknown_tag_defaults_to_average() {
        assert_eq!(PerformanceTag::from("excellent"), PerformanceTag::Average);
        assert_eq!(PerformanceTag::from("good"), PerformanceTag::Good);
    }
}
