//! Built-in demo dataset
//!
//! Generates a plausible network (regions, branches, fleet buckets,
//! transporters, open orders) and KPI figures from a seed, so every run with
//! the same seed shows the same dashboard.

use chrono::Utc;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

use crate::kpi_catalog::{
    AVG_TRANSIT_DAYS, FREIGHT_BUDGET_ACTUAL, FREIGHT_COST_PER_KM, OTIF, PLACEMENT_EFFICIENCY,
    UNASSIGNED_ORDERS, VEHICLE_UTILIZATION,
};
use crate::models::{
    CardFamily, CardStatus, ComparisonPolicy, Dataset, DeltaMode, KpiGroup, MetricRecord,
    MetricUnit, OperationalCard, OperationalGroup, OrganizationalUnit, PerformanceTag,
    RegionFigure, Snapshot, UnitKind, UnitMetric,
};

/// (region id, region name, branches)
const NETWORK: &[(&str, &str, &[&str])] = &[
    ("north", "North", &["Albany", "Syracuse", "Buffalo"]),
    ("south", "South", &["Dallas", "Austin", "Houston"]),
    ("east", "East", &["Newark", "Philadelphia", "Baltimore"]),
    ("west", "West", &["Oakland", "Fresno", "Sacramento"]),
    ("central", "Central", &["Chicago", "Indianapolis", "Columbus"]),
];

const VEHICLE_TYPES: &[&str] = &["20ft Container", "32ft MXL", "Trailer", "LCV", "Reefer"];

const ROUTE_TYPES: &[&str] = &["Line Haul", "Milk Run", "Last Mile", "Inter-Branch"];

const TRANSPORTERS: &[&str] = &[
    "XPO Logistics",
    "Old Dominion",
    "Estes Express",
    "Saia LTL",
    "ABF Freight",
    "R+L Carriers",
    "J.B. Hunt",
    "Schneider National",
];

const OPEN_ORDERS: usize = 8;

/// Generation profile for one KPI
struct KpiDef {
    id: &'static str,
    name: &'static str,
    unit: MetricUnit,
    /// Typical per-unit value and spread
    base: f64,
    spread: f64,
    target: Option<f64>,
    /// Budget coverage factor for budget KPIs
    budget_factor: Option<f64>,
}

struct GroupDef {
    id: &'static str,
    title: &'static str,
    policy: ComparisonPolicy,
    kpis: Vec<KpiDef>,
}

fn group_definitions() -> Vec<GroupDef> {
    vec![
        GroupDef {
            id: "freight_cost",
            title: "Freight Cost",
            policy: ComparisonPolicy::LowerIsBetter,
            kpis: vec![
                KpiDef {
                    id: FREIGHT_COST_PER_KM,
                    name: "Freight Cost per KM",
                    unit: MetricUnit::Currency,
                    base: 42.0,
                    spread: 6.0,
                    target: Some(40.0),
                    budget_factor: None,
                },
                KpiDef {
                    id: FREIGHT_BUDGET_ACTUAL,
                    name: "Freight Budget vs Actual",
                    unit: MetricUnit::Currency,
                    base: 240_000.0,
                    spread: 40_000.0,
                    target: None,
                    budget_factor: Some(1.05),
                },
            ],
        },
        GroupDef {
            id: "fleet_performance",
            title: "Fleet Performance",
            policy: ComparisonPolicy::HigherIsBetter,
            kpis: vec![
                KpiDef {
                    id: VEHICLE_UTILIZATION,
                    name: "Vehicle Utilization",
                    unit: MetricUnit::Percent,
                    base: 78.0,
                    spread: 9.0,
                    target: Some(85.0),
                    budget_factor: None,
                },
                KpiDef {
                    id: OTIF,
                    name: "OTIF",
                    unit: MetricUnit::Percent,
                    base: 91.0,
                    spread: 5.0,
                    target: Some(95.0),
                    budget_factor: None,
                },
                KpiDef {
                    id: PLACEMENT_EFFICIENCY,
                    name: "Placement Efficiency",
                    unit: MetricUnit::Percent,
                    base: 88.0,
                    spread: 7.0,
                    target: Some(92.0),
                    budget_factor: None,
                },
            ],
        },
        GroupDef {
            id: "transit",
            title: "Transit",
            policy: ComparisonPolicy::LowerIsBetter,
            kpis: vec![KpiDef {
                id: AVG_TRANSIT_DAYS,
                name: "Average Transit Days",
                unit: MetricUnit::Days,
                base: 3.2,
                spread: 0.8,
                target: Some(3.0),
                budget_factor: None,
            }],
        },
        GroupDef {
            id: "pending_actions",
            title: "Pending Actions",
            policy: ComparisonPolicy::LowerIsBetter,
            kpis: vec![KpiDef {
                id: UNASSIGNED_ORDERS,
                name: "Unassigned Orders",
                unit: MetricUnit::Count,
                base: 9.0,
                spread: 5.0,
                target: Some(5.0),
                budget_factor: None,
            }],
        },
    ]
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn demo_units() -> Vec<OrganizationalUnit> {
    let mut units = Vec::new();
    for (region_id, region_name, branches) in NETWORK {
        units.push(OrganizationalUnit {
            id: region_id.to_string(),
            name: region_name.to_string(),
            kind: UnitKind::Region,
            parent_id: None,
        });
        for (i, branch) in branches.iter().enumerate() {
            units.push(OrganizationalUnit {
                id: format!("{}-{}", region_id, i + 1),
                name: branch.to_string(),
                kind: UnitKind::Branch,
                parent_id: Some(region_id.to_string()),
            });
        }
    }
    let flat = [
        (UnitKind::VehicleType, VEHICLE_TYPES),
        (UnitKind::RouteType, ROUTE_TYPES),
        (UnitKind::Transporter, TRANSPORTERS),
    ];
    for (kind, names) in flat {
        units.extend(names.iter().map(|name| OrganizationalUnit {
            id: slug(name),
            name: name.to_string(),
            kind,
            parent_id: None,
        }));
    }
    units.extend((0..OPEN_ORDERS).map(|i| OrganizationalUnit {
        id: format!("ORD-{:05}", 10_231 + i * 17),
        name: format!("Order {:05}", 10_231 + i * 17),
        kind: UnitKind::Order,
        parent_id: None,
    }));
    units
}

fn sample(def: &KpiDef, rng: &mut StdRng) -> f64 {
    let v = def.base + rng.gen_range(-def.spread..=def.spread);
    match def.unit {
        MetricUnit::Count => v.round().max(1.0),
        MetricUnit::Percent => (v * 10.0).round() / 10.0,
        MetricUnit::Days => (v * 100.0).round() / 100.0,
        MetricUnit::Currency => v.round(),
    }
}

fn budget_for(def: &KpiDef, value: f64, rng: &mut StdRng) -> Option<f64> {
    def.budget_factor
        .map(|factor| (value * factor * rng.gen_range(0.85..=1.15) / 1000.0).round() * 1000.0)
}

fn tag_for(
    value: f64,
    target: Option<f64>,
    budget: Option<f64>,
    policy: ComparisonPolicy,
) -> PerformanceTag {
    let Some(goal) = target.or(budget) else {
        return PerformanceTag::Average;
    };
    let ratio = match policy {
        ComparisonPolicy::LowerIsBetter => goal / value,
        ComparisonPolicy::HigherIsBetter => value / goal,
    };
    if ratio >= 1.0 {
        PerformanceTag::Good
    } else if ratio >= 0.95 {
        PerformanceTag::Average
    } else {
        PerformanceTag::Poor
    }
}

fn rows_for_kpi(def: &KpiDef, units: &[OrganizationalUnit], rng: &mut StdRng) -> Vec<UnitMetric> {
    units
        .iter()
        .filter(|u| match u.kind {
            UnitKind::Order => def.id == UNASSIGNED_ORDERS,
            _ => true,
        })
        .map(|unit| {
            let value = match unit.kind {
                UnitKind::Order => rng.gen_range(1.0_f64..=6.0).round(),
                _ => sample(def, rng),
            };
            UnitMetric {
                unit: unit.clone(),
                value,
                budget: budget_for(def, value, rng),
            }
        })
        .collect()
}

fn aggregate(def: &KpiDef, regional: &BTreeMap<String, RegionFigure>) -> (f64, Option<f64>) {
    let n = regional.len().max(1) as f64;
    let total: f64 = regional.values().map(|f| f.value).sum();
    let budget: Option<f64> = def
        .budget_factor
        .map(|_| regional.values().filter_map(|f| f.budget).sum());
    match def.unit {
        MetricUnit::Count => (total, budget),
        MetricUnit::Currency if def.budget_factor.is_some() => (total, budget),
        _ => (((total / n) * 100.0).round() / 100.0, budget),
    }
}

pub fn demo_dataset(seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let units = demo_units();
    let mut breakdowns = BTreeMap::new();

    let groups = group_definitions()
        .into_iter()
        .map(|group| {
            let kpis = group
                .kpis
                .iter()
                .map(|def| {
                    let rows = rows_for_kpi(def, &units, &mut rng);
                    let regional: BTreeMap<String, RegionFigure> = rows
                        .iter()
                        .filter(|r| r.unit.kind == UnitKind::Region)
                        .map(|r| {
                            let figure = RegionFigure { value: r.value, budget: r.budget };
                            (r.unit.id.clone(), figure)
                        })
                        .collect();
                    let (value, budget) = aggregate(def, &regional);
                    breakdowns.insert(def.id.to_string(), rows);

                    MetricRecord {
                        id: def.id.to_string(),
                        name: def.name.to_string(),
                        value,
                        target: def.target,
                        budget,
                        unit: def.unit,
                        performance_tag: tag_for(value, def.target, budget, group.policy),
                        regional,
                    }
                })
                .collect();
            KpiGroup {
                id: group.id.to_string(),
                title: group.title.to_string(),
                kpis,
                comparison_policy: group.policy,
            }
        })
        .collect();

    Dataset {
        groups,
        units,
        breakdowns,
        operational: demo_operational(&mut rng),
    }
}

fn demo_card(
    id: &str,
    name: &str,
    family: CardFamily,
    delta_mode: DeltaMode,
    count: u32,
) -> OperationalCard {
    let status = family
        .thresholds()
        .map(|t| t.classify(count))
        .unwrap_or(CardStatus::Normal);
    OperationalCard {
        id: id.to_string(),
        name: name.to_string(),
        count,
        status,
        trend: 0,
        family,
        delta_mode,
    }
}

fn demo_operational(rng: &mut StdRng) -> Vec<OperationalGroup> {
    vec![
        OperationalGroup {
            id: "pending_actions".to_string(),
            title: "Pending Actions".to_string(),
            cards: vec![
                demo_card(
                    UNASSIGNED_ORDERS,
                    "Unassigned Orders",
                    CardFamily::PendingOrders,
                    DeltaMode::Step,
                    rng.gen_range(18..=45),
                ),
                demo_card(
                    "pending_pods",
                    "Pending PODs",
                    CardFamily::PendingOrders,
                    DeltaMode::Percent,
                    rng.gen_range(10..=40),
                ),
            ],
        },
        OperationalGroup {
            id: "in_transit".to_string(),
            title: "In Transit".to_string(),
            cards: vec![
                demo_card(
                    "delayed_trips",
                    "Delayed Trips",
                    CardFamily::Delays,
                    DeltaMode::Percent,
                    rng.gen_range(4..=20),
                ),
                demo_card(
                    "eta_breaches",
                    "ETA Breaches",
                    CardFamily::Delays,
                    DeltaMode::Step,
                    rng.gen_range(2..=12),
                ),
            ],
        },
        OperationalGroup {
            id: "exceptions".to_string(),
            title: "Exceptions".to_string(),
            cards: vec![
                demo_card(
                    "damaged_shipments",
                    "Damaged Shipments",
                    CardFamily::Exceptions,
                    DeltaMode::Step,
                    rng.gen_range(1..=8),
                ),
                demo_card(
                    "detention_alerts",
                    "Detention Alerts",
                    CardFamily::Exceptions,
                    DeltaMode::Step,
                    rng.gen_range(2..=14),
                ),
            ],
        },
        OperationalGroup {
            id: "today".to_string(),
            title: "Today".to_string(),
            cards: vec![
                demo_card(
                    "trips_today",
                    "Trips Today",
                    CardFamily::Volume,
                    DeltaMode::Percent,
                    rng.gen_range(180..=260),
                ),
                demo_card(
                    "vehicles_on_road",
                    "Vehicles on Road",
                    CardFamily::Volume,
                    DeltaMode::Percent,
                    rng.gen_range(90..=140),
                ),
            ],
        },
    ]
}

pub fn demo_snapshot(seed: u64) -> Snapshot {
    demo_dataset(seed).into_snapshot(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_dataset() {
        let a = serde_json::to_value(demo_dataset(5)).unwrap();
        let b = serde_json::to_value(demo_dataset(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_network_shape() {
        let snapshot = demo_snapshot(1);
        assert_eq!(snapshot.regions().count(), NETWORK.len());
        for region in snapshot.regions() {
            assert_eq!(snapshot.branches_of(&region.id).count(), 3);
        }
    }

    #[test]
    fn test_every_kpi_has_regional_figures_and_rows() {
        let snapshot = demo_snapshot(2);
        for group in &snapshot.groups {
            for kpi in &group.kpis {
                assert_eq!(kpi.regional.len(), NETWORK.len(), "{}", kpi.id);
                assert!(!snapshot.breakdowns[&kpi.id].is_empty());
            }
        }
        let (_, budget_kpi) = snapshot.find_kpi(FREIGHT_BUDGET_ACTUAL).unwrap();
        assert!(budget_kpi.budget.is_some());
        assert!(budget_kpi.regional.values().all(|f| f.budget.is_some()));
    }

    #[test]
    fn test_order_rows_only_for_unassigned_orders() {
        let snapshot = demo_snapshot(3);
        let has_orders = |kpi: &str| {
            snapshot.breakdowns[kpi].iter().any(|r| r.unit.kind == UnitKind::Order)
        };
        assert!(has_orders(UNASSIGNED_ORDERS));
        assert!(!has_orders(OTIF));
    }
}
