//! Live update simulation
//!
//! Produces the next snapshot from the current one with bounded random
//! perturbation and recomputed card statuses. The random source is passed
//! in so ticks are reproducible under a seeded generator.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::BTreeMap;

use crate::models::{
    CardFamily, CardStatus, DeltaMode, KpiGroup, MetricRecord, OperationalCard, OperationalGroup,
    RegionFigure, Snapshot, UnitMetric,
};

/// Maximum relative change per tick (+/-5%)
pub const MAX_RELATIVE_DELTA: f64 = 0.05;

/// Maximum absolute change per tick for step cards
pub const MAX_STEP_DELTA: i32 = 2;

/// Lowest value a count-like field may take
pub const COUNT_FLOOR: u32 = 1;

/// Status thresholds, both exclusive lower bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusThresholds {
    pub critical_above: u32,
    pub attention_above: u32,
}

impl StatusThresholds {
    pub fn classify(&self, count: u32) -> CardStatus {
        if count > self.critical_above {
            CardStatus::Critical
        } else if count > self.attention_above {
            CardStatus::Attention
        } else {
            CardStatus::Normal
        }
    }
}

impl CardFamily {
    pub fn thresholds(&self) -> Option<StatusThresholds> {
        match self {
            CardFamily::PendingOrders => {
                Some(StatusThresholds { critical_above: 30, attention_above: 20 })
            }
            CardFamily::Delays => Some(StatusThresholds { critical_above: 15, attention_above: 8 }),
            CardFamily::Exceptions => {
                Some(StatusThresholds { critical_above: 10, attention_above: 5 })
            }
            CardFamily::Volume => None,
        }
    }
}

pub fn simulate_tick<R: Rng + ?Sized>(
    snapshot: &Snapshot,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Snapshot {
    let groups: Vec<KpiGroup> = snapshot
        .groups
        .iter()
        .map(|group| KpiGroup {
            kpis: group.kpis.iter().map(|kpi| jitter_record(kpi, rng)).collect(),
            ..group.clone()
        })
        .collect();

    let breakdowns: BTreeMap<String, Vec<UnitMetric>> = snapshot
        .breakdowns
        .iter()
        .map(|(kpi_id, rows)| {
            let count_like = snapshot
                .find_kpi(kpi_id)
                .map(|(_, kpi)| kpi.is_count_like())
                .unwrap_or(false);
            let rows = rows
                .iter()
                .map(|row| UnitMetric {
                    value: jitter_value(row.value, count_like, rng),
                    ..row.clone()
                })
                .collect();
            (kpi_id.clone(), rows)
        })
        .collect();

    let operational: Vec<OperationalGroup> = snapshot
        .operational
        .iter()
        .map(|group| OperationalGroup {
            cards: group.cards.iter().map(|card| tick_card(card, rng)).collect(),
            ..group.clone()
        })
        .collect();

    Snapshot {
        generated_at: now,
        groups,
        units: snapshot.units.clone(),
        breakdowns,
        operational,
    }
}

fn relative_delta<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(-MAX_RELATIVE_DELTA..=MAX_RELATIVE_DELTA)
}

/// Rounds up with probability equal to the fractional part, so small
/// counts still move under a few percent of jitter.
fn round_count<R: Rng + ?Sized>(value: f64, rng: &mut R) -> f64 {
    (value + rng.gen::<f64>()).floor().max(COUNT_FLOOR as f64)
}

fn jitter_value<R: Rng + ?Sized>(value: f64, count_like: bool, rng: &mut R) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let next = value * (1.0 + relative_delta(rng));
    if count_like {
        round_count(next, rng)
    } else {
        next
    }
}

fn jitter_record<R: Rng + ?Sized>(kpi: &MetricRecord, rng: &mut R) -> MetricRecord {
    let count_like = kpi.is_count_like();
    let regional: BTreeMap<String, RegionFigure> = kpi
        .regional
        .iter()
        .map(|(region, figure)| {
            let figure = RegionFigure {
                value: jitter_value(figure.value, count_like, rng),
                budget: figure.budget,
            };
            (region.clone(), figure)
        })
        .collect();

    MetricRecord {
        value: jitter_value(kpi.value, count_like, rng),
        regional,
        ..kpi.clone()
    }
}

fn tick_card<R: Rng + ?Sized>(card: &OperationalCard, rng: &mut R) -> OperationalCard {
    let count = match card.delta_mode {
        DeltaMode::Percent => {
            let next = card.count as f64 * (1.0 + relative_delta(rng));
            round_count(next, rng) as u32
        }
        DeltaMode::Step => {
            let step = rng.gen_range(-MAX_STEP_DELTA..=MAX_STEP_DELTA);
            (card.count as i64 + step as i64).max(COUNT_FLOOR as i64) as u32
        }
    };

    // Unclassified families keep last tick's trend.
    let (status, trend) = match card.family.thresholds() {
        Some(thresholds) => (thresholds.classify(count), count as i32 - card.count as i32),
        None => (card.status, card.trend),
    };

    OperationalCard { count, status, trend, ..card.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparisonPolicy, MetricUnit, OrganizationalUnit, PerformanceTag, UnitKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn card(id: &str, count: u32, family: CardFamily, delta_mode: DeltaMode) -> OperationalCard {
        OperationalCard {
            id: id.into(),
            name: id.replace('_', " "),
            count,
            status: CardStatus::Normal,
            trend: 7,
            family,
            delta_mode,
        }
    }

    fn kpi(id: &str, value: f64, unit: MetricUnit) -> MetricRecord {
        MetricRecord {
            id: id.into(),
            name: id.into(),
            value,
            target: None,
            budget: Some(100.0),
            unit,
            performance_tag: PerformanceTag::Average,
            regional: BTreeMap::from([("north".to_string(), RegionFigure { value, budget: None })]),
        }
    }

    fn snapshot() -> Snapshot {
        let region = OrganizationalUnit {
            id: "north".into(),
            name: "North".into(),
            kind: UnitKind::Region,
            parent_id: None,
        };
        Snapshot {
            generated_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            groups: vec![KpiGroup {
                id: "ops".into(),
                title: "Ops".into(),
                kpis: vec![
                    kpi("unassigned_orders", 1.0, MetricUnit::Count),
                    kpi("otif", 92.0, MetricUnit::Percent),
                ],
                comparison_policy: ComparisonPolicy::HigherIsBetter,
            }],
            units: vec![region.clone()],
            breakdowns: BTreeMap::from([(
                "unassigned_orders".to_string(),
                vec![UnitMetric { unit: region, value: 1.0, budget: None }],
            )]),
            operational: vec![OperationalGroup {
                id: "pending".into(),
                title: "Pending Actions".into(),
                cards: vec![
                    card("unassigned_orders", 1, CardFamily::PendingOrders, DeltaMode::Step),
                    card("delayed_trips", 40, CardFamily::Delays, DeltaMode::Percent),
                    card("trips_today", 120, CardFamily::Volume, DeltaMode::Percent),
                ],
            }],
        }
    }

    #[test]
    fn test_thresholds() {
        let t = CardFamily::PendingOrders.thresholds().unwrap();
        assert_eq!(t.classify(42), CardStatus::Critical);
        assert_eq!(t.classify(31), CardStatus::Critical);
        assert_eq!(t.classify(30), CardStatus::Attention);
        assert_eq!(t.classify(21), CardStatus::Attention);
        assert_eq!(t.classify(20), CardStatus::Normal);
        assert!(CardFamily::Volume.thresholds().is_none());
    }

    #[test]
    fn test_count_fields_never_drop_below_floor() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut snap = snapshot();
        let now = snap.generated_at;
        for _ in 0..500 {
            snap = simulate_tick(&snap, &mut rng, now);
            for group in &snap.operational {
                for c in &group.cards {
                    assert!(c.count >= COUNT_FLOOR, "{} dropped to {}", c.id, c.count);
                }
            }
            let (_, orders) = snap.find_kpi("unassigned_orders").unwrap();
            assert!(orders.value >= 1.0);
            assert!(orders.regional["north"].value >= 1.0);
            assert!(snap.breakdowns["unassigned_orders"][0].value >= 1.0);
        }
    }

    #[test]
    fn test_deltas_are_bounded() {
        let mut rng = StdRng::seed_from_u64(42);
        let before = snapshot();
        for _ in 0..200 {
            let after = simulate_tick(&before, &mut rng, before.generated_at);
            let (_, otif) = after.find_kpi("otif").unwrap();
            assert!(otif.value >= 92.0 * 0.95 - 1e-9 && otif.value <= 92.0 * 1.05 + 1e-9);
            assert_eq!(otif.budget, Some(100.0));

            let step = &after.operational[0].cards[0];
            assert!(step.count <= 3);
            let delayed = &after.operational[0].cards[1];
            assert!((38..=42).contains(&delayed.count));
        }
    }

    #[test]
    fn test_reclassified_cards_recompute_trend() {
        let mut rng = StdRng::seed_from_u64(1);
        let before = snapshot();
        let after = simulate_tick(&before, &mut rng, before.generated_at);

        let delayed = &after.operational[0].cards[1];
        assert_eq!(delayed.trend, delayed.count as i32 - 40);
        assert_eq!(delayed.status, CardStatus::Critical);
    }

    #[test]
    fn test_unclassified_cards_keep_stale_trend() {
        let mut rng = StdRng::seed_from_u64(3);
        let before = snapshot();
        let after = simulate_tick(&before, &mut rng, before.generated_at);

        let volume = &after.operational[0].cards[2];
        assert_eq!(volume.trend, 7);
        assert_eq!(volume.status, CardStatus::Normal);
    }

    #[test]
    fn test_small_counts_keep_moving() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut snap = snapshot();
        snap.operational[0].cards[1].count = 9;
        snap.groups[0].kpis[0].value = 9.0;
        let now = snap.generated_at;

        let mut cards = std::collections::BTreeSet::new();
        let mut records = std::collections::BTreeSet::new();
        let mut trend_seen = false;
        for _ in 0..200 {
            snap = simulate_tick(&snap, &mut rng, now);
            let delayed = &snap.operational[0].cards[1];
            cards.insert(delayed.count);
            trend_seen |= delayed.trend != 0;
            records.insert(snap.groups[0].kpis[0].value as u32);
        }
        assert!(cards.len() > 1, "card stuck at {:?}", cards);
        assert!(trend_seen);
        assert!(records.len() > 1, "record stuck at {:?}", records);
    }

    #[test]
    fn test_missing_values_stay_missing() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut snap = snapshot();
        snap.groups[0].kpis[1].value = f64::NAN;
        let after = simulate_tick(&snap, &mut rng, snap.generated_at);
        assert!(after.find_kpi("otif").unwrap().1.value.is_nan());
    }

    #[test]
    fn test_seeded_ticks_are_reproducible() {
        let before = snapshot();
        let now = before.generated_at + chrono::Duration::minutes(2);
        let a = simulate_tick(&before, &mut StdRng::seed_from_u64(99), now);
        let b = simulate_tick(&before, &mut StdRng::seed_from_u64(99), now);
        assert_eq!(a, b);
        assert_eq!(a.generated_at, now);
        assert_eq!(before, snapshot());
    }
}
