//! Top / worst performer ranking for drill-down tables

use serde::Serialize;

use crate::models::{ComparisonPolicy, UnitMetric};

/// Number of rows shown on each result tab
pub const RESULT_TAB_SIZE: usize = 2;

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct Ranking {
    pub top: Vec<UnitMetric>,
    /// Worst-first
    pub worst: Vec<UnitMetric>,
}

/// Key a row is ordered on. Budget KPIs compare on value/budget.
pub fn ranking_key(row: &UnitMetric, policy: ComparisonPolicy) -> f64 {
    match policy {
        ComparisonPolicy::LowerIsBetter => row.budget_ratio().unwrap_or(row.value),
        ComparisonPolicy::HigherIsBetter => row.value,
    }
}

/// Sort rows best-first for the given policy. Ties keep input order.
pub fn sort_best_first(units: &[UnitMetric], policy: ComparisonPolicy) -> Vec<UnitMetric> {
    let mut sorted = units.to_vec();
    sorted.sort_by(|a, b| {
        let (ka, kb) = (ranking_key(a, policy), ranking_key(b, policy));
        let ord = ka.total_cmp(&kb);
        match policy {
            ComparisonPolicy::LowerIsBetter => ord,
            ComparisonPolicy::HigherIsBetter => ord.reverse(),
        }
    });
    sorted
}

pub fn rank(units: &[UnitMetric], policy: ComparisonPolicy) -> Ranking {
    rank_with_limit(units, policy, RESULT_TAB_SIZE)
}

/// Lists overlap when fewer than `2 * limit` rows are given.
pub fn rank_with_limit(units: &[UnitMetric], policy: ComparisonPolicy, limit: usize) -> Ranking {
    let sorted = sort_best_first(units, policy);

    let top: Vec<UnitMetric> = sorted.iter().take(limit).cloned().collect();
    let worst: Vec<UnitMetric> = sorted.iter().rev().take(limit).cloned().collect();

    Ranking { top, worst }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrganizationalUnit, UnitKind};

    fn row(id: &str, value: f64, budget: Option<f64>) -> UnitMetric {
        UnitMetric {
            unit: OrganizationalUnit {
                id: id.into(),
                name: id.to_uppercase(),
                kind: UnitKind::Region,
                parent_id: None,
            },
            value,
            budget,
        }
    }

    fn ids(rows: &[UnitMetric]) -> Vec<&str> {
        rows.iter().map(|r| r.unit.id.as_str()).collect()
    }

    #[test]
    fn test_lower_is_better_orders_ascending() {
        let rows = vec![
            row("a", 42.0, None),
            row("b", 38.5, None),
            row("c", 51.0, None),
            row("d", 45.2, None),
            row("e", 40.1, None),
        ];
        let ranking = rank(&rows, ComparisonPolicy::LowerIsBetter);

        assert_eq!(ids(&ranking.top), vec!["b", "e"]);
        assert_eq!(ids(&ranking.worst), vec!["c", "d"]);
        assert!(ranking.top[0].value <= ranking.top[1].value);
        for w in &ranking.worst {
            assert!(ranking.top[1].value <= w.value);
        }
    }

    #[test]
    fn test_higher_is_better_orders_descending() {
        let rows = vec![
            row("a", 78.0, None),
            row("b", 91.0, None),
            row("c", 64.0, None),
            row("d", 85.0, None),
        ];
        let ranking = rank(&rows, ComparisonPolicy::HigherIsBetter);

        assert_eq!(ids(&ranking.top), vec!["b", "d"]);
        assert_eq!(ids(&ranking.worst), vec!["c", "a"]);
        assert!(ranking.top[0].value >= ranking.top[1].value);
        for w in &ranking.worst {
            assert!(ranking.top[1].value >= w.value);
        }
    }

    #[test]
    fn test_budget_ratio_beats_raw_value() {
        // A spends more in absolute terms but is under budget; B is over budget.
        let rows = vec![
            row("a", 245_000.0, Some(300_000.0)),
            row("b", 210_000.0, Some(200_000.0)),
        ];
        let ranking = rank(&rows, ComparisonPolicy::LowerIsBetter);

        assert_eq!(ranking.top[0].unit.id, "a");
        assert_eq!(ranking.worst[0].unit.id, "b");
    }

    #[test]
    fn test_small_inputs_overlap() {
        let single = vec![row("only", 1.0, None)];
        let ranking = rank(&single, ComparisonPolicy::HigherIsBetter);
        assert_eq!(ids(&ranking.top), vec!["only"]);
        assert_eq!(ids(&ranking.worst), vec!["only"]);

        let three = vec![row("a", 1.0, None), row("b", 2.0, None), row("c", 3.0, None)];
        let ranking = rank(&three, ComparisonPolicy::HigherIsBetter);
        assert_eq!(ids(&ranking.top), vec!["c", "b"]);
        assert_eq!(ids(&ranking.worst), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_input() {
        let ranking = rank(&[], ComparisonPolicy::LowerIsBetter);
        assert!(ranking.top.is_empty());
        assert!(ranking.worst.is_empty());
    }

    #[test]
    fn test_nan_does_not_panic() {
        let rows = vec![row("a", f64::NAN, None), row("b", 3.0, None), row("c", 1.0, None)];
        let ranking = rank(&rows, ComparisonPolicy::LowerIsBetter);
        assert_eq!(ranking.top.len(), 2);
        assert_eq!(ranking.worst.len(), 2);
    }

    #[test]
    fn test_rank_with_limit() {
        let rows: Vec<UnitMetric> = (0..6).map(|i| row(&format!("u{i}"), i as f64, None)).collect();
        let ranking = rank_with_limit(&rows, ComparisonPolicy::HigherIsBetter, 3);
        assert_eq!(ids(&ranking.top), vec!["u5", "u4", "u3"]);
        assert_eq!(ids(&ranking.worst), vec!["u0", "u1", "u2"]);
    }
}
