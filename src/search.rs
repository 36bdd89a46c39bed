//! Free-text KPI search and the recent-searches list

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::models::{KpiGroup, MetricRecord, OperationalCard, OperationalGroup, UnitMetric};
use crate::store::KeyValueStore;

/// Key the recent-searches blob is stored under
pub const RECENT_SEARCHES_KEY: &str = "lastmile.recentSearches";

/// Most entries kept in the recent-searches list
pub const MAX_RECENT_SEARCHES: usize = 10;

pub trait NamedItem {
    fn display_name(&self) -> &str;
}

/// A titled collection whose children can be searched by name
pub trait SearchableGroup: Clone {
    type Item: NamedItem + Clone;

    fn title(&self) -> &str;
    fn items(&self) -> &[Self::Item];
    fn with_items(&self, items: Vec<Self::Item>) -> Self;
}

impl NamedItem for MetricRecord {
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl NamedItem for OperationalCard {
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl NamedItem for UnitMetric {
    fn display_name(&self) -> &str {
        &self.unit.name
    }
}

impl SearchableGroup for KpiGroup {
    type Item = MetricRecord;

    fn title(&self) -> &str {
        &self.title
    }

    fn items(&self) -> &[MetricRecord] {
        &self.kpis
    }

    fn with_items(&self, kpis: Vec<MetricRecord>) -> Self {
        KpiGroup { kpis, ..self.clone() }
    }
}

impl SearchableGroup for OperationalGroup {
    type Item = OperationalCard;

    fn title(&self) -> &str {
        &self.title
    }

    fn items(&self) -> &[OperationalCard] {
        &self.cards
    }

    fn with_items(&self, cards: Vec<OperationalCard>) -> Self {
        OperationalGroup { cards, ..self.clone() }
    }
}

fn normalize(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        None
    } else {
        Some(term.to_lowercase())
    }
}

fn matches(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(needle)
}

/// Keeps whole groups whose title matches, otherwise only matching children.
/// A blank term returns the input unchanged.
pub fn filter_by_search<G: SearchableGroup>(groups: &[G], term: &str) -> Vec<G> {
    let Some(needle) = normalize(term) else {
        return groups.to_vec();
    };

    groups
        .iter()
        .filter_map(|group| {
            if matches(group.title(), &needle) {
                return Some(group.clone());
            }
            let items: Vec<G::Item> = group
                .items()
                .iter()
                .filter(|item| matches(item.display_name(), &needle))
                .cloned()
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(group.with_items(items))
            }
        })
        .collect()
}

pub fn filter_records<T: NamedItem + Clone>(items: &[T], term: &str) -> Vec<T> {
    let Some(needle) = normalize(term) else {
        return items.to_vec();
    };
    items
        .iter()
        .filter(|item| matches(item.display_name(), &needle))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SearchKind {
    Kpi,
    Unit,
    Order,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentSearch {
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub value: String,
}

/// Most-recent-first, deduplicated by kind and value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RecentSearches {
    entries: Vec<RecentSearch>,
}

impl RecentSearches {
    pub fn entries(&self) -> &[RecentSearch] {
        &self.entries
    }

    pub fn record(&mut self, kind: SearchKind, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let entry = RecentSearch { kind, value: value.to_string() };
        self.entries.retain(|e| e != &entry);
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_RECENT_SEARCHES);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// A missing or unreadable blob yields an empty list
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(RECENT_SEARCHES_KEY) {
            Ok(Some(blob)) => serde_json::from_str::<RecentSearches>(&blob)
                .map(|mut list| {
                    list.entries.truncate(MAX_RECENT_SEARCHES);
                    list
                })
                .unwrap_or_else(|e| {
                    tracing::warn!("Discarding unreadable recent searches: {}", e);
                    Self::default()
                }),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("Could not read recent searches: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        let blob = serde_json::to_string(self).map_err(|e| DashboardError::Store(e.to_string()))?;
        store.set(RECENT_SEARCHES_KEY, &blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparisonPolicy, MetricUnit, PerformanceTag};
    use crate::store::MemoryStore;
    use std::collections::BTreeMap;

    fn kpi(name: &str) -> MetricRecord {
        MetricRecord {
            id: name.to_lowercase().replace(' ', "_"),
            name: name.into(),
            value: 42.0,
            target: None,
            budget: None,
            unit: MetricUnit::Count,
            performance_tag: PerformanceTag::Poor,
            regional: BTreeMap::new(),
        }
    }

    fn group(title: &str, names: &[&str]) -> KpiGroup {
        KpiGroup {
            id: title.to_lowercase().replace(' ', "_"),
            title: title.into(),
            kpis: names.iter().map(|n| kpi(n)).collect(),
            comparison_policy: ComparisonPolicy::LowerIsBetter,
        }
    }

    fn sample() -> Vec<KpiGroup> {
        vec![
            group("Pending Actions", &["Unassigned Orders", "Pending PODs"]),
            group("Freight Cost", &["Freight Cost per KM", "Freight Budget vs Actual"]),
            group("Fleet", &["Vehicle Utilization"]),
        ]
    }

    #[test]
    fn test_child_match_keeps_only_matching_kpis() {
        let result = filter_by_search(&sample(), "unassigned");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Pending Actions");
        assert_eq!(result[0].kpis.len(), 1);
        assert_eq!(result[0].kpis[0].name, "Unassigned Orders");
    }

    #[test]
    fn test_title_match_keeps_whole_group() {
        let result = filter_by_search(&sample(), "FREIGHT cost");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kpis.len(), 2);
    }

    #[test]
    fn test_blank_term_is_identity() {
        assert_eq!(filter_by_search(&sample(), ""), sample());
        assert_eq!(filter_by_search(&sample(), "   "), sample());
    }

    #[test]
    fn test_search_is_idempotent() {
        for term in ["u", "fleet", "budget", "zzz"] {
            let once = filter_by_search(&sample(), term);
            assert_eq!(filter_by_search(&once, term), once);
        }
    }

    #[test]
    fn test_no_match_drops_everything() {
        assert!(filter_by_search(&sample(), "detention").is_empty());
        assert!(filter_by_search::<KpiGroup>(&[], "x").is_empty());
    }

    #[test]
    fn test_filter_records() {
        let records = sample().remove(1).kpis;
        let hits = filter_records(&records, "per km");
        assert_eq!(hits.len(), 1);
        assert_eq!(filter_records(&records, "").len(), 2);
    }

    #[test]
    fn test_recent_searches_dedup_and_cap() {
        let mut recent = RecentSearches::default();
        for i in 0..12 {
            recent.record(SearchKind::Order, &format!("ORD-{i}"));
        }
        assert_eq!(recent.entries().len(), MAX_RECENT_SEARCHES);
        assert_eq!(recent.entries()[0].value, "ORD-11");

        recent.record(SearchKind::Order, "ORD-5");
        assert_eq!(recent.entries()[0].value, "ORD-5");
        assert_eq!(recent.entries().iter().filter(|e| e.value == "ORD-5").count(), 1);

        // Same value under another kind is a distinct entry.
        recent.record(SearchKind::Kpi, "ORD-5");
        assert_eq!(recent.entries()[0].kind, SearchKind::Kpi);
        assert_eq!(recent.entries()[1].kind, SearchKind::Order);

        recent.record(SearchKind::Kpi, "  ");
        assert_eq!(recent.entries()[0].value, "ORD-5");
    }

    #[test]
    fn test_recent_searches_persist() {
        let mut store = MemoryStore::default();
        let mut recent = RecentSearches::default();
        recent.record(SearchKind::Kpi, "otif");
        recent.record(SearchKind::Unit, "North");
        recent.save(&mut store).unwrap();

        let loaded = RecentSearches::load(&store);
        assert_eq!(loaded, recent);
        assert_eq!(loaded.entries()[0].value, "North");
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let mut store = MemoryStore::default();
        store.set(RECENT_SEARCHES_KEY, "{not json").unwrap();
        assert!(RecentSearches::load(&store).entries().is_empty());
    }
}
