//! Data-source collaborators and the simulated fetch

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::demo_data;
use crate::error::DashboardError;
use crate::models::{Dataset, Snapshot};

/// Supplies the role-independent metrics tree
pub trait DataSource: Send + Sync {
    fn load(&self) -> Result<Dataset>;

    fn describe(&self) -> String;
}

/// Reads a JSON dataset file on every load
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for JsonFileSource {
    fn load(&self) -> Result<Dataset> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading dataset {}", self.path.display()))?;
        let dataset: Dataset = serde_json::from_str(&raw)
            .with_context(|| format!("parsing dataset {}", self.path.display()))?;
        Ok(dataset)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// Seeded built-in dataset
pub struct DemoSource {
    seed: u64,
}

impl DemoSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl DataSource for DemoSource {
    fn load(&self) -> Result<Dataset> {
        Ok(demo_data::demo_dataset(self.seed))
    }

    fn describe(&self) -> String {
        format!("demo(seed={})", self.seed)
    }
}

/// Resolves after `delay`, like the dashboard's mock API calls
pub async fn fetch_snapshot(
    source: &dyn DataSource,
    delay: Duration,
) -> Result<Snapshot, DashboardError> {
    tokio::time::sleep(delay).await;
    let dataset = source
        .load()
        .map_err(|e| DashboardError::Fetch(format!("{:#}", e)))?;
    tracing::debug!(
        "Fetched {} KPI groups from {}",
        dataset.groups.len(),
        source.describe()
    );
    Ok(dataset.into_snapshot(Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricUnit, PerformanceTag};

    #[test]
    fn test_json_source_reads_demo_export() {
        let path =
            std::env::temp_dir().join(format!("lastmile-dataset-{}.json", std::process::id()));
        let dataset = demo_data::demo_dataset(4);
        fs::write(&path, serde_json::to_string(&dataset).unwrap()).unwrap();

        let loaded = JsonFileSource::new(&path).load().unwrap();
        let ids = |d: &Dataset| -> Vec<String> {
            d.groups.iter().flat_map(|g| g.kpis.iter().map(|k| k.id.clone())).collect()
        };
        assert_eq!(ids(&loaded), ids(&dataset));
        assert_eq!(loaded.units, dataset.units);
        assert_eq!(
            loaded.breakdowns.keys().collect::<Vec<_>>(),
            dataset.breakdowns.keys().collect::<Vec<_>>()
        );

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_sparse_records_load_with_defaults() {
        let path =
            std::env::temp_dir().join(format!("lastmile-sparse-{}.json", std::process::id()));
        let json = r#"{"groups":[{"id":"g","title":"G","comparisonPolicy":"lowerIsBetter","kpis":[
            {"id":"dock_dwell","name":"Dock Dwell"},
            {"id":"otif","name":"OTIF","value":null,"unit":"percent"}
        ]}],"units":[]}"#;
        fs::write(&path, json).unwrap();

        let loaded = JsonFileSource::new(&path).load().unwrap();
        let kpis = &loaded.groups[0].kpis;
        assert_eq!(kpis.len(), 2);
        for kpi in kpis {
            assert!(kpi.value.is_nan(), "{}", kpi.id);
            assert_eq!(kpi.performance_tag, PerformanceTag::Average);
            assert_eq!(crate::display::format_value(kpi.value, kpi.unit), "N/A");
        }
        assert_eq!(kpis[0].unit, MetricUnit::Count);
        assert_eq!(kpis[1].unit, MetricUnit::Percent);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = JsonFileSource::new("/nonexistent/lastmile.json");
        let err = source.load().unwrap_err();
        assert!(format!("{:#}", err).contains("reading dataset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_waits_for_delay() {
        let start = tokio::time::Instant::now();
        let snapshot = fetch_snapshot(&DemoSource::new(1), Duration::from_millis(500))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(!snapshot.groups.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_maps_load_errors() {
        let source = JsonFileSource::new("/nonexistent/lastmile.json");
        let err = fetch_snapshot(&source, Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, DashboardError::Fetch(_)));
    }
}
