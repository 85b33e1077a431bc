//! Test fixture for DashCache integration tests

use dashcache::{
    CacheConfig, CacheManager, DatasetRule, EndpointConfig, InMemoryDatasetStore, TabularSnapshot,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const SECTOR_LINE_CHART: &str = "sector_line_chart";
pub const SECTOR_TABLE: &str = "sector_table";
pub const PLATE_HEATMAP: &str = "plate_heatmap";
pub const UI_CONFIG: &str = "ui_config";

pub const PLATE_DF: &str = "plate_df";
pub const STOCK_DF: &str = "stock_df";

/// Dataset store plus cache manager sharing it
pub struct DashboardFixture {
    pub store: Arc<InMemoryDatasetStore>,
    pub manager: Arc<CacheManager>,
}

impl DashboardFixture {
    pub fn new() -> Self {
        Self::with_config(Self::dashboard_config())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let store = Arc::new(InMemoryDatasetStore::new());
        let manager = CacheManager::new(config, store.clone()).expect("valid dashboard config");

        Self {
            store,
            manager: Arc::new(manager),
        }
    }

    /// Endpoints used across the tests:
    /// - sector_line_chart: plate_df, latest row by `time`
    /// - sector_table: plate_df by `time`, stock_df by modification time
    /// - plate_heatmap: plate_df by modification time only
    /// - ui_config: startup-once
    pub fn dashboard_config() -> CacheConfig {
        CacheConfig::unbounded()
            .with_endpoint(
                SECTOR_LINE_CHART,
                EndpointConfig::fingerprinted(vec![DatasetRule::new(PLATE_DF).latest_by("time")]),
            )
            .with_endpoint(
                SECTOR_TABLE,
                EndpointConfig::fingerprinted(vec![
                    DatasetRule::new(PLATE_DF).latest_by("time"),
                    DatasetRule::new(STOCK_DF).track_modified(),
                ]),
            )
            .with_endpoint(
                PLATE_HEATMAP,
                EndpointConfig::fingerprinted(vec![DatasetRule::new(PLATE_DF).track_modified()]),
            )
            .with_endpoint(UI_CONFIG, EndpointConfig::startup_once())
    }

    /// plate_df snapshot with `rows` rows whose latest `time` is `latest`
    pub fn plate_snapshot(rows: usize, latest: &str) -> TabularSnapshot {
        let mut data: Vec<Vec<Value>> = (0..rows.saturating_sub(1))
            .map(|i| {
                vec![
                    json!(format!("2024-03-01T09:{:02}:{:02}", i / 60 % 60, i % 60)),
                    json!(format!("plate_{}", i % 7)),
                    json!((i % 11) as f64 * 0.5),
                ]
            })
            .collect();
        if rows > 0 {
            data.push(vec![json!(latest), json!("plate_0"), json!(1.25)]);
        }

        TabularSnapshot::new(
            vec!["time".to_string(), "plate".to_string(), "change".to_string()],
            data,
        )
    }

    pub fn load_plate_rows(&self, rows: usize, latest: &str) {
        self.store.replace(PLATE_DF, Self::plate_snapshot(rows, latest));
    }

    pub fn load_stock_rows(&self, rows: usize) {
        let data = (0..rows)
            .map(|i| vec![json!(format!("{:06}", i)), json!(10.0 + i as f64)])
            .collect();
        self.store.replace(
            STOCK_DF,
            TabularSnapshot::new(vec!["code".to_string(), "price".to_string()], data),
        );
    }

    /// Chart-shaped payload with a metadata section
    pub fn chart_payload(label: &str) -> Value {
        json!({
            "series": [{"name": label, "points": [1.0, 2.5, 3.0]}],
            "metadata": {"title": label, "unit": "%"}
        })
    }
}
