//! Startup-once cache tests

#[path = "testutils/mod.rs"]
mod testutils;

use chrono::{TimeZone, Utc};
use dashcache::{CacheError, RequestParams, StartupCache};
use serde_json::json;
use testutils::test_fixture::{DashboardFixture, PLATE_DF, UI_CONFIG};

fn ui_payload(version: u32) -> serde_json::Value {
    json!({
        "layout": {"columns": 3, "theme": "dark"},
        "metadata": {"version": version}
    })
}

#[test]
fn test_entry_survives_data_changes() {
    let fixture = DashboardFixture::new();
    let params = RequestParams::new();

    fixture.load_plate_rows(10, "2024-03-01T10:00:00");
    fixture
        .manager
        .set_startup_cache(UI_CONFIG, &params, ui_payload(1))
        .unwrap();

    fixture.load_plate_rows(500, "2024-03-01T15:00:00");
    fixture.store.touch(PLATE_DF);
    fixture.store.remove(PLATE_DF);

    assert!(fixture.manager.is_startup_cached(UI_CONFIG, &params));
    let served = fixture
        .manager
        .get_startup_cache(UI_CONFIG, &params)
        .unwrap();
    assert_eq!(served["metadata"]["version"], json!(1));
}

#[test]
fn test_second_set_keeps_first_entry() {
    let cache = StartupCache::new();
    let params = RequestParams::new();

    cache.set_startup_cache(UI_CONFIG, &params, ui_payload(1)).unwrap();
    let err = cache
        .set_startup_cache(UI_CONFIG, &params, ui_payload(2))
        .unwrap_err();
    match err {
        CacheError::AlreadyCached { key } => assert_eq!(key, "startup:ui_config"),
        other => panic!("unexpected error: {}", other),
    }

    let served = cache.get_startup_cache(UI_CONFIG, &params).unwrap();
    assert_eq!(served["metadata"]["version"], json!(1));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_clear_keeps_startup_time() {
    let startup_time = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let cache = StartupCache::with_startup_time(startup_time);

    cache
        .set_startup_cache(UI_CONFIG, &RequestParams::new(), ui_payload(1))
        .unwrap();
    cache
        .set_startup_cache("sector_list", &RequestParams::new(), json!(["bank", "energy"]))
        .unwrap();

    assert_eq!(cache.clear_startup_cache(), 2);
    assert!(cache.is_empty());
    assert!(!cache.is_startup_cached(UI_CONFIG, &RequestParams::new()));
    assert!(cache.get_startup_cache(UI_CONFIG, &RequestParams::new()).is_none());
    assert_eq!(cache.startup_time(), startup_time);
    assert_eq!(cache.clear_startup_cache(), 0);

    // Cleared keys can be populated again
    cache
        .set_startup_cache(UI_CONFIG, &RequestParams::new(), ui_payload(3))
        .unwrap();
    assert!(cache.is_startup_cached(UI_CONFIG, &RequestParams::new()));
}

#[test]
fn test_served_copy_is_annotated() {
    let startup_time = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let cache = StartupCache::with_startup_time(startup_time);
    let params = RequestParams::new();

    cache.set_startup_cache(UI_CONFIG, &params, ui_payload(1)).unwrap();

    let first = cache.get_startup_cache(UI_CONFIG, &params).unwrap();
    assert_eq!(first["metadata"]["cached"], json!(true));
    assert_eq!(first["metadata"]["cache_type"], json!("startup_once"));
    assert_eq!(
        first["metadata"]["cached_at"],
        json!(startup_time.to_rfc3339())
    );
    assert_eq!(first["layout"], json!({"columns": 3, "theme": "dark"}));

    // Annotation is applied to a copy, so repeated reads stay identical
    let second = cache.get_startup_cache(UI_CONFIG, &params).unwrap();
    assert_eq!(first, second);

    // Payloads without a metadata object are served verbatim
    cache
        .set_startup_cache("sector_list", &params, json!(["bank", "energy"]))
        .unwrap();
    assert_eq!(
        cache.get_startup_cache("sector_list", &params),
        Some(json!(["bank", "energy"]))
    );
}

#[test]
fn test_params_select_distinct_entries() {
    let cache = StartupCache::new();
    let zh = RequestParams::new().with("lang", "zh");
    let en = RequestParams::new().with("lang", "en");

    cache.set_startup_cache(UI_CONFIG, &zh, json!({"title": "仪表盘"})).unwrap();
    assert!(cache.is_startup_cached(UI_CONFIG, &zh));
    assert!(!cache.is_startup_cached(UI_CONFIG, &en));
    assert!(!cache.is_startup_cached(UI_CONFIG, &RequestParams::new()));

    cache.set_startup_cache(UI_CONFIG, &en, json!({"title": "Dashboard"})).unwrap();
    assert_eq!(
        cache.get_startup_cache(UI_CONFIG, &en),
        Some(json!({"title": "Dashboard"}))
    );
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_stats_report_keys_and_age() {
    let startup_time = Utc::now() - chrono::Duration::seconds(90);
    let cache = StartupCache::with_startup_time(startup_time);

    cache
        .set_startup_cache(UI_CONFIG, &RequestParams::new(), ui_payload(1))
        .unwrap();
    cache
        .set_startup_cache(
            "sector_list",
            &RequestParams::new().with("market", "cn"),
            json!([]),
        )
        .unwrap();

    let stats = cache.get_startup_cache_stats();
    assert_eq!(stats.cached_endpoints, 2);
    assert_eq!(stats.startup_time, startup_time);
    assert!(stats.cache_age_seconds >= 90.0);
    assert_eq!(stats.cache_keys.len(), 2);
    assert!(stats.cache_keys[0].starts_with("startup:sector_list:"));
    assert_eq!(stats.cache_keys[0].len(), "startup:sector_list:".len() + 8);
    assert_eq!(stats.cache_keys[1], "startup:ui_config");

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["cached_endpoints"], json!(2));
    assert!(json["startup_time"].is_string());
}

#[test]
fn test_refresh_replaces_deliberately() {
    let fixture = DashboardFixture::new();
    let params = RequestParams::new();

    assert!(!fixture
        .manager
        .refresh_startup_cache(UI_CONFIG, &params, ui_payload(1)));
    assert!(fixture
        .manager
        .refresh_startup_cache(UI_CONFIG, &params, ui_payload(2)));

    let served = fixture
        .manager
        .get_startup_cache(UI_CONFIG, &params)
        .unwrap();
    assert_eq!(served["metadata"]["version"], json!(2));
    assert_eq!(fixture.manager.get_startup_cache_stats().cached_endpoints, 1);
}
