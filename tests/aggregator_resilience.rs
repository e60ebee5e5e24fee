/// Integration tests for aggregation under upstream failure
///
/// These verify the resilience contract of `CoastalDataService`:
/// 1. A snapshot is always complete, whatever the upstreams do
/// 2. One provider's outage never leaks into another's reading
/// 3. Seeded synthetic data is reproducible
/// 4. Identical concurrent queries share one upstream fan-out
///
/// All upstream traffic goes through `support::MockFetcher`.

mod support;

use coastmon_service::model::{ProviderError, Quality, StationQuery, KNOTS_PER_MPS};
use coastmon_service::visualization::DEFAULT_FRAME_COUNT;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use support::{healthy_noaa, service, service_with, test_config, MockFetcher};

// ---------------------------------------------------------------------------
// 1. Complete snapshots
// ---------------------------------------------------------------------------

#[test]
fn test_all_upstreams_down_still_yields_complete_snapshot() {
    let fetcher = Arc::new(MockFetcher::new());
    let svc = service(fetcher.clone(), 1);

    let snap = svc
        .get_enhanced_data(&StationQuery::new("cb0201", None))
        .expect("provider failures never fail the aggregate");

    assert!(snap.success);
    assert_eq!(snap.station_id, "cb0201");

    assert_eq!(snap.wave_data.quality, Quality::Default);
    assert_eq!(snap.wave_data.significant_height, 2.1);

    assert_eq!(snap.temperature_data.quality, Quality::Default);
    assert_eq!(snap.temperature_data.base_temperature, 20.0);

    assert_eq!(snap.current_data.quality, Quality::Default);
    assert!((snap.current_data.speed_knots - 1.5 * KNOTS_PER_MPS).abs() < 1e-6);

    assert_eq!(snap.wind_data.quality, Quality::Default);
    assert_eq!(snap.tide_data.quality, Quality::Simulated);
    assert_eq!(snap.tide_data.predictions.len(), 48);

    assert_eq!(snap.buoy_network.stations.len(), 8);
    assert!(!snap.heatmap_data.is_empty());
    assert_eq!(snap.animation_frames.len(), DEFAULT_FRAME_COUNT);

    assert_eq!(fetcher.request_count(), 5, "one attempt per provider, no retries");
}

#[test]
fn test_unknown_station_keeps_requested_id() {
    let svc = service(Arc::new(MockFetcher::new()), 1);
    let snap = svc
        .get_enhanced_data(&StationQuery::new("9999999", None))
        .unwrap();
    assert_eq!(snap.station_id, "9999999");
    assert_eq!(snap.location.id, "9999999");
}

#[test]
fn test_healthy_upstream_readings_flow_through() {
    let svc = service(Arc::new(healthy_noaa()), 1);
    let snap = svc
        .get_enhanced_data(&StationQuery::new("cb0201", None))
        .unwrap();

    assert_eq!(snap.temperature_data.quality, Quality::Measured);
    assert_eq!(snap.temperature_data.base_temperature, 26.1);
    assert_eq!(snap.temperature_data.grid_points.len(), 100);

    assert_eq!(snap.current_data.quality, Quality::Measured);
    assert!((snap.current_data.current_speed - 1.2).abs() < 1e-9);
    assert!((snap.current_data.speed_knots - 1.2 * KNOTS_PER_MPS).abs() < 1e-6);

    assert_eq!(snap.wind_data.gust, 9.8);
    assert_eq!(snap.tide_data.quality, Quality::Measured);
    assert_eq!(snap.tide_data.predictions.len(), 3);
}

// ---------------------------------------------------------------------------
// 2. Isolation
// ---------------------------------------------------------------------------

#[test]
fn test_wind_outage_is_isolated_under_concurrency() {
    let fetcher = healthy_noaa().fail(
        "product=wind",
        ProviderError::Timeout("operation timed out".to_string()),
    );
    let mut config = test_config();
    config.cache_ttl = Duration::ZERO;
    let svc = Arc::new(service_with(&config, Arc::new(fetcher), 5));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let svc = Arc::clone(&svc);
            thread::spawn(move || {
                let station = if i % 2 == 0 { "cb0201" } else { "8638863" };
                svc.get_enhanced_data(&StationQuery::new(station, None))
                    .expect("snapshot")
            })
        })
        .collect();

    for handle in handles {
        let snap = handle.join().expect("aggregation thread");
        assert_eq!(snap.wind_data.quality, Quality::Default);
        assert_eq!(snap.wind_data.speed, 5.0);
        assert_eq!(snap.wave_data.quality, Quality::Simulated);
        assert_eq!(snap.current_data.quality, Quality::Measured);
        assert_eq!(snap.temperature_data.quality, Quality::Measured);
    }
}

#[test]
fn test_noaa_error_envelope_is_a_provider_failure() {
    // first matching fragment wins, so the error route goes ahead
    let fetcher = MockFetcher::new()
        .respond(
            "product=water_temperature",
            r#"{"error":{"message":"No data was found."}}"#,
        )
        .respond("product=water_level", support::WATER_LEVEL_JSON);
    let svc = service(Arc::new(fetcher), 1);
    let snap = svc
        .get_enhanced_data(&StationQuery::new("cb0201", None))
        .unwrap();
    assert_eq!(snap.temperature_data.quality, Quality::Default);
    assert_eq!(snap.wave_data.quality, Quality::Simulated);
}

// ---------------------------------------------------------------------------
// 3. Reproducibility
// ---------------------------------------------------------------------------

#[test]
fn test_same_seed_same_synthetic_output() {
    let query = StationQuery::new("cb0201", None);
    let a = service(Arc::new(healthy_noaa()), 42).get_enhanced_data(&query).unwrap();
    let b = service(Arc::new(healthy_noaa()), 42).get_enhanced_data(&query).unwrap();

    assert_eq!(a.wave_data, b.wave_data);
    assert_eq!(a.temperature_data, b.temperature_data);
    assert_eq!(a.heatmap_data, b.heatmap_data);
    let readings = |s: &coastmon_service::aggregator::EnvironmentalSnapshot| {
        s.buoy_network
            .stations
            .iter()
            .map(|st| st.data.salinity)
            .collect::<Vec<_>>()
    };
    assert_eq!(readings(&a), readings(&b));
}

#[test]
fn test_different_seeds_differ() {
    let query = StationQuery::new("cb0201", None);
    let a = service(Arc::new(healthy_noaa()), 1).get_enhanced_data(&query).unwrap();
    let b = service(Arc::new(healthy_noaa()), 2).get_enhanced_data(&query).unwrap();
    assert_ne!(a.wave_data.significant_height, b.wave_data.significant_height);
}

// ---------------------------------------------------------------------------
// 4. Single-flight cache
// ---------------------------------------------------------------------------

#[test]
fn test_concurrent_identical_queries_fetch_once() {
    let fetcher = Arc::new(healthy_noaa().with_delay(Duration::from_millis(100)));
    let svc = Arc::new(service(fetcher.clone(), 3));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let svc = Arc::clone(&svc);
            thread::spawn(move || {
                svc.get_enhanced_data(&StationQuery::new("cb0201", None))
                    .expect("snapshot")
            })
        })
        .collect();
    let snaps: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("aggregation thread"))
        .collect();

    assert!(Arc::ptr_eq(&snaps[0], &snaps[1]));
    assert_eq!(fetcher.request_count(), 5);
}

#[test]
fn test_bounds_are_part_of_cache_key() {
    use coastmon_service::model::BoundingBox;

    let fetcher = Arc::new(healthy_noaa());
    let svc = service(fetcher.clone(), 3);
    let bounds = BoundingBox::new(23.5, 22.0, 70.5, 68.5);

    let all = svc.get_enhanced_data(&StationQuery::new("cb0201", None)).unwrap();
    let gulf = svc.get_enhanced_data(&StationQuery::new("cb0201", bounds)).unwrap();

    assert_eq!(all.buoy_network.stations.len(), 8);
    assert!(gulf.buoy_network.stations.len() < 8);
    assert_eq!(fetcher.request_count(), 10);
}
