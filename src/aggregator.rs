/// Coastal data aggregation.
///
/// `CoastalDataService` owns the provider adapters, the station registry,
/// the snapshot cache and a thread pool for provider fan-out. Each snapshot
/// request fans the five NOAA readings and the monitoring network out onto
/// the pool and joins them through one channel per job. A job that fails or
/// panics is replaced by its typed default, so one provider can never take
/// another down.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use threadpool::ThreadPool;

use crate::analysis::conditions::{self, EnvironmentalSummary};
use crate::cache::{CacheOutcome, SnapshotCache};
use crate::config::ServiceConfig;
use crate::fetch::Fetcher;
use crate::logging::{self, DataSource};
use crate::model::{
    BoundingBox, CurrentReading, Quality, StationInfo, StationQuery, TemperatureField, TideSeries,
    WaveReading, WindReading,
};
use crate::providers::{iso_timestamp, NoaaProviders, Provider};
use crate::simulate::network::{self, MonitoringNetwork, MonitoringStation};
use crate::simulate::{self, RandomSource};
use crate::stations::StationRegistry;
use crate::visualization::{self, AnimationFrame, HeatmapKind, HeatmapPoint};

/// Tide samples included in the environmental summary.
pub const SUMMARY_TIDE_POINTS: usize = 8;

pub const FALLBACK_MESSAGE: &str = "Using simulated data - external services unavailable";

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentalSnapshot {
    pub success: bool,
    pub station_id: String,
    pub timestamp: String,
    pub location: StationInfo,
    pub wave_data: WaveReading,
    pub temperature_data: TemperatureField,
    pub current_data: CurrentReading,
    pub wind_data: WindReading,
    pub tide_data: TideSeries,
    pub buoy_network: MonitoringNetwork,
    pub heatmap_data: Vec<HeatmapPoint>,
    pub animation_frames: Vec<AnimationFrame>,
}

/// Reduced payload served alongside a 500 when aggregation itself fails.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackData {
    pub station_id: String,
    pub timestamp: String,
    pub message: String,
    pub wave_data: WaveReading,
    pub temperature_data: TemperatureField,
    pub current_data: CurrentReading,
}

#[derive(Debug, Clone)]
pub struct AggregateFailure {
    pub error: String,
    pub fallback_data: FallbackData,
}

/// The five provider readings for one station.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderReadings {
    pub waves: WaveReading,
    pub temperature: TemperatureField,
    pub currents: CurrentReading,
    pub wind: WindReading,
    pub tides: TideSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub station_id: String,
    pub summary: EnvironmentalSummary,
    pub raw_data: ProviderReadings,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct CoastalDataService {
    registry: Arc<StationRegistry>,
    providers: Arc<NoaaProviders>,
    random: RandomSource,
    cache: SnapshotCache<Arc<EnvironmentalSnapshot>>,
    pool: Mutex<ThreadPool>,
    #[cfg(test)]
    snapshot_fault: Option<&'static str>,
}

/// Join handles for the five in-flight provider jobs.
struct PendingReadings {
    station: StationInfo,
    now: DateTime<Utc>,
    wave: mpsc::Receiver<WaveReading>,
    temperature: mpsc::Receiver<TemperatureField>,
    current: mpsc::Receiver<CurrentReading>,
    wind: mpsc::Receiver<WindReading>,
    tide: mpsc::Receiver<TideSeries>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "aggregation panicked".to_string()
    }
}

/// Waits for a job's result; a job that panicked dropped its sender.
fn receive<T>(
    provider: Provider,
    station: &str,
    rx: mpsc::Receiver<T>,
    default: impl FnOnce() -> T,
) -> T {
    rx.recv().unwrap_or_else(|_| {
        logging::error(
            DataSource::Noaa,
            Some(station),
            &format!("{} job died before reporting; serving default reading", provider),
        );
        default()
    })
}

impl PendingReadings {
    fn join(self) -> ProviderReadings {
        let id = self.station.id.as_str();
        let now = self.now;
        ProviderReadings {
            waves: receive(Provider::Wave, id, self.wave, WaveReading::fallback),
            temperature: receive(Provider::Temperature, id, self.temperature, TemperatureField::fallback),
            currents: receive(Provider::Current, id, self.current, || {
                let mut reading = CurrentReading::fallback();
                reading.vectors = visualization::generate_current_vectors(
                    0.0,
                    reading.current_speed,
                    reading.current_direction,
                    self.station.coordinates(),
                );
                reading
            }),
            wind: receive(Provider::Wind, id, self.wind, || WindReading::fallback(iso_timestamp(now))),
            tides: receive(Provider::Tide, id, self.tide, || simulate::default_tide_series(now)),
        }
    }
}

impl CoastalDataService {
    pub fn new(
        config: &ServiceConfig,
        registry: StationRegistry,
        fetcher: Arc<dyn Fetcher>,
        random: RandomSource,
    ) -> Self {
        let providers = NoaaProviders::new(
            config.noaa_base_url.clone(),
            config.noaa_application.clone(),
            fetcher,
        );
        Self {
            registry: Arc::new(registry),
            providers: Arc::new(providers),
            random,
            cache: SnapshotCache::new(config.cache_ttl, config.cache_max_entries),
            pool: Mutex::new(ThreadPool::with_name(
                "provider".to_string(),
                config.provider_threads.max(1),
            )),
            #[cfg(test)]
            snapshot_fault: None,
        }
    }

    /// Every snapshot build panics with `message` once readings are joined.
    #[cfg(test)]
    pub(crate) fn with_snapshot_fault(mut self, message: &'static str) -> Self {
        self.snapshot_fault = Some(message);
        self
    }

    #[cfg(test)]
    fn check_snapshot_fault(&self) {
        if let Some(message) = self.snapshot_fault {
            panic!("{}", message);
        }
    }

    #[cfg(not(test))]
    fn check_snapshot_fault(&self) {}

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    /// Station id from a route segment, or the registry default.
    pub fn resolve_station(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.registry.default_query_station.clone(),
        }
    }

    fn spawn_job<T, F>(&self, job: F) -> mpsc::Receiver<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        lock(&self.pool).execute(move || {
            // The receiver may have given up; nothing to do then.
            let _ = tx.send(job());
        });
        rx
    }

    fn spawn_readings(&self, station: &StationInfo, now: DateTime<Utc>) -> PendingReadings {
        let id = station.id.as_str();

        let wave = {
            let (p, s) = (Arc::clone(&self.providers), station.clone());
            let mut rng = self.random.stream(&format!("wave:{}", id));
            self.spawn_job(move || p.wave(&s, now, &mut rng))
        };
        let temperature = {
            let (p, s) = (Arc::clone(&self.providers), station.clone());
            let mut rng = self.random.stream(&format!("temperature:{}", id));
            self.spawn_job(move || p.temperature(&s, now, &mut rng))
        };
        let current = {
            let (p, s) = (Arc::clone(&self.providers), station.clone());
            self.spawn_job(move || p.current(&s, now))
        };
        let wind = {
            let (p, s) = (Arc::clone(&self.providers), station.clone());
            self.spawn_job(move || p.wind(&s, now))
        };
        let tide = {
            let (p, s) = (Arc::clone(&self.providers), station.clone());
            self.spawn_job(move || p.tide(&s, now))
        };

        PendingReadings {
            station: station.clone(),
            now,
            wave,
            temperature,
            current,
            wind,
            tide,
        }
    }

    fn spawn_network(
        &self,
        bounds: Option<BoundingBox>,
        now: DateTime<Utc>,
    ) -> mpsc::Receiver<MonitoringNetwork> {
        let registry = Arc::clone(&self.registry);
        let mut rng = self.random.stream("network");
        self.spawn_job(move || {
            network::build_monitoring_network(&registry, bounds.as_ref(), now, &mut rng)
        })
    }

    /// Fetches the five readings for `station` concurrently.
    pub fn fetch_readings(&self, station: &StationInfo, now: DateTime<Utc>) -> ProviderReadings {
        self.spawn_readings(station, now).join()
    }

    /// Full snapshot for a station, served from the cache when fresh.
    /// Concurrent identical queries share one computation.
    pub fn get_enhanced_data(
        &self,
        query: &StationQuery,
    ) -> Result<Arc<EnvironmentalSnapshot>, AggregateFailure> {
        let key = query.cache_key();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.cache
                .get_or_compute(&key, || Arc::new(self.build_snapshot(query, Utc::now())))
        }));

        match result {
            Ok((snapshot, CacheOutcome::Hit)) => {
                logging::debug(DataSource::Cache, Some(&query.station_id), "snapshot served from cache");
                Ok(snapshot)
            }
            Ok((snapshot, CacheOutcome::Miss)) => Ok(snapshot),
            Err(payload) => {
                let error = panic_message(payload.as_ref());
                logging::error(
                    DataSource::System,
                    Some(&query.station_id),
                    &format!("aggregation failed: {}; serving fallback payload", error),
                );
                Err(AggregateFailure {
                    error,
                    fallback_data: self.fallback_data(&query.station_id, Utc::now()),
                })
            }
        }
    }

    /// Builds a snapshot without consulting the cache.
    pub fn build_snapshot(&self, query: &StationQuery, now: DateTime<Utc>) -> EnvironmentalSnapshot {
        let station = self.registry.station_info(&query.station_id);
        let pending = self.spawn_readings(&station, now);
        let network_rx = self.spawn_network(query.bounds, now);

        let readings = pending.join();
        self.check_snapshot_fault();
        let buoy_network = network_rx.recv().unwrap_or_else(|_| {
            logging::error(
                DataSource::System,
                Some(&station.id),
                "monitoring network job died; serving empty network",
            );
            MonitoringNetwork {
                stations: Vec::new(),
                quality: Quality::Default,
            }
        });

        let mut rng = self.random.stream(&format!("heatmap:{}", station.id));
        let heatmap_data = visualization::generate_heatmap(
            &self.registry.heatmap,
            self.registry.heatmap.default_resolution,
            Some(&readings.waves),
            Some(&readings.temperature),
            Some(&readings.currents),
            &mut rng,
        );
        let animation_frames = visualization::generate_animation_frames(
            visualization::DEFAULT_FRAME_COUNT,
            &readings.waves,
            &readings.currents,
            station.coordinates(),
            now.timestamp_millis(),
        );

        EnvironmentalSnapshot {
            success: true,
            station_id: station.id.clone(),
            timestamp: iso_timestamp(now),
            location: station,
            wave_data: readings.waves,
            temperature_data: readings.temperature,
            current_data: readings.currents,
            wind_data: readings.wind,
            tide_data: readings.tides,
            buoy_network,
            heatmap_data,
            animation_frames,
        }
    }

    /// Monitoring network stations, optionally restricted to `bounds`.
    pub fn buoy_network(&self, bounds: Option<&BoundingBox>, now: DateTime<Utc>) -> Vec<MonitoringStation> {
        let mut rng = self.random.stream("network");
        network::build_monitoring_network(&self.registry, bounds, now, &mut rng).stations
    }

    /// Heatmap of one kind, built from that kind's reading only.
    pub fn heatmap(
        &self,
        kind: HeatmapKind,
        station_id: &str,
        resolution: f64,
        now: DateTime<Utc>,
    ) -> Vec<HeatmapPoint> {
        let station = self.registry.station_info(station_id);
        let mut rng = self.random.stream(&format!("heatmap:{}", station.id));
        let region = &self.registry.heatmap;
        match kind {
            HeatmapKind::Temperature => {
                let mut field_rng = self.random.stream(&format!("temperature:{}", station.id));
                let temperature = self.providers.temperature(&station, now, &mut field_rng);
                visualization::generate_heatmap(region, resolution, None, Some(&temperature), None, &mut rng)
            }
            HeatmapKind::Waves => {
                let mut wave_rng = self.random.stream(&format!("wave:{}", station.id));
                let wave = self.providers.wave(&station, now, &mut wave_rng);
                visualization::generate_heatmap(region, resolution, Some(&wave), None, None, &mut rng)
            }
            HeatmapKind::Currents => {
                let current = self.providers.current(&station, now);
                visualization::generate_heatmap(region, resolution, None, None, Some(&current), &mut rng)
            }
        }
    }

    /// Wave and current readings fetched concurrently, plus `frames`
    /// animation frames derived from them.
    pub fn animation(
        &self,
        station_id: &str,
        frames: usize,
        now: DateTime<Utc>,
    ) -> (WaveReading, Vec<AnimationFrame>) {
        let station = self.registry.station_info(station_id);
        let wave_rx = {
            let (p, s) = (Arc::clone(&self.providers), station.clone());
            let mut rng = self.random.stream(&format!("wave:{}", station.id));
            self.spawn_job(move || p.wave(&s, now, &mut rng))
        };
        let current_rx = {
            let (p, s) = (Arc::clone(&self.providers), station.clone());
            self.spawn_job(move || p.current(&s, now))
        };
        let wave = receive(Provider::Wave, &station.id, wave_rx, WaveReading::fallback);
        let current = receive(Provider::Current, &station.id, current_rx, CurrentReading::fallback);

        let animation = visualization::generate_animation_frames(
            frames,
            &wave,
            &current,
            station.coordinates(),
            now.timestamp_millis(),
        );
        (wave, animation)
    }

    /// Classified conditions plus the raw readings, tides truncated.
    pub fn environmental_summary(&self, station_id: &str, now: DateTime<Utc>) -> SummaryReport {
        let station = self.registry.station_info(station_id);
        let mut readings = self.fetch_readings(&station, now);
        readings.tides = readings.tides.truncated(SUMMARY_TIDE_POINTS);
        let summary = conditions::summarize(
            &readings.waves,
            &readings.temperature,
            &readings.currents,
            &readings.wind,
        );
        SummaryReport {
            station_id: station.id,
            summary,
            raw_data: readings,
        }
    }

    pub fn fallback_data(&self, station_id: &str, now: DateTime<Utc>) -> FallbackData {
        FallbackData {
            station_id: station_id.to_string(),
            timestamp: iso_timestamp(now),
            message: FALLBACK_MESSAGE.to_string(),
            wave_data: WaveReading::fallback(),
            temperature_data: TemperatureField::fallback(),
            current_data: CurrentReading::fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::ScriptedFetcher;
    use crate::ingest::fixtures::*;
    use crate::model::ProviderError;
    use chrono::TimeZone;
    use std::time::Duration;

    fn service(fetcher: ScriptedFetcher, seed: u64) -> CoastalDataService {
        let config = ServiceConfig {
            cache_ttl: Duration::from_secs(300),
            provider_threads: 4,
            ..ServiceConfig::default()
        };
        CoastalDataService::new(
            &config,
            StationRegistry::embedded().unwrap(),
            Arc::new(fetcher),
            RandomSource::seeded(seed),
        )
    }

    fn may_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn healthy() -> ScriptedFetcher {
        ScriptedFetcher::new()
            .respond("product=water_level", fixture_water_level_json())
            .respond("product=water_temperature", fixture_water_temperature_json())
            .respond("product=currents", fixture_currents_json())
            .respond("product=wind", fixture_wind_json())
            .respond("product=predictions", fixture_predictions_json())
    }

    #[test]
    fn test_resolve_station_defaults() {
        let svc = service(ScriptedFetcher::new(), 1);
        assert_eq!(svc.resolve_station(None), "cb0201");
        assert_eq!(svc.resolve_station(Some("  ")), "cb0201");
        assert_eq!(svc.resolve_station(Some("8638863")), "8638863");
    }

    #[test]
    fn test_snapshot_complete_when_every_upstream_fails() {
        let svc = service(ScriptedFetcher::new(), 1);
        let snap = svc.build_snapshot(&StationQuery::new("cb0201", None), may_first());
        assert!(snap.success);
        assert_eq!(snap.wave_data.quality, Quality::Default);
        assert_eq!(snap.temperature_data.quality, Quality::Default);
        assert_eq!(snap.current_data.quality, Quality::Default);
        assert_eq!(snap.wind_data.quality, Quality::Default);
        assert_eq!(snap.tide_data.quality, Quality::Simulated);
        assert_eq!(snap.buoy_network.stations.len(), 8);
        assert_eq!(snap.heatmap_data.len(), 26 * 36);
        assert_eq!(snap.animation_frames.len(), visualization::DEFAULT_FRAME_COUNT);
    }

    #[test]
    fn test_snapshot_uses_measured_readings() {
        let svc = service(healthy(), 1);
        let snap = svc.build_snapshot(&StationQuery::new("cb0201", None), may_first());
        assert_eq!(snap.wave_data.quality, Quality::Simulated);
        assert_eq!(snap.temperature_data.base_temperature, 17.4);
        assert_eq!(snap.wind_data.speed, 6.3);
        assert_eq!(snap.location.name, "Chesapeake Bay Bridge Tunnel");
    }

    #[test]
    fn test_wind_outage_isolated() {
        let fetcher = healthy().fail("product=wind", ProviderError::Timeout("timed out".to_string()));
        let svc = service(fetcher, 1);
        let readings = svc.fetch_readings(&svc.registry().station_info("cb0201"), may_first());
        assert_eq!(readings.wind.quality, Quality::Default);
        assert_eq!(readings.waves.quality, Quality::Simulated);
        assert_eq!(readings.currents.quality, Quality::Measured);
    }

    #[test]
    fn test_cached_snapshot_reused() {
        let fetcher = Arc::new(healthy());
        let config = ServiceConfig::default();
        let svc = CoastalDataService::new(
            &config,
            StationRegistry::embedded().unwrap(),
            fetcher.clone(),
            RandomSource::seeded(3),
        );
        let query = StationQuery::new("cb0201", None);
        let a = svc.get_enhanced_data(&query).unwrap();
        let b = svc.get_enhanced_data(&query).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(fetcher.requests.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_bounds_filter_network_and_key_cache() {
        let svc = service(ScriptedFetcher::new(), 1);
        let bounds = BoundingBox::new(19.5, 18.5, 73.0, 72.5);
        let snap = svc.get_enhanced_data(&StationQuery::new("cb0201", bounds)).unwrap();
        assert_eq!(snap.buoy_network.stations.len(), 3);
        let all = svc.get_enhanced_data(&StationQuery::new("cb0201", None)).unwrap();
        assert_eq!(all.buoy_network.stations.len(), 8);
    }

    #[test]
    fn test_summary_truncates_tides() {
        let svc = service(ScriptedFetcher::new(), 1);
        let report = svc.environmental_summary("cb0201", may_first());
        assert_eq!(report.raw_data.tides.predictions.len(), SUMMARY_TIDE_POINTS);
        assert_eq!(report.summary.recommendations.len(), 1);
    }

    #[test]
    fn test_heatmap_kinds_cover_grid() {
        let svc = service(ScriptedFetcher::new(), 1);
        for kind in [HeatmapKind::Temperature, HeatmapKind::Waves, HeatmapKind::Currents] {
            let points = svc.heatmap(kind, "cb0201", 0.1, may_first());
            assert_eq!(points.len(), 6 * 8, "{}", kind.as_str());
        }
    }

    #[test]
    fn test_animation_frame_count() {
        let svc = service(ScriptedFetcher::new(), 1);
        let (wave, frames) = svc.animation("cb0201", 10, may_first());
        assert_eq!(wave.quality, Quality::Default);
        assert_eq!(frames.len(), 10);
        assert_eq!(frames[9].frame_id, 9);
    }

    #[test]
    fn test_same_seed_same_synthetic_output() {
        let a = service(healthy(), 42).build_snapshot(&StationQuery::new("cb0201", None), may_first());
        let b = service(healthy(), 42).build_snapshot(&StationQuery::new("cb0201", None), may_first());
        assert_eq!(a.wave_data, b.wave_data);
        assert_eq!(a.temperature_data, b.temperature_data);
        assert_eq!(a.heatmap_data, b.heatmap_data);
    }

    #[test]
    fn test_fallback_payload() {
        let svc = service(ScriptedFetcher::new(), 1);
        let fb = svc.fallback_data("cb0201", may_first());
        assert_eq!(fb.message, FALLBACK_MESSAGE);
        assert_eq!(fb.wave_data, WaveReading::fallback());
        assert_eq!(fb.timestamp, "2024-05-01T00:00:00.000Z");
    }

    #[test]
    fn test_glue_panic_becomes_aggregate_failure() {
        let svc = service(ScriptedFetcher::new(), 1).with_snapshot_fault("heatmap grid exploded");
        let query = StationQuery::new("cb0201", None);

        let failure = svc.get_enhanced_data(&query).unwrap_err();
        assert_eq!(failure.error, "heatmap grid exploded");
        assert_eq!(failure.fallback_data.station_id, "cb0201");
        assert_eq!(failure.fallback_data.message, FALLBACK_MESSAGE);
        assert_eq!(failure.fallback_data.current_data, CurrentReading::fallback());

        // nothing was cached and the key is not wedged
        assert!(svc.cache.is_empty());
        assert!(svc.get_enhanced_data(&query).is_err());
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
