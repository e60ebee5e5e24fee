//! Shared helpers for integration tests: a scripted `Fetcher` and canned
//! NOAA / OpenWeather payloads. Nothing here touches the network.
#![allow(dead_code)]

use coastmon_service::aggregator::CoastalDataService;
use coastmon_service::config::ServiceConfig;
use coastmon_service::endpoint::Router;
use coastmon_service::fetch::Fetcher;
use coastmon_service::ingest::openweather::OpenWeatherClient;
use coastmon_service::model::ProviderError;
use coastmon_service::reports::MemoryReportStore;
use coastmon_service::simulate::RandomSource;
use coastmon_service::stations::StationRegistry;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

pub const WATER_LEVEL_JSON: &str =
    r#"{"data":[{"t":"2024-05-01 12:00","v":"0.850","s":"0.010","f":"0,0,0,0","q":"p"}]}"#;

pub const WATER_TEMPERATURE_JSON: &str =
    r#"{"data":[{"t":"2024-05-01 12:00","v":"26.1","f":"0,0,0"}]}"#;

pub const CURRENTS_JSON: &str =
    r#"{"data":[{"t":"2024-05-01 12:00","s":"120.00","d":"250","b":"2"}]}"#;

pub const WIND_JSON: &str =
    r#"{"data":[{"t":"2024-05-01 12:00","s":"7.20","d":"200.00","dr":"SSW","g":"9.80","f":"0,0"}]}"#;

/// Predictions far enough ahead to always count as forward-looking.
pub const PREDICTIONS_JSON: &str = r#"{"predictions":[
    {"t":"2099-01-01 00:00","v":"0.120"},
    {"t":"2099-01-01 00:06","v":"0.135"},
    {"t":"2099-01-01 00:12","v":"0.151"}
]}"#;

pub const OPENWEATHER_JSON: &str = r#"{
    "coord":{"lon":72.8347,"lat":18.922},
    "weather":[{"id":803,"main":"Clouds","description":"broken clouds"}],
    "main":{"temp":29.4,"humidity":74,"pressure":1008},
    "wind":{"speed":5.1,"deg":250},
    "name":"Mumbai",
    "cod":200
}"#;

pub const OPENWEATHER_FORECAST_JSON: &str = r#"{
    "cod":"200",
    "cnt":1,
    "list":[{"dt":1714575600,"main":{"temp":30.1},"dt_txt":"2024-05-01 15:00:00"}],
    "city":{"name":"Mumbai"}
}"#;

pub const OPENWEATHER_ONECALL_JSON: &str = r#"{
    "lat":18.922,
    "lon":72.8347,
    "timezone":"Asia/Kolkata",
    "current":{"temp":29.4},
    "daily":[{"temp":{"max":32.5}}]
}"#;

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Answers by the first registered URL fragment; unmatched URLs fail with
/// HTTP 503. Every call is recorded and optionally delayed.
pub struct MockFetcher {
    routes: Vec<(String, Result<String, ProviderError>)>,
    delay: Duration,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, fragment: &str, body: &str) -> Self {
        self.routes.push((fragment.to_string(), Ok(body.to_string())));
        self
    }

    pub fn fail(mut self, fragment: &str, err: ProviderError) -> Self {
        self.routes.push((fragment.to_string(), Err(err)));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests_matching(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains(fragment))
            .count()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.routes
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or(Err(ProviderError::HttpError(503)))
    }
}

/// Every NOAA product answers with a valid payload.
pub fn healthy_noaa() -> MockFetcher {
    MockFetcher::new()
        .respond("product=water_level", WATER_LEVEL_JSON)
        .respond("product=water_temperature", WATER_TEMPERATURE_JSON)
        .respond("product=currents", CURRENTS_JSON)
        .respond("product=wind", WIND_JSON)
        .respond("product=predictions", PREDICTIONS_JSON)
}

// ---------------------------------------------------------------------------
// Service wiring
// ---------------------------------------------------------------------------

pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        provider_threads: 8,
        ..ServiceConfig::default()
    }
}

pub fn service_with(config: &ServiceConfig, fetcher: Arc<MockFetcher>, seed: u64) -> CoastalDataService {
    CoastalDataService::new(
        config,
        StationRegistry::embedded().expect("embedded registry"),
        fetcher,
        RandomSource::seeded(seed),
    )
}

pub fn service(fetcher: Arc<MockFetcher>, seed: u64) -> CoastalDataService {
    service_with(&test_config(), fetcher, seed)
}

/// Router over an in-memory report store. OpenWeather is wired to the same
/// fetcher when a key is given.
pub fn router(fetcher: Arc<MockFetcher>, openweather_key: Option<&str>) -> Router {
    let mut config = test_config();
    config.openweather_api_key = openweather_key.map(String::from);
    let openweather = openweather_key.map(|key| {
        OpenWeatherClient::new(
            config.openweather_base_url.clone(),
            key.to_string(),
            fetcher.clone(),
        )
    });
    let service = service_with(&config, fetcher, 11);
    Router::new(config, service, Box::new(MemoryReportStore::new()), openweather)
}
