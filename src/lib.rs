/// coastmon_service: coastal environmental data aggregation service.
///
/// # Module structure
///
/// ```text
/// coastmon_service
/// ├── model       — shared data types (readings, quality tags, BoundingBox, ProviderError)
/// ├── config      — ServiceConfig from the environment, registry file loading
/// ├── stations    — station registry: query stations, monitoring network, regions, heatmap area
/// ├── logging     — levelled, source-tagged logger with failure classification
/// ├── fetch       — Fetcher transport trait + blocking reqwest client
/// ├── ingest
/// │   ├── noaa        — NOAA CO-OPS datagetter: URL construction + JSON parsing
/// │   ├── openweather — OpenWeather current conditions: URL construction + parsing
/// │   └── fixtures (test only) — representative API response payloads
/// ├── providers   — wave, temperature, current, wind and tide adapters with typed defaults
/// ├── simulate    — seedable random source and synthetic readings
/// │   └── network — monitoring network readings and assessments
/// ├── visualization — heatmap grids and animation frames
/// ├── cache       — expiring, single-flight snapshot cache
/// ├── aggregator  — CoastalDataService: fan-out/fan-in aggregation
/// ├── analysis
/// │   └── conditions — categories, safety assessment and recommendations
/// ├── chat        — keyword FAQ responder
/// ├── reports     — community report validation and storage
/// ├── db          — PostgreSQL connection + schema validation
/// └── endpoint    — HTTP router and tiny_http server
/// ```

/// Public modules
pub mod aggregator;
pub mod analysis;
pub mod cache;
pub mod chat;
pub mod config;
pub mod db;
pub mod endpoint;
pub mod fetch;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod providers;
pub mod reports;
pub mod simulate;
pub mod stations;
pub mod visualization;
