//! Coastal Monitoring Service - HTTP daemon
//!
//! Serves aggregated coastal conditions for monitoring stations:
//! 1. Fetches water level, temperature, currents, wind and tide predictions
//!    from NOAA CO-OPS, falling back to typed defaults per provider
//! 2. Enriches them with simulated sea state, heatmaps and animation frames
//! 3. Lists the coastal monitoring network with regional assessments
//! 4. Accepts community reports and proxies OpenWeather current conditions
//!
//! Usage:
//!   cargo run --release                          # Serve on PORT (default 3001)
//!   cargo run --release -- --port 8080           # Override the port
//!   cargo run --release -- --stations my.toml    # Alternate station registry
//!   cargo run --release -- --seed 42             # Reproducible synthetic data
//!   cargo run --release -- --offline             # No upstream requests
//!
//! Environment:
//!   See `ServiceConfig::from_env`; DATABASE_URL enables persistent reports.

use coastmon_service::aggregator::CoastalDataService;
use coastmon_service::config::ServiceConfig;
use coastmon_service::endpoint::{self, Router};
use coastmon_service::fetch::{Fetcher, HttpFetcher, OfflineFetcher};
use coastmon_service::ingest::openweather::OpenWeatherClient;
use coastmon_service::logging::{self, DataSource};
use coastmon_service::reports::{MemoryReportStore, PgReportStore, ReportStore};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn usage_exit(program: &str) -> ! {
    eprintln!(
        "Usage: {} [--port PORT] [--stations FILE] [--seed N] [--offline]",
        program
    );
    std::process::exit(1);
}

fn main() {
    println!("🌊 Coastal Monitoring Service");
    println!("=============================\n");

    let mut config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut offline = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "--stations" | "--seed" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires a value", args[i]);
                    usage_exit(&args[0]);
                };
                match args[i].as_str() {
                    "--port" => match value.parse() {
                        Ok(port) => config.port = port,
                        Err(_) => {
                            eprintln!("Error: invalid port '{}'", value);
                            usage_exit(&args[0]);
                        }
                    },
                    "--seed" => match value.parse() {
                        Ok(seed) => config.sim_seed = Some(seed),
                        Err(_) => {
                            eprintln!("Error: invalid seed '{}'", value);
                            usage_exit(&args[0]);
                        }
                    },
                    _ => config.stations_path = Some(PathBuf::from(value)),
                }
                i += 2;
            }
            "--offline" => {
                offline = true;
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                usage_exit(&args[0]);
            }
        }
    }

    logging::init_logger(config.log_level, config.log_file.as_deref(), true);

    // Station registry
    println!("📊 Loading station registry...");
    let registry = match config.load_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("\n❌ Station registry error: {}\n", e);
            std::process::exit(1);
        }
    };
    println!(
        "✓ {} stations, {} regions (default station {})\n",
        registry.stations.len(),
        registry.regions.len(),
        registry.default_query_station
    );

    // Upstream transport
    let fetcher: Arc<dyn Fetcher> = if offline {
        println!("⚠️  Offline mode: serving default and simulated readings only\n");
        Arc::new(OfflineFetcher)
    } else {
        match HttpFetcher::new(config.upstream_timeout) {
            Ok(fetcher) => Arc::new(fetcher),
            Err(e) => {
                eprintln!("❌ Failed to create HTTP client: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Report storage
    println!("🗄️  Connecting report store...");
    let reports: Box<dyn ReportStore> = match PgReportStore::connect() {
        Ok(store) => {
            println!("✓ Reports persisted to PostgreSQL\n");
            Box::new(store)
        }
        Err(e) => {
            logging::warn(
                DataSource::Database,
                None,
                &format!("report database unavailable, keeping reports in memory: {}", e),
            );
            println!("⚠️  Reports kept in memory only\n");
            Box::new(MemoryReportStore::new())
        }
    };

    let openweather = config.openweather_api_key.clone().map(|key| {
        OpenWeatherClient::new(config.openweather_base_url.clone(), key, Arc::clone(&fetcher))
    });
    if openweather.is_none() {
        println!("ℹ️  OPENWEATHER_API_KEY not set; /api/openweather/current will answer 503\n");
    }

    if config.sim_seed.is_some() {
        println!("🎲 Synthetic data seeded (SIM_SEED)\n");
    }

    let random = config.random_source();
    let service = CoastalDataService::new(&config, registry, fetcher, random);
    let port = config.port;
    let workers = config.request_threads;
    let router = Arc::new(Router::new(config, service, reports, openweather));

    logging::info(DataSource::System, None, &format!("starting on port {}", port));
    println!("🚀 Starting HTTP endpoint server...");
    println!("   Press Ctrl+C to stop\n");

    if let Err(e) = endpoint::start_endpoint_server(router, port, workers) {
        eprintln!("\n❌ Endpoint server error: {}", e);
        std::process::exit(1);
    }
}
