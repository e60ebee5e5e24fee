/// Service configuration loader
///
/// Reads runtime settings from the environment (a `.env` file is honoured
/// via dotenv) and loads the station registry, either the copy embedded in
/// the binary or a `stations.toml` named by `STATIONS_CONFIG`. Everything
/// is validated up front so a bad deployment fails at startup rather than
/// on the first request.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::ingest::noaa::NOAA_BASE_URL;
use crate::ingest::openweather::OPENWEATHER_BASE_URL;
use crate::logging::LogLevel;
use crate::simulate::RandomSource;
use crate::stations::StationRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    /// The registry file could not be read.
    FileRead { path: String, message: String },
    /// The registry document is not valid TOML for the registry schema.
    Parse(String),
    /// The registry parsed but is internally inconsistent.
    Invalid(String),
    /// An environment variable holds a value of the wrong shape.
    InvalidEnv { key: String, value: String, expected: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileRead { path, message } => {
                write!(f, "Failed to read station registry {}: {}", path, message)
            }
            ConfigError::Parse(msg) => write!(f, "Failed to parse station registry: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid station registry: {}", msg),
            ConfigError::InvalidEnv { key, value, expected } => write!(
                f,
                "Invalid value '{}' for {}: expected {}",
                value, key, expected
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

/// Runtime settings for the daemon.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    /// Deployment label reported by the health endpoint.
    pub environment: String,
    pub noaa_base_url: String,
    /// `application` parameter NOAA asks API consumers to send.
    pub noaa_application: String,
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    /// Per outbound call.
    pub upstream_timeout: Duration,
    /// Zero disables snapshot caching.
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub provider_threads: usize,
    pub request_threads: usize,
    /// Registry override; the embedded registry is used when `None`.
    pub stations_path: Option<PathBuf>,
    /// Fixes the synthetic-data RNG for reproducible output.
    pub sim_seed: Option<u64>,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
    /// Value for `Access-Control-Allow-Origin`; no CORS headers when `None`.
    pub cors_origin: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            environment: "development".to_string(),
            noaa_base_url: NOAA_BASE_URL.to_string(),
            noaa_application: "coastmon_service".to_string(),
            openweather_api_key: None,
            openweather_base_url: OPENWEATHER_BASE_URL.to_string(),
            upstream_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 256,
            provider_threads: 12,
            request_threads: 8,
            stations_path: None,
            sim_seed: None,
            log_level: LogLevel::Info,
            log_file: None,
            cors_origin: None,
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from the process environment after reading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup. Unset and blank
    /// values take the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let log_level = match get("LOG_LEVEL") {
            Some(raw) => raw.parse::<LogLevel>().map_err(|_| ConfigError::InvalidEnv {
                key: "LOG_LEVEL".to_string(),
                value: raw.clone(),
                expected: "one of debug, info, warn, error".to_string(),
            })?,
            None => defaults.log_level,
        };

        let config = Self {
            port: parse_var(&get, "PORT", defaults.port, "a port number")?,
            environment: get("APP_ENV").unwrap_or(defaults.environment),
            noaa_base_url: get("NOAA_BASE_URL").unwrap_or(defaults.noaa_base_url),
            noaa_application: get("NOAA_APPLICATION").unwrap_or(defaults.noaa_application),
            openweather_api_key: get("OPENWEATHER_API_KEY"),
            openweather_base_url: get("OPENWEATHER_BASE_URL")
                .unwrap_or(defaults.openweather_base_url),
            upstream_timeout: Duration::from_secs(parse_var(
                &get,
                "UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout.as_secs(),
                "whole seconds",
            )?),
            cache_ttl: Duration::from_secs(parse_var(
                &get,
                "CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
                "whole seconds",
            )?),
            cache_max_entries: parse_var(
                &get,
                "CACHE_MAX_ENTRIES",
                defaults.cache_max_entries,
                "a non-negative integer",
            )?,
            provider_threads: parse_positive(&get, "PROVIDER_THREADS", defaults.provider_threads)?,
            request_threads: parse_positive(&get, "REQUEST_THREADS", defaults.request_threads)?,
            stations_path: get("STATIONS_CONFIG").map(PathBuf::from),
            sim_seed: match get("SIM_SEED") {
                Some(raw) => Some(raw.parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                    key: "SIM_SEED".to_string(),
                    value: raw.clone(),
                    expected: "an unsigned 64-bit integer".to_string(),
                })?),
                None => None,
            },
            log_level,
            log_file: get("LOG_FILE"),
            cors_origin: get("CORS_ORIGIN"),
        };

        if config.upstream_timeout.is_zero() {
            return Err(ConfigError::InvalidEnv {
                key: "UPSTREAM_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                expected: "at least 1 second".to_string(),
            });
        }

        Ok(config)
    }

    /// Loads the station registry named by `stations_path`, or the embedded one.
    pub fn load_registry(&self) -> Result<StationRegistry, ConfigError> {
        match &self.stations_path {
            Some(path) => load_registry_file(path),
            None => StationRegistry::embedded(),
        }
    }

    /// Random source honouring `sim_seed`.
    pub fn random_source(&self) -> RandomSource {
        match self.sim_seed {
            Some(seed) => RandomSource::seeded(seed),
            None => RandomSource::from_entropy(),
        }
    }
}

/// Reads and validates a registry file from disk.
pub fn load_registry_file(path: &Path) -> Result<StationRegistry, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    StationRegistry::from_toml_str(&contents)
}

fn parse_var<T, G>(get: &G, key: &str, default: T, expected: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value: raw,
            expected: expected.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_positive<G>(get: &G, key: &str, default: usize) -> Result<usize, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parse_var(get, key, default, "a positive integer")?;
    if value == 0 {
        return Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: "0".to_string(),
            expected: "a positive integer".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = ServiceConfig::from_lookup(lookup(&[])).expect("defaults are valid");
        assert_eq!(config.port, 3001);
        assert_eq!(config.environment, "development");
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.noaa_application, "coastmon_service");
        assert!(config.openweather_api_key.is_none());
        assert!(config.sim_seed.is_none());
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("APP_ENV", "production"),
            ("CACHE_TTL_SECS", "0"),
            ("SIM_SEED", "42"),
            ("LOG_LEVEL", "debug"),
            ("OPENWEATHER_API_KEY", "abc123"),
        ]))
        .expect("valid overrides");
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, "production");
        assert!(config.cache_ttl.is_zero(), "ttl of zero disables the cache");
        assert_eq!(config.sim_seed, Some(42));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.openweather_api_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[("PORT", "  "), ("OPENWEATHER_API_KEY", "")]))
            .expect("blank values are ignored");
        assert_eq!(config.port, 3001);
        assert!(config.openweather_api_key.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = ServiceConfig::from_lookup(lookup(&[("PORT", "harbour")])).unwrap_err();
        assert!(err.to_string().contains("PORT"), "error names the key: {}", err);
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(ServiceConfig::from_lookup(lookup(&[("PROVIDER_THREADS", "0")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[("UPSTREAM_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn test_load_embedded_registry() {
        let config = ServiceConfig::default();
        let registry = config.load_registry().expect("embedded registry loads");
        assert!(registry.find_station("cb0201").is_some());
    }

    #[test]
    fn test_missing_registry_file_reports_path() {
        let err = load_registry_file(Path::new("/nonexistent/stations.toml")).unwrap_err();
        assert!(
            matches!(err, ConfigError::FileRead { ref path, .. } if path.contains("nonexistent")),
            "got: {}",
            err
        );
    }

    #[test]
    fn test_seeded_random_source() {
        let mut config = ServiceConfig::default();
        config.sim_seed = Some(7);
        assert!(config.random_source().is_seeded());
        config.sim_seed = None;
        assert!(!config.random_source().is_seeded());
    }
}
