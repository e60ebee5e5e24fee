/// Structured logging for the coastal monitoring service
///
/// Levelled, source-tagged log lines with an optional station identifier.
/// Writes to the console and, when configured, appends to a log file.
/// Upstream failures are classified so that routine gaps (a station that
/// doesn't offer a product) stay quiet while outages are loud.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use crate::model::ProviderError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Noaa,
    OpenWeather,
    Cache,
    Reports,
    Http,
    Database,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Noaa => write!(f, "NOAA"),
            DataSource::OpenWeather => write!(f, "OWM"),
            DataSource::Cache => write!(f, "CACHE"),
            DataSource::Reports => write!(f, "REPORTS"),
            DataSource::Http => write!(f, "HTTP"),
            DataSource::Database => write!(f, "DB"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the station doesn't offer this product, or the
    /// provider is deliberately switched off
    Expected,
    /// Unexpected failure - indicates upstream degradation or a format change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut guard) = LOGGER.lock() {
            *guard = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, source: DataSource, station_id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let station_part = station_id.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, source, station_part, message);

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, station_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, station_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", source, station_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger. Until this is called, log calls are no-ops.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, source: DataSource, station_id: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, source, station_id, message);
        }
    }
}

pub fn info(source: DataSource, station_id: Option<&str>, message: &str) {
    emit(LogLevel::Info, source, station_id, message);
}

pub fn warn(source: DataSource, station_id: Option<&str>, message: &str) {
    emit(LogLevel::Warning, source, station_id, message);
}

pub fn error(source: DataSource, station_id: Option<&str>, message: &str) {
    emit(LogLevel::Error, source, station_id, message);
}

pub fn debug(source: DataSource, station_id: Option<&str>, message: &str) {
    emit(LogLevel::Debug, source, station_id, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify an upstream provider failure.
///
/// NOAA answers "No data was found" for products a station doesn't carry,
/// which is routine. Transport and format problems point at the upstream.
pub fn classify_provider_failure(err: &ProviderError) -> FailureType {
    match err {
        ProviderError::NotConfigured(_) => FailureType::Expected,
        ProviderError::NoDataAvailable(_) => FailureType::Expected,
        ProviderError::Upstream(msg) if msg.contains("No data was found") => FailureType::Expected,
        ProviderError::Upstream(_) => FailureType::Unknown,
        ProviderError::HttpError(code) if *code == 404 => FailureType::Unknown,
        ProviderError::HttpError(_)
        | ProviderError::Timeout(_)
        | ProviderError::Transport(_)
        | ProviderError::ParseError(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a provider failure with automatic classification
pub fn log_provider_failure(
    source: DataSource,
    station_id: &str,
    operation: &str,
    err: &ProviderError,
) {
    let failure_type = classify_provider_failure(err);
    let message = format!(
        "{} failed [{}]: {}",
        operation, failure_type, err
    );

    match failure_type {
        FailureType::Expected => debug(source, Some(station_id), &message),
        FailureType::Unexpected => error(source, Some(station_id), &message),
        FailureType::Unknown => warn(source, Some(station_id), &message),
    }
}

/// Log one handled HTTP request
pub fn log_request(method: &str, path: &str, status: u16, elapsed_ms: u128) {
    let message = format!("{} {} -> {} ({} ms)", method, path, status, elapsed_ms);
    if status >= 500 {
        error(DataSource::Http, None, &message);
    } else if status >= 400 {
        warn(DataSource::Http, None, &message);
    } else {
        debug(DataSource::Http, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!(" debug ".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_failure_classification() {
        let missing_product = ProviderError::Upstream(
            "No data was found. This product may not be offered at this station".into(),
        );
        assert_eq!(classify_provider_failure(&missing_product), FailureType::Expected);

        assert_eq!(
            classify_provider_failure(&ProviderError::HttpError(500)),
            FailureType::Unexpected
        );
        assert_eq!(
            classify_provider_failure(&ProviderError::Timeout("10s".into())),
            FailureType::Unexpected
        );
        assert_eq!(
            classify_provider_failure(&ProviderError::Upstream("Bad station".into())),
            FailureType::Unknown
        );
        assert_eq!(
            classify_provider_failure(&ProviderError::NotConfigured("offline".into())),
            FailureType::Expected
        );
    }

    #[test]
    fn test_data_source_tags() {
        assert_eq!(DataSource::Noaa.to_string(), "NOAA");
        assert_eq!(DataSource::OpenWeather.to_string(), "OWM");
    }
}
