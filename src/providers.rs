/// Provider adapters for the five NOAA-backed readings.
///
/// Each adapter makes one datagetter call, parses it, and turns it into a
/// typed reading. Adapters never fail: any transport, format or upstream
/// error is logged with its classification and replaced by the reading's
/// default, tagged `Quality::Default` (or `Simulated` for tides).

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::sync::Arc;

use crate::fetch::Fetcher;
use crate::ingest::noaa::{self, NoaaProduct};
use crate::logging::{self, DataSource};
use crate::model::{
    CurrentReading, ProviderError, Quality, StationInfo, TemperatureField, TideSeries,
    WaveReading, WindReading, TIDE_HORIZON,
};
use crate::simulate::{self, SimRng};
use crate::visualization::generate_current_vectors;

/// The five readings gathered for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Wave,
    Temperature,
    Current,
    Wind,
    Tide,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Wave,
        Provider::Temperature,
        Provider::Current,
        Provider::Wind,
        Provider::Tide,
    ];

    pub fn product(&self) -> NoaaProduct {
        match self {
            Provider::Wave => NoaaProduct::WaterLevel,
            Provider::Temperature => NoaaProduct::WaterTemperature,
            Provider::Current => NoaaProduct::Currents,
            Provider::Wind => NoaaProduct::Wind,
            Provider::Tide => NoaaProduct::Predictions,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Wave => write!(f, "wave"),
            Provider::Temperature => write!(f, "temperature"),
            Provider::Current => write!(f, "current"),
            Provider::Wind => write!(f, "wind"),
            Provider::Tide => write!(f, "tide"),
        }
    }
}

pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// NOAA adapters
// ---------------------------------------------------------------------------

pub struct NoaaProviders {
    base_url: String,
    application: String,
    fetcher: Arc<dyn Fetcher>,
}

impl NoaaProviders {
    pub fn new(base_url: String, application: String, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            base_url,
            application,
            fetcher,
        }
    }

    fn fetch(
        &self,
        provider: Provider,
        station: &str,
        now: DateTime<Utc>,
    ) -> Result<String, ProviderError> {
        let url = noaa::build_datagetter_url(
            &self.base_url,
            provider.product(),
            station,
            &self.application,
            now,
        );
        self.fetcher.fetch(&url)
    }

    fn recover<T>(
        &self,
        provider: Provider,
        station: &str,
        result: Result<T, ProviderError>,
        default: impl FnOnce() -> T,
    ) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                let operation = format!("{} fetch", provider);
                logging::log_provider_failure(DataSource::Noaa, station, &operation, &e);
                default()
            }
        }
    }

    /// Sea state modelled from the latest water level.
    pub fn wave(&self, station: &StationInfo, now: DateTime<Utc>, rng: &mut SimRng) -> WaveReading {
        let result = self
            .fetch(Provider::Wave, &station.id, now)
            .and_then(|body| noaa::parse_latest_value(&body))
            .map(|level| simulate::simulate_wave(level, station.clone(), rng));
        self.recover(Provider::Wave, &station.id, result, WaveReading::fallback)
    }

    /// Temperature samples scattered around the station from the latest
    /// water temperature.
    pub fn temperature(&self, station: &StationInfo, now: DateTime<Utc>, rng: &mut SimRng) -> TemperatureField {
        let result = self
            .fetch(Provider::Temperature, &station.id, now)
            .and_then(|body| noaa::parse_latest_value(&body))
            .map(|base| simulate::temperature_grid(base, station.coordinates(), rng));
        self.recover(Provider::Temperature, &station.id, result, TemperatureField::fallback)
    }

    pub fn current(&self, station: &StationInfo, now: DateTime<Utc>) -> CurrentReading {
        let result = self
            .fetch(Provider::Current, &station.id, now)
            .and_then(|body| noaa::parse_currents(&body))
            .map(|sample| {
                CurrentReading::new(sample.speed, sample.direction, sample.timestamp, Quality::Measured)
            });
        let mut reading = self.recover(Provider::Current, &station.id, result, CurrentReading::fallback);
        reading.vectors = generate_current_vectors(
            0.0,
            reading.current_speed,
            reading.current_direction,
            station.coordinates(),
        );
        reading
    }

    pub fn wind(&self, station: &StationInfo, now: DateTime<Utc>) -> WindReading {
        let result = self
            .fetch(Provider::Wind, &station.id, now)
            .and_then(|body| noaa::parse_wind(&body))
            .map(|sample| WindReading {
                speed: sample.speed,
                direction: sample.direction,
                gust: sample.gust,
                timestamp: sample.timestamp.unwrap_or_else(|| iso_timestamp(now)),
                quality: Quality::Measured,
            });
        self.recover(Provider::Wind, &station.id, result, || WindReading::fallback(iso_timestamp(now)))
    }

    /// Up to 48 forward predictions; a synthetic day of tides on failure.
    pub fn tide(&self, station: &StationInfo, now: DateTime<Utc>) -> TideSeries {
        let result = self
            .fetch(Provider::Tide, &station.id, now)
            .and_then(|body| noaa::parse_predictions(&body, now, TIDE_HORIZON))
            .map(|predictions| TideSeries {
                predictions,
                quality: Quality::Measured,
            });
        self.recover(Provider::Tide, &station.id, result, || simulate::default_tide_series(now))
    }
}
