/// Synthetic data for the coastal monitoring service.
///
/// The tides API has no wave product for most stations and the monitoring
/// network has no live feed, so parts of every snapshot are modelled. All
/// randomness flows through `RandomSource`: with a seed, every named stream
/// is reproducible; without one, each stream is seeded from OS entropy.
///
/// Submodules:
/// - `network`: the coastal monitoring network and its assessments.

pub mod network;

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

use crate::model::{
    Coordinates, GridPoint, Quality, StationInfo, TemperatureField, TidePoint, TideSeries,
    WaveReading, TIDE_HORIZON,
};

/// Generator behind every synthetic value.
pub type SimRng = ChaCha8Rng;

/// Degrees spanned by the scatter box around a station (±half each way).
pub const SCATTER_SPAN_DEG: f64 = 0.15;

/// Number of temperature samples scattered around a station.
pub const TEMPERATURE_GRID_POINTS: usize = 100;

/// Timestamp format shared with NOAA tide predictions.
pub const TIDE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

// ---------------------------------------------------------------------------
// RandomSource
// ---------------------------------------------------------------------------

/// Hands out independent RNG streams by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSource {
    seed: Option<u64>,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn from_entropy() -> Self {
        Self { seed: None }
    }

    pub fn is_seeded(&self) -> bool {
        self.seed.is_some()
    }

    /// A fresh stream for `label`. Seeded sources return the same sequence
    /// for the same label on every call.
    pub fn stream(&self, label: &str) -> SimRng {
        match self.seed {
            Some(seed) => SimRng::seed_from_u64(seed ^ label_hash(label)),
            None => SimRng::from_entropy(),
        }
    }
}

/// FNV-1a over the label bytes.
fn label_hash(label: &str) -> u64 {
    label.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rounds to three decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// A point uniformly scattered in the box around `center`.
pub fn random_coordinate(center: Coordinates, rng: &mut SimRng) -> Coordinates {
    let [lon, lat] = center;
    [
        lon + (rng.gen_range(0.0..1.0) - 0.5) * SCATTER_SPAN_DEG,
        lat + (rng.gen_range(0.0..1.0) - 0.5) * SCATTER_SPAN_DEG,
    ]
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Sea state modelled from a measured water level.
pub fn simulate_wave(water_level: f64, station: StationInfo, rng: &mut SimRng) -> WaveReading {
    WaveReading {
        significant_height: 1.5 + rng.gen_range(0.0..2.0),
        dominant_period: 7.0 + rng.gen_range(0.0..5.0),
        average_period: 6.0 + rng.gen_range(0.0..3.0),
        peak_direction: 120.0 + rng.gen_range(0.0..120.0),
        water_level_influence: Some(water_level.abs() * 0.1),
        station_info: Some(station),
        quality: Quality::Simulated,
    }
}

/// Temperature samples scattered around a station from one measured value.
pub fn temperature_grid(base: f64, center: Coordinates, rng: &mut SimRng) -> TemperatureField {
    let variation = 3.0;
    let grid_points = (0..TEMPERATURE_GRID_POINTS)
        .map(|_| GridPoint {
            temperature: base + (rng.gen_range(0.0..1.0) - 0.5) * variation,
            coordinates: random_coordinate(center, rng),
            depth: rng.gen_range(0.0..10.0),
        })
        .collect();

    TemperatureField {
        base_temperature: base,
        grid_points,
        variation_range: variation,
        unit: "celsius".to_string(),
        quality: Quality::Measured,
    }
}

/// 24 hours of half-hourly sine-wave tides starting at `now`.
pub fn default_tide_series(now: DateTime<Utc>) -> TideSeries {
    let predictions = (0..TIDE_HORIZON)
        .map(|i| {
            let at = now + Duration::minutes(30 * i as i64);
            TidePoint {
                timestamp: at.format(TIDE_TIME_FORMAT).to_string(),
                height: round3((i as f64 * PI / 12.0).sin() * 1.5),
            }
        })
        .collect();

    TideSeries {
        predictions,
        quality: Quality::Simulated,
    }
}
