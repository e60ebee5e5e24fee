/// Core data types for the coastal monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// the typed readings produced by the provider adapters, the query/bounds
/// types parsed from requests, and the provider error type.
/// It contains no I/O.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Conversion factor from metres per second to knots.
pub const KNOTS_PER_MPS: f64 = 1.94384;

/// `[longitude, latitude]` in decimal degrees, the order map clients expect.
pub type Coordinates = [f64; 2];

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Provenance of a reading. Consumers use this to detect degraded data
/// without inspecting values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Parsed directly from an upstream response.
    Measured,
    /// Synthesized from upstream data or from a model of it.
    Simulated,
    /// Hardcoded fallback used because the upstream call failed.
    Default,
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Axis-aligned lat/lon rectangle in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Builds a box, returning `None` unless all four edges are finite and
    /// `north >= south`, `east >= west`.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Option<Self> {
        let edges = [north, south, east, west];
        if !edges.iter().all(|v| v.is_finite()) || north < south || east < west {
            return None;
        }
        Some(Self { north, south, east, west })
    }

    /// Parses a bounds parameter such as
    /// `{"north":23.5,"south":18.0,"east":73.0,"west":68.0}`.
    ///
    /// Fails open: malformed JSON, missing edges or non-finite values all
    /// yield `None`, which callers treat as "no bounds".
    pub fn from_json(raw: &str) -> Option<Self> {
        let parsed: BoundingBox = serde_json::from_str(raw.trim()).ok()?;
        Self::new(parsed.north, parsed.south, parsed.east, parsed.west)
    }

    pub fn contains(&self, coordinates: Coordinates) -> bool {
        let [lon, lat] = coordinates;
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    /// Stable textual key, rounded so float noise doesn't split cache entries.
    pub fn cache_key(&self) -> String {
        format!(
            "{:.4},{:.4},{:.4},{:.4}",
            self.north, self.south, self.east, self.west
        )
    }
}

/// A request for one station's environmental snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StationQuery {
    pub station_id: String,
    pub bounds: Option<BoundingBox>,
}

impl StationQuery {
    pub fn new(station_id: impl Into<String>, bounds: Option<BoundingBox>) -> Self {
        Self {
            station_id: station_id.into(),
            bounds,
        }
    }

    pub fn cache_key(&self) -> String {
        match &self.bounds {
            Some(b) => format!("{}|{}", self.station_id, b.cache_key()),
            None => format!("{}|*", self.station_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Station description
// ---------------------------------------------------------------------------

/// Human-facing station description attached to snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationInfo {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type")]
    pub station_type: String,
    pub region: String,
    pub state: String,
}

impl StationInfo {
    pub fn coordinates(&self) -> Coordinates {
        [self.lon, self.lat]
    }
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// Sea state at a station. Usually `Simulated`: the tides API has no wave
/// product for most stations, so heights are modelled from water level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveReading {
    /// Metres.
    pub significant_height: f64,
    /// Seconds.
    pub dominant_period: f64,
    /// Seconds.
    pub average_period: f64,
    /// Degrees true.
    pub peak_direction: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_level_influence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_info: Option<StationInfo>,
    pub quality: Quality,
}

impl WaveReading {
    pub fn fallback() -> Self {
        Self {
            significant_height: 2.1,
            dominant_period: 8.5,
            average_period: 7.2,
            peak_direction: 180.0,
            water_level_influence: None,
            station_info: None,
            quality: Quality::Default,
        }
    }
}

/// One sampled water temperature around a station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPoint {
    pub temperature: f64,
    pub coordinates: Coordinates,
    /// Metres below surface.
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureField {
    /// Degrees Celsius.
    pub base_temperature: f64,
    pub grid_points: Vec<GridPoint>,
    pub variation_range: f64,
    pub unit: String,
    pub quality: Quality,
}

impl TemperatureField {
    pub fn fallback() -> Self {
        Self {
            base_temperature: 20.0,
            grid_points: Vec::new(),
            variation_range: 2.0,
            unit: "celsius".to_string(),
            quality: Quality::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Velocity {
    pub u: f64,
    pub v: f64,
}

/// A current arrow for map animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentVector {
    pub id: usize,
    pub start: Coordinates,
    pub velocity: Velocity,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentReading {
    /// Metres per second.
    pub current_speed: f64,
    /// Degrees true, direction of flow.
    pub current_direction: f64,
    pub speed_knots: f64,
    pub vectors: Vec<CurrentVector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub quality: Quality,
}

impl CurrentReading {
    /// Builds a reading; `speed_knots` is always derived from `speed`.
    pub fn new(speed: f64, direction: f64, timestamp: Option<String>, quality: Quality) -> Self {
        Self {
            current_speed: speed,
            current_direction: direction,
            speed_knots: speed * KNOTS_PER_MPS,
            vectors: Vec::new(),
            timestamp,
            quality,
        }
    }

    pub fn fallback() -> Self {
        Self::new(1.5, 180.0, None, Quality::Default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindReading {
    /// Metres per second.
    pub speed: f64,
    /// Degrees true, direction the wind blows from.
    pub direction: f64,
    /// Metres per second.
    pub gust: f64,
    pub timestamp: String,
    pub quality: Quality,
}

impl WindReading {
    pub fn fallback(timestamp: String) -> Self {
        Self {
            speed: 5.0,
            direction: 180.0,
            gust: 8.0,
            timestamp,
            quality: Quality::Default,
        }
    }
}

/// One tide prediction. Height in metres above MLLW.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidePoint {
    pub timestamp: String,
    pub height: f64,
}

/// Forward-looking tide predictions, at most `TIDE_HORIZON` samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TideSeries {
    pub predictions: Vec<TidePoint>,
    pub quality: Quality,
}

/// Number of forward tide samples kept per series.
pub const TIDE_HORIZON: usize = 48;

impl TideSeries {
    /// Copy of this series keeping only the first `n` predictions.
    pub fn truncated(&self, n: usize) -> Self {
        Self {
            predictions: self.predictions.iter().take(n).cloned().collect(),
            quality: self.quality,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or parsing upstream data.
///
/// Provider adapters never surface these to callers; they log them and
/// substitute a default reading.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Non-2xx HTTP response.
    HttpError(u16),
    /// The call exceeded the configured timeout.
    Timeout(String),
    /// Connection, TLS or body-read failure.
    Transport(String),
    /// The response body could not be deserialized.
    ParseError(String),
    /// The upstream answered with an explicit error message.
    Upstream(String),
    /// The response was well formed but held no usable sample.
    NoDataAvailable(String),
    /// The provider is not configured (missing key, offline mode).
    NotConfigured(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::HttpError(code) => write!(f, "HTTP error: {}", code),
            ProviderError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ProviderError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ProviderError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ProviderError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            ProviderError::NoDataAvailable(msg) => write!(f, "No data available: {}", msg),
            ProviderError::NotConfigured(msg) => write!(f, "Not configured: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
