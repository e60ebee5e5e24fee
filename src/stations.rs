/// Station registry for the coastal monitoring service.
///
/// Holds the canonical list of stations (query stations and the coastal
/// monitoring network), the regional profiles that modulate synthetic
/// readings, and the heatmap region. The data lives in `stations.toml`,
/// which is embedded at compile time and may be overridden at runtime.
/// All other modules look stations up here rather than hardcoding ids.

use serde::Deserialize;
use std::collections::HashSet;

use crate::config::ConfigError;
use crate::model::{Coordinates, StationInfo};

/// Built-in registry shipped with the service.
pub const EMBEDDED_REGISTRY: &str = include_str!("../stations.toml");

// ---------------------------------------------------------------------------
// Registry types
// ---------------------------------------------------------------------------

/// Metadata for a single station.
#[derive(Debug, Clone, Deserialize)]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Selects which sensors a network station reports.
    #[serde(rename = "type")]
    pub station_type: String,
    /// Key into the region profiles.
    pub region: String,
    pub state: String,
    #[serde(default = "default_status")]
    pub status: String,
    /// Whether the station is part of the coastal monitoring network.
    #[serde(default)]
    pub network: bool,
}

fn default_status() -> String {
    "operational".to_string()
}

impl StationRecord {
    pub fn coordinates(&self) -> Coordinates {
        [self.longitude, self.latitude]
    }
}

/// Modifiers and static conditions for one coastal region.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionProfile {
    pub id: String,
    pub name: String,
    pub wave_height_factor: f64,
    /// Degrees Celsius added to simulated water temperature.
    pub temperature_offset: f64,
    pub current_strength: f64,
    pub typical_wave_range: String,
    pub temperature_range: String,
    pub monsoon_season: String,
    pub primary_currents: String,
    pub fishing_seasons: Vec<String>,
    pub navigation_notes: String,
    /// Shallow regions add tide-related navigation advice.
    #[serde(default)]
    pub shallow_water: bool,
}

impl RegionProfile {
    /// Profile with no modifiers, used if the registry lacks a region.
    pub fn neutral(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            wave_height_factor: 1.0,
            temperature_offset: 0.0,
            current_strength: 1.0,
            typical_wave_range: "unknown".to_string(),
            temperature_range: "unknown".to_string(),
            monsoon_season: "unknown".to_string(),
            primary_currents: "unknown".to_string(),
            fishing_seasons: Vec::new(),
            navigation_notes: "No regional notes available".to_string(),
            shallow_water: false,
        }
    }
}

/// Extent and reference lines of the heatmap grid.
#[derive(Debug, Clone, Deserialize)]
pub struct HeatmapRegion {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub reference_latitude: f64,
    pub channel_longitude: f64,
    pub default_resolution: f64,
}

/// Root of `stations.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct StationRegistry {
    pub default_query_station: String,
    pub fallback_station: String,
    pub fallback_region: String,
    pub heatmap: HeatmapRegion,
    #[serde(rename = "station")]
    pub stations: Vec<StationRecord>,
    #[serde(rename = "region")]
    pub regions: Vec<RegionProfile>,
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl StationRegistry {
    /// Parses the registry compiled into the binary.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(EMBEDDED_REGISTRY)
    }

    /// Parses and validates a registry document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let registry: StationRegistry =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Checks the cross-references and ranges serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for station in &self.stations {
            if station.id.trim().is_empty() {
                return Err(ConfigError::Invalid("station with empty id".to_string()));
            }
            if !seen.insert(station.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate station id '{}'",
                    station.id
                )));
            }
            if !(-90.0..=90.0).contains(&station.latitude)
                || !(-180.0..=180.0).contains(&station.longitude)
            {
                return Err(ConfigError::Invalid(format!(
                    "station '{}' has out-of-range coordinates",
                    station.id
                )));
            }
        }

        for id in [&self.default_query_station, &self.fallback_station] {
            if self.find_station(id).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "station '{}' is referenced but not defined",
                    id
                )));
            }
        }
        if self.region(&self.fallback_region).is_none() {
            return Err(ConfigError::Invalid(format!(
                "fallback region '{}' is not defined",
                self.fallback_region
            )));
        }

        let h = &self.heatmap;
        let edges = [h.north, h.south, h.east, h.west];
        if !edges.iter().all(|v| v.is_finite()) || h.north <= h.south || h.east <= h.west {
            return Err(ConfigError::Invalid(
                "heatmap region must have north > south and east > west".to_string(),
            ));
        }
        if !(h.default_resolution.is_finite() && h.default_resolution > 0.0) {
            return Err(ConfigError::Invalid(
                "heatmap default_resolution must be positive".to_string(),
            ));
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Looks up a station by id. Returns `None` if not found.
    pub fn find_station(&self, id: &str) -> Option<&StationRecord> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// The requested station, or the fallback station for unknown ids.
    pub fn station_or_fallback(&self, id: &str) -> Option<&StationRecord> {
        self.find_station(id)
            .or_else(|| self.find_station(&self.fallback_station))
    }

    pub fn region(&self, id: &str) -> Option<&RegionProfile> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// The named region, else the fallback region, else a neutral profile.
    pub fn region_or_fallback(&self, id: &str) -> RegionProfile {
        self.region(id)
            .or_else(|| self.region(&self.fallback_region))
            .cloned()
            .unwrap_or_else(|| RegionProfile::neutral(id))
    }

    /// Stations that make up the coastal monitoring network, in file order.
    pub fn network_stations(&self) -> impl Iterator<Item = &StationRecord> {
        self.stations.iter().filter(|s| s.network)
    }

    /// Display metadata for a station id. Unknown ids describe the fallback
    /// station but keep the requested id.
    pub fn station_info(&self, id: &str) -> StationInfo {
        match self.station_or_fallback(id) {
            Some(record) => StationInfo {
                id: id.to_string(),
                name: record.name.clone(),
                lat: record.latitude,
                lon: record.longitude,
                station_type: record.station_type.clone(),
                region: self
                    .region(&record.region)
                    .map(|r| r.name.clone())
                    .unwrap_or_else(|| record.region.clone()),
                state: record.state.clone(),
            },
            // Only reachable for a registry that skipped validation.
            None => StationInfo {
                id: id.to_string(),
                name: "Unknown station".to_string(),
                lat: (self.heatmap.north + self.heatmap.south) / 2.0,
                lon: (self.heatmap.east + self.heatmap.west) / 2.0,
                station_type: "unknown".to_string(),
                region: "unknown".to_string(),
                state: "unknown".to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
