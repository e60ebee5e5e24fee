/// Coastal monitoring network.
///
/// Each network station reports the sensors its type carries. Readings are
/// scaled by the station's regional profile, tagged with the monsoon phase
/// for the current month, and assessed for fishing and navigation.

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};
use rand::Rng;
use serde::Serialize;

use crate::model::{BoundingBox, Coordinates, Quality};
use crate::simulate::SimRng;
use crate::stations::{RegionProfile, StationRegistry};

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

/// Sensors present depend on station type; absent sensors are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorReadings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_period: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_direction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_direction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barometric_pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<String>,
}

/// Draws the sensors a station of `station_type` reports.
pub fn generate_sensor_readings(
    station_type: &str,
    now: DateTime<Utc>,
    rng: &mut SimRng,
) -> SensorReadings {
    match station_type {
        "wave" | "major_port" | "fishing_port" => SensorReadings {
            wave_height: Some(1.8 + rng.gen_range(0.0..2.5)),
            wave_period: Some(7.0 + rng.gen_range(0.0..5.0)),
            wave_direction: Some(180.0 + rng.gen_range(0.0..120.0)),
            wind_speed: Some(8.0 + rng.gen_range(0.0..12.0)),
            wind_direction: Some(200.0 + rng.gen_range(0.0..80.0)),
            ..Default::default()
        },
        "current" | "coastal_monitor" => SensorReadings {
            current_speed: Some(0.5 + rng.gen_range(0.0..2.5)),
            current_direction: Some(rng.gen_range(0.0..360.0)),
            water_temperature: Some(24.0 + rng.gen_range(0.0..6.0)),
            ..Default::default()
        },
        "meteorological" | "monitoring_station" => SensorReadings {
            wind_speed: Some(5.0 + rng.gen_range(0.0..15.0)),
            wind_direction: Some(rng.gen_range(0.0..360.0)),
            air_temperature: Some(25.0 + rng.gen_range(0.0..10.0)),
            barometric_pressure: Some(1008.0 + rng.gen_range(0.0..12.0)),
            humidity: Some(65.0 + rng.gen_range(0.0..25.0)),
            ..Default::default()
        },
        "offshore_platform" => SensorReadings {
            wave_height: Some(2.2 + rng.gen_range(0.0..2.8)),
            wave_period: Some(8.0 + rng.gen_range(0.0..6.0)),
            current_speed: Some(1.0 + rng.gen_range(0.0..2.0)),
            wind_speed: Some(10.0 + rng.gen_range(0.0..18.0)),
            water_temperature: Some(26.0 + rng.gen_range(0.0..4.0)),
            ..Default::default()
        },
        _ => {
            let days_ago = rng.gen_range(0.0..30.0);
            let maintained = now - Duration::seconds((days_ago * 86_400.0) as i64);
            SensorReadings {
                status: Some("operational".to_string()),
                last_maintenance: Some(maintained.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ..Default::default()
            }
        }
    }
}

/// Scales wave height and current speed and offsets water temperature.
pub fn apply_regional_modifiers(readings: &mut SensorReadings, region: &RegionProfile) {
    if let Some(h) = readings.wave_height.as_mut() {
        *h *= region.wave_height_factor;
    }
    if let Some(s) = readings.current_speed.as_mut() {
        *s *= region.current_strength;
    }
    if let Some(t) = readings.water_temperature.as_mut() {
        *t += region.temperature_offset;
    }
}

// ---------------------------------------------------------------------------
// Monsoon
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonsoonSeason {
    Monsoon,
    Transition,
    Calm,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonsoonInfluence {
    pub season: MonsoonSeason,
    pub intensity: f64,
    pub wave_amplification: f64,
    pub current_intensification: f64,
    pub weather_severity: String,
}

/// Monsoon phase for a zero-based month: June to September is monsoon,
/// May and October are transition months.
pub fn monsoon_influence(month0: u32, rng: &mut SimRng) -> MonsoonInfluence {
    let (season, intensity, wave_amplification, current_intensification, severity) = match month0 {
        5..=8 => (MonsoonSeason::Monsoon, 0.8 + rng.gen_range(0.0..0.4), 1.5, 1.3, "high"),
        4 | 9 => (MonsoonSeason::Transition, 0.4 + rng.gen_range(0.0..0.3), 1.1, 1.1, "moderate"),
        _ => (MonsoonSeason::Calm, 0.2 + rng.gen_range(0.0..0.2), 0.8, 0.9, "low"),
    };
    MonsoonInfluence {
        season,
        intensity,
        wave_amplification,
        current_intensification,
        weather_severity: severity.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Assessments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FishingCategory {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FishingConditions {
    /// 0..=100.
    pub score: i32,
    pub category: FishingCategory,
    pub recommendations: Vec<String>,
}

/// Scores fishing conditions from 70, adjusting for each sensor present.
/// Absent sensors contribute nothing.
pub fn assess_fishing(readings: &SensorReadings, monsoon: &MonsoonInfluence) -> FishingConditions {
    let mut score: i32 = 70;

    if let Some(wave) = readings.wave_height {
        if wave > 3.0 {
            score -= 30;
        } else if wave > 2.0 {
            score -= 15;
        } else if wave < 1.0 {
            score += 10;
        }
    }

    if let Some(current) = readings.current_speed {
        if current > 2.0 {
            score -= 20;
        } else if current < 0.5 {
            score -= 10;
        }
    }

    match monsoon.season {
        MonsoonSeason::Monsoon => score -= 40,
        MonsoonSeason::Calm => score += 20,
        MonsoonSeason::Transition => {}
    }

    if readings.wind_speed.is_some_and(|w| w > 15.0) {
        score -= 25;
    }

    let score = score.clamp(0, 100);
    let (category, advice): (FishingCategory, [&str; 2]) = if score > 70 {
        (
            FishingCategory::Excellent,
            ["Excellent conditions for fishing", "All vessel sizes can operate safely"],
        )
    } else if score > 50 {
        (
            FishingCategory::Good,
            ["Good conditions for experienced fishermen", "Medium to large vessels recommended"],
        )
    } else if score > 30 {
        (
            FishingCategory::Fair,
            ["Caution advised - only experienced crews", "Large vessels only"],
        )
    } else {
        (
            FishingCategory::Poor,
            ["Poor conditions - avoid fishing activities", "Wait for weather improvement"],
        )
    };

    let mut recommendations: Vec<String> = advice.iter().map(|s| s.to_string()).collect();
    if monsoon.season == MonsoonSeason::Monsoon {
        recommendations.push("Monsoon season - exercise extreme caution".to_string());
    }

    FishingConditions {
        score,
        category,
        recommendations,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationSafety {
    pub risk_level: RiskLevel,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Navigation risk is the worst level any single hazard reaches.
pub fn assess_navigation(readings: &SensorReadings, region: &RegionProfile) -> NavigationSafety {
    let mut risk_level = RiskLevel::Low;
    let mut risks = Vec::new();
    let mut raise = |level: RiskLevel, risk: &str, risks: &mut Vec<String>| {
        risk_level = risk_level.max(level);
        risks.push(risk.to_string());
    };

    if let Some(wave) = readings.wave_height {
        if wave > 3.5 {
            raise(RiskLevel::High, "Very high waves", &mut risks);
        } else if wave > 2.5 {
            raise(RiskLevel::Medium, "High waves", &mut risks);
        }
    }
    if readings.current_speed.is_some_and(|c| c > 2.5) {
        raise(RiskLevel::High, "Strong currents", &mut risks);
    }
    if readings.wind_speed.is_some_and(|w| w > 20.0) {
        raise(RiskLevel::High, "Strong winds", &mut risks);
    }
    if region.shallow_water {
        risks.push("Shallow waters - check tides".to_string());
    }

    let advice: &[&str] = match risk_level {
        RiskLevel::High => &[
            "High risk - avoid unnecessary navigation",
            "Large vessels only with experienced crew",
            "Monitor weather updates continuously",
        ],
        RiskLevel::Medium => &[
            "Moderate risk - exercise caution",
            "Medium to large vessels recommended",
            "Check weather before departure",
        ],
        RiskLevel::Low => &["Generally safe for navigation", "Standard precautions apply"],
    };
    let mut recommendations: Vec<String> = advice.iter().map(|s| s.to_string()).collect();
    if region.shallow_water {
        recommendations.push("Check tidal charts - shallow waters".to_string());
        recommendations.push("Local pilot recommended for large vessels".to_string());
    }

    NavigationSafety {
        risk_level,
        risks,
        recommendations,
    }
}

// ---------------------------------------------------------------------------
// Network assembly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReadings {
    #[serde(flatten)]
    pub sensors: SensorReadings,
    pub monsoon_influence: MonsoonInfluence,
    pub region: String,
    /// Practical salinity units.
    pub salinity: f64,
    /// NTU.
    pub turbidity: f64,
    pub fishing_conditions: FishingConditions,
    pub navigation_safety: NavigationSafety,
}

/// Static description of a station's region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalConditions {
    pub typical_wave_range: String,
    pub temperature_range: String,
    pub monsoon_season: String,
    pub primary_currents: String,
    pub fishing_seasons: Vec<String>,
    pub navigation_notes: String,
}

impl From<&RegionProfile> for RegionalConditions {
    fn from(profile: &RegionProfile) -> Self {
        Self {
            typical_wave_range: profile.typical_wave_range.clone(),
            temperature_range: profile.temperature_range.clone(),
            monsoon_season: profile.monsoon_season.clone(),
            primary_currents: profile.primary_currents.clone(),
            fishing_seasons: profile.fishing_seasons.clone(),
            navigation_notes: profile.navigation_notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringStation {
    pub id: String,
    pub name: String,
    pub coordinates: Coordinates,
    #[serde(rename = "type")]
    pub station_type: String,
    pub state: String,
    pub region: String,
    pub status: String,
    pub data: StationReadings,
    pub environmental_conditions: RegionalConditions,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringNetwork {
    pub stations: Vec<MonitoringStation>,
    pub quality: Quality,
}

/// Full reading set for one station of the given type and region.
pub fn generate_station_readings(
    station_type: &str,
    region: &RegionProfile,
    now: DateTime<Utc>,
    rng: &mut SimRng,
) -> StationReadings {
    let mut sensors = generate_sensor_readings(station_type, now, rng);
    let monsoon = monsoon_influence(now.month0(), rng);
    apply_regional_modifiers(&mut sensors, region);

    let salinity = 35.0 + rng.gen_range(0.0..2.0);
    let turbidity = rng.gen_range(0.0..5.0);
    let fishing_conditions = assess_fishing(&sensors, &monsoon);
    let navigation_safety = assess_navigation(&sensors, region);

    StationReadings {
        sensors,
        monsoon_influence: monsoon,
        region: region.id.clone(),
        salinity,
        turbidity,
        fishing_conditions,
        navigation_safety,
    }
}

/// The registry's network stations, optionally restricted to `bounds`,
/// each enriched with freshly generated readings.
pub fn build_monitoring_network(
    registry: &StationRegistry,
    bounds: Option<&BoundingBox>,
    now: DateTime<Utc>,
    rng: &mut SimRng,
) -> MonitoringNetwork {
    let last_updated = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let stations = registry
        .network_stations()
        .filter(|s| bounds.is_none_or(|b| b.contains(s.coordinates())))
        .map(|s| {
            let region = registry.region_or_fallback(&s.region);
            MonitoringStation {
                id: s.id.clone(),
                name: s.name.clone(),
                coordinates: s.coordinates(),
                station_type: s.station_type.clone(),
                state: s.state.clone(),
                region: s.region.clone(),
                status: s.status.clone(),
                data: generate_station_readings(&s.station_type, &region, now, rng),
                environmental_conditions: RegionalConditions::from(&region),
                last_updated: last_updated.clone(),
            }
        })
        .collect();

    MonitoringNetwork {
        stations,
        quality: Quality::Simulated,
    }
}
