/// Map visualization helpers: heatmap grids and animation frames.
///
/// The surfaces are presentation heuristics layered on one station's
/// readings, not physical models. Everything except the temperature noise
/// is a pure function of its inputs.

use rand::Rng;
use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::model::{
    Coordinates, CurrentReading, CurrentVector, TemperatureField, Velocity, WaveReading,
};
use crate::simulate::{SimRng, SCATTER_SPAN_DEG};
use crate::stations::HeatmapRegion;

/// Smallest accepted heatmap spacing in degrees.
pub const MIN_RESOLUTION: f64 = 0.005;

pub const DEFAULT_FRAME_COUNT: usize = 60;
pub const MAX_FRAME_COUNT: usize = 600;

/// Milliseconds between animation frames.
pub const FRAME_INTERVAL_MS: i64 = 100;

const WAVE_FIELD_SAMPLES: usize = 50;
const CURRENT_VECTOR_COUNT: usize = 20;
const VECTOR_GRID_COLUMNS: usize = 5;

const DEFAULT_WAVE_BASE: f64 = 2.0;
const DEFAULT_TEMPERATURE_BASE: f64 = 20.0;
const DEFAULT_CURRENT_BASE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

/// Which reading a heatmap request is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatmapKind {
    Temperature,
    Waves,
    Currents,
}

impl HeatmapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatmapKind::Temperature => "temperature",
            HeatmapKind::Waves => "waves",
            HeatmapKind::Currents => "currents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHeatmapType(pub String);

impl fmt::Display for UnknownHeatmapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown heatmap type: {}", self.0)
    }
}

impl std::error::Error for UnknownHeatmapType {}

impl FromStr for HeatmapKind {
    type Err = UnknownHeatmapType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(HeatmapKind::Temperature),
            "waves" => Ok(HeatmapKind::Waves),
            "currents" => Ok(HeatmapKind::Currents),
            other => Err(UnknownHeatmapType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapPoint {
    pub coordinates: Coordinates,
    pub wave_height: f64,
    pub temperature: f64,
    pub current_speed: f64,
    /// 0..=1.
    pub intensity: f64,
}

/// Clamps a requested spacing to the supported range. Non-finite or
/// non-positive values take `default`.
pub fn normalize_resolution(requested: Option<f64>, default: f64) -> f64 {
    match requested {
        Some(r) if r.is_finite() && r > 0.0 => r.max(MIN_RESOLUTION),
        _ => default.max(MIN_RESOLUTION),
    }
}

/// `(rows, cols)` of the grid: `floor(span / resolution) + 1` each way.
/// The epsilon keeps exact multiples from losing their last row to float
/// error.
pub fn grid_dimensions(region: &HeatmapRegion, resolution: f64) -> (usize, usize) {
    let steps = |span: f64| ((span / resolution) + 1e-9).floor().max(0.0) as usize + 1;
    (steps(region.north - region.south), steps(region.east - region.west))
}

pub fn interpolate_wave_height(lng: f64, lat: f64, base: f64) -> f64 {
    let noise = (lat * 10.0).sin() * (lng * 10.0).cos() * 0.5;
    (base + noise).max(0.0)
}

pub fn interpolate_temperature(lat: f64, base: f64, reference_lat: f64, rng: &mut SimRng) -> f64 {
    base + (lat - reference_lat) * 2.0 + rng.gen_range(-1.0..1.0)
}

pub fn interpolate_current_speed(lng: f64, base: f64, channel_lng: f64) -> f64 {
    let channel_effect = (-((lng - channel_lng) * 20.0).powi(2)).exp() * 2.0;
    (base + channel_effect).max(0.0)
}

pub fn intensity(wave_height: f64, current_speed: f64) -> f64 {
    ((wave_height / 5.0 + current_speed / 3.0) / 2.0).clamp(0.0, 1.0)
}

/// Grid over `region`, south to north then west to east. Missing inputs
/// use fixed base values.
pub fn generate_heatmap(
    region: &HeatmapRegion,
    resolution: f64,
    wave: Option<&WaveReading>,
    temperature: Option<&TemperatureField>,
    current: Option<&CurrentReading>,
    rng: &mut SimRng,
) -> Vec<HeatmapPoint> {
    let resolution = resolution.max(MIN_RESOLUTION);
    let (rows, cols) = grid_dimensions(region, resolution);
    let wave_base = wave.map(|w| w.significant_height).unwrap_or(DEFAULT_WAVE_BASE);
    let temp_base = temperature
        .map(|t| t.base_temperature)
        .unwrap_or(DEFAULT_TEMPERATURE_BASE);
    let current_base = current.map(|c| c.current_speed).unwrap_or(DEFAULT_CURRENT_BASE);

    let mut points = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let lat = region.south + row as f64 * resolution;
        for col in 0..cols {
            let lng = region.west + col as f64 * resolution;
            let wave_height = interpolate_wave_height(lng, lat, wave_base);
            let current_speed = interpolate_current_speed(lng, current_base, region.channel_longitude);
            points.push(HeatmapPoint {
                coordinates: [lng, lat],
                wave_height,
                temperature: interpolate_temperature(lat, temp_base, region.reference_latitude, rng),
                current_speed,
                intensity: intensity(wave_height, current_speed),
            });
        }
    }
    points
}

// ---------------------------------------------------------------------------
// Animation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WavePoint {
    /// Metres along the propagation axis.
    pub position: f64,
    pub height: f64,
    pub steepness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationFrame {
    pub frame_id: usize,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub wave_field: Vec<WavePoint>,
    pub current_vectors: Vec<CurrentVector>,
}

/// Clamps a requested frame count to `1..=MAX_FRAME_COUNT`; absent or zero
/// takes the default.
pub fn normalize_frame_count(requested: Option<usize>) -> usize {
    match requested {
        Some(0) | None => DEFAULT_FRAME_COUNT,
        Some(n) => n.min(MAX_FRAME_COUNT),
    }
}

/// 50 samples of a travelling sine wave, 10 m apart, centred on 0.
pub fn generate_wave_field(time: f64, amplitude: f64) -> Vec<WavePoint> {
    let wave_length = 100.0;
    let frequency = 0.1;
    (0..WAVE_FIELD_SAMPLES)
        .map(|i| {
            let x = (i as f64 - 25.0) * 10.0;
            let phase = 2.0 * PI * (frequency * time - x / wave_length);
            WavePoint {
                position: x,
                height: amplitude * phase.sin(),
                steepness: phase.cos(),
            }
        })
        .collect()
}

/// Anchor for vector `i`: a 5×4 lattice spanning the scatter box.
fn vector_anchor(i: usize, center: Coordinates) -> Coordinates {
    let rows = CURRENT_VECTOR_COUNT / VECTOR_GRID_COLUMNS;
    let col = (i % VECTOR_GRID_COLUMNS) as f64;
    let row = (i / VECTOR_GRID_COLUMNS) as f64;
    let half = SCATTER_SPAN_DEG / 2.0;
    [
        center[0] - half + col * SCATTER_SPAN_DEG / (VECTOR_GRID_COLUMNS - 1) as f64,
        center[1] - half + row * SCATTER_SPAN_DEG / (rows - 1) as f64,
    ]
}

/// 20 current arrows whose heading and speed oscillate with `time`.
/// Direction is degrees true; `u` is east, `v` north.
pub fn generate_current_vectors(
    time: f64,
    speed: f64,
    direction: f64,
    center: Coordinates,
) -> Vec<CurrentVector> {
    (0..CURRENT_VECTOR_COUNT)
        .map(|i| {
            let phase = i as f64;
            let angle = (direction + (time + phase).sin() * 30.0).to_radians();
            let magnitude = speed * (0.8 + (time * 2.0 + phase).sin() * 0.4);
            CurrentVector {
                id: i,
                start: vector_anchor(i, center),
                velocity: Velocity {
                    u: magnitude * angle.sin(),
                    v: magnitude * angle.cos(),
                },
                magnitude,
            }
        })
        .collect()
}

/// One frame of a `count`-frame loop.
pub fn animation_frame(
    frame_id: usize,
    count: usize,
    wave: &WaveReading,
    current: &CurrentReading,
    center: Coordinates,
    start_ms: i64,
) -> AnimationFrame {
    let time = frame_id as f64 / count.max(1) as f64 * 2.0 * PI;
    AnimationFrame {
        frame_id,
        timestamp: start_ms + frame_id as i64 * FRAME_INTERVAL_MS,
        wave_field: generate_wave_field(time, wave.significant_height),
        current_vectors: generate_current_vectors(
            time,
            current.current_speed,
            current.current_direction,
            center,
        ),
    }
}

/// Exactly `count` frames, ids `0..count`, 100 ms apart from `start_ms`.
pub fn generate_animation_frames(
    count: usize,
    wave: &WaveReading,
    current: &CurrentReading,
    center: Coordinates,
    start_ms: i64,
) -> Vec<AnimationFrame> {
    (0..count)
        .map(|frame| animation_frame(frame, count, wave, current, center, start_ms))
        .collect()
}
