/// Environmental condition classifier.
///
/// Turns wave, current, wind and temperature readings into categories,
/// an overall score, a safety assessment and advisory text. Every function
/// is total: magnitudes are classified by absolute value and NaN reads as
/// zero, so no reading can fall outside the partition.
///
/// All bands are half-open `[lower, upper)` with the last band unbounded.

use serde::Serialize;

use crate::model::{CurrentReading, TemperatureField, WaveReading, WindReading};

// ---------------------------------------------------------------------------
// Input policy
// ---------------------------------------------------------------------------

/// Non-negative magnitude for speeds and heights.
fn magnitude(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.abs() }
}

/// Signed temperature.
fn signed(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value }
}

// ---------------------------------------------------------------------------
// Per-dimension categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveCategory {
    Calm,
    Slight,
    Moderate,
    Rough,
    VeryRough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentCategory {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindCategory {
    Light,
    Moderate,
    Fresh,
    Strong,
    Gale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureCategory {
    Cold,
    Cool,
    Moderate,
    Warm,
    Hot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comfort {
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Category, description and risk for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification<C> {
    pub category: C,
    pub description: &'static str,
    pub risk: Risk,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureStatus {
    pub category: TemperatureCategory,
    pub description: &'static str,
    pub comfort: Comfort,
}

/// Significant wave height in metres.
pub fn classify_wave(height: f64) -> Classification<WaveCategory> {
    let h = magnitude(height);
    let (category, description, risk) = if h < 1.0 {
        (WaveCategory::Calm, "Smooth seas", Risk::Low)
    } else if h < 2.0 {
        (WaveCategory::Slight, "Small waves", Risk::Low)
    } else if h < 3.0 {
        (WaveCategory::Moderate, "Moderate waves", Risk::Medium)
    } else if h < 4.0 {
        (WaveCategory::Rough, "Large waves", Risk::High)
    } else {
        (WaveCategory::VeryRough, "Very large waves", Risk::VeryHigh)
    };
    Classification { category, description, risk }
}

/// Current speed in m/s.
pub fn classify_current(speed: f64) -> Classification<CurrentCategory> {
    let s = magnitude(speed);
    let (category, description, risk) = if s < 0.5 {
        (CurrentCategory::Weak, "Minimal current", Risk::Low)
    } else if s < 1.0 {
        (CurrentCategory::Moderate, "Moderate current", Risk::Medium)
    } else if s < 2.0 {
        (CurrentCategory::Strong, "Strong current", Risk::High)
    } else {
        (CurrentCategory::VeryStrong, "Very strong current", Risk::VeryHigh)
    };
    Classification { category, description, risk }
}

/// Wind speed in m/s.
pub fn classify_wind(speed: f64) -> Classification<WindCategory> {
    let s = magnitude(speed);
    let (category, description, risk) = if s < 5.0 {
        (WindCategory::Light, "Light winds", Risk::Low)
    } else if s < 10.0 {
        (WindCategory::Moderate, "Moderate winds", Risk::Low)
    } else if s < 15.0 {
        (WindCategory::Fresh, "Fresh winds", Risk::Medium)
    } else if s < 20.0 {
        (WindCategory::Strong, "Strong winds", Risk::High)
    } else {
        (WindCategory::Gale, "Gale force winds", Risk::VeryHigh)
    };
    Classification { category, description, risk }
}

/// Water temperature in °C.
pub fn classify_temperature(celsius: f64) -> TemperatureStatus {
    let t = signed(celsius);
    let (category, description, comfort) = if t < 10.0 {
        (TemperatureCategory::Cold, "Cold water", Comfort::Poor)
    } else if t < 18.0 {
        (TemperatureCategory::Cool, "Cool water", Comfort::Fair)
    } else if t < 24.0 {
        (TemperatureCategory::Moderate, "Moderate temperature", Comfort::Good)
    } else if t < 28.0 {
        (TemperatureCategory::Warm, "Warm water", Comfort::Excellent)
    } else {
        (TemperatureCategory::Hot, "Very warm water", Comfort::Good)
    };
    TemperatureStatus { category, description, comfort }
}

// ---------------------------------------------------------------------------
// Overall conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallLevel {
    Calm,
    Moderate,
    Rough,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallConditions {
    pub level: OverallLevel,
    /// 0..=100.
    pub score: f64,
    pub color: &'static str,
}

/// Mean of the wave (4 m), wind (20 m/s) and current (3 m/s) scores, each
/// capped at 100.
pub fn overall_conditions(wave_height: f64, wind_speed: f64, current_speed: f64) -> OverallConditions {
    let wave_score = (magnitude(wave_height) / 4.0 * 100.0).min(100.0);
    let wind_score = (magnitude(wind_speed) / 20.0 * 100.0).min(100.0);
    let current_score = (magnitude(current_speed) / 3.0 * 100.0).min(100.0);
    let score = (wave_score + wind_score + current_score) / 3.0;

    let (level, color) = if score < 30.0 {
        (OverallLevel::Calm, "green")
    } else if score < 60.0 {
        (OverallLevel::Moderate, "yellow")
    } else if score < 80.0 {
        (OverallLevel::Rough, "orange")
    } else {
        (OverallLevel::Severe, "red")
    };
    OverallConditions { level, score, color }
}

// ---------------------------------------------------------------------------
// Safety
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    HighRisk,
    MediumRisk,
    LowRisk,
    Safe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyAssessment {
    pub level: SafetyLevel,
    pub description: &'static str,
    pub color: &'static str,
}

fn dimension_risk(value: f64, high_above: f64, medium_above: f64) -> Risk {
    let v = magnitude(value);
    if v > high_above {
        Risk::High
    } else if v > medium_above {
        Risk::Medium
    } else {
        Risk::Low
    }
}

/// Any high dimension is high risk; two medium dimensions are medium risk;
/// one medium dimension is low risk.
pub fn assess_safety(wave_height: f64, wind_speed: f64, current_speed: f64) -> SafetyAssessment {
    let risks = [
        dimension_risk(wave_height, 3.0, 2.0),
        dimension_risk(wind_speed, 15.0, 10.0),
        dimension_risk(current_speed, 2.0, 1.0),
    ];
    let high = risks.iter().filter(|r| **r == Risk::High).count();
    let medium = risks.iter().filter(|r| **r == Risk::Medium).count();

    let (level, description, color) = if high > 0 {
        (SafetyLevel::HighRisk, "Dangerous conditions - avoid water activities", "red")
    } else if medium >= 2 {
        (SafetyLevel::MediumRisk, "Caution advised - experienced users only", "orange")
    } else if medium == 1 {
        (SafetyLevel::LowRisk, "Generally safe with normal precautions", "yellow")
    } else {
        (SafetyLevel::Safe, "Good conditions for water activities", "green")
    };
    SafetyAssessment { level, description, color }
}

/// Advisories for each dimension over its threshold, or a single
/// all-clear line when none applies.
pub fn recommendations(wave_height: f64, wind_speed: f64, current_speed: f64) -> Vec<String> {
    let mut out = Vec::new();
    if magnitude(wave_height) > 2.5 {
        out.push("Large waves present - small craft should exercise caution".to_string());
    }
    if magnitude(current_speed) > 1.5 {
        out.push("Strong currents detected - be aware of drift".to_string());
    }
    if magnitude(wind_speed) > 12.0 {
        out.push("Strong winds - consider postponing small boat activities".to_string());
    }
    if out.is_empty() {
        out.push("Good conditions for most water activities".to_string());
    }
    out
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentalSummary {
    pub overall_conditions: OverallConditions,
    pub wave_conditions: Classification<WaveCategory>,
    pub current_strength: Classification<CurrentCategory>,
    pub wind_conditions: Classification<WindCategory>,
    pub temperature_status: TemperatureStatus,
    pub safety_assessment: SafetyAssessment,
    pub recommendations: Vec<String>,
}

pub fn summarize(
    wave: &WaveReading,
    temperature: &TemperatureField,
    current: &CurrentReading,
    wind: &WindReading,
) -> EnvironmentalSummary {
    let h = wave.significant_height;
    let w = wind.speed;
    let c = current.current_speed;
    EnvironmentalSummary {
        overall_conditions: overall_conditions(h, w, c),
        wave_conditions: classify_wave(h),
        current_strength: classify_current(c),
        wind_conditions: classify_wind(w),
        temperature_status: classify_temperature(temperature.base_temperature),
        safety_assessment: assess_safety(h, w, c),
        recommendations: recommendations(h, w, c),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
