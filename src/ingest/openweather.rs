/// OpenWeather client for current conditions, the 5 day / 3 hour forecast
/// and One Call.
///
/// The server-side API key is attached here so browsers never see it. Bodies
/// are passed through as JSON after checking that each is a real payload of
/// the requested kind rather than an error object.

use std::sync::Arc;

use crate::fetch::Fetcher;
use crate::model::ProviderError;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Forecast entries are 3 hours apart.
const FORECAST_ENTRIES_PER_DAY: u32 = 8;

/// The free forecast product covers five days.
pub const MAX_FORECAST_DAYS: u32 = 5;

/// Blocks One Call accepts in `exclude`.
const ONECALL_PARTS: [&str; 5] = ["current", "minutely", "hourly", "daily", "alerts"];

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

fn build_url(base_url: &str, path: &str, lat: f64, lon: f64, extra: &str, api_key: &str) -> String {
    format!(
        "{}/{}?lat={}&lon={}&units=metric{}&appid={}",
        base_url.trim_end_matches('/'),
        path,
        lat,
        lon,
        extra,
        urlencoding::encode(api_key)
    )
}

/// Builds a current-weather URL in metric units.
pub fn build_current_url(base_url: &str, lat: f64, lon: f64, api_key: &str) -> String {
    build_url(base_url, "weather", lat, lon, "", api_key)
}

/// Builds a forecast URL limited to `days` worth of 3-hour entries.
pub fn build_forecast_url(base_url: &str, lat: f64, lon: f64, days: u32, api_key: &str) -> String {
    let cnt = days * FORECAST_ENTRIES_PER_DAY;
    build_url(base_url, "forecast", lat, lon, &format!("&cnt={}", cnt), api_key)
}

/// Builds a One Call URL; `exclude` is an already validated part list.
pub fn build_onecall_url(
    base_url: &str,
    lat: f64,
    lon: f64,
    exclude: Option<&str>,
    api_key: &str,
) -> String {
    let extra = exclude
        .map(|parts| format!("&exclude={}", urlencoding::encode(parts)))
        .unwrap_or_default();
    build_url(base_url, "onecall", lat, lon, &extra, api_key)
}

// ---------------------------------------------------------------------------
// Query validation
// ---------------------------------------------------------------------------

/// Validates a latitude or longitude query value.
pub fn parse_coordinate(raw: Option<&str>, name: &str, limit: f64) -> Result<f64, String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        "lat and lon query params required".to_string()
    })?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{} must be a number, got '{}'", name, raw))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(format!("{} must be within ±{}", name, limit));
    }
    Ok(value)
}

/// Forecast length in days. Absent means the full five.
pub fn parse_forecast_days(raw: Option<&str>) -> Result<u32, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(MAX_FORECAST_DAYS);
    };
    match raw.parse::<u32>() {
        Ok(days) if (1..=MAX_FORECAST_DAYS).contains(&days) => Ok(days),
        _ => Err(format!(
            "days must be an integer between 1 and {}, got '{}'",
            MAX_FORECAST_DAYS, raw
        )),
    }
}

/// Normalizes a comma-separated One Call `exclude` list. Blank means none.
pub fn parse_exclude(raw: Option<&str>) -> Result<Option<String>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let mut parts = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let part = part.to_ascii_lowercase();
        if !ONECALL_PARTS.contains(&part.as_str()) {
            return Err(format!(
                "exclude accepts {}, got '{}'",
                ONECALL_PARTS.join(", "),
                part
            ));
        }
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    Ok((!parts.is_empty()).then(|| parts.join(",")))
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Error objects carry a `cod` other than 200 (number or string) and a
/// `message`; a valid body must also hold `required` with the given shape.
fn check_response(
    json: &str,
    required: &str,
    is_shape: fn(&serde_json::Value) -> bool,
) -> Result<serde_json::Value, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| ProviderError::ParseError(format!("JSON deserialization failed: {}", e)))?;

    let cod_ok = match value.get("cod") {
        None => true,
        Some(serde_json::Value::Number(n)) => n.as_u64() == Some(200),
        Some(serde_json::Value::String(s)) => s == "200",
        Some(_) => false,
    };
    if !cod_ok {
        let message = value
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown OpenWeather error");
        return Err(ProviderError::Upstream(message.to_string()));
    }

    if !value.get(required).is_some_and(is_shape) {
        return Err(ProviderError::ParseError(format!(
            "response has no '{}' field of the expected shape",
            required
        )));
    }

    Ok(value)
}

pub fn parse_current_response(json: &str) -> Result<serde_json::Value, ProviderError> {
    check_response(json, "main", serde_json::Value::is_object)
}

pub fn parse_forecast_response(json: &str) -> Result<serde_json::Value, ProviderError> {
    check_response(json, "list", serde_json::Value::is_array)
}

/// `timezone` is present whatever blocks were excluded.
pub fn parse_onecall_response(json: &str) -> Result<serde_json::Value, ProviderError> {
    check_response(json, "timezone", serde_json::Value::is_string)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OpenWeatherClient {
    base_url: String,
    api_key: String,
    fetcher: Arc<dyn Fetcher>,
}

impl OpenWeatherClient {
    pub fn new(base_url: String, api_key: String, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            base_url,
            api_key,
            fetcher,
        }
    }

    /// Current conditions at a coordinate.
    pub fn current(&self, lat: f64, lon: f64) -> Result<serde_json::Value, ProviderError> {
        let url = build_current_url(&self.base_url, lat, lon, &self.api_key);
        parse_current_response(&self.fetcher.fetch(&url)?)
    }

    pub fn forecast(&self, lat: f64, lon: f64, days: u32) -> Result<serde_json::Value, ProviderError> {
        let url = build_forecast_url(&self.base_url, lat, lon, days, &self.api_key);
        parse_forecast_response(&self.fetcher.fetch(&url)?)
    }

    pub fn onecall(
        &self,
        lat: f64,
        lon: f64,
        exclude: Option<&str>,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = build_onecall_url(&self.base_url, lat, lon, exclude, &self.api_key);
        parse_onecall_response(&self.fetcher.fetch(&url)?)
    }
}
