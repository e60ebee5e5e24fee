/// NOAA CO-OPS (Tides & Currents) data API client.
///
/// Handles URL construction and JSON response parsing for the datagetter
/// endpoint:
///   https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
///
/// One product per request. See `fixtures.rs` for annotated examples of
/// the response envelopes.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::model::{ProviderError, TidePoint};

pub const NOAA_BASE_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

/// Timestamp format of the `t` field when `time_zone=gmt`.
const NOAA_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// `begin_date` with a time of day, accepted by the datagetter.
const PREDICTIONS_BEGIN_FORMAT: &str = "%Y%m%d %H:%M";

/// Predictions come every 6 minutes, so this covers far more than the
/// 48-sample horizon.
const PREDICTIONS_RANGE_HOURS: u32 = 24;

/// NOAA reports currents in cm/s when `units=metric`.
const CM_PER_M: f64 = 100.0;

// ---------------------------------------------------------------------------
// Serde structures for datagetter JSON
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DataGetterResponse {
    #[serde(default)]
    data: Option<Vec<Sample>>,
    #[serde(default)]
    predictions: Option<Vec<Sample>>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// All measurement fields arrive as strings.
#[derive(Deserialize)]
struct Sample {
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    v: Option<String>,
    /// Speed (wind, currents).
    #[serde(default)]
    s: Option<String>,
    /// Direction in degrees (wind, currents).
    #[serde(default)]
    d: Option<String>,
    /// Gust (wind).
    #[serde(default)]
    g: Option<String>,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoaaProduct {
    WaterLevel,
    WaterTemperature,
    Currents,
    Wind,
    Predictions,
}

impl NoaaProduct {
    /// Value of the `product` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            NoaaProduct::WaterLevel => "water_level",
            NoaaProduct::WaterTemperature => "water_temperature",
            NoaaProduct::Currents => "currents",
            NoaaProduct::Wind => "wind",
            NoaaProduct::Predictions => "predictions",
        }
    }
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds a datagetter URL for one product at one station.
///
/// Observation products request the latest sample; predictions request a
/// 24-hour window starting at `now` (UTC, to the minute), so the forward
/// horizon is full at any time of day. Every request asks for metric units,
/// GMT timestamps and JSON.
pub fn build_datagetter_url(
    base_url: &str,
    product: NoaaProduct,
    station: &str,
    application: &str,
    now: DateTime<Utc>,
) -> String {
    let mut url = format!(
        "{}?product={}&station={}&time_zone=gmt&units=metric&format=json&application={}",
        base_url,
        product.as_param(),
        urlencoding::encode(station),
        urlencoding::encode(application)
    );

    match product {
        NoaaProduct::WaterLevel => url.push_str("&date=latest&datum=MLLW"),
        NoaaProduct::WaterTemperature | NoaaProduct::Currents | NoaaProduct::Wind => {
            url.push_str("&date=latest")
        }
        NoaaProduct::Predictions => {
            let begin = now.format(PREDICTIONS_BEGIN_FORMAT).to_string();
            url.push_str(&format!(
                "&begin_date={}&range={}&datum=MLLW",
                urlencoding::encode(&begin),
                PREDICTIONS_RANGE_HOURS
            ));
        }
    }

    url
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Latest current observation. Speed is converted to m/s.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSample {
    pub speed: f64,
    pub direction: f64,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindSample {
    pub speed: f64,
    pub direction: f64,
    pub gust: f64,
    pub timestamp: Option<String>,
}

/// Deserializes the envelope and surfaces the in-body error object.
fn parse_envelope(json: &str) -> Result<DataGetterResponse, ProviderError> {
    let response: DataGetterResponse = serde_json::from_str(json)
        .map_err(|e| ProviderError::ParseError(format!("JSON deserialization failed: {}", e)))?;

    if let Some(err) = &response.error {
        return Err(ProviderError::Upstream(err.message.clone()));
    }

    Ok(response)
}

fn data_samples(json: &str) -> Result<Vec<Sample>, ProviderError> {
    let samples = parse_envelope(json)?.data.unwrap_or_default();
    if samples.is_empty() {
        return Err(ProviderError::NoDataAvailable(
            "response contained no data samples".to_string(),
        ));
    }
    Ok(samples)
}

/// Parses a numeric string field. Missing or blank fields are treated as
/// absent data; anything else that fails to parse is a format problem.
fn parse_number(field: &str, raw: Option<&String>) -> Result<f64, ProviderError> {
    let raw = raw.map(|s| s.trim()).unwrap_or("");
    if raw.is_empty() {
        return Err(ProviderError::NoDataAvailable(format!(
            "sample field '{}' is empty",
            field
        )));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| ProviderError::ParseError(format!("field '{}' is not numeric: '{}'", field, raw)))?;
    if !value.is_finite() {
        return Err(ProviderError::ParseError(format!(
            "field '{}' is not finite: '{}'",
            field, raw
        )));
    }
    Ok(value)
}

/// First `v` of an observation product (water level, water temperature).
pub fn parse_latest_value(json: &str) -> Result<f64, ProviderError> {
    let samples = data_samples(json)?;
    parse_number("v", samples[0].v.as_ref())
}

/// Last sample of a currents response; NOAA orders bins oldest first.
pub fn parse_currents(json: &str) -> Result<CurrentSample, ProviderError> {
    let samples = data_samples(json)?;
    let latest = &samples[samples.len() - 1];
    Ok(CurrentSample {
        speed: parse_number("s", latest.s.as_ref())? / CM_PER_M,
        direction: parse_number("d", latest.d.as_ref())?,
        timestamp: latest.t.clone(),
    })
}

/// First sample of a wind response. A blank gust reads as 0.
pub fn parse_wind(json: &str) -> Result<WindSample, ProviderError> {
    let samples = data_samples(json)?;
    let first = &samples[0];
    let gust = match parse_number("g", first.g.as_ref()) {
        Ok(g) => g,
        Err(ProviderError::NoDataAvailable(_)) => 0.0,
        Err(e) => return Err(e),
    };
    Ok(WindSample {
        speed: parse_number("s", first.s.as_ref())?,
        direction: parse_number("d", first.d.as_ref())?,
        gust,
        timestamp: first.t.clone(),
    })
}

/// Tide predictions at or after `now`, at most `limit` of them, in order.
///
/// Samples with unparseable timestamps or heights are skipped; a response
/// with no usable forward sample is `NoDataAvailable`.
pub fn parse_predictions(
    json: &str,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<TidePoint>, ProviderError> {
    let predictions = parse_envelope(json)?.predictions.ok_or_else(|| {
        ProviderError::ParseError("response has no 'predictions' array".to_string())
    })?;

    let now = now.naive_utc();
    let points: Vec<TidePoint> = predictions
        .iter()
        .filter_map(|p| {
            let t = p.t.as_ref()?;
            let at = NaiveDateTime::parse_from_str(t, NOAA_TIME_FORMAT).ok()?;
            if at < now {
                return None;
            }
            let height = parse_number("v", p.v.as_ref()).ok()?;
            Some(TidePoint {
                timestamp: t.clone(),
                height,
            })
        })
        .take(limit)
        .collect();

    if points.is_empty() {
        return Err(ProviderError::NoDataAvailable(
            "no tide predictions at or after the current time".to_string(),
        ));
    }
    Ok(points)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
