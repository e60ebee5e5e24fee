/// Test fixtures: representative JSON payloads from the upstream APIs.
///
/// These fixtures are structurally complete but truncated to the minimum
/// needed to exercise the parsers. They reflect the envelopes returned by:
///   https://api.tidesandcurrents.noaa.gov/api/prod/datagetter?format=json&...
///   https://api.openweathermap.org/data/2.5/{weather,forecast,onecall}?units=metric&...
///
/// NOAA CO-OPS response shapes:
///   { "metadata": {...}, "data": [ { "t": ..., "v": ..., ... } ] }
///     .t: "YYYY-MM-DD HH:MM" in the requested time zone (gmt)
///     .v: measurement as a STRING
///     .s / .d / .g: wind speed, direction, gust (also strings)
///     currents use .s (cm/s), .d (degrees), .b (bin)
///   { "predictions": [ { "t": ..., "v": ... } ] }   for product=predictions
///   { "error": { "message": "No data was found..." } }  (with HTTP 200!)
///
/// Note: NOAA reports most errors inside a 200 response. Parsers must look
/// for the `error` object before looking for data.

/// Water level at the Chesapeake Bay Bridge Tunnel, latest sample.
#[cfg(test)]
pub(crate) fn fixture_water_level_json() -> &'static str {
    r#"{
      "metadata": { "id": "8638863", "name": "Chesapeake Bay Bridge Tunnel", "lat": "36.9667", "lon": "-76.1133" },
      "data": [
        { "t": "2024-05-01 12:00", "v": "1.234", "s": "0.012", "f": "0,0,0,0", "q": "p" }
      ]
    }"#
}

/// Water temperature, latest sample.
#[cfg(test)]
pub(crate) fn fixture_water_temperature_json() -> &'static str {
    r#"{
      "metadata": { "id": "8638863", "name": "Chesapeake Bay Bridge Tunnel", "lat": "36.9667", "lon": "-76.1133" },
      "data": [
        { "t": "2024-05-01 12:00", "v": "17.4", "f": "0,0,0" }
      ]
    }"#
}

/// Currents: NOAA returns several bins; the last sample is the freshest.
/// Speeds are cm/s with `units=metric`.
#[cfg(test)]
pub(crate) fn fixture_currents_json() -> &'static str {
    r#"{
      "metadata": { "id": "cb0201", "name": "Chesapeake Bay Entrance", "lat": "36.9667", "lon": "-76.1167" },
      "data": [
        { "t": "2024-05-01 11:54", "s": "38.10", "d": "301", "b": "3" },
        { "t": "2024-05-01 12:00", "s": "45.20", "d": "295", "b": "3" }
      ]
    }"#
}

/// Wind, latest sample. Speeds in m/s with `units=metric`.
#[cfg(test)]
pub(crate) fn fixture_wind_json() -> &'static str {
    r#"{
      "metadata": { "id": "8638863", "name": "Chesapeake Bay Bridge Tunnel", "lat": "36.9667", "lon": "-76.1133" },
      "data": [
        { "t": "2024-05-01 12:00", "s": "6.30", "d": "215.00", "dr": "SW", "g": "8.10", "f": "0,0" }
      ]
    }"#
}

/// Wind sample with an empty gust field, which NOAA sends when the
/// anemometer doesn't report gusts.
#[cfg(test)]
pub(crate) fn fixture_wind_no_gust_json() -> &'static str {
    r#"{
      "data": [
        { "t": "2024-05-01 12:00", "s": "4.10", "d": "90.00", "dr": "E", "g": "", "f": "0,0" }
      ]
    }"#
}

/// Tide predictions spanning midnight; two samples precede 2024-05-01 00:00.
#[cfg(test)]
pub(crate) fn fixture_predictions_json() -> &'static str {
    r#"{
      "predictions": [
        { "t": "2024-04-30 23:48", "v": "0.412" },
        { "t": "2024-04-30 23:54", "v": "0.398" },
        { "t": "2024-05-01 00:00", "v": "0.383" },
        { "t": "2024-05-01 00:06", "v": "0.367" },
        { "t": "2024-05-01 00:12", "v": "0.350" }
      ]
    }"#
}

/// The error envelope NOAA returns (with HTTP 200) when a station doesn't
/// offer the requested product.
#[cfg(test)]
pub(crate) fn fixture_noaa_no_data_json() -> &'static str {
    r#"{ "error": { "message": "No data was found. This product may not be offered at this station at the requested time." } }"#
}

/// Well-formed envelope with an empty data array.
#[cfg(test)]
pub(crate) fn fixture_noaa_empty_data_json() -> &'static str {
    r#"{ "metadata": { "id": "8638863" }, "data": [] }"#
}

/// Sample whose value is missing, as seen during sensor outages.
#[cfg(test)]
pub(crate) fn fixture_noaa_blank_value_json() -> &'static str {
    r#"{ "data": [ { "t": "2024-05-01 12:00", "v": "", "f": "1,1,1,1" } ] }"#
}

/// OpenWeather current conditions, trimmed.
#[cfg(test)]
pub(crate) fn fixture_openweather_current_json() -> &'static str {
    r#"{
      "coord": { "lon": 72.8347, "lat": 18.922 },
      "weather": [ { "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" } ],
      "main": { "temp": 29.4, "feels_like": 33.1, "pressure": 1008, "humidity": 74 },
      "wind": { "speed": 5.7, "deg": 250 },
      "dt": 1714564800,
      "name": "Mumbai",
      "cod": 200
    }"#
}

/// OpenWeather error body, e.g. for a bad key (sent with HTTP 401).
#[cfg(test)]
pub(crate) fn fixture_openweather_error_json() -> &'static str {
    r#"{ "cod": 401, "message": "Invalid API key. Please see https://openweathermap.org/faq#error401 for more info." }"#
}

/// OpenWeather 5 day / 3 hour forecast, two entries. Note `cod` is a string
/// here, unlike current conditions.
#[cfg(test)]
pub(crate) fn fixture_openweather_forecast_json() -> &'static str {
    r#"{
      "cod": "200",
      "message": 0,
      "cnt": 2,
      "list": [
        { "dt": 1714575600, "main": { "temp": 30.1, "humidity": 70 }, "wind": { "speed": 6.2, "deg": 245 }, "dt_txt": "2024-05-01 15:00:00" },
        { "dt": 1714586400, "main": { "temp": 29.2, "humidity": 75 }, "wind": { "speed": 5.4, "deg": 250 }, "dt_txt": "2024-05-01 18:00:00" }
      ],
      "city": { "name": "Mumbai", "country": "IN", "timezone": 19800 }
    }"#
}

/// OpenWeather One Call with `exclude=minutely,alerts`, trimmed. Success
/// bodies carry no `cod`.
#[cfg(test)]
pub(crate) fn fixture_openweather_onecall_json() -> &'static str {
    r#"{
      "lat": 18.922,
      "lon": 72.8347,
      "timezone": "Asia/Kolkata",
      "timezone_offset": 19800,
      "current": { "dt": 1714564800, "temp": 29.4, "humidity": 74, "wind_speed": 5.7 },
      "hourly": [ { "dt": 1714564800, "temp": 29.4 } ],
      "daily": [ { "dt": 1714545000, "temp": { "min": 27.0, "max": 32.5 } } ]
    }"#
}
