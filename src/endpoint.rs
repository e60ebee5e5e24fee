/// HTTP API for the coastal monitoring service
///
/// Routing is a pure function from `ApiRequest` to `ApiResponse` so it can
/// be exercised without sockets; `start_endpoint_server` adapts it to
/// tiny_http and spreads requests over a worker pool.
///
/// Endpoints:
/// - GET  /api/health
/// - GET  /api/enhanced-coastal/enhanced[/{station}][?bounds={json}]
/// - GET  /api/enhanced-coastal/waves/animation[/{station}][?frames=N]
/// - GET  /api/enhanced-coastal/heatmap/{type}[/{station}][?resolution=r]
/// - GET  /api/enhanced-coastal/buoys[/{bounds}]
/// - GET  /api/enhanced-coastal/environmental-summary[/{station}]
/// - POST /api/reports, GET /api/reports[?limit=N]
/// - POST /api/ai/chat
/// - GET  /api/openweather/{current,forecast,onecall}?lat=&lon=
/// - GET  /api/openweather/status

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use threadpool::ThreadPool;

use crate::aggregator::CoastalDataService;
use crate::chat::{self, ChatRequest};
use crate::config::ServiceConfig;
use crate::ingest::openweather::{self, OpenWeatherClient};
use crate::logging::{self, DataSource};
use crate::model::{BoundingBox, StationQuery};
use crate::reports::{self, NewReport, ReportStore};
use crate::visualization::{self, HeatmapKind};

/// Request bodies beyond this are truncated (and then fail to parse).
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Options,
    Other,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Options => "OPTIONS",
            Method::Other => "OTHER",
        }
    }
}

impl From<&tiny_http::Method> for Method {
    fn from(method: &tiny_http::Method) -> Self {
        match method {
            tiny_http::Method::Get => Method::Get,
            tiny_http::Method::Post => Method::Post,
            tiny_http::Method::Options => Method::Options,
            _ => Method::Other,
        }
    }
}

/// Percent-decodes one URL component. Form-encoded components (query keys
/// and values) also read `+` as a space; path segments keep it literal.
fn decode_component(raw: &str, form: bool) -> String {
    let raw = if form {
        raw.replace('+', " ")
    } else {
        raw.to_string()
    };
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub segments: Vec<String>,
    pub query: HashMap<String, String>,
    /// Query values percent-decoded only, for parameters carrying JSON.
    pub query_literal: HashMap<String, String>,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn parse(method: Method, url: &str, body: Option<String>) -> Self {
        let (path, query_string) = url.split_once('?').unwrap_or((url, ""));
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| decode_component(s, false))
            .collect();
        let mut query = HashMap::new();
        let mut query_literal = HashMap::new();
        for pair in query_string.split('&').filter(|pair| !pair.is_empty()) {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(k, true);
            query_literal.insert(key.clone(), decode_component(v, false));
            query.insert(key, decode_component(v, true));
        }
        Self {
            method,
            path: path.to_string(),
            segments,
            query,
            query_literal,
            body,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::parse(Method::Get, url, None)
    }

    pub fn post(url: &str, body: &str) -> Self {
        Self::parse(Method::Post, url, Some(body.to_string()))
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Query value with `+` kept, so JSON exponents such as `1e+1` survive.
    pub fn query_json(&self, name: &str) -> Option<&str> {
        self.query_literal.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `None` for empty responses (204).
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    BadRequest,
    ValidationFailed,
    UnknownResource,
    NotFound,
    NotConfigured,
    UpstreamFailed,
    StorageFailed,
    AggregationFailed,
    Internal,
}

impl ApiErrorKind {
    pub fn status(&self) -> u16 {
        match self {
            ApiErrorKind::BadRequest
            | ApiErrorKind::ValidationFailed
            | ApiErrorKind::UnknownResource => 400,
            ApiErrorKind::NotFound => 404,
            ApiErrorKind::NotConfigured => 503,
            ApiErrorKind::UpstreamFailed => 502,
            ApiErrorKind::StorageFailed
            | ApiErrorKind::AggregationFailed
            | ApiErrorKind::Internal => 500,
        }
    }
}

/// The one error shape every handler answers with.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(ApiErrorKind::NotFound, format!("No route for {}", path))
    }

    pub fn into_response(self) -> ApiResponse {
        let mut body = json!({
            "success": false,
            "kind": self.kind,
            "error": self.message,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        ApiResponse::with_status(self.kind.status(), body)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| {
        ApiError::new(ApiErrorKind::Internal, format!("Failed to serialize response: {}", e))
    })
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router {
    config: ServiceConfig,
    service: CoastalDataService,
    reports: Box<dyn ReportStore>,
    openweather: Option<OpenWeatherClient>,
}

impl Router {
    pub fn new(
        config: ServiceConfig,
        service: CoastalDataService,
        reports: Box<dyn ReportStore>,
        openweather: Option<OpenWeatherClient>,
    ) -> Self {
        Self {
            config,
            service,
            reports,
            openweather,
        }
    }

    pub fn cors_origin(&self) -> Option<&str> {
        self.config.cors_origin.as_deref()
    }

    pub fn handle(&self, req: &ApiRequest) -> ApiResponse {
        if req.method == Method::Options {
            return ApiResponse::no_content();
        }
        self.route(req).unwrap_or_else(ApiError::into_response)
    }

    fn route(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let segments: Vec<&str> = req.segments.iter().map(String::as_str).collect();
        match (req.method, segments.as_slice()) {
            (Method::Get, ["api", "health"]) => Ok(self.health()),
            (Method::Get, ["api", "enhanced-coastal", "enhanced", rest @ ..]) if rest.len() <= 1 => {
                self.enhanced(rest.first().copied(), req)
            }
            (Method::Get, ["api", "enhanced-coastal", "waves", "animation", rest @ ..])
                if rest.len() <= 1 =>
            {
                self.animation(rest.first().copied(), req)
            }
            (Method::Get, ["api", "enhanced-coastal", "heatmap", kind, rest @ ..]) if rest.len() <= 1 => {
                self.heatmap(kind, rest.first().copied(), req)
            }
            (Method::Get, ["api", "enhanced-coastal", "buoys", rest @ ..]) if rest.len() <= 1 => {
                self.buoys(rest.first().copied())
            }
            (Method::Get, ["api", "enhanced-coastal", "environmental-summary", rest @ ..])
                if rest.len() <= 1 =>
            {
                self.summary(rest.first().copied())
            }
            (Method::Post, ["api", "reports"]) => self.create_report(req),
            (Method::Get, ["api", "reports"]) => self.list_reports(req),
            (Method::Post, ["api", "ai", "chat"]) => self.chat(req),
            (Method::Get, ["api", "openweather", product @ ("current" | "forecast" | "onecall")]) => {
                self.openweather(product, req)
            }
            (Method::Get, ["api", "openweather", "status"]) => Ok(self.openweather_status()),
            _ => Err(ApiError::not_found(&req.path)),
        }
    }

    fn health(&self) -> ApiResponse {
        ApiResponse::ok(json!({
            "status": "OK",
            "message": "Coastal monitoring service is running",
            "timestamp": now_iso(),
            "version": env!("CARGO_PKG_VERSION"),
            "environment": self.config.environment,
        }))
    }

    fn enhanced(&self, station: Option<&str>, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let station_id = self.service.resolve_station(station);
        let bounds = req.query_json("bounds").and_then(BoundingBox::from_json);
        logging::info(DataSource::Http, Some(&station_id), "enhanced coastal data request");

        match self.service.get_enhanced_data(&StationQuery::new(station_id, bounds)) {
            Ok(snapshot) => Ok(ApiResponse::ok(to_json(snapshot.as_ref())?)),
            Err(failure) => Err(ApiError::new(
                ApiErrorKind::AggregationFailed,
                "Failed to fetch enhanced coastal data",
            )
            .with_details(json!({
                "message": failure.error,
                "fallback_data": to_json(&failure.fallback_data)?,
            }))),
        }
    }

    fn animation(&self, station: Option<&str>, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let station_id = self.service.resolve_station(station);
        let requested = req
            .query_param("frames")
            .and_then(|s| s.trim().parse::<usize>().ok());
        let frames = visualization::normalize_frame_count(requested);
        logging::info(
            DataSource::Http,
            Some(&station_id),
            &format!("wave animation request, {} frames", frames),
        );

        let (wave, animation) = self.service.animation(&station_id, frames, Utc::now());
        Ok(ApiResponse::ok(json!({
            "success": true,
            "station_id": station_id,
            "frame_count": animation.len(),
            "frames": to_json(&animation)?,
            "wave_data": to_json(&wave)?,
            "timestamp": now_iso(),
        })))
    }

    fn heatmap(&self, kind: &str, station: Option<&str>, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let kind: HeatmapKind = kind
            .parse()
            .map_err(|e: visualization::UnknownHeatmapType| {
                ApiError::new(ApiErrorKind::UnknownResource, e.to_string())
            })?;
        let station_id = self.service.resolve_station(station);
        let requested = req
            .query_param("resolution")
            .and_then(|s| s.trim().parse::<f64>().ok());
        let resolution = visualization::normalize_resolution(
            requested,
            self.service.registry().heatmap.default_resolution,
        );
        logging::info(
            DataSource::Http,
            Some(&station_id),
            &format!("{} heatmap request", kind.as_str()),
        );

        let data = self.service.heatmap(kind, &station_id, resolution, Utc::now());
        Ok(ApiResponse::ok(json!({
            "success": true,
            "type": kind.as_str(),
            "station_id": station_id,
            "resolution": resolution,
            "data": to_json(&data)?,
            "timestamp": now_iso(),
        })))
    }

    fn buoys(&self, bounds: Option<&str>) -> Result<ApiResponse, ApiError> {
        let bounds = bounds.and_then(BoundingBox::from_json);
        let buoys = self.service.buoy_network(bounds.as_ref(), Utc::now());
        Ok(ApiResponse::ok(json!({
            "success": true,
            "buoy_count": buoys.len(),
            "buoys": to_json(&buoys)?,
            "timestamp": now_iso(),
        })))
    }

    fn summary(&self, station: Option<&str>) -> Result<ApiResponse, ApiError> {
        let station_id = self.service.resolve_station(station);
        logging::info(DataSource::Http, Some(&station_id), "environmental summary request");
        let report = self.service.environmental_summary(&station_id, Utc::now());
        Ok(ApiResponse::ok(json!({
            "success": true,
            "station_id": report.station_id,
            "timestamp": now_iso(),
            "summary": to_json(&report.summary)?,
            "raw_data": to_json(&report.raw_data)?,
        })))
    }

    fn create_report(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let body = req.body.as_deref().unwrap_or("");
        let value: Value = serde_json::from_str(body).map_err(|e| {
            ApiError::new(ApiErrorKind::BadRequest, format!("Request body is not valid JSON: {}", e))
        })?;
        let report = NewReport::from_json(&value).map_err(|e| {
            ApiError::new(ApiErrorKind::ValidationFailed, e.to_string())
                .with_details(json!(e.problems))
        })?;

        let saved = self.reports.save(report).map_err(|e| {
            logging::error(DataSource::Reports, None, &e.to_string());
            ApiError::new(ApiErrorKind::StorageFailed, e.to_string())
        })?;
        logging::info(
            DataSource::Reports,
            None,
            &format!("report {} saved ({} store)", saved.id, self.reports.backend()),
        );
        Ok(ApiResponse::with_status(
            201,
            json!({
                "success": true,
                "message": "Report saved",
                "report": to_json(&saved)?,
            }),
        ))
    }

    fn list_reports(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let limit = reports::parse_limit(req.query_param("limit"));
        let recent = self.reports.recent(limit).map_err(|e| {
            logging::error(DataSource::Reports, None, &e.to_string());
            ApiError::new(ApiErrorKind::StorageFailed, e.to_string())
        })?;
        Ok(ApiResponse::ok(json!({
            "success": true,
            "count": recent.len(),
            "reports": to_json(&recent)?,
        })))
    }

    fn chat(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let body = req
            .body
            .as_deref()
            .and_then(|b| serde_json::from_str::<Value>(b).ok())
            .unwrap_or(Value::Null);
        let reply = chat::respond(ChatRequest::from_json(&body));
        Ok(ApiResponse::ok(to_json(&reply)?))
    }

    fn openweather(&self, product: &str, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let client = self.openweather.as_ref().ok_or_else(|| {
            ApiError::new(
                ApiErrorKind::NotConfigured,
                "OpenWeather API not configured on server",
            )
        })?;
        let bad_request = |e: String| ApiError::new(ApiErrorKind::BadRequest, e);
        let lat = openweather::parse_coordinate(req.query_param("lat"), "lat", 90.0).map_err(bad_request)?;
        let lon = openweather::parse_coordinate(req.query_param("lon"), "lon", 180.0).map_err(bad_request)?;

        let result = match product {
            "forecast" => {
                let days = openweather::parse_forecast_days(req.query_param("days")).map_err(bad_request)?;
                client.forecast(lat, lon, days)
            }
            "onecall" => {
                let exclude = openweather::parse_exclude(req.query_param("exclude")).map_err(bad_request)?;
                client.onecall(lat, lon, exclude.as_deref())
            }
            _ => client.current(lat, lon),
        };

        match result {
            Ok(data) => Ok(ApiResponse::ok(json!({ "success": true, "data": data }))),
            Err(e) => {
                logging::log_provider_failure(
                    DataSource::OpenWeather,
                    &format!("{:.4},{:.4}", lat, lon),
                    &format!("{} weather", product),
                    &e,
                );
                Err(ApiError::new(ApiErrorKind::UpstreamFailed, e.to_string()))
            }
        }
    }

    fn openweather_status(&self) -> ApiResponse {
        ApiResponse::ok(json!({
            "success": true,
            "configured": self.openweather.is_some(),
            "has_key": self.config.openweather_api_key.is_some(),
        }))
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the specified port. Blocks for the life
/// of the process.
pub fn start_endpoint_server(router: Arc<Router>, port: u16, workers: usize) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;

    println!("📡 HTTP endpoint listening on http://0.0.0.0:{}", port);
    println!("   GET  /api/health");
    println!("   GET  /api/enhanced-coastal/enhanced/{{station}}");
    println!("   GET  /api/enhanced-coastal/waves/animation/{{station}}");
    println!("   GET  /api/enhanced-coastal/heatmap/{{type}}/{{station}}");
    println!("   GET  /api/enhanced-coastal/buoys/{{bounds}}");
    println!("   GET  /api/enhanced-coastal/environmental-summary/{{station}}");
    println!("   POST /api/reports, GET /api/reports");
    println!("   POST /api/ai/chat");
    println!("   GET  /api/openweather/{{current,forecast,onecall}}, /api/openweather/status\n");

    let pool = ThreadPool::with_name("request".to_string(), workers.max(1));
    for request in server.incoming_requests() {
        let router = Arc::clone(&router);
        pool.execute(move || serve(&router, request));
    }

    Ok(())
}

fn read_body(request: &mut tiny_http::Request) -> Option<String> {
    let mut body = String::new();
    match request.as_reader().take(MAX_BODY_BYTES).read_to_string(&mut body) {
        Ok(_) => Some(body),
        Err(e) => {
            logging::warn(DataSource::Http, None, &format!("Failed to read request body: {}", e));
            None
        }
    }
}

fn serve(router: &Router, mut request: tiny_http::Request) {
    let started = Instant::now();
    let method = Method::from(request.method());
    let body = match method {
        Method::Post => read_body(&mut request),
        _ => None,
    };
    let api_request = ApiRequest::parse(method, request.url(), body);
    let response = router.handle(&api_request);
    let status = response.status;

    if let Err(e) = request.respond(create_response(&response, router.cors_origin())) {
        logging::warn(DataSource::Http, None, &format!("Failed to send response: {}", e));
    }
    logging::log_request(method.as_str(), &api_request.path, status, started.elapsed().as_millis());
}

fn header(name: &str, value: &str) -> Option<tiny_http::Header> {
    tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

/// Create HTTP response with JSON body
fn create_response(
    response: &ApiResponse,
    cors_origin: Option<&str>,
) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let bytes = match &response.body {
        Some(body) => serde_json::to_vec_pretty(body).unwrap_or_default(),
        None => Vec::new(),
    };

    let mut http = tiny_http::Response::from_data(bytes)
        .with_status_code(tiny_http::StatusCode::from(response.status));

    let mut headers = Vec::new();
    if response.body.is_some() {
        headers.push(header("Content-Type", "application/json"));
    }
    if let Some(origin) = cors_origin {
        headers.push(header("Access-Control-Allow-Origin", origin));
        headers.push(header("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
        headers.push(header("Access-Control-Allow-Headers", "Content-Type"));
    }
    for h in headers.into_iter().flatten() {
        http.add_header(h);
    }
    http
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
