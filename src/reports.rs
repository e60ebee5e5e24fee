/// Community reports: validation and storage.
///
/// Reports are the one persisted entity. The request body uses camelCase
/// keys (`peopleAffected`, `immediateRisk`); snake_case spellings are
/// accepted too. Storage goes through `ReportStore`, backed by PostgreSQL
/// when a database is reachable and by memory otherwise.

use chrono::{DateTime, Utc};
use postgres::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::db::{self, DbConfigError, REPORTS_SCHEMA};
use crate::logging::{self, DataSource};

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportFlags {
    pub immediate_risk: bool,
    pub evacuation: bool,
    pub damage: bool,
}

/// A validated report that hasn't been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub report_type: String,
    pub severity: String,
    pub location: String,
    pub description: String,
    pub people_affected: i32,
    pub flags: ReportFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub id: i64,
    #[serde(rename = "type")]
    pub report_type: String,
    pub severity: String,
    pub location: String,
    pub description: String,
    pub people_affected: i32,
    pub flags: ReportFlags,
    pub created_at: DateTime<Utc>,
}

impl Report {
    fn from_new(id: i64, report: NewReport, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            report_type: report.report_type,
            severity: report.severity,
            location: report.location,
            description: report.description,
            people_affected: report.people_affected,
            flags: report.flags,
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Every problem found in a submitted report, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportValidationError {
    pub problems: Vec<String>,
}

impl fmt::Display for ReportValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Report validation failed: {}", self.problems.join("; "))
    }
}

impl std::error::Error for ReportValidationError {}

#[derive(Debug)]
pub enum StoreError {
    Database(postgres::Error),
    /// The connection was lost and could not be re-established.
    Reconnect(DbConfigError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Report storage failed: {}", e),
            StoreError::Reconnect(e) => write!(f, "Report database unavailable: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<postgres::Error> for StoreError {
    fn from(err: postgres::Error) -> Self {
        StoreError::Database(err)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn field<'a>(obj: &'a Map<String, Value>, camel: &str, snake: &str) -> Option<&'a Value> {
    obj.get(camel).or_else(|| obj.get(snake)).filter(|v| !v.is_null())
}

fn required_text(obj: &Map<String, Value>, name: &str, problems: &mut Vec<String>) -> String {
    match obj.get(name).filter(|v| !v.is_null()) {
        None => {
            problems.push(format!("{} is required", name));
            String::new()
        }
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(_) => {
            problems.push(format!("{} must be a non-empty string", name));
            String::new()
        }
    }
}

fn people_affected(obj: &Map<String, Value>, problems: &mut Vec<String>) -> i32 {
    let Some(value) = field(obj, "peopleAffected", "people_affected") else {
        problems.push("peopleAffected is required".to_string());
        return 0;
    };
    let whole = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    });
    match whole.and_then(|n| i32::try_from(n).ok()).filter(|n| *n >= 0) {
        Some(n) => n,
        None => {
            problems.push("peopleAffected must be a non-negative integer".to_string());
            0
        }
    }
}

fn flags(obj: &Map<String, Value>, problems: &mut Vec<String>) -> ReportFlags {
    let Some(value) = obj.get("flags").filter(|v| !v.is_null()) else {
        return ReportFlags::default();
    };
    let Some(map) = value.as_object() else {
        problems.push("flags must be an object".to_string());
        return ReportFlags::default();
    };
    let mut flag = |camel: &str, snake: &str| match field(map, camel, snake) {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            problems.push(format!("flags.{} must be a boolean", camel));
            false
        }
    };
    ReportFlags {
        immediate_risk: flag("immediateRisk", "immediate_risk"),
        evacuation: flag("evacuation", "evacuation"),
        damage: flag("damage", "damage"),
    }
}

impl NewReport {
    /// Validates a request body, collecting every problem rather than
    /// stopping at the first.
    pub fn from_json(body: &Value) -> Result<Self, ReportValidationError> {
        let Some(obj) = body.as_object() else {
            return Err(ReportValidationError {
                problems: vec!["request body must be a JSON object".to_string()],
            });
        };

        let mut problems = Vec::new();
        let report = NewReport {
            report_type: required_text(obj, "type", &mut problems),
            severity: required_text(obj, "severity", &mut problems),
            location: required_text(obj, "location", &mut problems),
            description: required_text(obj, "description", &mut problems),
            people_affected: people_affected(obj, &mut problems),
            flags: flags(obj, &mut problems),
        };

        if problems.is_empty() {
            Ok(report)
        } else {
            Err(ReportValidationError { problems })
        }
    }
}

/// `?limit=` for listings: default 50, clamped to 1..=500.
pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT)
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

pub trait ReportStore: Send + Sync {
    /// Persists a report, assigning its id and creation time.
    fn save(&self, report: NewReport) -> Result<Report, StoreError>;

    /// Up to `limit` reports, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<Report>, StoreError>;

    /// Short backend name for logs and the health check.
    fn backend(&self) -> &'static str;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local store used when no database is configured.
#[derive(Default)]
pub struct MemoryReportStore {
    reports: Mutex<Vec<Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportStore for MemoryReportStore {
    fn save(&self, report: NewReport) -> Result<Report, StoreError> {
        let mut reports = lock(&self.reports);
        let id = reports.len() as i64 + 1;
        let stored = Report::from_new(id, report, Utc::now());
        reports.push(stored.clone());
        Ok(stored)
    }

    fn recent(&self, limit: usize) -> Result<Vec<Report>, StoreError> {
        let reports = lock(&self.reports);
        Ok(reports.iter().rev().take(limit).cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// A database session that can report a dropped connection.
pub trait Session {
    fn is_closed(&self) -> bool;
}

impl Session for Client {
    fn is_closed(&self) -> bool {
        Client::is_closed(self)
    }
}

type Connector<C> = Box<dyn Fn() -> Result<C, DbConfigError> + Send + Sync>;

/// Locks the session, replacing it first if the server closed it. A failed
/// reconnect leaves the closed session in place so the next call retries.
fn checkout<'a, C: Session>(
    slot: &'a Mutex<C>,
    connector: &Connector<C>,
) -> Result<MutexGuard<'a, C>, StoreError> {
    let mut session = lock(slot);
    if session.is_closed() {
        logging::warn(
            DataSource::Database,
            None,
            "report database connection closed; reconnecting",
        );
        *session = connector().map_err(StoreError::Reconnect)?;
        logging::info(DataSource::Database, None, "report database reconnected");
    }
    Ok(session)
}

/// PostgreSQL store over `reports.community_reports`. A connection the
/// server dropped is re-established on the next call.
pub struct PgReportStore {
    client: Mutex<Client>,
    connector: Connector<Client>,
}

impl PgReportStore {
    /// Wraps an open client; reconnects go through `DATABASE_URL`.
    pub fn new(client: Client) -> Self {
        Self {
            client: Mutex::new(client),
            connector: Box::new(|| db::connect_and_verify(&[REPORTS_SCHEMA])),
        }
    }

    /// Connects via `DATABASE_URL` and checks the reports schema.
    pub fn connect() -> Result<Self, DbConfigError> {
        let client = db::connect_and_verify(&[REPORTS_SCHEMA])?;
        Ok(Self::new(client))
    }

    fn client(&self) -> Result<MutexGuard<'_, Client>, StoreError> {
        checkout(&self.client, &self.connector)
    }
}

fn report_from_row(row: &postgres::Row) -> Result<Report, StoreError> {
    Ok(Report {
        id: row.try_get("id")?,
        report_type: row.try_get("report_type")?,
        severity: row.try_get("severity")?,
        location: row.try_get("location")?,
        description: row.try_get("description")?,
        people_affected: row.try_get("people_affected")?,
        flags: ReportFlags {
            immediate_risk: row.try_get("immediate_risk")?,
            evacuation: row.try_get("evacuation")?,
            damage: row.try_get("damage")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

impl ReportStore for PgReportStore {
    fn save(&self, report: NewReport) -> Result<Report, StoreError> {
        let mut client = self.client()?;
        let row = client.query_one(
            "INSERT INTO reports.community_reports
             (report_type, severity, location, description, people_affected,
              immediate_risk, evacuation, damage)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id, created_at",
            &[
                &report.report_type,
                &report.severity,
                &report.location,
                &report.description,
                &report.people_affected,
                &report.flags.immediate_risk,
                &report.flags.evacuation,
                &report.flags.damage,
            ],
        )?;
        let id: i64 = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        Ok(Report::from_new(id, report, created_at))
    }

    fn recent(&self, limit: usize) -> Result<Vec<Report>, StoreError> {
        let mut client = self.client()?;
        let limit = limit.min(MAX_LIST_LIMIT) as i64;
        let rows = client.query(
            "SELECT id, report_type, severity, location, description, people_affected,
                    immediate_risk, evacuation, damage, created_at
             FROM reports.community_reports
             ORDER BY created_at DESC, id DESC
             LIMIT $1",
            &[&limit],
        )?;
        rows.iter().map(report_from_row).collect()
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn flooding() -> Value {
        json!({
            "type": "flooding",
            "severity": "high",
            "location": "X",
            "description": "Y",
            "peopleAffected": 10
        })
    }

    #[test]
    fn test_valid_report_parses() {
        let report = NewReport::from_json(&flooding()).unwrap();
        assert_eq!(report.report_type, "flooding");
        assert_eq!(report.people_affected, 10);
        assert_eq!(report.flags, ReportFlags::default());
    }

    #[test]
    fn test_flags_and_snake_case_aliases() {
        let body = json!({
            "type": "erosion",
            "severity": "low",
            "location": "Juhu",
            "description": "dune loss",
            "people_affected": 0,
            "flags": { "immediateRisk": true, "damage": true }
        });
        let report = NewReport::from_json(&body).unwrap();
        assert_eq!(report.people_affected, 0);
        assert!(report.flags.immediate_risk);
        assert!(!report.flags.evacuation);
        assert!(report.flags.damage);
    }

    #[test]
    fn test_missing_fields_all_reported() {
        let err = NewReport::from_json(&json!({ "type": "flooding" })).unwrap_err();
        assert_eq!(
            err.problems,
            vec![
                "severity is required",
                "location is required",
                "description is required",
                "peopleAffected is required",
            ]
        );
        assert!(err.to_string().starts_with("Report validation failed: severity is required"));
    }

    #[test]
    fn test_bad_values_rejected() {
        let mut body = flooding();
        body["peopleAffected"] = json!(-3);
        body["severity"] = json!("   ");
        body["flags"] = json!({ "evacuation": "yes" });
        let err = NewReport::from_json(&body).unwrap_err();
        assert_eq!(
            err.problems,
            vec![
                "severity must be a non-empty string",
                "peopleAffected must be a non-negative integer",
                "flags.evacuation must be a boolean",
            ]
        );
    }

    #[test]
    fn test_whole_float_people_count_accepted() {
        let mut body = flooding();
        body["peopleAffected"] = json!(12.0);
        assert_eq!(NewReport::from_json(&body).unwrap().people_affected, 12);
        body["peopleAffected"] = json!(12.5);
        assert!(NewReport::from_json(&body).is_err());
    }

    #[test]
    fn test_non_object_body() {
        let err = NewReport::from_json(&json!([1, 2])).unwrap_err();
        assert_eq!(err.problems, vec!["request body must be a JSON object"]);
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None), 50);
        assert_eq!(parse_limit(Some("10")), 10);
        assert_eq!(parse_limit(Some("0")), 50);
        assert_eq!(parse_limit(Some("abc")), 50);
        assert_eq!(parse_limit(Some("9999")), 500);
    }

    #[test]
    fn test_memory_store_newest_first() {
        let store = MemoryReportStore::new();
        for location in ["A", "B", "C"] {
            let mut body = flooding();
            body["location"] = json!(location);
            store.save(NewReport::from_json(&body).unwrap()).unwrap();
        }
        let recent = store.recent(2).unwrap();
        let locations: Vec<_> = recent.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec!["C", "B"]);
        assert_eq!(recent[0].id, 3);
        assert_eq!(store.backend(), "memory");
    }

    #[test]
    fn test_report_serializes_type_key() {
        let store = MemoryReportStore::new();
        let report = store.save(NewReport::from_json(&flooding()).unwrap()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["type"], "flooding");
        assert_eq!(json["people_affected"], 10);
        assert_eq!(json["flags"]["immediate_risk"], false);
    }

    /// Stand-in session whose liveness the test controls.
    #[derive(Debug)]
    struct FakeSession {
        generation: usize,
        closed: bool,
    }

    impl Session for FakeSession {
        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    fn counting_connector(
        attempts: Arc<AtomicUsize>,
        succeed: bool,
    ) -> Connector<FakeSession> {
        Box::new(move || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if succeed {
                Ok(FakeSession { generation: n, closed: false })
            } else {
                Err(DbConfigError::MissingDatabaseUrl)
            }
        })
    }

    #[test]
    fn test_checkout_keeps_open_session() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = counting_connector(attempts.clone(), true);
        let slot = Mutex::new(FakeSession { generation: 0, closed: false });

        assert_eq!(checkout(&slot, &connector).unwrap().generation, 0);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_checkout_reconnects_closed_session() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = counting_connector(attempts.clone(), true);
        let slot = Mutex::new(FakeSession { generation: 0, closed: true });

        assert_eq!(checkout(&slot, &connector).unwrap().generation, 1);
        // the replacement is reused while it stays open
        assert_eq!(checkout(&slot, &connector).unwrap().generation, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_reconnect_is_retried_next_call() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = counting_connector(attempts.clone(), false);
        let slot = Mutex::new(FakeSession { generation: 0, closed: true });

        let err = checkout(&slot, &connector).unwrap_err();
        assert!(matches!(err, StoreError::Reconnect(DbConfigError::MissingDatabaseUrl)));
        assert!(err.to_string().starts_with("Report database unavailable"));
        assert!(checkout(&slot, &connector).is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(lock(&slot).closed);
    }

    #[test]
    #[ignore] // Only run when database is available
    fn test_pg_store_round_trip() {
        let store = PgReportStore::connect().expect("database with reports schema");
        let saved = store.save(NewReport::from_json(&flooding()).unwrap()).unwrap();
        let recent = store.recent(5).unwrap();
        assert!(recent.iter().any(|r| r.id == saved.id));
    }
}
