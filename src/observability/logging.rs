//! Structured logging.
//!
//! # Responsibilities
//! - Assemble one single-line JSON record per log call
//! - Auto-inject correlation id, caller location, and record kind
//! - Route domain and audit records to separately configurable sinks
//!
//! # Design Decisions
//! - Sinks are explicit configuration built once at startup; there is no
//!   global logger registry
//! - Caller location comes from `#[track_caller]`, never from walking the
//!   stack at runtime
//! - A log call never fails: serialization problems are coerced and sink
//!   write errors are dropped

use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::observability::correlation::{self, CorrelationId};

/// Record severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized log level: {0}")]
pub struct UnknownLevel(String);

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" => Ok(Level::Critical),
            other => Err(UnknownLevel(other.to_string())),
        }
    }
}

/// Domain records are ordinary application logs; audit records mark
/// business-significant events and route to their own sink set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogKind {
    #[default]
    Domain,
    Audit,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Domain => "domain",
            LogKind::Audit => "audit",
        }
    }

    /// Unrecognized input falls back to domain.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "audit" => LogKind::Audit,
            _ => LogKind::Domain,
        }
    }
}

/// Call-site location attached to every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerLocation {
    pub module: String,
    pub function: String,
    pub line: u32,
}

impl CallerLocation {
    /// The defensive fallback used when the call site cannot be resolved.
    pub fn unknown() -> Self {
        Self {
            module: "unknown".to_string(),
            function: "unknown".to_string(),
            line: 0,
        }
    }

    /// Capture the location of the nearest non-logging caller.
    ///
    /// Function names are not recoverable without stack walking, so the
    /// `function` field stays at its fallback; module and line identify
    /// the call site.
    #[track_caller]
    pub fn capture() -> Self {
        let location = Location::caller();
        match module_from_path(location.file()) {
            Some(module) => Self {
                module,
                function: "unknown".to_string(),
                line: location.line(),
            },
            None => Self::unknown(),
        }
    }
}

impl Default for CallerLocation {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Derive a dotted module name from a source path, e.g.
/// `src/http/middleware.rs` becomes `http.middleware`.
fn module_from_path(file: &str) -> Option<String> {
    let file = file.replace('\\', "/");
    let stem = file.strip_suffix(".rs")?;
    let stem = match stem.rsplit_once("src/") {
        Some((_, module)) => module,
        None => stem,
    };
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace('/', "."))
}

/// One assembled record, pre-serialization.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: Level,
    pub kind: LogKind,
    pub logger: String,
    pub message: String,
    pub correlation_id: Option<String>,
    pub location: CallerLocation,
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Serialize with stable field naming. Caller-supplied fields never
    /// clobber the core schema keys.
    pub fn to_value(&self) -> Value {
        let mut record = Map::new();
        record.insert("timestamp".to_string(), Value::from(self.timestamp.clone()));
        record.insert("level".to_string(), Value::from(self.level.as_str()));
        record.insert("log_kind".to_string(), Value::from(self.kind.as_str()));
        record.insert("logger".to_string(), Value::from(self.logger.clone()));
        record.insert("message".to_string(), Value::from(self.message.clone()));
        if let Some(id) = &self.correlation_id {
            record.insert("correlation_id".to_string(), Value::from(id.clone()));
        }
        record.insert("module".to_string(), Value::from(self.location.module.clone()));
        record.insert(
            "function".to_string(),
            Value::from(self.location.function.clone()),
        );
        record.insert("line".to_string(), Value::from(self.location.line));
        for (key, value) in &self.fields {
            record.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(record)
    }
}

/// Destination for serialized records.
pub trait LogSink: Send + Sync {
    fn write(&self, record: &Value);
}

/// Writes each record as one JSON line on stdout.
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write(&self, record: &Value) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{record}");
    }
}

/// In-memory sink for asserting on emitted records in tests.
#[derive(Clone, Default)]
pub struct CaptureSink {
    records: Arc<Mutex<Vec<Value>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Value> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl LogSink for CaptureSink {
    fn write(&self, record: &Value) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

struct LoggingInner {
    level: Level,
    domain_sinks: Vec<Arc<dyn LogSink>>,
    audit_sinks: Vec<Arc<dyn LogSink>>,
}

/// Explicit logging configuration, built once at startup and shared by
/// handle. Loggers are cheap views onto this handle.
#[derive(Clone)]
pub struct Logging {
    inner: Arc<LoggingInner>,
}

impl Logging {
    pub fn builder() -> LoggingBuilder {
        LoggingBuilder {
            level: Level::Info,
            domain_sinks: Vec::new(),
            audit_sinks: Vec::new(),
        }
    }

    /// Stdout-only configuration at the default level.
    pub fn stdout() -> Self {
        Self::builder().build()
    }

    /// A logger bound to a dotted component name.
    pub fn logger(&self, name: &str) -> Logger {
        Logger {
            logging: self.clone(),
            name: normalize_name(name),
            correlation: None,
        }
    }
}

pub struct LoggingBuilder {
    level: Level,
    domain_sinks: Vec<Arc<dyn LogSink>>,
    audit_sinks: Vec<Arc<dyn LogSink>>,
}

impl LoggingBuilder {
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Attach a sink to both the domain and audit channels.
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.domain_sinks.push(sink.clone());
        self.audit_sinks.push(sink);
        self
    }

    pub fn domain_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.domain_sinks.push(sink);
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.audit_sinks.push(sink);
        self
    }

    pub fn build(mut self) -> Logging {
        if self.domain_sinks.is_empty() && self.audit_sinks.is_empty() {
            let stdout: Arc<dyn LogSink> = Arc::new(StdoutSink);
            self.domain_sinks.push(stdout.clone());
            self.audit_sinks.push(stdout);
        }
        Logging {
            inner: Arc::new(LoggingInner {
                level: self.level,
                domain_sinks: self.domain_sinks,
                audit_sinks: self.audit_sinks,
            }),
        }
    }
}

/// Mirror URL-path logger names into dotted component names, e.g.
/// `/items/{item_id}` becomes `items.item_id`.
fn normalize_name(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_prefix("app.").unwrap_or(name);
    let cleaned: String = if name.starts_with('/') {
        name.trim_matches('/')
            .replace('/', ".")
            .chars()
            .filter(|c| *c != '{' && *c != '}')
            .collect()
    } else {
        name.to_string()
    };
    if cleaned.is_empty() {
        "app".to_string()
    } else {
        cleaned
    }
}

/// A named logger view. Binding a correlation id returns a new view and
/// leaves the original untouched.
#[derive(Clone)]
pub struct Logger {
    logging: Logging,
    name: String,
    correlation: Option<CorrelationId>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-destructive binding: returns a derived logger that injects `id`
    /// into every record it emits.
    pub fn bind_correlation_id(&self, id: &CorrelationId) -> Logger {
        Logger {
            logging: self.logging.clone(),
            name: self.name.clone(),
            correlation: Some(id.clone()),
        }
    }

    /// Emit a domain record. `fields` is expected to be a JSON object;
    /// other shapes are coerced to a string under a `fields` key.
    #[track_caller]
    pub fn emit(&self, level: Level, message: &str, fields: Value) {
        self.write(level, LogKind::Domain, message, fields, CallerLocation::capture());
    }

    #[track_caller]
    pub fn debug(&self, message: &str, fields: Value) {
        self.write(Level::Debug, LogKind::Domain, message, fields, CallerLocation::capture());
    }

    #[track_caller]
    pub fn info(&self, message: &str, fields: Value) {
        self.write(Level::Info, LogKind::Domain, message, fields, CallerLocation::capture());
    }

    #[track_caller]
    pub fn warning(&self, message: &str, fields: Value) {
        self.write(Level::Warning, LogKind::Domain, message, fields, CallerLocation::capture());
    }

    #[track_caller]
    pub fn error(&self, message: &str, fields: Value) {
        self.write(Level::Error, LogKind::Domain, message, fields, CallerLocation::capture());
    }

    #[track_caller]
    pub fn critical(&self, message: &str, fields: Value) {
        self.write(Level::Critical, LogKind::Domain, message, fields, CallerLocation::capture());
    }

    /// Emit an audit record. Audit records bypass the level threshold and
    /// route to the audit sink set.
    #[track_caller]
    pub fn audit(&self, message: &str, fields: Value) {
        self.write(Level::Info, LogKind::Audit, message, fields, CallerLocation::capture());
    }

    fn write(
        &self,
        level: Level,
        kind: LogKind,
        message: &str,
        fields: Value,
        location: CallerLocation,
    ) {
        if kind == LogKind::Domain && level < self.logging.inner.level {
            return;
        }

        let mut fields = coerce_fields(fields);

        // Precedence: explicit field, then bound id, then ambient context.
        let correlation_id = match fields.remove("correlation_id") {
            Some(value) => Some(value_to_string(value)),
            None => self
                .correlation
                .as_ref()
                .map(|id| id.to_string())
                .or_else(|| correlation::current().map(|id| id.to_string())),
        };

        let record = LogRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            level,
            kind,
            logger: self.name.clone(),
            message: message.to_string(),
            correlation_id,
            location,
            fields,
        };

        let value = record.to_value();
        let sinks = match kind {
            LogKind::Domain => &self.logging.inner.domain_sinks,
            LogKind::Audit => &self.logging.inner.audit_sinks,
        };
        for sink in sinks {
            sink.write(&value);
        }
    }
}

fn coerce_fields(fields: Value) -> Map<String, Value> {
    match fields {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("fields".to_string(), Value::from(other.to_string()));
            map
        }
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::observability::correlation;

    fn capture_logging(level: Level) -> (Logging, CaptureSink) {
        let sink = CaptureSink::new();
        let logging = Logging::builder()
            .level(level)
            .sink(Arc::new(sink.clone()))
            .build();
        (logging, sink)
    }

    #[test]
    fn binding_a_correlation_id_is_non_destructive() {
        let (logging, sink) = capture_logging(Level::Debug);
        let base = logging.logger("service.ocr");
        let id = CorrelationId::from_string("20250101#abc");

        let bound = base.bind_correlation_id(&id);
        bound.info("bound record", json!({}));
        base.info("unbound record", json!({}));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["correlation_id"], json!("20250101#abc"));
        assert_eq!(records[1].get("correlation_id"), None);
    }

    #[test]
    fn ambient_context_id_is_injected_when_unbound() {
        let (logging, sink) = capture_logging(Level::Debug);
        let logger = logging.logger("service.ocr");
        let id = CorrelationId::from_string("20250101#ambient");

        correlation::scope_sync(id, || {
            logger.info("inside scope", json!({}));
        });

        assert_eq!(sink.records()[0]["correlation_id"], json!("20250101#ambient"));
    }

    #[test]
    fn explicit_correlation_field_wins_over_bound_id() {
        let (logging, sink) = capture_logging(Level::Debug);
        let bound = logging
            .logger("service.ocr")
            .bind_correlation_id(&CorrelationId::from_string("20250101#bound"));

        bound.info("override", json!({ "correlation_id": "20250101#explicit" }));

        assert_eq!(
            sink.records()[0]["correlation_id"],
            json!("20250101#explicit")
        );
    }

    #[test]
    fn records_carry_the_stable_schema() {
        let (logging, sink) = capture_logging(Level::Debug);
        logging
            .logger("routers.items")
            .info("Getting all items", json!({ "item_count": 3 }));

        let record = &sink.records()[0];
        assert_eq!(record["message"], json!("Getting all items"));
        assert_eq!(record["level"], json!("info"));
        assert_eq!(record["log_kind"], json!("domain"));
        assert_eq!(record["logger"], json!("routers.items"));
        assert_eq!(record["item_count"], json!(3));
        assert_eq!(record["module"], json!("observability.logging"));
        assert!(record["line"].as_u64().is_some_and(|line| line > 0));
        assert!(record["timestamp"]
            .as_str()
            .is_some_and(|ts| ts.ends_with('Z')));
    }

    #[test]
    fn empty_message_is_permitted() {
        let (logging, sink) = capture_logging(Level::Debug);
        logging.logger("app").info("", json!({}));
        assert_eq!(sink.records()[0]["message"], json!(""));
    }

    #[test]
    fn non_object_fields_are_coerced_not_fatal() {
        let (logging, sink) = capture_logging(Level::Debug);
        logging.logger("app").info("odd payload", json!([1, 2, 3]));
        assert_eq!(sink.records()[0]["fields"], json!("[1,2,3]"));
    }

    #[test]
    fn caller_fields_cannot_clobber_the_schema() {
        let (logging, sink) = capture_logging(Level::Debug);
        logging
            .logger("app")
            .info("real message", json!({ "message": "imposter" }));
        assert_eq!(sink.records()[0]["message"], json!("real message"));
    }

    #[test]
    fn audit_records_bypass_the_level_threshold() {
        let (logging, sink) = capture_logging(Level::Error);
        let logger = logging.logger("middleware");

        logger.info("dropped", json!({}));
        logger.audit("kept", json!({}));
        logger.error("also kept", json!({}));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["log_kind"], json!("audit"));
        assert_eq!(records[1]["level"], json!("error"));
    }

    #[test]
    fn audit_records_route_to_the_audit_sinks() {
        let domain = CaptureSink::new();
        let audit = CaptureSink::new();
        let logging = Logging::builder()
            .level(Level::Debug)
            .domain_sink(Arc::new(domain.clone()))
            .audit_sink(Arc::new(audit.clone()))
            .build();
        let logger = logging.logger("middleware");

        logger.info("domain entry", json!({}));
        logger.audit("audit entry", json!({}));

        assert_eq!(domain.records().len(), 1);
        assert_eq!(audit.records().len(), 1);
        assert_eq!(audit.records()[0]["log_kind"], json!("audit"));
    }

    #[test]
    fn unrecognized_kind_defaults_to_domain() {
        assert_eq!(LogKind::parse("audit"), LogKind::Audit);
        assert_eq!(LogKind::parse("AUDIT"), LogKind::Audit);
        assert_eq!(LogKind::parse("weird"), LogKind::Domain);
        assert_eq!(LogKind::parse(""), LogKind::Domain);
    }

    #[test]
    fn level_parsing_and_ordering() {
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warning));
        assert_eq!("WARN".parse::<Level>(), Ok(Level::Warning));
        assert!("verbose".parse::<Level>().is_err());
        assert!(Level::Debug < Level::Critical);
    }

    #[test]
    fn module_names_derive_from_source_paths() {
        assert_eq!(
            module_from_path("src/http/middleware.rs").as_deref(),
            Some("http.middleware")
        );
        assert_eq!(module_from_path("src/lib.rs").as_deref(), Some("lib"));
        assert_eq!(module_from_path("no-extension"), None);
    }

    #[test]
    fn caller_location_fallback_is_fully_unknown() {
        let fallback = CallerLocation::unknown();
        assert_eq!(fallback.module, "unknown");
        assert_eq!(fallback.function, "unknown");
        assert_eq!(fallback.line, 0);
    }

    #[test]
    fn url_path_names_are_normalized() {
        assert_eq!(normalize_name("/items/{item_id}"), "items.item_id");
        assert_eq!(normalize_name("/"), "app");
        assert_eq!(normalize_name("app.service.ocr"), "service.ocr");
        assert_eq!(normalize_name("service.ocr"), "service.ocr");
    }
}
