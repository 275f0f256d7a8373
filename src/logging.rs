//! Structured logging for the dashboard.
//!
//! Every record is one JSON object on stderr (stdout carries render output).
//! When `LOG_DIR` is set, records are mirrored to `<LOG_DIR>/<run_id>/events.jsonl`
//! so a session can be replayed against the render stream.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Data,    // Dataset load, validation
    View,    // Lookups and reshaping
    Render,  // Draw requests
    System,  // Startup, shutdown
    Profile, // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Data => "data",
            Domain::View => "view",
            Domain::Render => "render",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let events = std::env::var("LOG_DIR").ok().and_then(|base| {
            let mut run_dir = PathBuf::from(base);
            run_dir.push(&run_id);
            if let Err(err) = create_dir_all(&run_dir) {
                eprintln!("[log] failed to create run dir: {}", err);
                return None;
            }
            match File::create(run_dir.join("events.jsonl")) {
                Ok(file) => Some(Mutex::new(BufWriter::new(file))),
                Err(err) => {
                    eprintln!("[log] failed to create events log: {}", err);
                    None
                }
            }
        });
        RunContext { run_id, events }
    })
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["subject_id", "surface", "source", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

pub fn ts_epoch_secs() -> u64 {
    Utc::now().timestamp() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }
    let line = Value::Object(build_record(level, domain.as_str(), event, fields)).to_string();
    let ctx = ensure_run_context();
    if let Some(events) = &ctx.events {
        if let Ok(mut w) = events.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
    eprintln!("{}", line);
}

fn build_record(
    level: Level,
    component: &str,
    event: &str,
    fields: Map<String, Value>,
) -> Map<String, Value> {
    let ctx = ensure_run_context();
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    entry
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_startup(source: &str, top_n: usize) {
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[("source", v_str(source)), ("top_n", json!(top_n))]),
    );
}

pub fn log_dataset_loaded(source: &str, names: u64, metadata: u64, samples: u64) {
    log(
        Level::Info,
        Domain::Data,
        "dataset_loaded",
        obj(&[
            ("source", v_str(source)),
            ("names", json!(names)),
            ("metadata_records", json!(metadata)),
            ("sample_records", json!(samples)),
        ]),
    );
}

pub fn log_load_failed(source: &str, err: &anyhow::Error) {
    log(
        Level::Error,
        Domain::Data,
        "load_failed",
        obj(&[
            ("source", v_str(source)),
            ("msg", v_str("can't fetch")),
            ("error", v_str(&format!("{:#}", err))),
        ]),
    );
}

pub fn log_dataset_warning(warning: &str) {
    log(
        Level::Warn,
        Domain::Data,
        "dataset_warning",
        obj(&[("msg", v_str(warning))]),
    );
}

pub fn log_selection(subject_id: &str) {
    log(
        Level::Debug,
        Domain::View,
        "selection",
        obj(&[("subject_id", v_str(subject_id))]),
    );
}

pub fn log_lookup_miss(view: &str, subject_id: &str) {
    log(
        Level::Warn,
        Domain::View,
        "lookup_miss",
        obj(&[("subject_id", v_str(subject_id)), ("view", v_str(view))]),
    );
}

pub fn log_input_error(err: &str) {
    log(
        Level::Warn,
        Domain::System,
        "input_error",
        obj(&[("msg", v_str("selection input closed")), ("error", v_str(err))]),
    );
}

pub fn log_draw(surface: &str, points: usize) {
    log(
        Level::Trace,
        Domain::Render,
        "draw",
        obj(&[("surface", v_str(surface)), ("points", json!(points))]),
    );
}

pub fn log_session_summary(duration_secs: u64, selections: u64) {
    log(
        Level::Info,
        Domain::System,
        "session_summary",
        obj(&[
            ("duration_secs", json!(duration_secs)),
            ("selections", json!(selections)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits elapsed time for a labelled block when dropped.
pub struct ProfileScope {
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = std::mem::take(&mut self.context);
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }

    #[test]
    fn test_record_lifts_routing_fields() {
        let rec = build_record(
            Level::Warn,
            "view",
            "lookup_miss",
            obj(&[
                ("subject_id", v_str("940")),
                ("msg", v_str("no record")),
                ("view", v_str("bar")),
            ]),
        );
        assert_eq!(rec["lvl"], "WARN");
        assert_eq!(rec["subject_id"], "940");
        assert_eq!(rec["msg"], "no record");
        assert_eq!(rec["data"]["view"], "bar");
        assert!(rec["data"].get("subject_id").is_none());
    }
}
