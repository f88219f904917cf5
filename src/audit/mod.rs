//! Audit trail for every replayed request and response.
//!
//! The [`AuditLog`] is built once at startup and handed by reference to each
//! call site. It owns two sinks: an append-only file that receives
//! timestamped lines at or above the configured level, and a console mirror
//! that receives the same lines without timestamps, never below `INFO`.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use http::HeaderMap;
use log::{Level, LevelFilter};
use serde_json::{Map, Value};

use crate::replay::ReplayResult;
use crate::session::ResponseRecord;

/// Character budget applied to logged bodies unless full-body logging is on.
pub const LOG_TRUNCATE_DEFAULT: usize = 2000;
pub const TRUNCATION_MARKER: &str = "...(truncated)";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type Sink = Mutex<Box<dyn Write + Send>>;

/// Settings accepted by [`AuditLog::configure`].
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub path: PathBuf,
    pub level: LevelFilter,
    pub log_full: bool,
}

impl AuditConfig {
    pub fn new(path: impl Into<PathBuf>, level: LevelFilter, log_full: bool) -> Self {
        Self {
            path: path.into(),
            level,
            log_full,
        }
    }
}

pub struct AuditLog {
    file: Option<(PathBuf, Sink)>,
    console: Sink,
    level: LevelFilter,
    log_full: bool,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("file", &self.file.as_ref().map(|(path, _)| path))
            .field("level", &self.level)
            .field("log_full", &self.log_full)
            .finish()
    }
}

impl AuditLog {
    /// Opens `config.path` in append mode and mirrors to stdout.
    pub fn configure(config: &AuditConfig) -> ReplayResult<Self> {
        let file = open_append(&config.path)?;
        Ok(Self {
            file: Some((config.path.clone(), Mutex::new(Box::new(file)))),
            console: Mutex::new(Box::new(io::stdout())),
            level: config.level,
            log_full: config.log_full,
        })
    }

    /// Builds a log over arbitrary writers. `file` may be omitted to only
    /// mirror to the console.
    pub fn from_writers(
        file: Option<Box<dyn Write + Send>>,
        console: Box<dyn Write + Send>,
        level: LevelFilter,
        log_full: bool,
    ) -> Self {
        Self {
            file: file.map(|writer| (PathBuf::new(), Mutex::new(writer))),
            console: Mutex::new(console),
            level,
            log_full,
        }
    }

    /// Applies a new level and body policy. A file sink is only attached when
    /// none is attached yet, so repeated configuration never duplicates lines.
    pub fn reconfigure(&mut self, config: &AuditConfig) -> ReplayResult<()> {
        self.level = config.level;
        self.log_full = config.log_full;
        if self.file.is_none() {
            let file = open_append(&config.path)?;
            self.file = Some((config.path.clone(), Mutex::new(Box::new(file))));
        } else {
            log::debug!(
                "audit file sink already attached, ignoring {}",
                config.path.display()
            );
        }
        Ok(())
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn log_full(&self) -> bool {
        self.log_full
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn log(&self, level: Level, message: &str) {
        if !self.enabled(level) {
            return;
        }

        if let Some((_, sink)) = &self.file {
            let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
            write_line(sink, &format!("{stamp} {} {message}", level_name(level)));
        }

        if level <= Level::Info {
            write_line(&self.console, message);
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    /// Writes a user-facing line to the console, bypassing level and file.
    pub fn println(&self, message: &str) {
        write_line(&self.console, message);
    }

    pub fn log_request(
        &self,
        tag: &str,
        method: &http::Method,
        url: &url::Url,
        headers: &HeaderMap,
        body: Option<&str>,
    ) {
        self.info(&format!("[REQ] {tag} {method} {url}"));
        if !self.enabled(Level::Debug) {
            return;
        }

        match headers_to_json(headers) {
            Ok(json) => self.debug(&format!("[REQ-HEADERS] {tag} {json}")),
            Err(err) => self.error(&format!("[REQ] error serializing request: {err}")),
        }
        if let Some(body) = body {
            self.debug(&format!("[REQ-BODY] {tag} {}", self.body_preview(body)));
        }
    }

    pub fn log_response(&self, tag: &str, response: &ResponseRecord) {
        self.info(&format!(
            "[RESP] {tag} {} {}",
            response.status, response.url
        ));
        if !self.enabled(Level::Debug) {
            return;
        }

        match headers_to_json(&response.headers) {
            Ok(json) => {
                self.debug(&format!("[RESP-HEADERS] {tag} {json}"));
                self.debug(&format!(
                    "[RESP-BODY] {tag} {}",
                    self.body_preview(&response.body)
                ));
            }
            Err(err) => self.error(&format!("[RESP] error serializing response: {err}")),
        }
    }

    fn body_preview<'a>(&self, body: &'a str) -> std::borrow::Cow<'a, str> {
        if self.log_full {
            body.into()
        } else {
            truncate(body, LOG_TRUNCATE_DEFAULT)
        }
    }
}

fn open_append(path: &Path) -> io::Result<std::fs::File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn write_line(sink: &Sink, line: &str) {
    let mut guard = match sink.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(err) = writeln!(guard, "{line}").and_then(|_| guard.flush()) {
        log::warn!("audit sink write failed: {err}");
    }
}

/// Level names as they appear in the audit file.
pub fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug | Level::Trace => "DEBUG",
    }
}

/// Parses `DEBUG`, `INFO`, `WARNING` (or `WARN`) and `ERROR`, ignoring case.
/// Anything else falls back to `INFO`.
pub fn parse_level(raw: &str) -> LevelFilter {
    match raw.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARNING" | "WARN" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        other => {
            log::warn!("unknown log level {other:?}, using INFO");
            LevelFilter::Info
        }
    }
}

/// Cuts `body` to `limit` characters and appends [`TRUNCATION_MARKER`].
pub fn truncate(body: &str, limit: usize) -> std::borrow::Cow<'_, str> {
    match body.char_indices().nth(limit) {
        None => body.into(),
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &body[..cut]).into(),
    }
}

/// Renders headers as a JSON object. Fails on values that are not UTF-8.
pub fn headers_to_json(headers: &HeaderMap) -> Result<String, http::header::ToStrError> {
    let mut map = Map::new();
    for (name, value) in headers {
        let value = value.to_str()?;
        match map.get_mut(name.as_str()) {
            Some(Value::String(joined)) => {
                joined.push_str(", ");
                joined.push_str(value);
            }
            _ => {
                map.insert(name.as_str().to_string(), Value::String(value.to_string()));
            }
        }
    }
    Ok(json_object_text(
        map.iter()
            .map(|(name, value)| (name.as_str(), value.as_str().unwrap_or_default())),
    ))
}

/// Flat string-to-string JSON object with `", "` and `": "` separators, the
/// layout the audit trail uses for headers and form bodies.
pub fn json_object_text<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let fields: Vec<String> = pairs
        .into_iter()
        .map(|(name, value)| format!("{}: {}", Value::from(name), Value::from(value)))
        .collect();
    format!("{{{}}}", fields.join(", "))
}
