//! Observability setup: structured logging.
//!
//! **Important**: This module never writes to stdout, which is reserved for
//! the calculated version so build scripts can capture it. All logging goes
//! to a JSON-lines file, or to stderr when no log file can be opened.

use anyhow::Result;
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::Event;
use tracing::field::{Field, Visit};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "BRANCHVER_LOG_PATH";
const ENV_LOG_DIR: &str = "BRANCHVER_LOG_DIR";
const DEFAULT_LOG_DIR_UNIX: &str = "/var/log";
const LOG_FILE_SUFFIX: &str = ".jsonl";

/// Configuration for observability setup.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// The service name used for the log file and in every entry.
    pub service: String,
    /// Service version recorded in every entry.
    pub version: String,
    /// Directory for JSONL log files. Falls back to platform defaults if unset.
    pub log_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Create config for this binary, with the log directory from config.
    pub fn from_env_with_overrides(log_dir: Option<PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            log_dir,
        }
    }
}

/// Must be held for the lifetime of the application so buffered log lines
/// are flushed on exit.
pub struct ObservabilityGuard {
    _log_guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Never fails today; a missing log directory degrades to stderr.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
) -> Result<ObservabilityGuard> {
    let sources = LogSources::from_env(cfg.log_dir.clone());
    let (writer, guard) = match sources.resolve(&cfg.service) {
        Ok(target) => target.open(),
        Err(err) => {
            // stderr, never stdout: stdout carries the version.
            eprintln!("Warning: {err}. Falling back to stderr logging.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(JsonLogLayer::new(writer, &cfg.service, &cfg.version))
        .init();

    tracing::debug!("observability initialized");

    Ok(ObservabilityGuard { _log_guard: guard })
}

/// Build an `EnvFilter` based on CLI flags and environment.
///
/// Priority: quiet flag > verbose flag > RUST_LOG env > default_level
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

// ============================================================================
// JSON Log Layer
// ============================================================================

/// Writes one JSON object per event, with the fields of every enclosing span
/// flattened in (innermost wins on conflicts).
struct JsonLogLayer<W> {
    writer: W,
    service: String,
    version: String,
}

impl<W> JsonLogLayer<W> {
    fn new(writer: W, service: &str, version: &str) -> Self {
        Self {
            writer,
            service: service.to_string(),
            version: version.to_string(),
        }
    }

    fn base_entry(&self, event: &Event<'_>) -> Map<String, Value> {
        let meta = event.metadata();
        let mut map = Map::new();
        map.insert("timestamp".into(), Value::String(format_timestamp(SystemTime::now())));
        map.insert("level".into(), Value::String(meta.level().as_str().to_lowercase()));
        map.insert("target".into(), Value::String(meta.target().to_string()));
        map.insert("service".into(), Value::String(self.service.clone()));
        map.insert("service_version".into(), Value::String(self.version.clone()));
        map
    }
}

impl<S, W> tracing_subscriber::Layer<S> for JsonLogLayer<W>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: LayerContext<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            let mut fields = SpanFields::default();
            attrs.record(&mut fields);
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: LayerContext<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(fields) => values.record(fields),
            None => {
                let mut fields = SpanFields::default();
                values.record(&mut fields);
                extensions.insert(fields);
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: LayerContext<'_, S>) {
        let mut map = self.base_entry(event);

        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<&str> = scope
                .from_root()
                .map(|span| {
                    if let Some(fields) = span.extensions().get::<SpanFields>() {
                        map.extend(fields.0.clone());
                    }
                    span.name()
                })
                .collect();
            map.insert("span".into(), Value::String(spans.join(":")));
        }

        let mut fields = SpanFields::default();
        event.record(&mut fields);
        map.extend(fields.0);

        let mut writer = self.writer.make_writer();
        if serde_json::to_writer(&mut writer, &Value::Object(map)).is_ok() {
            let _ = writer.write_all(b"\n");
        }
    }
}

/// Recorded field values, stored in span extensions.
#[derive(Clone, Debug, Default)]
struct SpanFields(Map<String, Value>);

impl SpanFields {
    fn put(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for SpanFields {
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(number) = serde_json::Number::from_f64(value) {
            self.put(field, Value::Number(number));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }
}

/// Format `time` as RFC 3339 UTC with millisecond precision.
fn format_timestamp(time: SystemTime) -> String {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = since_epoch.as_secs();
    let millis = since_epoch.subsec_millis();

    let (year, month, day) = civil_from_days(secs / 86_400);
    let secs_of_day = secs % 86_400;
    let (hours, minutes, seconds) = (secs_of_day / 3600, (secs_of_day % 3600) / 60, secs_of_day % 60);

    format!("{year:04}-{month:02}-{day:02}T{hours:02}:{minutes:02}:{seconds:02}.{millis:03}Z")
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
///
/// Hinnant's `civil_from_days`, restricted to dates on or after the epoch.
const fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

// ============================================================================
// Log Target Resolution
// ============================================================================

/// Where a log file may be placed, highest priority first.
#[derive(Clone, Debug, Default)]
struct LogSources {
    /// `BRANCHVER_LOG_PATH`: exact file.
    path: Option<PathBuf>,
    /// `BRANCHVER_LOG_DIR`: directory.
    dir: Option<PathBuf>,
    /// `log_dir` from config.
    config_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogTarget {
    dir: PathBuf,
    file_name: String,
}

impl LogSources {
    fn from_env(config_dir: Option<PathBuf>) -> Self {
        Self {
            path: std::env::var_os(ENV_LOG_PATH).map(PathBuf::from),
            dir: std::env::var_os(ENV_LOG_DIR).map(PathBuf::from),
            config_dir,
        }
    }

    /// Pick the first usable target. Explicit sources are not second-guessed:
    /// if one is set but unwritable, that is an error.
    fn resolve(&self, service: &str) -> Result<LogTarget, String> {
        let file_name = format!("{service}{LOG_FILE_SUFFIX}");

        if let Some(ref path) = self.path {
            return LogTarget::from_path(path);
        }
        if let Some(dir) = self.dir.as_ref().or(self.config_dir.as_ref()) {
            return LogTarget::checked(dir.clone(), file_name);
        }

        default_log_dirs(service)
            .into_iter()
            .find_map(|dir| LogTarget::checked(dir, file_name.clone()).ok())
            .ok_or_else(|| "No writable log directory found".to_string())
    }
}

impl LogTarget {
    fn checked(dir: PathBuf, file_name: String) -> Result<Self, String> {
        ensure_writable(&dir, &file_name)?;
        Ok(Self { dir, file_name })
    }

    fn from_path(path: &Path) -> Result<Self, String> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format!("{ENV_LOG_PATH} must end in a UTF-8 file name"))?
            .to_string();
        let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        Self::checked(dir, file_name)
    }

    fn open(&self) -> (NonBlocking, WorkerGuard) {
        let appender = tracing_appender::rolling::daily(&self.dir, &self.file_name);
        tracing_appender::non_blocking(appender)
    }
}

fn default_log_dirs(service: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if cfg!(unix) {
        candidates.push(PathBuf::from(DEFAULT_LOG_DIR_UNIX));
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", service) {
        candidates.push(proj_dirs.data_local_dir().join("logs"));
    }
    if let Ok(dir) = std::env::current_dir() {
        candidates.push(dir);
    }
    candidates
}

fn ensure_writable(dir: &Path, file_name: &str) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create log directory {}: {e}", dir.display()))?;

    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn env_filter_quiet_overrides() {
        assert_eq!(env_filter(true, 3, "info").to_string(), "error");
    }

    #[test]
    fn env_filter_verbose_maps_to_debug_and_trace() {
        assert_eq!(env_filter(false, 1, "info").to_string(), "debug");
        assert_eq!(env_filter(false, 2, "info").to_string(), "trace");
    }

    #[test]
    fn path_source_wins() {
        let dir = std::env::temp_dir().join("branchver-log-path");
        let file = dir.join("custom.jsonl");
        let sources = LogSources {
            path: Some(file),
            dir: Some(std::env::temp_dir().join("ignored")),
            config_dir: None,
        };

        let target = sources.resolve("demo").expect("log target from path");
        assert_eq!(target.dir, dir);
        assert_eq!(target.file_name, "custom.jsonl");
    }

    #[test]
    fn env_dir_beats_config_dir() {
        let env_dir = std::env::temp_dir().join("branchver-log-env-dir");
        let sources = LogSources {
            path: None,
            dir: Some(env_dir.clone()),
            config_dir: Some(std::env::temp_dir().join("branchver-log-config-dir")),
        };

        let target = sources.resolve("demo").expect("env dir log target");
        assert_eq!(target.dir, env_dir);
        assert_eq!(target.file_name, format!("demo{LOG_FILE_SUFFIX}"));
    }

    #[test]
    fn config_dir_used_without_env() {
        let config_dir = std::env::temp_dir().join("branchver-log-config-only");
        let sources = LogSources {
            config_dir: Some(config_dir.clone()),
            ..LogSources::default()
        };

        let target = sources.resolve("demo").expect("config dir log target");
        assert_eq!(target.dir, config_dir);
    }

    #[test]
    fn timestamp_at_known_instants() {
        assert_eq!(format_timestamp(UNIX_EPOCH), "1970-01-01T00:00:00.000Z");

        // 2024-02-29T12:34:56.789Z
        let leap = UNIX_EPOCH + Duration::from_millis(1_709_210_096_789);
        assert_eq!(format_timestamp(leap), "2024-02-29T12:34:56.789Z");
    }

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(10_957), (2000, 1, 1));
        assert_eq!(civil_from_days(19_782), (2024, 2, 29));
    }
}
