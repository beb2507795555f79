use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};

use chrono::Local;
use tracing::{
    field::{Field, Visit},
    Dispatch, Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, Layer},
    prelude::*,
    registry::LookupSpan,
    EnvFilter,
};

const MAX_LOG_BYTES: usize = 256 * 1024; // 256KB

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("logger already initialized")]
    AlreadyInitialized,
    #[error("logger not initialized")]
    NotInitialized,
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },
    #[error("could not install subscriber: {0}")]
    Subscriber(String),
}

/// Bounded buffer of formatted log lines; the oldest lines go first once the
/// byte budget is exceeded.
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    bytes: Mutex<usize>,
    max_bytes: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(MAX_LOG_BYTES)
    }
}

impl LogBuffer {
    pub fn new(max_bytes: usize) -> Self {
        LogBuffer {
            lines: Mutex::new(VecDeque::new()),
            bytes: Mutex::new(0),
            max_bytes,
        }
    }

    /// Append one formatted entry, evicting old entries to stay in budget.
    /// A single entry larger than the budget is kept alone.
    pub fn push(&self, entry: String) {
        let (Ok(mut lines), Ok(mut bytes)) = (self.lines.lock(), self.bytes.lock()) else {
            return;
        };
        while *bytes + entry.len() > self.max_bytes {
            match lines.pop_front() {
                Some(old) => *bytes -= old.len(),
                None => break,
            }
        }
        *bytes += entry.len();
        lines.push_back(entry);
    }

    /// Everything currently buffered, oldest first
    pub fn read_logs(&self) -> String {
        match self.lines.lock() {
            Ok(lines) => lines.iter().map(String::as_str).collect(),
            Err(_) => String::new(),
        }
    }

    pub fn current_size(&self) -> usize {
        self.bytes.lock().map(|bytes| *bytes).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let (Ok(mut lines), Ok(mut bytes)) = (self.lines.lock(), self.bytes.lock()) {
            lines.clear();
            *bytes = 0;
        }
    }
}

/// Tracing layer that prints to the browser console (stderr off-browser)
/// and keeps a copy in a [`LogBuffer`].
pub struct ConsoleLayer {
    buffer: Arc<LogBuffer>,
}

impl ConsoleLayer {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        ConsoleLayer { buffer }
    }

    fn format_event<S>(&self, event: &Event, ctx: Context<'_, S>) -> String
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let level = event.metadata().level();
        let target = event.metadata().target();

        let mut visitor = FieldCollector::new();
        event.record(&mut visitor);

        let span_info = match ctx.event_span(event) {
            Some(span) => format!(" [{}]", span.metadata().name()),
            None => String::new(),
        };

        format!("[{}] {} - {}{} - {}\n", timestamp, level, target, span_info, visitor.finish())
    }
}

impl<S> Layer<S> for ConsoleLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event, ctx: Context<'_, S>) {
        let formatted = self.format_event(event, ctx);
        write_console(*event.metadata().level(), &formatted);
        self.buffer.push(formatted);
    }
}

#[cfg(target_arch = "wasm32")]
fn write_console(level: Level, line: &str) {
    use web_sys::console;

    let line = wasm_bindgen::JsValue::from_str(line.trim_end());
    match level {
        Level::ERROR => console::error_1(&line),
        Level::WARN => console::warn_1(&line),
        Level::INFO => console::info_1(&line),
        _ => console::debug_1(&line),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn write_console(_level: Level, line: &str) {
    eprint!("{}", line);
}

/// Collects event fields; the `message` field is printed bare, the rest as `name=value`
struct FieldCollector {
    message: Option<String>,
    fields: Vec<String>,
}

impl FieldCollector {
    fn new() -> Self {
        FieldCollector {
            message: None,
            fields: Vec::new(),
        }
    }

    fn finish(self) -> String {
        let mut parts = Vec::with_capacity(self.fields.len() + 1);
        if let Some(message) = self.message {
            parts.push(message);
        }
        parts.extend(self.fields);
        parts.join(", ")
    }
}

impl Visit for FieldCollector {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.push(format!("{}={}", field.name(), value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.push(format!("{}={}", field.name(), value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.push(format!("{}={}", field.name(), value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.push(format!("{}={}", field.name(), value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}=\"{}\"", field.name(), value));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields.push(format!("{}=\"{}\"", field.name(), value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

static GLOBAL_BUFFER: OnceLock<Arc<LogBuffer>> = OnceLock::new();

/// Install the console layer as the global subscriber.
///
/// `filter` takes `EnvFilter` directives, e.g. `"info"` or `"theme_sync=debug,warn"`.
pub fn init_logger(app_name: &str, filter: &str) -> Result<(), LoggerError> {
    install(&GLOBAL_BUFFER, filter, |dispatch| {
        tracing::dispatcher::set_global_default(dispatch).map_err(|e| e.to_string())
    })?;
    tracing::info!("Console logger initialized for {}", app_name);
    Ok(())
}

/// The buffer is published only once the subscriber is in place, so a failed
/// install leaves the logger uninitialized.
fn install(
    slot: &OnceLock<Arc<LogBuffer>>,
    filter: &str,
    set_default: impl FnOnce(Dispatch) -> Result<(), String>,
) -> Result<(), LoggerError> {
    let env_filter = EnvFilter::try_new(filter).map_err(|e| LoggerError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })?;
    if slot.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let buffer = Arc::new(LogBuffer::default());
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(ConsoleLayer::new(buffer.clone()));
    set_default(Dispatch::new(subscriber)).map_err(LoggerError::Subscriber)?;

    slot.set(buffer).map_err(|_| LoggerError::AlreadyInitialized)
}

/// Buffered log lines of the global logger
pub fn read_logs() -> Result<String, LoggerError> {
    GLOBAL_BUFFER
        .get()
        .map(|buffer| buffer.read_logs())
        .ok_or(LoggerError::NotInitialized)
}
