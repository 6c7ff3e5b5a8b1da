//! In-memory log capture for the dashboard's admin log view.
//!
//! `LogCaptureLayer` sits next to the fmt layer in the tracing registry and
//! copies every event into a bounded `LogBuffer`. The web server reads recent
//! entries from the buffer and streams new ones over SSE.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Capacity of the live-stream channel. Slow SSE clients past this lag and skip entries.
const STREAM_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: &str, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            level: level.to_string(),
            target: target.to_string(),
            message: message.into(),
        }
    }

    /// Single-line form used by the plain-text log download
    pub fn format(&self) -> String {
        format!(
            "{} {:>5} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level,
            self.target,
            self.message
        )
    }

    fn level_rank(&self) -> u8 {
        level_rank(&self.level)
    }

    /// Whether the entry is `min_level` or more severe
    pub fn at_least(&self, min_level: &str) -> bool {
        self.level_rank() <= level_rank(min_level)
    }
}

/// ERROR=0 .. TRACE=4, unknown levels sort as TRACE
fn level_rank(level: &str) -> u8 {
    match level.to_ascii_uppercase().as_str() {
        "ERROR" => 0,
        "WARN" => 1,
        "INFO" => 2,
        "DEBUG" => 3,
        _ => 4,
    }
}

/// Ring buffer of recent entries plus a broadcast channel for live subscribers
pub struct LogBuffer {
    tx: broadcast::Sender<LogEntry>,
    recent: parking_lot::RwLock<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            tx,
            recent: parking_lot::RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        {
            let mut recent = self.recent.write();
            while recent.len() >= self.capacity.max(1) {
                recent.pop_front();
            }
            recent.push_back(entry.clone());
        }

        // No receivers is fine
        let _ = self.tx.send(entry);
    }

    /// Up to `count` most recent entries at `min_level` or more severe, oldest first
    pub fn recent(&self, count: usize, min_level: Option<&str>) -> Vec<LogEntry> {
        let threshold = min_level.map(level_rank).unwrap_or(u8::MAX);
        let recent = self.recent.read();
        let mut entries: Vec<LogEntry> = recent
            .iter()
            .rev()
            .filter(|e| e.level_rank() <= threshold)
            .take(count)
            .cloned()
            .collect();
        entries.reverse();
        entries
    }

    pub fn len(&self) -> usize {
        self.recent.read().len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }
}

pub type SharedLogBuffer = Arc<LogBuffer>;

pub fn create_log_buffer(capacity: usize) -> SharedLogBuffer {
    Arc::new(LogBuffer::new(capacity))
}

/// Tracing layer that copies events into a [`LogBuffer`]
pub struct LogCaptureLayer {
    buffer: SharedLogBuffer,
}

impl LogCaptureLayer {
    pub fn new(buffer: SharedLogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        // Skip the chatty gateway internals
        if metadata.target().starts_with("serenity") && *metadata.level() > Level::WARN {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(LogEntry::new(
            *metadata.level(),
            metadata.target(),
            visitor.finish(),
        ));
    }
}

/// Collects the `message` field and appends any other fields as `key=value`
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: String,
}

impl FieldVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields
        } else {
            format!("{} {}", self.message, self.fields)
        }
    }

    fn push_field(&mut self, name: &str, value: &dyn std::fmt::Debug) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={:?}", name, value);
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.push_field(field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), &value);
        }
    }
}
