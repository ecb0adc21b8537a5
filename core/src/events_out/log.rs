use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::writer::EventsOutTx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One human-readable batch-level notification.
#[derive(Debug, Clone, Serialize)]
pub struct SystemLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Batch event sink. Entries are kept in memory for display, broadcast to
/// subscribers, mirrored to `tracing`, and optionally teed as JSONL.
/// Nothing here feeds back into scheduling.
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<EventLogInner>,
}

struct EventLogInner {
    entries: Mutex<Vec<SystemLog>>,
    tx: broadcast::Sender<SystemLog>,
    out: Option<EventsOutTx>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_events_out(None)
    }

    pub fn with_events_out(out: Option<EventsOutTx>) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(EventLogInner {
                entries: Mutex::new(Vec::new()),
                tx,
                out,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SystemLog> {
        self.inner.tx.subscribe()
    }

    pub async fn log(&self, level: LogLevel, message: impl Into<String>, details: Option<Value>) {
        let entry = SystemLog {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            details,
        };

        match level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(target: "uniflow.events", kind = ?level, "{}", entry.message)
            }
            LogLevel::Warning => tracing::warn!(target: "uniflow.events", "{}", entry.message),
            LogLevel::Error => tracing::error!(target: "uniflow.events", "{}", entry.message),
        }

        if let Some(out) = &self.inner.out {
            if let Ok(line) = serde_json::to_string(&entry) {
                out.send_line(line).await;
            }
        }

        if let Ok(mut entries) = self.inner.entries.lock() {
            entries.push(entry.clone());
        }
        let _ = self.inner.tx.send(entry);
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None).await;
    }

    pub async fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message, None).await;
    }

    pub async fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message, None).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None).await;
    }

    pub fn entries(&self) -> Vec<SystemLog> {
        self.inner
            .entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.inner.entries.lock() {
            entries.clear();
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
