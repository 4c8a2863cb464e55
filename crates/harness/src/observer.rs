//! Background observers: append-only capture of network and console activity
//!
//! The log is owned by the Session and handed by handle to whichever
//! component needs a snapshot. Events arrive from the driver's reader task
//! while foreground steps run; appends never block a probe.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// One captured response. Never mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEvent {
    pub url: String,
    pub http_status: u16,
    /// Zero when the response body could not be read
    pub byte_size: u64,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsoleKind {
    /// Application-logged error (console.error)
    ConsoleError,
    /// Uncaught/unhandled page error
    RuntimeError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEvent {
    pub kind: ConsoleKind,
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
    pub timestamp: String,
}

#[derive(Default)]
struct LogInner {
    network: Vec<NetworkEvent>,
    console: Vec<ConsoleEvent>,
}

/// Append-only accumulation of session activity. Cloning the log clones
/// the handle, not the contents; snapshot accessors return copies so
/// callers never hold the live accumulation.
#[derive(Clone, Default)]
pub struct ObserverLog {
    inner: Arc<Mutex<LogInner>>,
}

impl ObserverLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_network(&self, event: NetworkEvent) {
        trace!(url = %event.url, status = event.http_status, size = event.byte_size, "network event");
        self.inner.lock().network.push(event);
    }

    pub fn push_console(&self, event: ConsoleEvent) {
        trace!(kind = ?event.kind, "console event");
        self.inner.lock().console.push(event);
    }

    /// Ingest an unsolicited driver event line. Unknown event shapes are
    /// ignored rather than failing the capture.
    pub fn ingest(&self, value: &Value) {
        match value.get("event").and_then(Value::as_str) {
            Some("network") => {
                self.push_network(NetworkEvent {
                    url: value["url"].as_str().unwrap_or_default().to_string(),
                    http_status: value["status"].as_u64().unwrap_or(0) as u16,
                    byte_size: value["size"].as_u64().unwrap_or(0),
                    content_type: value["content_type"]
                        .as_str()
                        .unwrap_or("unknown")
                        .to_string(),
                });
            }
            Some(kind @ ("console_error" | "runtime_error")) => {
                self.push_console(ConsoleEvent {
                    kind: if kind == "console_error" {
                        ConsoleKind::ConsoleError
                    } else {
                        ConsoleKind::RuntimeError
                    },
                    message: value["message"].as_str().unwrap_or_default().to_string(),
                    stack: value["stack"].as_str().map(str::to_string),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                });
            }
            _ => {}
        }
    }

    /// Snapshot of captured responses, in arrival order
    pub fn network_events(&self) -> Vec<NetworkEvent> {
        self.inner.lock().network.clone()
    }

    /// Snapshot of captured console/runtime errors, in arrival order
    pub fn console_events(&self) -> Vec<ConsoleEvent> {
        self.inner.lock().console.clone()
    }

    /// Sum of all captured response body sizes
    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().network.iter().map(|e| e.byte_size).sum()
    }

    /// Size of the entry document: the response whose URL exactly matches
    /// the target, or whose path ends in the expected entry document name.
    pub fn document_size(&self, target: &str, entry_document: &str) -> Option<u64> {
        self.inner
            .lock()
            .network
            .iter()
            .find(|e| e.url == target || e.url.ends_with(entry_document))
            .map(|e| e.byte_size)
    }
}
