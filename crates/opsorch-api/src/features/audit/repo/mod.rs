use opsorch_core::{AuditEntry, AuditRecorder};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Destination of audit entries.
#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Emits each entry as one JSON line on the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditEntry) {
        match serde_json::to_string(entry) {
            Ok(line) => info!(target: "audit", entry = %line, "audit"),
            Err(e) => warn!(action = %entry.action, error = %e, "Failed to encode audit entry"),
        }
    }
}

/// Keeps entries in memory; used by tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditSink {
    recorder: Arc<Mutex<AuditRecorder>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .to_vec()
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.action).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, entry: &AuditEntry) {
        self.recorder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(entry.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_sink_keeps_order() {
        let sink = InMemoryAuditSink::new();
        sink.record(&AuditEntry::new("incident.create", "r1"));
        sink.record(&AuditEntry::new("incident.update", "r2"));

        assert_eq!(sink.actions(), vec!["incident.create", "incident.update"]);
        assert_eq!(sink.entries()[1].request_id, "r2");
    }

    #[test]
    fn test_clones_share_entries() {
        let sink = InMemoryAuditSink::new();
        let clone = sink.clone();
        clone.record(&AuditEntry::new("log.query", "r1"));
        assert_eq!(sink.actions(), vec!["log.query"]);
    }
}
