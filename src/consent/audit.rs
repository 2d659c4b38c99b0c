use super::types::ConsentPreferences;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Result as IoResult, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AcceptAll,
    NecessaryOnly,
    Update,
    Clear,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AcceptAll => "accept_all",
            AuditAction::NecessaryOnly => "necessary_only",
            AuditAction::Update => "update",
            AuditAction::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: String,
    pub action: AuditAction,
    pub preferences: Option<ConsentPreferences>,
    pub persisted: bool,
}

impl AuditEvent {
    /// Audit event for a saved decision
    pub fn saved(action: AuditAction, preferences: ConsentPreferences, persisted: bool) -> Self {
        Self {
            id: format!("consent-{}", Uuid::new_v4()),
            timestamp: Utc::now().to_rfc3339(),
            action,
            preferences: Some(preferences),
            persisted,
        }
    }

    /// Audit event for a withdrawn decision
    pub fn cleared(persisted: bool) -> Self {
        Self {
            id: format!("consent-{}", Uuid::new_v4()),
            timestamp: Utc::now().to_rfc3339(),
            action: AuditAction::Clear,
            preferences: None,
            persisted,
        }
    }
}

pub trait AuditSink: Send {
    fn log(&mut self, event: AuditEvent) -> IoResult<()>;
}

/// Appends one JSON line per event.
pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn open_append(&self) -> IoResult<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
    }
}

impl AuditSink for FileAuditSink {
    fn log(&mut self, event: AuditEvent) -> IoResult<()> {
        let mut file = self.open_append()?;
        let line = serde_json::to_string(&event)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Audit sink that only writes to the log
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log(&mut self, event: AuditEvent) -> IoResult<()> {
        info!(
            "[AUDIT] {} {} persisted={}",
            event.timestamp,
            event.action.as_str(),
            event.persisted
        );
        Ok(())
    }
}

/// Keeps events in memory; the handle can be cloned to read them back.
#[derive(Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn log(&mut self, event: AuditEvent) -> IoResult<()> {
        self.events
            .lock()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?
            .push(event);
        Ok(())
    }
}
