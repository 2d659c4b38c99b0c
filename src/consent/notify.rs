use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyKind {
    Success,
    Error,
}

/// Toast surface. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotifyKind, message: &str);
}

/// Discards every notification.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _kind: NotifyKind, _message: &str) {}
}

/// Records notifications so they can be inspected later.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(NotifyKind, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(NotifyKind, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotifyKind, message: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((kind, message.to_string()));
        }
    }
}
