//! Toast surface for the consent UI.
//!
//! Every notification is emitted to the webview as `consent-toast`; when
//! enabled, it is also raised as an OS notification.

use crate::consent::{Notifier, NotifyKind};
use serde::Serialize;
use tauri::{AppHandle, Emitter, Runtime};
use tauri_plugin_notification::NotificationExt;
use tracing::warn;

pub const TOAST_EVENT: &str = "consent-toast";

#[derive(Debug, Clone, Serialize)]
struct Toast<'a> {
    kind: NotifyKind,
    message: &'a str,
}

pub struct TauriNotifier<R: Runtime> {
    app: AppHandle<R>,
    os_notifications: bool,
}

impl<R: Runtime> TauriNotifier<R> {
    pub fn new(app: AppHandle<R>, os_notifications: bool) -> Self {
        Self {
            app,
            os_notifications,
        }
    }
}

impl<R: Runtime> Notifier for TauriNotifier<R> {
    fn notify(&self, kind: NotifyKind, message: &str) {
        if let Err(e) = self.app.emit(TOAST_EVENT, Toast { kind, message }) {
            warn!("Failed to emit {}: {}", TOAST_EVENT, e);
        }

        if !self.os_notifications {
            return;
        }
        let title = match kind {
            NotifyKind::Success => "Cookie preferences",
            NotifyKind::Error => "Cookie preferences not saved",
        };
        if let Err(e) = self
            .app
            .notification()
            .builder()
            .title(title)
            .body(message)
            .show()
        {
            warn!("Failed to show notification: {}", e);
        }
    }
}
