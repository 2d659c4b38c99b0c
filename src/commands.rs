//! Consent Tauri Commands
//!
//! Exposes the consent manager, the banner and the settings panel to the
//! webview. Surfaces are tracked per window label, so each window has at most
//! one banner and one settings panel.

use crate::config::ConsentConfig;
use crate::consent::banner::reveal_after_delay;
use crate::consent::{
    BannerAction, BannerState, ConsentBanner, ConsentChange, ConsentPreferences,
    ConsentSettingsPanel, ConsentState, ConsentStateManager, Notifier, SaveReport,
    SettingsAction, SettingsView, SharedBanner,
};
use std::collections::HashMap;
use std::sync::Arc;
use tauri::{AppHandle, Emitter, Manager, State, WebviewWindow};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const CHANGED_EVENT: &str = "consent-changed";
pub const BANNER_EVENT: &str = "consent-banner-state";
pub const SETTINGS_EVENT: &str = "consent-settings-state";

// ============================================================================
// State Types
// ============================================================================

pub struct ConsentAppState {
    pub manager: Arc<ConsentStateManager>,
    pub notifier: Arc<dyn Notifier>,
    pub config: ConsentConfig,
    pub banners: Mutex<HashMap<String, SharedBanner>>,
    pub panels: Mutex<HashMap<String, ConsentSettingsPanel>>,
}

impl ConsentAppState {
    pub fn new(
        manager: Arc<ConsentStateManager>,
        notifier: Arc<dyn Notifier>,
        config: ConsentConfig,
    ) -> Self {
        Self {
            manager,
            notifier,
            config,
            banners: Mutex::new(HashMap::new()),
            panels: Mutex::new(HashMap::new()),
        }
    }

    /// Drops the surfaces owned by a closed window.
    pub async fn forget_window(&self, label: &str) {
        self.banners.lock().await.remove(label);
        self.panels.lock().await.remove(label);
    }

    async fn banner_for(&self, label: &str) -> SharedBanner {
        let mut banners = self.banners.lock().await;
        banners
            .entry(label.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ConsentBanner::new(self.config.display_delay())))
            })
            .clone()
    }
}

/// Broadcasts every write to all windows and refreshes settings panels that
/// have no unsaved edits.
pub fn bridge_changes(app: &AppHandle, manager: &ConsentStateManager) {
    let handle = app.clone();
    manager.subscribe(move |change: &ConsentChange| {
        if let Err(e) = handle.emit(CHANGED_EVENT, change) {
            warn!("Failed to emit {}: {}", CHANGED_EVENT, e);
        }

        let app = handle.clone();
        tauri::async_runtime::spawn(async move {
            let Some(state) = app.try_state::<ConsentAppState>() else {
                return;
            };
            let mut panels = state.panels.lock().await;
            for (label, panel) in panels.iter_mut() {
                if !panel.refresh_if_clean(&state.manager) {
                    continue;
                }
                if let Err(e) = app.emit_to(label.as_str(), SETTINGS_EVENT, panel.view()) {
                    debug!("Failed to emit {} to {}: {}", SETTINGS_EVENT, label, e);
                }
            }
        });
    });
}

// ============================================================================
// Manager Commands
// ============================================================================

#[tauri::command]
pub async fn get_consent_state(state: State<'_, ConsentAppState>) -> Result<ConsentState, String> {
    Ok(state.manager.get_state())
}

#[tauri::command]
pub async fn update_consent_preferences(
    preferences: ConsentPreferences,
    state: State<'_, ConsentAppState>,
) -> Result<SaveReport, String> {
    Ok(state.manager.update_preferences(preferences))
}

#[tauri::command]
pub async fn accept_all_consent(state: State<'_, ConsentAppState>) -> Result<SaveReport, String> {
    Ok(state.manager.accept_all())
}

#[tauri::command]
pub async fn accept_necessary_consent(
    state: State<'_, ConsentAppState>,
) -> Result<SaveReport, String> {
    Ok(state.manager.accept_necessary_only())
}

/// Withdraws consent. Meant for account deletion and reset flows.
#[tauri::command]
pub async fn clear_consent(state: State<'_, ConsentAppState>) -> Result<SaveReport, String> {
    info!("clear_consent command received");
    Ok(state.manager.clear_consent())
}

// ============================================================================
// Banner Commands
// ============================================================================

/// Mounts the calling window's banner. An undecided user gets
/// `consent-banner-state` once the display delay has passed.
#[tauri::command]
pub async fn mount_consent_banner(
    window: WebviewWindow,
    state: State<'_, ConsentAppState>,
    app: AppHandle,
) -> Result<BannerState, String> {
    let label = window.label().to_string();
    let banner = state.banner_for(&label).await;

    let (current, ticket) = {
        let mut guard = banner.lock().await;
        let ticket = guard.mount(&state.manager);
        (guard.state(), ticket)
    };

    if let Some(ticket) = ticket {
        debug!("Consent banner for {} scheduled in {:?}", label, ticket.delay);
        tauri::async_runtime::spawn(async move {
            if let Some(revealed) = reveal_after_delay(banner, ticket).await {
                if let Err(e) = app.emit_to(label.as_str(), BANNER_EVENT, revealed) {
                    warn!("Failed to emit {} to {}: {}", BANNER_EVENT, label, e);
                }
            }
        });
    }

    Ok(current)
}

#[tauri::command]
pub async fn consent_banner_action(
    action: BannerAction,
    window: WebviewWindow,
    state: State<'_, ConsentAppState>,
) -> Result<BannerState, String> {
    let banner = {
        let banners = state.banners.lock().await;
        banners
            .get(window.label())
            .cloned()
            .ok_or_else(|| format!("No consent banner mounted in {}", window.label()))?
    };

    let mut banner = banner.lock().await;
    banner
        .handle(action, &state.manager, state.notifier.as_ref())
        .map_err(|e| {
            warn!("Rejected banner action in {}: {}", window.label(), e);
            e.to_string()
        })
}

#[tauri::command]
pub async fn get_consent_banner(
    window: WebviewWindow,
    state: State<'_, ConsentAppState>,
) -> Result<Option<BannerState>, String> {
    let banner = state.banners.lock().await.get(window.label()).cloned();
    match banner {
        Some(banner) => Ok(Some(banner.lock().await.state())),
        None => Ok(None),
    }
}

// ============================================================================
// Settings Panel Commands
// ============================================================================

#[tauri::command]
pub async fn mount_consent_settings(
    window: WebviewWindow,
    state: State<'_, ConsentAppState>,
) -> Result<SettingsView, String> {
    let panel = ConsentSettingsPanel::mount(&state.manager);
    let view = panel.view();
    state
        .panels
        .lock()
        .await
        .insert(window.label().to_string(), panel);
    Ok(view)
}

#[tauri::command]
pub async fn consent_settings_action(
    action: SettingsAction,
    window: WebviewWindow,
    state: State<'_, ConsentAppState>,
) -> Result<SettingsView, String> {
    let mut panels = state.panels.lock().await;
    let panel = panels
        .entry(window.label().to_string())
        .or_insert_with(|| ConsentSettingsPanel::mount(&state.manager));
    Ok(panel.handle(action, &state.manager, state.notifier.as_ref()))
}

#[tauri::command]
pub async fn get_consent_settings(
    window: WebviewWindow,
    state: State<'_, ConsentAppState>,
) -> Result<Option<SettingsView>, String> {
    let panels = state.panels.lock().await;
    Ok(panels.get(window.label()).map(|panel| panel.view()))
}
