use crate::commands::ConsentAppState;
use crate::config::PolicyTarget;
use tauri::{AppHandle, Manager, State, WebviewUrl, WebviewWindowBuilder};
use tracing::info;

pub const MAIN_WINDOW: &str = "main";
pub const POLICY_WINDOW: &str = "policy";

pub fn show_window(app: &AppHandle, label: &str) -> bool {
    match app.get_webview_window(label) {
        Some(window) => {
            let _ = window.show();
            let _ = window.set_focus();
            true
        }
        None => false,
    }
}

/// Shows the cookie policy page, which embeds the settings panel.
pub fn open_policy_window(app: &AppHandle, target: PolicyTarget) -> Result<(), String> {
    if show_window(app, POLICY_WINDOW) {
        return Ok(());
    }

    let url = match target {
        PolicyTarget::App(path) => WebviewUrl::App(path),
        PolicyTarget::External(url) => WebviewUrl::External(url),
    };
    info!("Opening policy window at {:?}", url);

    WebviewWindowBuilder::new(app, POLICY_WINDOW, url)
        .title("Cookie Policy")
        .inner_size(820.0, 900.0)
        .build()
        .map_err(|e| e.to_string())?;
    Ok(())
}

#[tauri::command]
pub async fn open_policy_page(
    app: AppHandle,
    state: State<'_, ConsentAppState>,
) -> Result<(), String> {
    let target = state.config.policy_target().map_err(|e| e.to_string())?;
    open_policy_window(&app, target)
}
