use crate::commands::ConsentAppState;
use crate::window_manager::{open_policy_window, show_window, MAIN_WINDOW};
use tauri::{
    image::Image,
    menu::{MenuBuilder, MenuItemBuilder, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager,
};
use tracing::{info, warn};

pub fn setup_tray(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let icon = Image::from_bytes(include_bytes!("../icons/icon.png"))?;

    let open_main = MenuItemBuilder::new("Open").id("open_main").build(app)?;

    let cookie_settings = MenuItemBuilder::new("Cookie Settings")
        .id("cookie_settings")
        .build(app)?;

    let separator = PredefinedMenuItem::separator(app)?;

    let quit = MenuItemBuilder::new("Quit").id("quit").build(app)?;

    let menu = MenuBuilder::new(app)
        .item(&open_main)
        .item(&cookie_settings)
        .item(&separator)
        .item(&quit)
        .build()?;

    let _tray = TrayIconBuilder::new()
        .icon(icon)
        .menu(&menu)
        .tooltip("Consent Desktop")
        .on_menu_event(move |app, event| match event.id().as_ref() {
            "open_main" => {
                show_window(app, MAIN_WINDOW);
            }
            "cookie_settings" => {
                let Some(state) = app.try_state::<ConsentAppState>() else {
                    return;
                };
                let opened = state
                    .config
                    .policy_target()
                    .map_err(|e| e.to_string())
                    .and_then(|target| open_policy_window(app, target));
                if let Err(e) = opened {
                    warn!("Failed to open cookie settings: {}", e);
                }
            }
            "quit" => {
                app.exit(0);
            }
            _ => {}
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button,
                button_state,
                ..
            } = event
            {
                if button == MouseButton::Left && button_state == MouseButtonState::Up {
                    show_window(tray.app_handle(), MAIN_WINDOW);
                }
            }
        })
        .build(app)?;

    info!("System tray initialized");
    Ok(())
}
