//! Consent Desktop - Main Entry Point
//!
//! Tauri application entry point that sets up:
//! - Logging to stderr and a daily-rotated file
//! - The consent store, manager and audit trail
//! - IPC command handlers for the banner and the settings panel
//! - System tray

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use consent_desktop_lib::commands::{self, ConsentAppState};
use consent_desktop_lib::config::{ConsentConfig, CONFIG_FILE_NAME};
use consent_desktop_lib::consent::{
    AuditSink, ConsentStateManager, ConsentStore, FileAuditSink, Notifier, StorageBackend,
    TracingAuditSink, UnavailableBackend,
};
use consent_desktop_lib::notifier::TauriNotifier;
use consent_desktop_lib::storage::TauriStoreBackend;
use consent_desktop_lib::{tray, window_manager};
use std::sync::Arc;
use tauri::{AppHandle, Manager};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "consent_desktop=info,consent_desktop_lib=debug";

fn open_storage(app: &AppHandle, config: &ConsentConfig) -> Box<dyn StorageBackend> {
    match TauriStoreBackend::open(app, &config.store_file) {
        Ok(backend) => {
            info!("Consent store opened: {}", config.store_file);
            Box::new(backend)
        }
        Err(e) => {
            // Decisions still apply for this session and every save reports failure.
            error!("Consent store unavailable: {}", e);
            Box::new(UnavailableBackend::new(e.to_string()))
        }
    }
}

fn audit_sink(app: &AppHandle, config: &ConsentConfig) -> Box<dyn AuditSink> {
    if !config.audit_log {
        return Box::new(TracingAuditSink);
    }
    match app.path().app_data_dir() {
        Ok(dir) => Box::new(FileAuditSink::new(dir.join("consent-audit.jsonl"))),
        Err(e) => {
            warn!("No app data dir for the consent audit log: {}", e);
            Box::new(TracingAuditSink)
        }
    }
}

fn main() {
    // ---------- Log directory setup ----------
    let log_dir = dirs::data_local_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("consent-desktop")
        .join("logs");
    let _ = std::fs::create_dir_all(&log_dir);

    // Daily-rotated file appender: desktop.log.YYYY-MM-DD
    let file_appender = tracing_appender::rolling::daily(&log_dir, "desktop.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr)) // console
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking)) // file
        .init();

    info!("Consent Desktop starting...");
    info!("Log directory: {}", log_dir.display());

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .plugin(tauri_plugin_notification::init())
        .invoke_handler(tauri::generate_handler![
            // Consent state
            commands::get_consent_state,
            commands::update_consent_preferences,
            commands::accept_all_consent,
            commands::accept_necessary_consent,
            commands::clear_consent,
            // Banner
            commands::mount_consent_banner,
            commands::consent_banner_action,
            commands::get_consent_banner,
            // Settings panel
            commands::mount_consent_settings,
            commands::consent_settings_action,
            commands::get_consent_settings,
            // Navigation
            window_manager::open_policy_page,
        ])
        .setup(|app| {
            let app_handle = app.handle().clone();

            let config = match app.path().app_config_dir() {
                Ok(dir) => ConsentConfig::load_or_default(&dir.join(CONFIG_FILE_NAME)),
                Err(e) => {
                    warn!("No app config dir, using default consent config: {}", e);
                    ConsentConfig::default()
                }
            };

            let store = ConsentStore::new(open_storage(&app_handle, &config));
            let manager = Arc::new(
                ConsentStateManager::new(store)
                    .with_defaults(config.defaults)
                    .with_audit_sink(audit_sink(&app_handle, &config)),
            );
            commands::bridge_changes(&app_handle, &manager);

            let notifier: Arc<dyn Notifier> =
                Arc::new(TauriNotifier::new(app_handle.clone(), config.notifications));
            info!(
                "Consent manager ready (decided: {})",
                manager.has_consented()
            );
            app.manage(ConsentAppState::new(manager, notifier, config));

            if let Err(e) = tray::setup_tray(&app_handle) {
                warn!("Failed to setup system tray: {}", e);
            }

            info!("Tauri app setup complete");
            Ok(())
        })
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::Destroyed = event {
                let app = window.app_handle().clone();
                let label = window.label().to_string();
                tauri::async_runtime::spawn(async move {
                    if let Some(state) = app.try_state::<ConsentAppState>() {
                        state.forget_window(&label).await;
                    }
                });
            }
        })
        .run(tauri::generate_context!());

    if let Err(e) = result {
        error!("Error while running tauri application: {}", e);
        std::process::exit(1);
    }
}
