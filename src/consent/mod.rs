//! Consent state for the cookie banner and the cookie settings panel.
//! Nothing in here depends on Tauri, so it can be reviewed and tested in isolation.

pub mod audit;
pub mod banner;
mod manager;
pub mod notify;
pub mod settings;
pub mod store;
mod types;

pub use audit::{AuditAction, AuditEvent, AuditSink, FileAuditSink, TracingAuditSink};
pub use banner::{BannerAction, BannerError, BannerState, ConsentBanner, RevealTicket, SharedBanner};
pub use manager::{ConsentListener, ConsentStateManager, SubscriptionId};
pub use notify::{Notifier, NotifyKind};
pub use settings::{ConsentSettingsPanel, SettingsAction, SettingsView};
pub use store::{ConsentStore, MemoryBackend, StorageBackend, StoreError, UnavailableBackend};
pub use types::{
    ChangeKind, ConsentCategory, ConsentChange, ConsentPreferences, ConsentState, SaveReport,
    StoredConsent,
};

#[cfg(test)]
mod tests {
    //! End-to-end flows across the banner, the settings panel and the store.
    use super::*;
    use crate::consent::notify::SilentNotifier;
    use std::sync::Arc;

    #[test]
    fn banner_decision_is_visible_to_settings_panel_and_next_launch() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = Arc::new(ConsentStateManager::new(ConsentStore::new(Box::new(
            backend.clone(),
        ))));

        let mut banner = ConsentBanner::default();
        let ticket = banner.mount(&manager).unwrap();
        banner.reveal(&ticket);
        banner
            .handle(BannerAction::Customize, &manager, &SilentNotifier)
            .unwrap();
        banner
            .handle(
                BannerAction::Toggle {
                    category: ConsentCategory::Functional,
                },
                &manager,
                &SilentNotifier,
            )
            .unwrap();
        banner
            .handle(BannerAction::SavePreferences, &manager, &SilentNotifier)
            .unwrap();

        let panel = ConsentSettingsPanel::mount(&manager);
        assert_eq!(panel.draft(), ConsentPreferences::necessary_only());

        // A new process over the same storage area.
        let relaunched = ConsentStateManager::new(ConsentStore::new(Box::new(backend)));
        let mut next = ConsentBanner::default();
        assert!(next.mount(&relaunched).is_none());
        assert_eq!(
            relaunched.get_state().preferences,
            ConsentPreferences::necessary_only()
        );
    }
}
