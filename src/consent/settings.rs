use super::manager::ConsentStateManager;
use super::notify::{Notifier, NotifyKind};
use super::types::{ConsentCategory, ConsentPreferences, SaveReport};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettingsAction {
    Toggle { category: ConsentCategory },
    Save,
    AcceptAll,
    RejectOptional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub draft: ConsentPreferences,
    pub has_consented: bool,
    pub dirty: bool,
}

/// Cookie settings section of the policy page. Always available; every
/// commit goes straight to the manager.
#[derive(Debug, Clone)]
pub struct ConsentSettingsPanel {
    draft: ConsentPreferences,
    committed: ConsentPreferences,
    has_consented: bool,
}

impl ConsentSettingsPanel {
    pub fn mount(manager: &ConsentStateManager) -> Self {
        let state = manager.get_state();
        Self {
            draft: state.preferences,
            committed: state.preferences,
            has_consented: state.has_consented,
        }
    }

    /// Re-reads the manager, dropping unsaved edits.
    pub fn refresh(&mut self, manager: &ConsentStateManager) {
        *self = Self::mount(manager);
    }

    /// Refreshes only when there are no unsaved edits. Returns whether the
    /// panel was refreshed.
    pub fn refresh_if_clean(&mut self, manager: &ConsentStateManager) -> bool {
        if self.view().dirty {
            return false;
        }
        self.refresh(manager);
        true
    }

    pub fn draft(&self) -> ConsentPreferences {
        self.draft
    }

    pub fn view(&self) -> SettingsView {
        SettingsView {
            draft: self.draft,
            has_consented: self.has_consented,
            dirty: self.draft != self.committed,
        }
    }

    pub fn toggle(&mut self, category: ConsentCategory) -> bool {
        self.draft.toggle(category)
    }

    pub fn save(&mut self, manager: &ConsentStateManager, notifier: &dyn Notifier) -> SaveReport {
        let report = manager.update_preferences(self.draft);
        self.apply(report, notifier, "Your cookie preferences have been saved.")
    }

    pub fn accept_all(
        &mut self,
        manager: &ConsentStateManager,
        notifier: &dyn Notifier,
    ) -> SaveReport {
        let report = manager.accept_all();
        self.apply(report, notifier, "All cookies have been accepted.")
    }

    pub fn reject_optional(
        &mut self,
        manager: &ConsentStateManager,
        notifier: &dyn Notifier,
    ) -> SaveReport {
        let report = manager.accept_necessary_only();
        self.apply(report, notifier, "Optional cookies have been rejected.")
    }

    pub fn handle(
        &mut self,
        action: SettingsAction,
        manager: &ConsentStateManager,
        notifier: &dyn Notifier,
    ) -> SettingsView {
        match action {
            SettingsAction::Toggle { category } => {
                if !self.toggle(category) {
                    debug!("Ignoring toggle of {}", category.as_str());
                }
            }
            SettingsAction::Save => {
                self.save(manager, notifier);
            }
            SettingsAction::AcceptAll => {
                self.accept_all(manager, notifier);
            }
            SettingsAction::RejectOptional => {
                self.reject_optional(manager, notifier);
            }
        }
        self.view()
    }

    fn apply(&mut self, report: SaveReport, notifier: &dyn Notifier, success: &str) -> SaveReport {
        self.draft = report.state.preferences;
        self.committed = report.state.preferences;
        self.has_consented = report.state.has_consented;
        if report.persisted {
            notifier.notify(NotifyKind::Success, success);
        } else {
            notifier.notify(
                NotifyKind::Error,
                "Failed to save cookie preferences. They apply until you close the app.",
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::notify::RecordingNotifier;
    use crate::consent::store::{ConsentStore, MemoryBackend, UnavailableBackend};
    use crate::consent::types::StoredConsent;
    use std::sync::Arc;

    fn setup() -> (ConsentStateManager, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let manager = ConsentStateManager::new(ConsentStore::new(Box::new(backend.clone())));
        (manager, backend)
    }

    fn stored(backend: &Arc<MemoryBackend>) -> StoredConsent {
        ConsentStore::new(Box::new(backend.clone())).load()
    }

    #[test]
    fn undecided_user_sees_policy_default() {
        let (manager, _) = setup();
        let panel = ConsentSettingsPanel::mount(&manager);
        assert_eq!(panel.draft(), ConsentPreferences::policy_default());
        assert!(!panel.view().has_consented);
        assert!(!panel.view().dirty);
    }

    #[test]
    fn reject_optional_keeps_only_necessary() {
        let (manager, backend) = setup();
        manager.update_preferences(ConsentPreferences::new(false, true, true));
        let notifier = RecordingNotifier::new();

        let mut panel = ConsentSettingsPanel::mount(&manager);
        assert_eq!(panel.draft(), ConsentPreferences::new(false, true, true));

        let report = panel.reject_optional(&manager, &notifier);
        assert!(report.persisted);
        assert_eq!(
            stored(&backend),
            StoredConsent::decided(ConsentPreferences::necessary_only())
        );
        assert_eq!(panel.draft(), ConsentPreferences::necessary_only());
        assert_eq!(
            notifier.sent(),
            vec![(
                NotifyKind::Success,
                "Optional cookies have been rejected.".to_string()
            )]
        );
    }

    #[test]
    fn toggles_stay_in_draft_until_saved() {
        let (manager, backend) = setup();
        let notifier = RecordingNotifier::new();
        let mut panel = ConsentSettingsPanel::mount(&manager);

        let view = panel.handle(
            SettingsAction::Toggle {
                category: ConsentCategory::Marketing,
            },
            &manager,
            &notifier,
        );
        assert!(view.dirty);
        assert_eq!(stored(&backend), StoredConsent::undecided());
        assert!(notifier.sent().is_empty());

        let view = panel.handle(SettingsAction::Save, &manager, &notifier);
        assert!(!view.dirty);
        assert!(view.has_consented);
        assert_eq!(
            stored(&backend),
            StoredConsent::decided(ConsentPreferences::new(true, false, true))
        );
    }

    #[test]
    fn necessary_toggle_is_ignored() {
        let (manager, _) = setup();
        let notifier = RecordingNotifier::new();
        let mut panel = ConsentSettingsPanel::mount(&manager);
        let view = panel.handle(
            SettingsAction::Toggle {
                category: ConsentCategory::Necessary,
            },
            &manager,
            &notifier,
        );
        assert!(!view.dirty);
        assert!(view.draft.necessary());
    }

    #[test]
    fn accept_all_commits_immediately() {
        let (manager, backend) = setup();
        let notifier = RecordingNotifier::new();
        let mut panel = ConsentSettingsPanel::mount(&manager);
        panel.handle(SettingsAction::AcceptAll, &manager, &notifier);
        assert_eq!(stored(&backend), StoredConsent::decided(ConsentPreferences::all()));
        assert_eq!(notifier.sent()[0].0, NotifyKind::Success);
    }

    #[test]
    fn storage_failure_reports_error_toast() {
        let (manager, backend) = setup();
        manager.accept_necessary_only();
        backend.set_read_only(true);

        let notifier = RecordingNotifier::new();
        let mut panel = ConsentSettingsPanel::mount(&manager);
        let report = panel.accept_all(&manager, &notifier);

        assert!(!report.persisted);
        assert_eq!(panel.draft(), ConsentPreferences::all());
        assert_eq!(notifier.sent()[0].0, NotifyKind::Error);

        backend.set_read_only(false);
        assert_eq!(
            stored(&backend),
            StoredConsent::decided(ConsentPreferences::necessary_only())
        );
    }

    #[test]
    fn refresh_picks_up_writes_from_other_surfaces() {
        let (manager, _) = setup();
        let mut panel = ConsentSettingsPanel::mount(&manager);
        panel.toggle(ConsentCategory::Analytics);

        manager.accept_necessary_only();
        panel.refresh(&manager);
        assert_eq!(panel.draft(), ConsentPreferences::necessary_only());
        assert!(panel.view().has_consented);
        assert!(!panel.view().dirty);
    }

    #[test]
    fn clean_panel_follows_other_surfaces() {
        let (manager, _) = setup();
        let mut panel = ConsentSettingsPanel::mount(&manager);

        manager.accept_all();
        assert!(panel.refresh_if_clean(&manager));
        assert_eq!(panel.draft(), ConsentPreferences::all());
        assert!(panel.view().has_consented);
    }

    #[test]
    fn dirty_panel_keeps_its_draft() {
        let (manager, _) = setup();
        let mut panel = ConsentSettingsPanel::mount(&manager);
        panel.toggle(ConsentCategory::Marketing);

        manager.accept_necessary_only();
        assert!(!panel.refresh_if_clean(&manager));
        assert_eq!(panel.draft(), ConsentPreferences::new(true, false, true));
        assert!(!panel.view().has_consented);
        assert!(panel.view().dirty);
    }

    #[test]
    fn unavailable_storage_never_claims_success() {
        let unavailable = || {
            ConsentStateManager::new(ConsentStore::new(Box::new(UnavailableBackend::new(
                "store file could not be opened",
            ))))
        };
        let manager = unavailable();
        let notifier = RecordingNotifier::new();
        let mut panel = ConsentSettingsPanel::mount(&manager);

        let report = panel.accept_all(&manager, &notifier);
        assert!(!report.persisted);
        assert!(manager.has_consented());
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].0, NotifyKind::Error);

        let relaunched = unavailable();
        assert!(!relaunched.has_consented());
    }
}
