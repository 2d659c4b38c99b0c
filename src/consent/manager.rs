//! Read/update façade over [`ConsentStore`] shared by every UI surface.

use super::audit::{AuditAction, AuditEvent, AuditSink, TracingAuditSink};
use super::store::ConsentStore;
use super::types::{ChangeKind, ConsentChange, ConsentPreferences, ConsentState, SaveReport};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ConsentListener = Arc<dyn Fn(&ConsentChange) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

pub struct ConsentStateManager {
    store: ConsentStore,
    defaults: ConsentPreferences,
    /// Decision that failed to persist; served until the next successful write.
    unpersisted: Mutex<Option<ConsentPreferences>>,
    listeners: Mutex<Vec<(SubscriptionId, ConsentListener)>>,
    audit_sink: Mutex<Box<dyn AuditSink>>,
}

impl ConsentStateManager {
    pub fn new(store: ConsentStore) -> Self {
        Self {
            store,
            defaults: ConsentPreferences::policy_default(),
            unpersisted: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            audit_sink: Mutex::new(Box::new(TracingAuditSink)),
        }
    }

    /// Preferences shown before the user has ever decided.
    pub fn with_defaults(mut self, defaults: ConsentPreferences) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_audit_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit_sink = Mutex::new(sink);
        self
    }

    pub fn get_state(&self) -> ConsentState {
        if let Some(preferences) = self.pending() {
            return ConsentState {
                preferences,
                has_consented: true,
            };
        }

        let stored = self.store.load();
        match (stored.has_consented, stored.preferences) {
            (true, Some(preferences)) => ConsentState {
                preferences,
                has_consented: true,
            },
            _ => ConsentState {
                preferences: self.defaults,
                has_consented: false,
            },
        }
    }

    pub fn has_consented(&self) -> bool {
        self.get_state().has_consented
    }

    pub fn update_preferences(&self, preferences: ConsentPreferences) -> SaveReport {
        self.commit(preferences, AuditAction::Update)
    }

    pub fn accept_all(&self) -> SaveReport {
        self.commit(ConsentPreferences::all(), AuditAction::AcceptAll)
    }

    pub fn accept_necessary_only(&self) -> SaveReport {
        self.commit(ConsentPreferences::necessary_only(), AuditAction::NecessaryOnly)
    }

    /// Withdraws the decision. Used by account deletion and reset flows.
    pub fn clear_consent(&self) -> SaveReport {
        let persisted = match self.store.clear() {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to clear stored consent: {}", e);
                false
            }
        };
        self.set_pending(None);
        info!("Consent cleared (persisted: {})", persisted);

        self.audit(AuditEvent::cleared(persisted));
        let state = self.get_state();
        self.publish(ChangeKind::Cleared, state, persisted);
        SaveReport { state, persisted }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ConsentChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.listeners.lock() {
            Ok(mut listeners) => {
                let before = listeners.len();
                listeners.retain(|(existing, _)| *existing != id);
                listeners.len() != before
            }
            Err(_) => false,
        }
    }

    fn commit(&self, preferences: ConsentPreferences, action: AuditAction) -> SaveReport {
        let persisted = match self.store.save(&preferences) {
            Ok(()) => {
                self.set_pending(None);
                true
            }
            Err(e) => {
                warn!(
                    "Consent {} not persisted, keeping it for this session: {}",
                    action.as_str(),
                    e
                );
                self.set_pending(Some(preferences));
                false
            }
        };
        info!(
            "Consent saved via {}: functional={} analytics={} marketing={} (persisted: {})",
            action.as_str(),
            preferences.functional,
            preferences.analytics,
            preferences.marketing,
            persisted
        );

        self.audit(AuditEvent::saved(action, preferences, persisted));
        let state = ConsentState {
            preferences,
            has_consented: true,
        };
        self.publish(ChangeKind::Saved, state, persisted);
        SaveReport { state, persisted }
    }

    fn pending(&self) -> Option<ConsentPreferences> {
        self.unpersisted.lock().ok().and_then(|pending| *pending)
    }

    fn set_pending(&self, preferences: Option<ConsentPreferences>) {
        if let Ok(mut pending) = self.unpersisted.lock() {
            *pending = preferences;
        }
    }

    fn audit(&self, event: AuditEvent) {
        if let Ok(mut sink) = self.audit_sink.lock() {
            if let Err(e) = sink.log(event) {
                debug!("Failed to write consent audit event: {}", e);
            }
        }
    }

    fn publish(&self, kind: ChangeKind, state: ConsentState, persisted: bool) {
        // Listeners are called without holding the lock so they may read back.
        let listeners: Vec<ConsentListener> = match self.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(_, l)| l.clone()).collect(),
            Err(_) => return,
        };
        let change = ConsentChange {
            kind,
            state,
            persisted,
            at: Utc::now(),
        };
        for listener in listeners {
            listener(&change);
        }
    }
}
