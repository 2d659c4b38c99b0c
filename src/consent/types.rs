use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the four consent categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentCategory {
    Necessary,
    Functional,
    Analytics,
    Marketing,
}

impl ConsentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentCategory::Necessary => "necessary",
            ConsentCategory::Functional => "functional",
            ConsentCategory::Analytics => "analytics",
            ConsentCategory::Marketing => "marketing",
        }
    }
}

/// Wire shape of the preference record.
///
/// `necessary` is accepted for compatibility with whatever the webview or an
/// older store file sends, but its value is discarded on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesRecord {
    #[serde(default)]
    necessary: Option<bool>,
    functional: bool,
    analytics: bool,
    marketing: bool,
}

/// Category grants. The necessary category is implied and has no storage, so
/// no value of this type can ever carry `necessary = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PreferencesRecord", into = "PreferencesRecord")]
pub struct ConsentPreferences {
    pub functional: bool,
    pub analytics: bool,
    pub marketing: bool,
}

impl From<PreferencesRecord> for ConsentPreferences {
    fn from(record: PreferencesRecord) -> Self {
        Self {
            functional: record.functional,
            analytics: record.analytics,
            marketing: record.marketing,
        }
    }
}

impl From<ConsentPreferences> for PreferencesRecord {
    fn from(prefs: ConsentPreferences) -> Self {
        Self {
            necessary: Some(true),
            functional: prefs.functional,
            analytics: prefs.analytics,
            marketing: prefs.marketing,
        }
    }
}

impl ConsentPreferences {
    pub const fn new(functional: bool, analytics: bool, marketing: bool) -> Self {
        Self {
            functional,
            analytics,
            marketing,
        }
    }

    /// Every category granted.
    pub const fn all() -> Self {
        Self::new(true, true, true)
    }

    /// Only the necessary category.
    pub const fn necessary_only() -> Self {
        Self::new(false, false, false)
    }

    /// What a user sees pre-selected before ever deciding.
    pub const fn policy_default() -> Self {
        Self::new(true, false, false)
    }

    pub const fn necessary(&self) -> bool {
        true
    }

    pub fn get(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => true,
            ConsentCategory::Functional => self.functional,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Marketing => self.marketing,
        }
    }

    /// Returns false when the category cannot be changed.
    pub fn set(&mut self, category: ConsentCategory, granted: bool) -> bool {
        match category {
            ConsentCategory::Necessary => return false,
            ConsentCategory::Functional => self.functional = granted,
            ConsentCategory::Analytics => self.analytics = granted,
            ConsentCategory::Marketing => self.marketing = granted,
        }
        true
    }

    pub fn toggle(&mut self, category: ConsentCategory) -> bool {
        let current = self.get(category);
        self.set(category, !current)
    }
}

impl Default for ConsentPreferences {
    fn default() -> Self {
        Self::policy_default()
    }
}

/// Raw result of reading the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredConsent {
    pub has_consented: bool,
    pub preferences: Option<ConsentPreferences>,
}

impl StoredConsent {
    pub fn undecided() -> Self {
        Self {
            has_consented: false,
            preferences: None,
        }
    }

    pub fn decided(preferences: ConsentPreferences) -> Self {
        Self {
            has_consented: true,
            preferences: Some(preferences),
        }
    }
}

/// The consent state every UI surface renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentState {
    pub preferences: ConsentPreferences,
    pub has_consented: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Saved,
    Cleared,
}

/// Published to subscribers after every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentChange {
    pub kind: ChangeKind,
    pub state: ConsentState,
    pub persisted: bool,
    pub at: DateTime<Utc>,
}

/// Outcome of a write through the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub state: ConsentState,
    pub persisted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_necessary_true() {
        let value = serde_json::to_value(ConsentPreferences::necessary_only()).unwrap();
        assert_eq!(
            value,
            json!({"necessary": true, "functional": false, "analytics": false, "marketing": false})
        );
    }

    #[test]
    fn necessary_false_on_input_is_ignored() {
        let prefs: ConsentPreferences = serde_json::from_value(json!({
            "necessary": false,
            "functional": true,
            "analytics": false,
            "marketing": true
        }))
        .unwrap();
        assert!(prefs.necessary());
        assert_eq!(prefs, ConsentPreferences::new(true, false, true));
        let back = serde_json::to_value(prefs).unwrap();
        assert_eq!(back["necessary"], json!(true));
    }

    #[test]
    fn missing_necessary_is_accepted_but_missing_category_is_not() {
        let ok: Result<ConsentPreferences, _> = serde_json::from_value(json!({
            "functional": false, "analytics": true, "marketing": false
        }));
        assert!(ok.is_ok());

        let missing: Result<ConsentPreferences, _> = serde_json::from_value(json!({
            "necessary": true, "functional": false, "analytics": true
        }));
        assert!(missing.is_err());
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let prefs: ConsentPreferences = serde_json::from_value(json!({
            "necessary": true,
            "functional": false,
            "analytics": false,
            "marketing": false,
            "advertising": true
        }))
        .unwrap();
        let back = serde_json::to_value(prefs).unwrap();
        assert!(back.get("advertising").is_none());
    }

    #[test]
    fn necessary_cannot_be_toggled() {
        let mut prefs = ConsentPreferences::policy_default();
        assert!(!prefs.toggle(ConsentCategory::Necessary));
        assert!(!prefs.set(ConsentCategory::Necessary, false));
        assert!(prefs.get(ConsentCategory::Necessary));

        assert!(prefs.toggle(ConsentCategory::Analytics));
        assert_eq!(prefs, ConsentPreferences::new(true, true, false));
    }

    #[test]
    fn state_uses_camel_case() {
        let state = ConsentState {
            preferences: ConsentPreferences::all(),
            has_consented: true,
        };
        let value = serde_json::to_value(state).unwrap();
        assert_eq!(value["hasConsented"], json!(true));
        assert_eq!(value["preferences"]["marketing"], json!(true));
    }
}
