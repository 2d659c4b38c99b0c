//! First-run consent prompt.
//!
//! The banner stays `Hidden` for a short display delay after mounting so it
//! does not flash during the first paint, then prompts until the user picks
//! an option or closes it. Closing records nothing, so an undecided user is
//! prompted again on the next launch.

use super::manager::ConsentStateManager;
use super::notify::{Notifier, NotifyKind};
use super::types::{ConsentCategory, ConsentPreferences, SaveReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_DISPLAY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum BannerState {
    Hidden,
    Prompting,
    Customizing { draft: ConsentPreferences },
    Dismissed,
}

impl BannerState {
    pub fn name(&self) -> &'static str {
        match self {
            BannerState::Hidden => "hidden",
            BannerState::Prompting => "prompting",
            BannerState::Customizing { .. } => "customizing",
            BannerState::Dismissed => "dismissed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BannerAction {
    AcceptAll,
    NecessaryOnly,
    Customize,
    Toggle { category: ConsentCategory },
    SavePreferences,
    Back,
    Close,
}

impl BannerAction {
    pub fn name(&self) -> &'static str {
        match self {
            BannerAction::AcceptAll => "accept_all",
            BannerAction::NecessaryOnly => "necessary_only",
            BannerAction::Customize => "customize",
            BannerAction::Toggle { .. } => "toggle",
            BannerAction::SavePreferences => "save_preferences",
            BannerAction::Back => "back",
            BannerAction::Close => "close",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BannerError {
    #[error("cannot {action} while the banner is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}

/// Returned by [`ConsentBanner::mount`] when the banner should appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTicket {
    pub mount_id: Uuid,
    pub delay: Duration,
}

#[derive(Debug)]
pub struct ConsentBanner {
    state: BannerState,
    mount_id: Uuid,
    display_delay: Duration,
}

impl ConsentBanner {
    pub fn new(display_delay: Duration) -> Self {
        Self {
            state: BannerState::Hidden,
            mount_id: Uuid::new_v4(),
            display_delay,
        }
    }

    pub fn state(&self) -> BannerState {
        self.state
    }

    pub fn mount_id(&self) -> Uuid {
        self.mount_id
    }

    /// Starts a fresh mount. Decided users never see the banner; everyone else
    /// gets a ticket to redeem with [`ConsentBanner::reveal`] once the delay
    /// has passed.
    pub fn mount(&mut self, manager: &ConsentStateManager) -> Option<RevealTicket> {
        self.mount_id = Uuid::new_v4();
        if manager.has_consented() {
            debug!("Consent already recorded, banner suppressed");
            self.state = BannerState::Dismissed;
            return None;
        }
        self.state = BannerState::Hidden;
        Some(RevealTicket {
            mount_id: self.mount_id,
            delay: self.display_delay,
        })
    }

    /// Returns true if the banner moved to `Prompting`. Tickets from an
    /// earlier mount are ignored.
    pub fn reveal(&mut self, ticket: &RevealTicket) -> bool {
        if ticket.mount_id != self.mount_id || self.state != BannerState::Hidden {
            return false;
        }
        self.state = BannerState::Prompting;
        true
    }

    pub fn handle(
        &mut self,
        action: BannerAction,
        manager: &ConsentStateManager,
        notifier: &dyn Notifier,
    ) -> Result<BannerState, BannerError> {
        let next = match (self.state, action) {
            (BannerState::Prompting, BannerAction::AcceptAll) => {
                report_failure(manager.accept_all(), notifier);
                BannerState::Dismissed
            }
            (BannerState::Prompting, BannerAction::NecessaryOnly) => {
                report_failure(manager.accept_necessary_only(), notifier);
                BannerState::Dismissed
            }
            (BannerState::Prompting, BannerAction::Customize) => BannerState::Customizing {
                draft: manager.get_state().preferences,
            },
            (BannerState::Customizing { mut draft }, BannerAction::Toggle { category }) => {
                draft.toggle(category);
                BannerState::Customizing { draft }
            }
            (BannerState::Customizing { draft }, BannerAction::SavePreferences) => {
                report_failure(manager.update_preferences(draft), notifier);
                BannerState::Dismissed
            }
            (BannerState::Customizing { .. }, BannerAction::Back) => BannerState::Prompting,
            (BannerState::Prompting | BannerState::Customizing { .. }, BannerAction::Close) => {
                info!("Consent banner closed without a decision");
                BannerState::Dismissed
            }
            (state, action) => {
                return Err(BannerError::InvalidTransition {
                    state: state.name(),
                    action: action.name(),
                })
            }
        };
        debug!("Consent banner {} -> {}", self.state.name(), next.name());
        self.state = next;
        Ok(next)
    }
}

impl Default for ConsentBanner {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_DELAY)
    }
}

/// Banner shared between command handlers and its reveal timer.
pub type SharedBanner = Arc<tokio::sync::Mutex<ConsentBanner>>;

/// Sleeps for the ticket's delay, then reveals the banner. Returns the new
/// state, or `None` if the banner was remounted or acted on meanwhile.
pub async fn reveal_after_delay(
    banner: SharedBanner,
    ticket: RevealTicket,
) -> Option<BannerState> {
    tokio::time::sleep(ticket.delay).await;
    let mut banner = banner.lock().await;
    if banner.reveal(&ticket) {
        Some(banner.state())
    } else {
        None
    }
}

fn report_failure(report: SaveReport, notifier: &dyn Notifier) {
    if !report.persisted {
        notifier.notify(
            NotifyKind::Error,
            "Your cookie choice applies to this session but could not be saved.",
        );
    }
}
