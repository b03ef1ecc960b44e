use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use super::tab::{TabId, WindowId};

/// How recent an activation must be, relative to the popup closing, to count
/// as the user picking a result tab.
pub const ACTIVATION_AUTHORITY_WINDOW: Duration = Duration::from_millis(200);

/// Lifecycle of one popup-open-to-close cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Searching,
    Closing,
}

/// Per-session bookkeeping owned by the session controller.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Tabs this engine hid and has not shown again.
    pub hidden_by_us: BTreeSet<TabId>,
    /// Matches of the most recent classification pass.
    pub last_matched: Vec<TabId>,
    /// Correlates log lines of one session.
    pub session_id: Option<Uuid>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            hidden_by_us: BTreeSet::new(),
            last_matched: Vec::new(),
            session_id: None,
        }
    }

    pub fn search_in_progress(&self) -> bool {
        self.phase == SessionPhase::Searching
    }

    /// Enter `Searching`, allocating a session id on the first transition.
    pub fn begin_search(&mut self) -> Uuid {
        self.phase = SessionPhase::Searching;
        *self.session_id.get_or_insert_with(Uuid::new_v4)
    }

    /// Record the outcome of a hide/show pass.
    ///
    /// Hidden ids accumulate across passes of one session; a tab shown again
    /// leaves the set.
    pub fn record_pass(&mut self, hidden: &BTreeSet<TabId>, shown: &BTreeSet<TabId>) {
        self.hidden_by_us.extend(hidden.iter().copied());
        self.hidden_by_us.retain(|id| !shown.contains(id));
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// The most recent tab activation reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentActivation {
    pub tab_id: TabId,
    pub window_id: WindowId,
    pub at: Instant,
}

impl RecentActivation {
    pub fn now(tab_id: TabId, window_id: WindowId) -> Self {
        Self {
            tab_id,
            window_id,
            at: Instant::now(),
        }
    }

    /// Whether this activation happened close enough to `reference` to be
    /// treated as the user's explicit choice.
    pub fn is_authoritative_at(&self, reference: Instant) -> bool {
        let gap = if reference >= self.at {
            reference - self.at
        } else {
            self.at - reference
        };
        gap <= ACTIVATION_AUTHORITY_WINDOW
    }
}
