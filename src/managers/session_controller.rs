//! Session lifecycle: popup open → search → popup close.
//!
//! One controller instance owns all per-session state and handles one event
//! at a time to completion. It never assumes it owns the tab collection:
//! every step starts from a fresh host query.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::managers::tree_coordinator::TreeViewCoordinator;
use crate::managers::visibility_reconciler::VisibilityReconciler;
use crate::services::badge::BadgeSink;
use crate::services::match_evaluator::MatchEvaluator;
use crate::services::option_store::{load_search_options, OptionStore};
use crate::services::progress_reporter::ProgressReporter;
use crate::services::tab_host::TabHost;
use crate::services::tree_view::TreeViewBridge;
use crate::types::events::{
    AudibleOutcome, CloseOutcome, EventOutcome, InboundEvent, SearchOutcome,
};
use crate::types::search::{Classification, SearchCriteria, SearchPlan};
use crate::types::session::{RecentActivation, SessionPhase, SessionState};
use crate::types::tab::{TabId, TabRecord, WindowId};

/// Delay between hiding and re-showing the last tab at startup.
pub const STARTUP_NUDGE_DELAY: Duration = Duration::from_millis(500);

/// Drives the match evaluator, reconciler and tree coordinator through a
/// search session.
pub struct SessionController<H, T, O, B> {
    host: Arc<H>,
    options: Arc<O>,
    evaluator: MatchEvaluator<H>,
    reconciler: VisibilityReconciler<H, B>,
    tree: TreeViewCoordinator<T>,
    session: SessionState,
    last_activation: Option<RecentActivation>,
}

impl<H, T, O, B> SessionController<H, T, O, B>
where
    H: TabHost,
    T: TreeViewBridge,
    O: OptionStore,
    B: BadgeSink,
{
    pub fn new(host: Arc<H>, tree_bridge: Arc<T>, options: Arc<O>, badge: Arc<B>) -> Self {
        Self {
            evaluator: MatchEvaluator::new(Arc::clone(&host)),
            reconciler: VisibilityReconciler::new(Arc::clone(&host), ProgressReporter::new(badge)),
            tree: TreeViewCoordinator::new(tree_bridge),
            host,
            options,
            session: SessionState::new(),
            last_activation: None,
        }
    }

    /// Poll convergence every `period` instead of the default.
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        let badge = Arc::clone(self.reconciler.progress().badge());
        self.reconciler = VisibilityReconciler::new(
            Arc::clone(&self.host),
            ProgressReporter::with_period(badge, period),
        );
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    pub fn tree(&self) -> &TreeViewCoordinator<T> {
        &self.tree
    }

    pub fn progress(&self) -> &ProgressReporter<B> {
        self.reconciler.progress()
    }

    pub fn last_activation(&self) -> Option<RecentActivation> {
        self.last_activation
    }

    /// Handle one inbound event to completion.
    pub async fn handle(&mut self, event: InboundEvent) -> EventOutcome {
        match event {
            InboundEvent::SearchTabs { .. } => match event.criteria() {
                Some(criteria) => self.search(&criteria).await,
                None => EventOutcome::Ignored,
            },
            InboundEvent::PopupClosed { window_id } => {
                EventOutcome::Closed(self.popup_closed(window_id).await)
            }
            InboundEvent::ClearMatchedTabs => {
                self.clear_matched_tabs();
                EventOutcome::Done
            }
            InboundEvent::TabActivated { tab_id, window_id } => {
                self.tab_activated(tab_id, window_id).await
            }
            InboundEvent::OptionsChanged => {
                self.options_changed().await;
                EventOutcome::Done
            }
            InboundEvent::SearchAudible => EventOutcome::Audible(self.search_audible().await),
        }
    }

    /// One reconciliation pass for `criteria`.
    ///
    /// A request with no enabled criterion is ignored.
    pub async fn search(&mut self, criteria: &SearchCriteria) -> EventOutcome {
        if !criteria.any_enabled() {
            log::debug!("search request with no enabled criteria ignored");
            return EventOutcome::Ignored;
        }

        let options = load_search_options(self.options.as_ref()).await;
        // Without a tab list nothing can change, so the phase stays as it was.
        let Some(mut tabs) = self.query_tabs().await else {
            return EventOutcome::Search(SearchOutcome::default());
        };

        let session_id = self.session.begin_search();
        log::info!(
            "[{}] search {:?} (title={}, url={}, content={})",
            session_id,
            criteria.term(),
            criteria.match_title,
            criteria.match_url,
            criteria.match_content
        );

        if options.tst_support && !criteria.shows_everything() {
            self.tree.prepare(&tabs).await;
            if let Some(fresh) = self.query_tabs().await {
                tabs = fresh;
            }
        }

        let outcome = match self.evaluator.evaluate(&tabs, criteria).await {
            SearchPlan::ShowAll => {
                // Nothing stays hidden, so the search is over until the next keystroke.
                self.session.phase = SessionPhase::Idle;
                let shown = self.reconciler.show_all_hidden().await;
                self.session.hidden_by_us.clear();
                SearchOutcome {
                    matched: 0,
                    hidden: 0,
                    shown,
                    show_all: true,
                }
            }
            SearchPlan::Classified(classification) => {
                self.session.last_matched = classification.matched.clone();
                let pass = self
                    .reconciler
                    .reconcile(&classification, &mut self.session)
                    .await;
                if classification.is_noop() {
                    // Nothing left to apply: the search has settled.
                    self.session.phase = SessionPhase::Idle;
                }
                SearchOutcome {
                    matched: classification.matched.len(),
                    hidden: pass.hidden,
                    shown: pass.shown,
                    show_all: false,
                }
            }
        };

        log::info!(
            "[{}] {} matched, {} hidden, {} shown",
            session_id,
            outcome.matched,
            outcome.hidden,
            outcome.shown
        );
        EventOutcome::Search(outcome)
    }

    /// Session end: unhide everything, restore the tree, select matches, and
    /// reset to idle.
    pub async fn popup_closed(&mut self, window_id: Option<WindowId>) -> CloseOutcome {
        let closed_at = Instant::now();
        let session_label = self
            .session
            .session_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        log::info!("[{}] popup closed (window {:?})", session_label, window_id);

        self.session.phase = SessionPhase::Closing;
        let options = load_search_options(self.options.as_ref()).await;

        let shown = self.reconciler.end_session(&mut self.session).await;

        if options.tst_support {
            let tabs = self.query_tabs().await.unwrap_or_default();
            self.tree.restore(&tabs, self.last_activation, closed_at).await;
            if options.tree_auto_expand() {
                let matched = self.session.last_matched.clone();
                self.tree.auto_expand(&tabs, &matched).await;
            }
        } else {
            self.tree.reset();
        }

        let selected = if options.select_matching_tabs {
            self.select_matching_tabs().await
        } else {
            Vec::new()
        };

        self.session.reset();
        log::info!("[{}] session ended, {} tabs shown", session_label, shown);
        CloseOutcome { shown, selected }
    }

    /// Forget the last matches without touching visibility.
    pub fn clear_matched_tabs(&mut self) {
        self.session.last_matched.clear();
    }

    /// Record the activation and, outside a search, unhide anything this
    /// engine left hidden.
    pub async fn tab_activated(&mut self, tab_id: TabId, window_id: WindowId) -> EventOutcome {
        self.last_activation = Some(RecentActivation::now(tab_id, window_id));

        if self.session.search_in_progress() || self.session.hidden_by_us.is_empty() {
            return EventOutcome::Done;
        }

        log::info!(
            "tab {} activated with {} tabs still hidden outside a search, unhiding",
            tab_id,
            self.session.hidden_by_us.len()
        );
        let shown = self.reconciler.show_all_hidden().await;
        self.session.hidden_by_us.clear();
        EventOutcome::Recovered { shown }
    }

    /// Any option toggle drops the current matches and the multi-selection
    /// in the current window.
    pub async fn options_changed(&mut self) {
        self.session.last_matched.clear();

        let window_id = match self.host.current_window().await {
            Ok(window_id) => window_id,
            Err(e) => {
                log::warn!("cannot resolve current window to clear selection: {}", e);
                return;
            }
        };
        let tabs = match self.host.query_window(window_id).await {
            Ok(tabs) => tabs,
            Err(e) => {
                log::warn!("querying window {} failed: {}", window_id, e);
                return;
            }
        };
        if let Some(active) = tabs.iter().find(|t| t.active) {
            if let Err(e) = self.host.highlight(window_id, &[active.index]).await {
                log::warn!("resetting selection in window {} failed: {}", window_id, e);
            }
        }
    }

    /// Narrow the current window to tabs playing audio.
    pub async fn search_audible(&mut self) -> AudibleOutcome {
        let Some(tabs) = self.query_tabs().await else {
            return AudibleOutcome::NoAudibleTabs;
        };
        let audible: Vec<&TabRecord> = tabs.iter().filter(|t| t.audible).collect();

        match audible.as_slice() {
            [] => AudibleOutcome::NoAudibleTabs,
            [only] => {
                if let Err(e) = self.host.activate(only.id).await {
                    log::warn!("activating audible tab {} failed: {}", only.id, e);
                }
                AudibleOutcome::Activated { tab_id: only.id }
            }
            _ => {
                let window_id = match self.host.current_window().await {
                    Ok(window_id) => window_id,
                    Err(e) => {
                        log::warn!("cannot resolve current window, using the first audible tab's: {}", e);
                        audible[0].window_id
                    }
                };
                let classification = Classification {
                    matched: audible.iter().map(|t| t.id).collect(),
                    to_hide: tabs
                        .iter()
                        .filter(|t| t.window_id == window_id)
                        .filter(|t| !t.audible && !t.is_hide_exempt() && !t.hidden)
                        .map(|t| t.id)
                        .collect(),
                    to_show: Default::default(),
                };
                if classification.is_noop() {
                    log::debug!("every tab in window {} is audible or exempt", window_id);
                    return AudibleOutcome::Filtered { hidden: 0 };
                }
                self.session.begin_search();
                let pass = self
                    .reconciler
                    .reconcile(&classification, &mut self.session)
                    .await;
                AudibleOutcome::Filtered { hidden: pass.hidden }
            }
        }
    }

    /// Hide the last tab of the current window and show it again shortly
    /// after, unless disabled in the options.
    ///
    /// Returns the handle of the delayed show so callers may wait for it.
    pub async fn startup(&self) -> Option<JoinHandle<()>> {
        let options = load_search_options(self.options.as_ref()).await;
        if options.disable_empty_tab {
            return None;
        }

        let window_id = match self.host.current_window().await {
            Ok(window_id) => window_id,
            Err(e) => {
                log::warn!("startup nudge skipped: {}", e);
                return None;
            }
        };
        let last = match self.host.query_window(window_id).await {
            Ok(tabs) => tabs.last().map(|t| t.id)?,
            Err(e) => {
                log::warn!("startup nudge skipped: {}", e);
                return None;
            }
        };

        if let Err(e) = self.host.hide(&[last]).await {
            log::warn!("startup nudge could not hide tab {}: {}", last, e);
            return None;
        }

        let host = Arc::clone(&self.host);
        Some(tokio::spawn(async move {
            tokio::time::sleep(STARTUP_NUDGE_DELAY).await;
            if let Err(e) = host.show(&[last]).await {
                log::warn!("startup nudge could not show tab {} again: {}", last, e);
            }
        }))
    }

    /// Drop all session state and stop the progress loop.
    pub fn reset(&mut self) {
        self.session.reset();
        self.tree.reset();
        self.last_activation = None;
        self.reconciler.progress_mut().cancel();
    }

    /// Activate the first match (unless one already is active) and select
    /// every match in that tab's window.
    async fn select_matching_tabs(&mut self) -> Vec<TabId> {
        if self.session.last_matched.is_empty() {
            return Vec::new();
        }
        let Some(tabs) = self.query_tabs().await else {
            return Vec::new();
        };

        let matched: Vec<&TabRecord> = tabs
            .iter()
            .filter(|t| self.session.last_matched.contains(&t.id))
            .collect();
        // Only the current window's active tab counts as already chosen.
        let current_window = self.host.current_window().await.ok();
        let Some(anchor) = matched
            .iter()
            .find(|t| t.active && current_window.map_or(true, |w| t.window_id == w))
            .or_else(|| matched.first())
            .copied()
        else {
            return Vec::new();
        };

        if !anchor.active {
            if let Err(e) = self.host.activate(anchor.id).await {
                log::warn!("activating matched tab {} failed: {}", anchor.id, e);
            }
        }

        let in_window: Vec<&TabRecord> = matched
            .iter()
            .filter(|t| t.window_id == anchor.window_id)
            .copied()
            .collect();
        if in_window.len() > 1 {
            // The anchor goes first so it stays the active tab.
            let mut indices = vec![anchor.index];
            indices.extend(in_window.iter().filter(|t| t.id != anchor.id).map(|t| t.index));
            if let Err(e) = self.host.highlight(anchor.window_id, &indices).await {
                log::warn!("selecting {} matched tabs failed: {}", in_window.len(), e);
            }
        }

        in_window.iter().map(|t| t.id).collect()
    }

    async fn query_tabs(&self) -> Option<Vec<TabRecord>> {
        match self.host.query_all().await {
            Ok(tabs) => Some(tabs),
            Err(e) => {
                log::warn!("querying tabs failed: {}", e);
                None
            }
        }
    }
}
