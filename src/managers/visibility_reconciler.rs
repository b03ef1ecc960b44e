//! Applies hide/show decisions to the host.
//!
//! Each pass issues at most one hide batch and one show batch. The two
//! target sets are disjoint, so the batches run concurrently and either may
//! land first. A rejected batch is logged and does not stop the other one.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::services::badge::BadgeSink;
use crate::services::progress_reporter::ProgressReporter;
use crate::services::tab_host::TabHost;
use crate::types::errors::HostError;
use crate::types::search::Classification;
use crate::types::session::SessionState;
use crate::types::tab::TabId;

/// How many times session end re-queries and re-issues the unhide when a tab
/// vanished between query and show.
const SHOW_ALL_ATTEMPTS: usize = 2;

/// What one reconciliation pass actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassResult {
    pub hidden: usize,
    pub shown: usize,
}

/// Ids a pass is still waiting on.
struct PendingBatch {
    to_hide: BTreeSet<TabId>,
    to_show: BTreeSet<TabId>,
}

impl PendingBatch {
    /// Tabs that exist and have not reached their target state. Closed tabs
    /// no longer count. A failed query reports convergence so the counter
    /// never sticks.
    async fn remaining<H: TabHost>(&self, host: &H) -> usize {
        match host.query_all().await {
            Ok(tabs) => tabs
                .iter()
                .filter(|t| {
                    (self.to_hide.contains(&t.id) && !t.hidden)
                        || (self.to_show.contains(&t.id) && t.hidden)
                })
                .count(),
            Err(e) => {
                log::warn!("progress poll failed: {}", e);
                0
            }
        }
    }
}

async fn count_hidden<H: TabHost>(host: &H) -> usize {
    match host.query_all().await {
        Ok(tabs) => tabs.iter().filter(|t| t.hidden).count(),
        Err(e) => {
            log::warn!("progress poll failed: {}", e);
            0
        }
    }
}

async fn hide_batch<H: TabHost>(host: &H, ids: &[TabId]) -> bool {
    if ids.is_empty() {
        return true;
    }
    match host.hide(ids).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("hiding {} tabs failed: {}", ids.len(), e);
            false
        }
    }
}

async fn show_batch<H: TabHost>(host: &H, ids: &[TabId]) -> Result<(), HostError> {
    if ids.is_empty() {
        return Ok(());
    }
    host.show(ids).await
}

/// Computes nothing itself: it applies a [`Classification`] and keeps
/// [`SessionState::hidden_by_us`] in step with what the host accepted.
pub struct VisibilityReconciler<H, B> {
    host: Arc<H>,
    progress: ProgressReporter<B>,
}

impl<H: TabHost, B: BadgeSink> VisibilityReconciler<H, B> {
    pub fn new(host: Arc<H>, progress: ProgressReporter<B>) -> Self {
        Self { host, progress }
    }

    pub fn progress(&self) -> &ProgressReporter<B> {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressReporter<B> {
        &mut self.progress
    }

    /// Apply one classification pass.
    pub async fn reconcile(
        &mut self,
        classification: &Classification,
        session: &mut SessionState,
    ) -> PassResult {
        let total = classification.pending_operations();
        self.progress.publish(total);
        if total > 0 {
            self.track_batch(&classification.to_hide, &classification.to_show);
        } else {
            self.progress.cancel();
            return PassResult::default();
        }

        let hide_ids: Vec<TabId> = classification.to_hide.iter().copied().collect();
        let show_ids: Vec<TabId> = classification.to_show.iter().copied().collect();
        let host = self.host.as_ref();
        let (hidden_ok, show_result) =
            tokio::join!(hide_batch(host, &hide_ids), show_batch(host, &show_ids));

        let shown_ok = match show_result {
            Ok(()) => true,
            Err(e) => {
                log::warn!("showing {} tabs failed: {}", show_ids.len(), e);
                false
            }
        };

        let empty = BTreeSet::new();
        let hidden = if hidden_ok { &classification.to_hide } else { &empty };
        let shown = if shown_ok { &classification.to_show } else { &empty };
        session.record_pass(hidden, shown);

        // A rejected batch never converges; keep polling only what was accepted.
        if !(hidden_ok && shown_ok) {
            if hidden.is_empty() && shown.is_empty() {
                self.progress.cancel();
            } else {
                self.track_batch(hidden, shown);
            }
        }

        PassResult {
            hidden: hidden.len(),
            shown: shown.len(),
        }
    }

    /// Unhide every tab the host reports as hidden, whoever hid it.
    ///
    /// Returns how many tabs the host accepted to show.
    pub async fn show_all_hidden(&mut self) -> usize {
        for attempt in 1..=SHOW_ALL_ATTEMPTS {
            let tabs = match self.host.query_all().await {
                Ok(tabs) => tabs,
                Err(e) => {
                    log::warn!("querying tabs to unhide failed: {}", e);
                    self.progress.cancel();
                    return 0;
                }
            };

            let hidden: Vec<TabId> = tabs.iter().filter(|t| t.hidden).map(|t| t.id).collect();
            if hidden.is_empty() {
                self.progress.cancel();
                return 0;
            }

            self.progress.publish(hidden.len());
            self.track_all_hidden();
            match show_batch(self.host.as_ref(), &hidden).await {
                Ok(()) => return hidden.len(),
                Err(HostError::TabNotFound(id)) if attempt < SHOW_ALL_ATTEMPTS => {
                    log::debug!("tab {} closed while unhiding, retrying with a fresh query", id);
                }
                Err(e) => {
                    log::warn!("showing {} hidden tabs failed: {}", hidden.len(), e);
                    self.progress.cancel();
                    return 0;
                }
            }
        }
        0
    }

    /// Leave no tab hidden and forget what this session hid.
    pub async fn end_session(&mut self, session: &mut SessionState) -> usize {
        let shown = self.show_all_hidden().await;
        session.hidden_by_us.clear();
        shown
    }

    fn track_batch(&mut self, to_hide: &BTreeSet<TabId>, to_show: &BTreeSet<TabId>) {
        let host = Arc::clone(&self.host);
        let pending = Arc::new(PendingBatch {
            to_hide: to_hide.clone(),
            to_show: to_show.clone(),
        });
        self.progress.start_tracking(move || {
            let host = Arc::clone(&host);
            let pending = Arc::clone(&pending);
            async move { pending.remaining(host.as_ref()).await }
        });
    }

    fn track_all_hidden(&mut self) {
        let host = Arc::clone(&self.host);
        self.progress.start_tracking(move || {
            let host = Arc::clone(&host);
            async move { count_hidden(host.as_ref()).await }
        });
    }
}
