//! Classifies tabs against a search term.

use std::sync::Arc;

use crate::services::tab_host::TabHost;
use crate::types::search::{Classification, SearchCriteria, SearchPlan};
use crate::types::tab::TabRecord;

/// Decides, per tab, whether it matches and whether it must be hidden or
/// shown to reflect that.
pub struct MatchEvaluator<H> {
    host: Arc<H>,
}

impl<H: TabHost> MatchEvaluator<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }

    /// Turn a search request into a plan.
    ///
    /// An empty term, or a content-only search with a term under three
    /// characters, short-circuits to [`SearchPlan::ShowAll`] without touching
    /// any tab.
    pub async fn evaluate(&self, tabs: &[TabRecord], criteria: &SearchCriteria) -> SearchPlan {
        if criteria.shows_everything() {
            return SearchPlan::ShowAll;
        }
        SearchPlan::Classified(self.classify(tabs, criteria).await)
    }

    /// Classify every tab.
    ///
    /// Tabs no enabled criterion applies to are left out of all three sets.
    /// Active and pinned tabs are never scheduled for hiding; a hidden tab that
    /// should stay hidden produces no operation.
    pub async fn classify(&self, tabs: &[TabRecord], criteria: &SearchCriteria) -> Classification {
        let mut classification = Classification::default();
        if !criteria.can_classify() {
            return classification;
        }

        for tab in tabs {
            let matched = self.matches(tab, criteria).await;
            if matched {
                classification.matched.push(tab.id);
            }

            if !matched && !tab.is_hide_exempt() {
                if !tab.hidden {
                    classification.to_hide.insert(tab.id);
                }
            } else if tab.hidden {
                classification.to_show.insert(tab.id);
            }
        }

        log::debug!(
            "classified {} tabs for {:?}: {} matched, {} to hide, {} to show",
            tabs.len(),
            criteria.term(),
            classification.matched.len(),
            classification.to_hide.len(),
            classification.to_show.len()
        );
        classification
    }

    async fn matches(&self, tab: &TabRecord, criteria: &SearchCriteria) -> bool {
        let term = criteria.term();
        if criteria.match_title && tab.title.to_lowercase().contains(term) {
            return true;
        }
        if criteria.match_url && tab.url.to_lowercase().contains(term) {
            return true;
        }
        if criteria.content_search_allowed() && tab.is_web_page() {
            return self.content_matches(tab, term).await;
        }
        false
    }

    /// Page search failures (privileged pages, missing permission, closed
    /// tab) count as "no match".
    async fn content_matches(&self, tab: &TabRecord, term: &str) -> bool {
        match self.host.find_in_page(term, tab.id).await {
            Ok(count) => count > 0,
            Err(e) => {
                log::debug!("content search skipped for tab {}: {}", tab.id, e);
                false
            }
        }
    }
}
