use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// Minimum term length (in characters) before page content is searched.
pub const MIN_CONTENT_TERM_LEN: usize = 3;

/// What to match a term against. Built once per search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    term: String,
    pub match_title: bool,
    pub match_url: bool,
    pub match_content: bool,
}

impl SearchCriteria {
    /// The term is trimmed and lowercased here so every comparison downstream
    /// is case-insensitive.
    pub fn new(term: &str, match_title: bool, match_url: bool, match_content: bool) -> Self {
        Self {
            term: term.trim().to_lowercase(),
            match_title,
            match_url,
            match_content,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn any_enabled(&self) -> bool {
        self.match_title || self.match_url || self.match_content
    }

    /// Content search only runs for terms of at least three characters.
    pub fn content_search_allowed(&self) -> bool {
        self.match_content && self.term.chars().count() >= MIN_CONTENT_TERM_LEN
    }

    /// Whether any enabled criterion can apply to a tab at all. When false the
    /// tab is left untouched by a classification pass.
    pub fn can_classify(&self) -> bool {
        self.match_title || self.match_url || self.content_search_allowed()
    }

    /// An empty term, or a content-only search with a too-short term, means
    /// "show everything" instead of a classification pass.
    pub fn shows_everything(&self) -> bool {
        let content_only = self.match_content && !self.match_title && !self.match_url;
        self.term.is_empty() || (content_only && !self.content_search_allowed())
    }
}

/// Result of classifying every tab against a [`SearchCriteria`].
///
/// `to_hide` and `to_show` are always disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Matched tabs in host-reported order.
    pub matched: Vec<TabId>,
    pub to_hide: BTreeSet<TabId>,
    pub to_show: BTreeSet<TabId>,
}

impl Classification {
    pub fn pending_operations(&self) -> usize {
        self.to_hide.len() + self.to_show.len()
    }

    pub fn is_noop(&self) -> bool {
        self.to_hide.is_empty() && self.to_show.is_empty()
    }
}

/// What a search request turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPlan {
    /// Skip classification and unhide every hidden tab.
    ShowAll,
    Classified(Classification),
}
