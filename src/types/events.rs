use serde::{Deserialize, Serialize};

use super::search::SearchCriteria;
use super::tab::{TabId, WindowId};

/// Every inbound action name the engine understands.
pub const KNOWN_ACTIONS: [&str; 6] = [
    "search-tabs",
    "popup-closed",
    "clear-matched-tabs",
    "tab-activated",
    "options-changed",
    "search-audible",
];

/// Events delivered to the session controller, discriminated by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum InboundEvent {
    #[serde(rename_all = "camelCase")]
    SearchTabs {
        #[serde(default)]
        term: String,
        #[serde(default, rename = "searchTitles", alias = "matchTitle")]
        match_title: bool,
        #[serde(default, rename = "searchUrls", alias = "matchUrl")]
        match_url: bool,
        #[serde(default, rename = "searchContents", alias = "matchContent")]
        match_content: bool,
    },
    #[serde(rename_all = "camelCase")]
    PopupClosed {
        #[serde(default)]
        window_id: Option<WindowId>,
    },
    ClearMatchedTabs,
    #[serde(rename_all = "camelCase")]
    TabActivated { tab_id: TabId, window_id: WindowId },
    OptionsChanged,
    SearchAudible,
}

impl InboundEvent {
    pub fn criteria(&self) -> Option<SearchCriteria> {
        match self {
            InboundEvent::SearchTabs {
                term,
                match_title,
                match_url,
                match_content,
            } => Some(SearchCriteria::new(term, *match_title, *match_url, *match_content)),
            _ => None,
        }
    }
}

/// Outcome of one classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub matched: usize,
    pub hidden: usize,
    pub shown: usize,
    /// The pass skipped classification and unhid everything.
    pub show_all: bool,
}

/// Outcome of the session-end sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseOutcome {
    pub shown: usize,
    /// Tabs left selected by select-matching-tabs.
    pub selected: Vec<TabId>,
}

/// Outcome of an audible-tab search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum AudibleOutcome {
    NoAudibleTabs,
    #[serde(rename_all = "camelCase")]
    Activated { tab_id: TabId },
    Filtered { hidden: usize },
}

/// What handling one event produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EventOutcome {
    Search(SearchOutcome),
    Closed(CloseOutcome),
    Audible(AudibleOutcome),
    /// Recovery unhide triggered by a tab activation outside a search.
    Recovered { shown: usize },
    Done,
    Ignored,
}
