use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SEARCH_URLS: &str = "searchUrls";
pub const SEARCH_TITLES: &str = "searchTitles";
pub const SEARCH_CONTENTS: &str = "searchContents";
pub const REALTIME_SEARCH: &str = "realtimeSearch";
pub const DISABLE_EMPTY_TAB: &str = "disableEmptyTab";
pub const SELECT_MATCHING_TABS: &str = "selectMatchingTabs";
pub const TST_SUPPORT: &str = "tstSupport";
pub const TST_AUTO_EXPAND: &str = "tstAutoExpand";

/// Every option key the engine reads or writes.
pub const ALL_KEYS: [&str; 8] = [
    SEARCH_URLS,
    SEARCH_TITLES,
    SEARCH_CONTENTS,
    REALTIME_SEARCH,
    DISABLE_EMPTY_TAB,
    SELECT_MATCHING_TABS,
    TST_SUPPORT,
    TST_AUTO_EXPAND,
];

/// Keys whose joint absence means "first run": defaults are written back.
const FIRST_RUN_KEYS: [&str; 5] = [
    SEARCH_URLS,
    SEARCH_TITLES,
    SEARCH_CONTENTS,
    REALTIME_SEARCH,
    DISABLE_EMPTY_TAB,
];

/// Typed view of the persisted option mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    pub search_urls: bool,
    pub search_titles: bool,
    pub search_contents: bool,
    pub realtime_search: bool,
    /// Skips the startup hide/show nudge.
    pub disable_empty_tab: bool,
    pub select_matching_tabs: bool,
    /// Coordinate with the foreign tree-view extension.
    pub tst_support: bool,
    pub tst_auto_expand: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_urls: true,
            search_titles: true,
            search_contents: true,
            realtime_search: true,
            disable_empty_tab: false,
            select_matching_tabs: false,
            tst_support: false,
            tst_auto_expand: false,
        }
    }
}

impl SearchOptions {
    /// Build options from a stored mapping. Missing keys take their defaults;
    /// non-boolean values count as `false`.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| match map.get(key) {
            None | Some(Value::Null) => default,
            Some(Value::Bool(b)) => *b,
            Some(_) => false,
        };
        let mut options = Self {
            search_urls: flag(SEARCH_URLS, defaults.search_urls),
            search_titles: flag(SEARCH_TITLES, defaults.search_titles),
            search_contents: flag(SEARCH_CONTENTS, defaults.search_contents),
            realtime_search: flag(REALTIME_SEARCH, defaults.realtime_search),
            disable_empty_tab: flag(DISABLE_EMPTY_TAB, defaults.disable_empty_tab),
            select_matching_tabs: flag(SELECT_MATCHING_TABS, defaults.select_matching_tabs),
            tst_support: flag(TST_SUPPORT, defaults.tst_support),
            tst_auto_expand: flag(TST_AUTO_EXPAND, defaults.tst_auto_expand),
        };
        options.normalize();
        options
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(SEARCH_URLS.to_string(), Value::Bool(self.search_urls));
        map.insert(SEARCH_TITLES.to_string(), Value::Bool(self.search_titles));
        map.insert(SEARCH_CONTENTS.to_string(), Value::Bool(self.search_contents));
        map.insert(REALTIME_SEARCH.to_string(), Value::Bool(self.realtime_search));
        map.insert(DISABLE_EMPTY_TAB.to_string(), Value::Bool(self.disable_empty_tab));
        map.insert(
            SELECT_MATCHING_TABS.to_string(),
            Value::Bool(self.select_matching_tabs),
        );
        map.insert(TST_SUPPORT.to_string(), Value::Bool(self.tst_support));
        map.insert(TST_AUTO_EXPAND.to_string(), Value::Bool(self.tst_auto_expand));
        map
    }

    /// Auto-expand only makes sense with tree-view support enabled.
    pub fn normalize(&mut self) {
        if !self.tst_support {
            self.tst_auto_expand = false;
        }
    }

    pub fn tree_auto_expand(&self) -> bool {
        self.tst_support && self.tst_auto_expand
    }

    /// Whether the stored mapping predates any saved options.
    pub fn is_first_run(map: &Map<String, Value>) -> bool {
        FIRST_RUN_KEYS
            .iter()
            .all(|key| matches!(map.get(*key), None | Some(Value::Null)))
    }
}
