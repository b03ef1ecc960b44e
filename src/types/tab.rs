use serde::{Deserialize, Serialize};

/// Opaque host-assigned tab identifier.
pub type TabId = i64;

/// Opaque host-assigned window identifier.
pub type WindowId = i64;

/// A snapshot of one browser tab as reported by the host.
///
/// The engine never mutates these; it only asks the host to change state
/// through hide/show/activate/highlight calls and re-queries afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: TabId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub window_id: WindowId,
    /// Position within its window.
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub audible: bool,
    #[serde(default)]
    pub highlighted: bool,
}

impl TabRecord {
    /// Whether an in-page text search can be attempted on this tab.
    pub fn is_web_page(&self) -> bool {
        self.url.starts_with("http")
    }

    /// Active and pinned tabs are never hidden.
    pub fn is_hide_exempt(&self) -> bool {
        self.active || self.pinned
    }
}
