//! In-memory tab collection.
//!
//! Behaves like the browser's tab API closely enough to drive the engine in
//! tests and in the demo binaries: per-window ordering, one active tab per
//! window, pinned tabs kept to the left, hidden/highlighted flags, page text
//! for in-page search, and a log of every mutating call.

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::Mutex;

use crate::services::tab_host::TabHost;
use crate::types::errors::HostError;
use crate::types::tab::{TabId, TabRecord, WindowId};

/// A mutating call received through [`TabHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Hide(Vec<TabId>),
    Show(Vec<TabId>),
    Activate(TabId),
    Highlight { window_id: WindowId, indices: Vec<usize> },
    FindInPage { term: String, tab_id: TabId },
}

/// Which host calls to reject, for exercising failure paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCallKind {
    Query,
    Hide,
    Show,
    Activate,
    Highlight,
    FindInPage,
}

/// Trait defining the tab collection's own mutation interface (the part the
/// user and other extensions drive, not the engine).
pub trait TabManagerTrait {
    fn open_tab(&self, window_id: WindowId, url: &str, title: &str) -> TabId;
    fn close_tab(&self, tab_id: TabId) -> Result<(), HostError>;
    fn switch_tab(&self, tab_id: TabId) -> Result<(), HostError>;
    fn pin_tab(&self, tab_id: TabId) -> Result<(), HostError>;
    fn set_audible(&self, tab_id: TabId, audible: bool) -> Result<(), HostError>;
    /// Hide or show a tab outside the engine's control.
    fn set_hidden(&self, tab_id: TabId, hidden: bool) -> Result<(), HostError>;
    fn set_page_text(&self, tab_id: TabId, text: &str) -> Result<(), HostError>;
    /// Make in-page search on this tab fail with a permission error.
    fn restrict_page(&self, tab_id: TabId) -> Result<(), HostError>;
    fn focus_window(&self, window_id: WindowId);
    fn get_tab(&self, tab_id: TabId) -> Option<TabRecord>;
    fn get_all_tabs(&self) -> Vec<TabRecord>;
    fn tab_count(&self) -> usize;
}

struct Inner {
    tabs: Vec<TabRecord>,
    next_id: TabId,
    current_window: Option<WindowId>,
    page_text: HashMap<TabId, String>,
    restricted: HashSet<TabId>,
    rejected: HashSet<HostCallKind>,
    calls: Vec<HostCall>,
}

impl Inner {
    fn find(&self, tab_id: TabId) -> Result<usize, HostError> {
        self.tabs
            .iter()
            .position(|t| t.id == tab_id)
            .ok_or(HostError::TabNotFound(tab_id))
    }

    fn check(&self, kind: HostCallKind) -> Result<(), HostError> {
        if self.rejected.contains(&kind) {
            return Err(HostError::Rejected(format!("{:?} rejected", kind)));
        }
        Ok(())
    }

    /// A batch call fails as a whole when any id is unknown.
    fn check_ids(&self, ids: &[TabId]) -> Result<(), HostError> {
        match ids.iter().find(|id| self.find(**id).is_err()) {
            Some(missing) => Err(HostError::TabNotFound(*missing)),
            None => Ok(()),
        }
    }

    /// Host order: by window, then by position.
    fn ordered(&self) -> Vec<TabRecord> {
        let mut tabs = self.tabs.clone();
        tabs.sort_by_key(|t| (t.window_id, t.index));
        tabs
    }

    fn window_ids(&self, window_id: WindowId) -> Vec<TabId> {
        let mut tabs: Vec<&TabRecord> = self
            .tabs
            .iter()
            .filter(|t| t.window_id == window_id)
            .collect();
        tabs.sort_by_key(|t| t.index);
        tabs.into_iter().map(|t| t.id).collect()
    }

    /// Rewrite indices of `window_id` to follow `order`.
    fn reindex(&mut self, window_id: WindowId, order: &[TabId]) {
        for (index, id) in order.iter().enumerate() {
            if let Some(tab) = self.tabs.iter_mut().find(|t| t.id == *id && t.window_id == window_id) {
                tab.index = index;
            }
        }
    }

    fn activate(&mut self, tab_id: TabId) -> Result<(), HostError> {
        let idx = self.find(tab_id)?;
        let window_id = self.tabs[idx].window_id;
        for tab in self.tabs.iter_mut().filter(|t| t.window_id == window_id) {
            let is_target = tab.id == tab_id;
            tab.active = is_target;
            tab.highlighted = is_target;
            if is_target {
                tab.hidden = false;
            }
        }
        Ok(())
    }
}

/// In-memory tab collection implementing [`TabHost`].
pub struct TabManager {
    inner: Mutex<Inner>,
}

impl TabManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                tabs: Vec::new(),
                next_id: 1,
                current_window: None,
                page_text: HashMap::new(),
                restricted: HashSet::new(),
                rejected: HashSet::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Seed the collection from recorded tabs (e.g. a JSON fixture).
    pub fn from_records(records: Vec<TabRecord>) -> Self {
        let manager = Self::new();
        {
            let mut inner = manager.inner.lock();
            inner.next_id = records.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            inner.current_window = records
                .iter()
                .find(|t| t.active)
                .or_else(|| records.first())
                .map(|t| t.window_id);
            inner.tabs = records;
        }
        manager
    }

    /// Mutating calls received so far, oldest first.
    pub fn calls(&self) -> Vec<HostCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Make every future call of `kind` fail.
    pub fn reject(&self, kind: HostCallKind) {
        self.inner.lock().rejected.insert(kind);
    }

    pub fn accept(&self, kind: HostCallKind) {
        self.inner.lock().rejected.remove(&kind);
    }

    pub fn hidden_ids(&self) -> BTreeSet<TabId> {
        self.inner
            .lock()
            .tabs
            .iter()
            .filter(|t| t.hidden)
            .map(|t| t.id)
            .collect()
    }

    pub fn highlighted_ids(&self) -> BTreeSet<TabId> {
        self.inner
            .lock()
            .tabs
            .iter()
            .filter(|t| t.highlighted)
            .map(|t| t.id)
            .collect()
    }

    pub fn active_tab(&self, window_id: WindowId) -> Option<TabRecord> {
        self.inner
            .lock()
            .tabs
            .iter()
            .find(|t| t.window_id == window_id && t.active)
            .cloned()
    }

    /// Number of tabs whose in-page search was requested.
    pub fn find_in_page_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, HostCall::FindInPage { .. }))
            .count()
    }
}

impl Default for TabManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TabManagerTrait for TabManager {
    /// Open a tab at the end of `window_id`. The first tab of a window
    /// becomes its active tab.
    fn open_tab(&self, window_id: WindowId, url: &str, title: &str) -> TabId {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let index = inner.tabs.iter().filter(|t| t.window_id == window_id).count();
        inner.tabs.push(TabRecord {
            id,
            title: title.to_string(),
            url: url.to_string(),
            window_id,
            index,
            active: index == 0,
            pinned: false,
            hidden: false,
            audible: false,
            highlighted: index == 0,
        });
        inner.current_window.get_or_insert(window_id);
        id
    }

    /// Close a tab. If it was active, its right neighbour (or the new last
    /// tab) takes over.
    fn close_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let idx = inner.find(tab_id)?;
        let closed = inner.tabs.remove(idx);
        inner.page_text.remove(&tab_id);
        inner.restricted.remove(&tab_id);

        let order = inner.window_ids(closed.window_id);
        inner.reindex(closed.window_id, &order);

        if closed.active && !order.is_empty() {
            let next = order[closed.index.min(order.len() - 1)];
            inner.activate(next)?;
        }
        Ok(())
    }

    fn switch_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        self.inner.lock().activate(tab_id)
    }

    /// Pin a tab, moving it to the end of its window's pinned section.
    fn pin_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let idx = inner.find(tab_id)?;
        if inner.tabs[idx].pinned {
            return Ok(());
        }
        let window_id = inner.tabs[idx].window_id;
        let pinned_before = inner
            .tabs
            .iter()
            .filter(|t| t.window_id == window_id && t.pinned)
            .count();
        inner.tabs[idx].pinned = true;

        let mut order = inner.window_ids(window_id);
        order.retain(|id| *id != tab_id);
        order.insert(pinned_before.min(order.len()), tab_id);
        inner.reindex(window_id, &order);
        Ok(())
    }

    fn set_audible(&self, tab_id: TabId, audible: bool) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let idx = inner.find(tab_id)?;
        inner.tabs[idx].audible = audible;
        Ok(())
    }

    fn set_hidden(&self, tab_id: TabId, hidden: bool) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let idx = inner.find(tab_id)?;
        inner.tabs[idx].hidden = hidden;
        Ok(())
    }

    fn set_page_text(&self, tab_id: TabId, text: &str) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        inner.find(tab_id)?;
        inner.page_text.insert(tab_id, text.to_string());
        Ok(())
    }

    fn restrict_page(&self, tab_id: TabId) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        inner.find(tab_id)?;
        inner.restricted.insert(tab_id);
        Ok(())
    }

    fn focus_window(&self, window_id: WindowId) {
        self.inner.lock().current_window = Some(window_id);
    }

    fn get_tab(&self, tab_id: TabId) -> Option<TabRecord> {
        self.inner.lock().tabs.iter().find(|t| t.id == tab_id).cloned()
    }

    fn get_all_tabs(&self) -> Vec<TabRecord> {
        self.inner.lock().ordered()
    }

    fn tab_count(&self) -> usize {
        self.inner.lock().tabs.len()
    }
}

impl TabHost for TabManager {
    async fn query_all(&self) -> Result<Vec<TabRecord>, HostError> {
        let inner = self.inner.lock();
        inner.check(HostCallKind::Query)?;
        Ok(inner.ordered())
    }

    async fn query_window(&self, window_id: WindowId) -> Result<Vec<TabRecord>, HostError> {
        let inner = self.inner.lock();
        inner.check(HostCallKind::Query)?;
        Ok(inner
            .ordered()
            .into_iter()
            .filter(|t| t.window_id == window_id)
            .collect())
    }

    async fn current_window(&self) -> Result<WindowId, HostError> {
        let inner = self.inner.lock();
        inner.check(HostCallKind::Query)?;
        inner
            .current_window
            .ok_or_else(|| HostError::Unavailable("no window is open".to_string()))
    }

    /// Active and pinned tabs are skipped, as the browser does.
    async fn hide(&self, ids: &[TabId]) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        inner.calls.push(HostCall::Hide(ids.to_vec()));
        inner.check(HostCallKind::Hide)?;
        inner.check_ids(ids)?;
        for tab in inner.tabs.iter_mut().filter(|t| ids.contains(&t.id)) {
            if tab.active || tab.pinned {
                continue;
            }
            tab.hidden = true;
            tab.highlighted = false;
        }
        Ok(())
    }

    async fn show(&self, ids: &[TabId]) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        inner.calls.push(HostCall::Show(ids.to_vec()));
        inner.check(HostCallKind::Show)?;
        inner.check_ids(ids)?;
        for tab in inner.tabs.iter_mut().filter(|t| ids.contains(&t.id)) {
            tab.hidden = false;
        }
        Ok(())
    }

    async fn activate(&self, id: TabId) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        inner.calls.push(HostCall::Activate(id));
        inner.check(HostCallKind::Activate)?;
        inner.activate(id)
    }

    /// Selects exactly the tabs at `indices`; the first one becomes active.
    async fn highlight(&self, window_id: WindowId, indices: &[usize]) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        inner.calls.push(HostCall::Highlight {
            window_id,
            indices: indices.to_vec(),
        });
        inner.check(HostCallKind::Highlight)?;

        let order = inner.window_ids(window_id);
        let mut selected = Vec::with_capacity(indices.len());
        for index in indices {
            let id = order.get(*index).copied().ok_or_else(|| {
                HostError::Rejected(format!("no tab at index {} in window {}", index, window_id))
            })?;
            selected.push(id);
        }
        let Some(first) = selected.first().copied() else {
            return Err(HostError::Rejected("no tabs to highlight".to_string()));
        };

        inner.activate(first)?;
        for tab in inner.tabs.iter_mut().filter(|t| t.window_id == window_id) {
            tab.highlighted = selected.contains(&tab.id);
        }
        Ok(())
    }

    async fn find_in_page(&self, term: &str, id: TabId) -> Result<usize, HostError> {
        let mut inner = self.inner.lock();
        inner.calls.push(HostCall::FindInPage {
            term: term.to_string(),
            tab_id: id,
        });
        inner.check(HostCallKind::FindInPage)?;
        let idx = inner.find(id)?;
        let tab = &inner.tabs[idx];
        if !tab.is_web_page() || inner.restricted.contains(&id) {
            return Err(HostError::PermissionDenied(format!(
                "cannot search page content of {}",
                tab.url
            )));
        }
        let needle = term.to_lowercase();
        if needle.is_empty() {
            return Ok(0);
        }
        let hits = inner
            .page_text
            .get(&id)
            .map(|text| text.to_lowercase().matches(needle.as_str()).count())
            .unwrap_or(0);
        Ok(hits)
    }
}
