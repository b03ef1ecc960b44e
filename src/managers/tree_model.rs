//! In-memory model of the foreign tree-view extension.
//!
//! Keeps parent links, collapsed subtrees and per-tab state tags, answers
//! tree reads the way the real extension does, and logs every call so tests
//! can check what the coordinator asked for.

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::Mutex;

use crate::services::tree_view::TreeViewBridge;
use crate::types::errors::TreeError;
use crate::types::tab::{TabId, WindowId};
use crate::types::tree::{TreeItem, SUBTREE_COLLAPSED_STATE};

/// A call received through [`TreeViewBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeCall {
    Register,
    GetTree { window_id: WindowId, tabs: Vec<TabId> },
    Expand { tab_id: TabId, recursive: bool },
    Collapse(TabId),
    AddState { tabs: Vec<TabId>, state: String },
    RemoveState { tabs: Vec<TabId>, state: String },
}

#[derive(Default)]
struct Inner {
    /// (child, parent) in attach order.
    links: Vec<(TabId, TabId)>,
    collapsed: HashSet<TabId>,
    states: HashMap<TabId, BTreeSet<String>>,
    registrations: usize,
    absent: bool,
    broken_windows: HashSet<WindowId>,
    calls: Vec<TreeCall>,
}

impl Inner {
    fn parent_of(&self, tab_id: TabId) -> Option<TabId> {
        self.links
            .iter()
            .find(|(child, _)| *child == tab_id)
            .map(|(_, parent)| *parent)
    }

    fn children_of(&self, tab_id: TabId) -> Vec<TabId> {
        self.links
            .iter()
            .filter(|(_, parent)| *parent == tab_id)
            .map(|(child, _)| *child)
            .collect()
    }

    /// Nearest ancestor first.
    fn ancestors_of(&self, tab_id: TabId) -> Vec<TabId> {
        let mut chain = Vec::new();
        let mut current = tab_id;
        while let Some(parent) = self.parent_of(current) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    fn descendants_of(&self, tab_id: TabId) -> Vec<TabId> {
        let mut out = Vec::new();
        let mut stack = self.children_of(tab_id);
        while let Some(id) = stack.pop() {
            if out.contains(&id) {
                continue;
            }
            out.push(id);
            stack.extend(self.children_of(id));
        }
        out
    }

    fn item(&self, tab_id: TabId, depth: usize) -> TreeItem {
        let children = if depth > 64 {
            Vec::new()
        } else {
            self.children_of(tab_id)
                .into_iter()
                .map(|child| self.item(child, depth + 1))
                .collect()
        };
        let mut states: Vec<String> = self
            .states
            .get(&tab_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        if self.collapsed.contains(&tab_id) {
            states.push(SUBTREE_COLLAPSED_STATE.to_string());
        }
        TreeItem {
            id: tab_id,
            children,
            ancestor_tab_ids: self.ancestors_of(tab_id),
            states,
        }
    }

    fn available(&self) -> Result<(), TreeError> {
        if self.absent {
            return Err(TreeError::Unavailable("tree extension is not installed".to_string()));
        }
        Ok(())
    }
}

/// In-memory [`TreeViewBridge`].
#[derive(Default)]
pub struct TreeModel {
    inner: Mutex<Inner>,
}

impl TreeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model whose every call fails as if the extension were missing.
    pub fn absent() -> Self {
        let model = Self::new();
        model.inner.lock().absent = true;
        model
    }

    /// Nest `child` under `parent`.
    pub fn attach(&self, child: TabId, parent: TabId) {
        let mut inner = self.inner.lock();
        inner.links.retain(|(c, _)| *c != child);
        inner.links.push((child, parent));
    }

    /// Collapse a subtree directly, as the user would in the tree UI.
    pub fn set_collapsed(&self, tab_id: TabId, collapsed: bool) {
        let mut inner = self.inner.lock();
        if collapsed {
            inner.collapsed.insert(tab_id);
        } else {
            inner.collapsed.remove(&tab_id);
        }
    }

    /// Make tree reads for `window_id` return garbage.
    pub fn break_window(&self, window_id: WindowId) {
        self.inner.lock().broken_windows.insert(window_id);
    }

    pub fn is_collapsed(&self, tab_id: TabId) -> bool {
        self.inner.lock().collapsed.contains(&tab_id)
    }

    pub fn states_of(&self, tab_id: TabId) -> BTreeSet<String> {
        self.inner
            .lock()
            .states
            .get(&tab_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn registrations(&self) -> usize {
        self.inner.lock().registrations
    }

    pub fn calls(&self) -> Vec<TreeCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }
}

impl TreeViewBridge for TreeModel {
    async fn register_self(&self) -> Result<(), TreeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TreeCall::Register);
        inner.available()?;
        inner.registrations += 1;
        Ok(())
    }

    async fn get_tree(&self, window_id: WindowId, tabs: &[TabId]) -> Result<Vec<TreeItem>, TreeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TreeCall::GetTree {
            window_id,
            tabs: tabs.to_vec(),
        });
        inner.available()?;
        if inner.broken_windows.contains(&window_id) {
            return Err(TreeError::InvalidResponse(format!(
                "tree read for window {} returned null",
                window_id
            )));
        }
        Ok(tabs.iter().map(|id| inner.item(*id, 0)).collect())
    }

    async fn expand_tree(&self, tab_id: TabId, recursive: bool) -> Result<(), TreeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TreeCall::Expand { tab_id, recursive });
        inner.available()?;
        inner.collapsed.remove(&tab_id);
        if recursive {
            for id in inner.descendants_of(tab_id) {
                inner.collapsed.remove(&id);
            }
        }
        Ok(())
    }

    async fn collapse_tree(&self, tab_id: TabId) -> Result<(), TreeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TreeCall::Collapse(tab_id));
        inner.available()?;
        inner.collapsed.insert(tab_id);
        Ok(())
    }

    async fn add_tab_state(&self, tabs: &[TabId], state: &str) -> Result<(), TreeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TreeCall::AddState {
            tabs: tabs.to_vec(),
            state: state.to_string(),
        });
        inner.available()?;
        for id in tabs {
            inner.states.entry(*id).or_default().insert(state.to_string());
        }
        Ok(())
    }

    async fn remove_tab_state(&self, tabs: &[TabId], state: &str) -> Result<(), TreeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TreeCall::RemoveState {
            tabs: tabs.to_vec(),
            state: state.to_string(),
        });
        inner.available()?;
        for id in tabs {
            if let Some(states) = inner.states.get_mut(id) {
                states.remove(state);
            }
        }
        Ok(())
    }
}
