//! Keeps the foreign tree-view extension's nesting intact across a search.
//!
//! Before the first hide, the coordinator records each window's collapsed
//! subtrees, tags every tab as flattened and expands every tree, so hiding
//! works on the plain tab list. At session end it collapses again exactly
//! what was collapsed before, except the ancestors of the tab the user ended
//! up on.
//!
//! Every call to the extension is best effort: a failure is logged and the
//! search goes on without tree coordination for that step or window.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tokio::time::Instant;

use crate::services::tree_view::{TreeViewBridge, FLATTENED_STATE};
use crate::types::session::RecentActivation;
use crate::types::tab::{TabId, TabRecord, WindowId};
use crate::types::tree::TreeSnapshot;

fn group_by_window(tabs: &[TabRecord]) -> BTreeMap<WindowId, Vec<TabId>> {
    let mut windows: BTreeMap<WindowId, Vec<TabId>> = BTreeMap::new();
    for tab in tabs {
        windows.entry(tab.window_id).or_default().push(tab.id);
    }
    windows
}

/// Per-session tree coordination state and the bridge it talks through.
pub struct TreeViewCoordinator<T> {
    bridge: Arc<T>,
    registered: bool,
    snapshot_taken: bool,
    flattened: bool,
    /// Tabs tagged as flattened, so the tag can be removed even from tabs
    /// that moved or closed since.
    flattened_tabs: BTreeSet<TabId>,
    expanded_windows: HashSet<WindowId>,
    snapshots: HashMap<WindowId, TreeSnapshot>,
}

impl<T: TreeViewBridge> TreeViewCoordinator<T> {
    pub fn new(bridge: Arc<T>) -> Self {
        Self {
            bridge,
            registered: false,
            snapshot_taken: false,
            flattened: false,
            flattened_tabs: BTreeSet::new(),
            expanded_windows: HashSet::new(),
            snapshots: HashMap::new(),
        }
    }

    pub fn bridge(&self) -> &Arc<T> {
        &self.bridge
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn snapshot_taken(&self) -> bool {
        self.snapshot_taken
    }

    pub fn snapshot_for(&self, window_id: WindowId) -> Option<&TreeSnapshot> {
        self.snapshots.get(&window_id)
    }

    /// Run the pre-search steps in order. Each one happens at most once per
    /// session, so repeated searches leave the tree alone.
    pub async fn prepare(&mut self, tabs: &[TabRecord]) {
        self.register_once().await;
        self.snapshot(tabs).await;
        let ids: Vec<TabId> = tabs.iter().map(|t| t.id).collect();
        self.flatten(&ids).await;
        self.expand_all().await;
    }

    /// Announce this engine to the extension.
    pub async fn register_once(&mut self) {
        if self.registered {
            return;
        }
        // Set before the call: a missing extension is not retried every keystroke.
        self.registered = true;
        if let Err(e) = self.bridge.register_self().await {
            log::warn!("tree extension registration failed: {}", e);
        }
    }

    /// Capture every window's tree. Windows whose read fails are skipped.
    pub async fn snapshot(&mut self, tabs: &[TabRecord]) {
        if self.snapshot_taken {
            return;
        }
        self.snapshot_taken = true;

        for (window_id, ids) in group_by_window(tabs) {
            match self.bridge.get_tree(window_id, &ids).await {
                Ok(items) => {
                    let snapshot = TreeSnapshot::from_items(&items);
                    log::debug!(
                        "window {}: {} parent nodes, {} collapsed",
                        window_id,
                        snapshot.parent_nodes.len(),
                        snapshot.collapsed_parent_ids.len()
                    );
                    self.snapshots.insert(window_id, snapshot);
                }
                Err(e) => {
                    log::warn!("tree read for window {} failed, skipping it: {}", window_id, e);
                }
            }
        }
    }

    /// Tag every tab as flattened.
    pub async fn flatten(&mut self, all_tab_ids: &[TabId]) {
        if self.flattened || all_tab_ids.is_empty() {
            return;
        }
        self.flattened = true;
        match self.bridge.add_tab_state(all_tab_ids, FLATTENED_STATE).await {
            Ok(()) => self.flattened_tabs.extend(all_tab_ids.iter().copied()),
            Err(e) => log::warn!("flattening {} tabs failed: {}", all_tab_ids.len(), e),
        }
    }

    /// Recursively expand every tree root of every snapshotted window, once
    /// per window.
    pub async fn expand_all(&mut self) {
        let mut windows: Vec<WindowId> = self.snapshots.keys().copied().collect();
        windows.sort_unstable();
        for window_id in windows {
            if !self.expanded_windows.insert(window_id) {
                continue;
            }
            let roots: Vec<TabId> = match self.snapshots.get(&window_id) {
                Some(snapshot) => snapshot.root_parents().map(|n| n.id).collect(),
                None => continue,
            };
            for root in roots {
                if let Err(e) = self.bridge.expand_tree(root, true).await {
                    log::warn!("expanding tree {} in window {} failed: {}", root, window_id, e);
                }
            }
        }
    }

    /// Re-collapse what was collapsed before the search and drop the
    /// flattened tag, then forget the session.
    ///
    /// In each window the ancestors of the tab to keep visible stay expanded:
    /// the recently activated tab if the activation is authoritative at
    /// `closed_at` and belongs to that window, otherwise the window's active
    /// tab in `tabs`.
    pub async fn restore(
        &mut self,
        tabs: &[TabRecord],
        recent: Option<RecentActivation>,
        closed_at: Instant,
    ) {
        let recent = recent.filter(|a| a.is_authoritative_at(closed_at));

        let mut windows: Vec<WindowId> = self.snapshots.keys().copied().collect();
        windows.sort_unstable();
        for window_id in windows {
            let Some(snapshot) = self.snapshots.get(&window_id) else {
                continue;
            };
            let keep_visible = recent
                .filter(|a| a.window_id == window_id)
                .map(|a| a.tab_id)
                .or_else(|| {
                    tabs.iter()
                        .find(|t| t.window_id == window_id && t.active)
                        .map(|t| t.id)
                });
            let keep_expanded = keep_visible
                .map(|id| snapshot.ancestors_of(id))
                .unwrap_or_default();

            for parent in &snapshot.collapsed_parent_ids {
                if keep_expanded.contains(parent) {
                    log::debug!("keeping tree {} expanded around tab {:?}", parent, keep_visible);
                    continue;
                }
                if let Err(e) = self.bridge.collapse_tree(*parent).await {
                    log::warn!("re-collapsing tree {} failed: {}", parent, e);
                }
            }
        }

        let mut tagged = std::mem::take(&mut self.flattened_tabs);
        tagged.extend(tabs.iter().map(|t| t.id));
        if self.flattened && !tagged.is_empty() {
            let ids: Vec<TabId> = tagged.into_iter().collect();
            if let Err(e) = self.bridge.remove_tab_state(&ids, FLATTENED_STATE).await {
                log::warn!("removing flattened state failed: {}", e);
            }
        }

        self.reset();
    }

    /// Expand the ancestor chain of every matched tab so matches buried in a
    /// collapsed subtree are visible.
    pub async fn auto_expand(&mut self, tabs: &[TabRecord], matched: &[TabId]) {
        let matched_tabs: Vec<TabRecord> = tabs
            .iter()
            .filter(|t| matched.contains(&t.id))
            .cloned()
            .collect();

        let mut expanded: BTreeSet<TabId> = BTreeSet::new();
        for (window_id, ids) in group_by_window(&matched_tabs) {
            let items = match self.bridge.get_tree(window_id, &ids).await {
                Ok(items) => items,
                Err(e) => {
                    log::warn!("tree read for auto-expand in window {} failed: {}", window_id, e);
                    continue;
                }
            };
            for item in items {
                for ancestor in item.ancestor_tab_ids {
                    if !expanded.insert(ancestor) {
                        continue;
                    }
                    if let Err(e) = self.bridge.expand_tree(ancestor, false).await {
                        log::warn!("expanding ancestor {} failed: {}", ancestor, e);
                    }
                }
            }
        }
    }

    /// Clear every per-session gate and the snapshot.
    pub fn reset(&mut self) {
        self.registered = false;
        self.snapshot_taken = false;
        self.flattened = false;
        self.flattened_tabs.clear();
        self.expanded_windows.clear();
        self.snapshots.clear();
    }
}
