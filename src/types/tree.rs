use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// State tag the foreign tree extension uses for a collapsed subtree.
pub const SUBTREE_COLLAPSED_STATE: &str = "subtree-collapsed";

/// A tree item as returned by the foreign tree extension's tree read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeItem {
    pub id: TabId,
    #[serde(default)]
    pub children: Vec<TreeItem>,
    #[serde(default)]
    pub ancestor_tab_ids: Vec<TabId>,
    #[serde(default)]
    pub states: Vec<String>,
}

impl TreeItem {
    pub fn is_subtree_collapsed(&self) -> bool {
        self.states.iter().any(|s| s == SUBTREE_COLLAPSED_STATE)
    }
}

/// A flattened tree node: direct children by id only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: TabId,
    pub children: Vec<TabId>,
    pub ancestor_ids: Vec<TabId>,
    pub collapsed: bool,
}

impl From<&TreeItem> for TreeNode {
    fn from(item: &TreeItem) -> Self {
        Self {
            id: item.id,
            children: item.children.iter().map(|c| c.id).collect(),
            ancestor_ids: item.ancestor_tab_ids.clone(),
            collapsed: item.is_subtree_collapsed(),
        }
    }
}

/// Tree state of one window captured before the first search mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Nodes with at least one child.
    pub parent_nodes: Vec<TreeNode>,
    /// Parents whose subtree was collapsed when the snapshot was taken.
    pub collapsed_parent_ids: BTreeSet<TabId>,
    /// Ancestor chain, as reported, for every node the tree read returned.
    pub ancestry: HashMap<TabId, Vec<TabId>>,
}

impl TreeSnapshot {
    pub fn from_items(items: &[TreeItem]) -> Self {
        let mut snapshot = Self::default();
        for item in items {
            snapshot.ancestry.insert(item.id, item.ancestor_tab_ids.clone());
            if item.children.is_empty() {
                continue;
            }
            let node = TreeNode::from(item);
            if node.collapsed {
                snapshot.collapsed_parent_ids.insert(node.id);
            }
            snapshot.parent_nodes.push(node);
        }
        snapshot
    }

    /// Parents with no ancestors: the roots of each tree in the window.
    pub fn root_parents(&self) -> impl Iterator<Item = &TreeNode> {
        self.parent_nodes.iter().filter(|n| n.ancestor_ids.is_empty())
    }

    /// Ancestors of `tab_id`, from the recorded chain or, failing that, by
    /// walking the recorded parent/child links.
    pub fn ancestors_of(&self, tab_id: TabId) -> BTreeSet<TabId> {
        if let Some(chain) = self.ancestry.get(&tab_id) {
            if !chain.is_empty() {
                return chain.iter().copied().collect();
            }
        }
        let mut ancestors = BTreeSet::new();
        let mut current = tab_id;
        while let Some(parent) = self
            .parent_nodes
            .iter()
            .find(|n| n.children.contains(&current))
        {
            if !ancestors.insert(parent.id) {
                break;
            }
            current = parent.id;
        }
        ancestors
    }
}
