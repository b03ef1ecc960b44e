//! Foreign tree-view extension seam.
//!
//! [`TreeViewBridge`] is the narrow interface the coordinator depends on.
//! [`TreeStyleTabAdapter`] turns it into the extension's JSON messages over
//! an [`ExtensionMessenger`]; [`NoopTreeView`] stands in when tree support is
//! off.

use std::future::Future;

use serde_json::{json, Value};

use crate::types::errors::TreeError;
use crate::types::tab::{TabId, WindowId};
use crate::types::tree::TreeItem;

/// Add-on id of the foreign tree extension.
pub const TREE_STYLE_TAB_ID: &str = "treestyletab@piro.sakura.ne.jp";

/// Name this engine registers under.
pub const REGISTRATION_NAME: &str = "TabSearch";

/// Tab-state tag that suppresses nested indentation while a search is open.
pub const FLATTENED_STATE: &str = "tab-search-flattened";

/// Style sent along with registration so the flattened tag takes effect.
const FLATTENED_STYLE: &str = "tab-item.tab-search-flattened { margin-inline-start: 0 !important; }";

/// Operations on the foreign tree extension.
pub trait TreeViewBridge: Send + Sync + 'static {
    fn register_self(&self) -> impl Future<Output = Result<(), TreeError>> + Send;

    /// Tree items for `tabs` in `window_id`, one per tab the extension knows.
    fn get_tree(
        &self,
        window_id: WindowId,
        tabs: &[TabId],
    ) -> impl Future<Output = Result<Vec<TreeItem>, TreeError>> + Send;

    fn expand_tree(
        &self,
        tab_id: TabId,
        recursive: bool,
    ) -> impl Future<Output = Result<(), TreeError>> + Send;

    fn collapse_tree(&self, tab_id: TabId) -> impl Future<Output = Result<(), TreeError>> + Send;

    fn add_tab_state(
        &self,
        tabs: &[TabId],
        state: &str,
    ) -> impl Future<Output = Result<(), TreeError>> + Send;

    fn remove_tab_state(
        &self,
        tabs: &[TabId],
        state: &str,
    ) -> impl Future<Output = Result<(), TreeError>> + Send;
}

/// Bridge used when tree-view support is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTreeView;

impl TreeViewBridge for NoopTreeView {
    async fn register_self(&self) -> Result<(), TreeError> {
        Ok(())
    }

    async fn get_tree(&self, _window_id: WindowId, _tabs: &[TabId]) -> Result<Vec<TreeItem>, TreeError> {
        Ok(Vec::new())
    }

    async fn expand_tree(&self, _tab_id: TabId, _recursive: bool) -> Result<(), TreeError> {
        Ok(())
    }

    async fn collapse_tree(&self, _tab_id: TabId) -> Result<(), TreeError> {
        Ok(())
    }

    async fn add_tab_state(&self, _tabs: &[TabId], _state: &str) -> Result<(), TreeError> {
        Ok(())
    }

    async fn remove_tab_state(&self, _tabs: &[TabId], _state: &str) -> Result<(), TreeError> {
        Ok(())
    }
}

/// Cross-extension message transport.
pub trait ExtensionMessenger: Send + Sync + 'static {
    fn send(
        &self,
        extension_id: &str,
        message: Value,
    ) -> impl Future<Output = Result<Value, TreeError>> + Send;
}

/// [`TreeViewBridge`] speaking the Tree Style Tab message API.
pub struct TreeStyleTabAdapter<M> {
    messenger: M,
    extension_id: String,
}

impl<M: ExtensionMessenger> TreeStyleTabAdapter<M> {
    pub fn new(messenger: M) -> Self {
        Self::with_extension_id(messenger, TREE_STYLE_TAB_ID)
    }

    pub fn with_extension_id(messenger: M, extension_id: &str) -> Self {
        Self {
            messenger,
            extension_id: extension_id.to_string(),
        }
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    async fn send(&self, message: Value) -> Result<Value, TreeError> {
        self.messenger.send(&self.extension_id, message).await
    }

    /// Decode a tree read. `null` entries are tabs the extension does not
    /// track and are skipped.
    pub fn decode_tree(response: Value) -> Result<Vec<TreeItem>, TreeError> {
        let entries = match response {
            Value::Array(entries) => entries,
            Value::Null => {
                return Err(TreeError::InvalidResponse("tree read returned null".to_string()))
            }
            other => {
                return Err(TreeError::InvalidResponse(format!(
                    "expected an array of tree items, got {}",
                    other
                )))
            }
        };

        entries
            .into_iter()
            .filter(|entry| !entry.is_null())
            .map(|entry| {
                serde_json::from_value::<TreeItem>(entry)
                    .map_err(|e| TreeError::InvalidResponse(format!("bad tree item: {}", e)))
            })
            .collect()
    }
}

impl<M: ExtensionMessenger> TreeViewBridge for TreeStyleTabAdapter<M> {
    async fn register_self(&self) -> Result<(), TreeError> {
        self.send(json!({
            "type": "register-self",
            "name": REGISTRATION_NAME,
            "listeningTypes": [],
            "style": FLATTENED_STYLE,
        }))
        .await
        .map(|_| ())
    }

    async fn get_tree(&self, window_id: WindowId, tabs: &[TabId]) -> Result<Vec<TreeItem>, TreeError> {
        let response = self
            .send(json!({
                "type": "get-tree",
                "window": window_id,
                "tabs": tabs,
            }))
            .await?;
        Self::decode_tree(response)
    }

    async fn expand_tree(&self, tab_id: TabId, recursive: bool) -> Result<(), TreeError> {
        self.send(json!({
            "type": "expand-tree",
            "tab": tab_id,
            "recursively": recursive,
        }))
        .await
        .map(|_| ())
    }

    async fn collapse_tree(&self, tab_id: TabId) -> Result<(), TreeError> {
        self.send(json!({
            "type": "collapse-tree",
            "tab": tab_id,
        }))
        .await
        .map(|_| ())
    }

    async fn add_tab_state(&self, tabs: &[TabId], state: &str) -> Result<(), TreeError> {
        self.send(json!({
            "type": "add-tab-state",
            "tabs": tabs,
            "state": state,
        }))
        .await
        .map(|_| ())
    }

    async fn remove_tab_state(&self, tabs: &[TabId], state: &str) -> Result<(), TreeError> {
        self.send(json!({
            "type": "remove-tab-state",
            "tabs": tabs,
            "state": state,
        }))
        .await
        .map(|_| ())
    }
}
