//! Host tab-collection seam.
//!
//! The engine reaches the browser only through [`TabHost`]. Every call is
//! asynchronous and may fail; callers log the failure and carry on.

use std::future::Future;

use crate::types::errors::HostError;
use crate::types::tab::{TabId, TabRecord, WindowId};

/// Operations the engine needs from the browser's tab API.
///
/// Queries always go to the host; implementations must not cache.
pub trait TabHost: Send + Sync + 'static {
    /// All tabs in all windows, in host order.
    fn query_all(&self) -> impl Future<Output = Result<Vec<TabRecord>, HostError>> + Send;

    /// Tabs of one window, in host order.
    fn query_window(
        &self,
        window_id: WindowId,
    ) -> impl Future<Output = Result<Vec<TabRecord>, HostError>> + Send;

    /// The window the user is currently looking at.
    fn current_window(&self) -> impl Future<Output = Result<WindowId, HostError>> + Send;

    fn hide(&self, ids: &[TabId]) -> impl Future<Output = Result<(), HostError>> + Send;

    fn show(&self, ids: &[TabId]) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Make a tab the active tab of its window.
    fn activate(&self, id: TabId) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Select the tabs at `indices` in `window_id`; the first becomes active.
    fn highlight(
        &self,
        window_id: WindowId,
        indices: &[usize],
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Case-insensitive in-page text search; returns the hit count.
    fn find_in_page(
        &self,
        term: &str,
        id: TabId,
    ) -> impl Future<Output = Result<usize, HostError>> + Send;
}
