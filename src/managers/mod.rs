// Tab search state managers
// Managers own per-session state: the session lifecycle, hide/show reconciliation,
// tree-view coordination, and the in-memory tab host and tree model.

pub mod session_controller;
pub mod tab_manager;
pub mod tree_coordinator;
pub mod tree_model;
pub mod visibility_reconciler;
