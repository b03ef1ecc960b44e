//! Inbound event dispatch for the TabSearch engine.
//!
//! Kept apart from `event_server.rs` so it can be unit-tested without stdin.
//! `handle_event` decodes one JSON payload into an [`InboundEvent`], runs it
//! through the [`SessionController`] and encodes the outcome.

use serde_json::Value;

use crate::managers::session_controller::SessionController;
use crate::services::badge::BadgeSink;
use crate::services::option_store::OptionStore;
use crate::services::tab_host::TabHost;
use crate::services::tree_view::TreeViewBridge;
use crate::types::errors::EventError;
use crate::types::events::{InboundEvent, KNOWN_ACTIONS};

/// Decode one event payload.
///
/// An `action` outside [`KNOWN_ACTIONS`] is reported as
/// [`EventError::UnknownAction`] rather than a generic parse failure.
pub fn parse_event(payload: &Value) -> Result<InboundEvent, EventError> {
    let action = payload
        .get("action")
        .ok_or_else(|| EventError::Parse("missing action".to_string()))?
        .as_str()
        .ok_or_else(|| EventError::Parse("action must be a string".to_string()))?;
    if !KNOWN_ACTIONS.contains(&action) {
        return Err(EventError::UnknownAction(action.to_string()));
    }
    serde_json::from_value(payload.clone()).map_err(|e| EventError::Parse(e.to_string()))
}

/// Handle one event payload to completion.
pub async fn handle_event<H, T, O, B>(
    controller: &mut SessionController<H, T, O, B>,
    payload: &Value,
) -> Result<Value, EventError>
where
    H: TabHost,
    T: TreeViewBridge,
    O: OptionStore,
    B: BadgeSink,
{
    let event = parse_event(payload)?;
    log::debug!("dispatching {:?}", event);
    let outcome = controller.handle(event).await;
    serde_json::to_value(&outcome).map_err(|e| EventError::Parse(e.to_string()))
}
