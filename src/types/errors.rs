use thiserror::Error;

use super::tab::TabId;

// === HostError ===

/// Errors returned by the host tab-collection API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The tab closed (or never existed) before the call reached it.
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),
    /// The host refused access, e.g. content search on a privileged page.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// The host rejected the call for another reason.
    #[error("Host rejected call: {0}")]
    Rejected(String),
    /// The capability is missing on this host.
    #[error("Host capability unavailable: {0}")]
    Unavailable(String),
}

// === TreeError ===

/// Errors talking to the foreign tree-view extension.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The extension is not installed, disabled, or not answering.
    #[error("Tree extension unavailable: {0}")]
    Unavailable(String),
    /// The extension answered with something other than the expected shape.
    #[error("Invalid tree response: {0}")]
    InvalidResponse(String),
    /// Message delivery failed.
    #[error("Tree message transport failed: {0}")]
    Transport(String),
}

// === OptionsError ===

/// Errors reading or writing persisted options.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Options I/O error: {0}")]
    IoError(String),
    #[error("Options serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid option key: {0}")]
    InvalidKey(String),
    #[error("Invalid option value: {0}")]
    InvalidValue(String),
}

// === EventError ===

/// Errors decoding an inbound event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Malformed event: {0}")]
    Parse(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}
