//! TabSearch: search across open tabs by hiding every tab that does not match.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod event_handler;
pub mod logging;
pub mod managers;
pub mod platform;
pub mod services;
pub mod types;
