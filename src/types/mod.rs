// TabSearch shared type definitions
// Plain data passed between the engine components and their collaborators.

pub mod errors;
pub mod events;
pub mod options;
pub mod search;
pub mod session;
pub mod tab;
pub mod tree;
