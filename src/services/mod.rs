// TabSearch services
// Collaborator seams (host tabs, tree extension, options, badge) and the
// stateless engines built on them (matching, progress polling).

pub mod badge;
pub mod match_evaluator;
pub mod option_store;
pub mod progress_reporter;
pub mod tab_host;
pub mod tree_view;
