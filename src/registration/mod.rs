//! Staged registration progress engine.
//!
//! Tracks where a driver or restaurant is in its registration wizard,
//! reconciles server-reported progress with the local cache, blocks
//! out-of-order navigation, and autosaves unsubmitted edits. Pages talk to
//! the [`Dashboard`]; everything else is plumbing behind it.

pub mod aggregator;
pub mod catalog;
pub mod dashboard;
pub mod drafts;
pub mod gate;
pub mod model;
pub mod reconciler;
pub mod routes;
pub mod source;

pub use catalog::{StageDefinition, UserType, stages_for};
pub use dashboard::{Dashboard, DashboardState};
pub use drafts::DraftStore;
pub use gate::{GateDecision, authorize};
pub use model::{Draft, ProgressSnapshot, ServerProgress, StageRecord};
pub use reconciler::reconcile;
pub use routes::{RegistrationRouteState, registration_routes};
pub use source::{HttpProgressSource, ProgressSource};
