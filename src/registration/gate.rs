//! Stage gate: decides whether a page may render a requested stage.
//!
//! Both redirect rules key off `current_stage`, never off individual
//! `completed` flags: the backend may report a stage ahead of the recorded
//! completions, and an explicit go-back may move it behind them.

use serde::Serialize;

use super::model::ProgressSnapshot;

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    RedirectTo { stage_id: u32 },
    /// Not a stage of this wizard.
    Reject,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Check `requested` against the snapshot. Rules apply in order.
pub fn authorize(requested: u32, snapshot: &ProgressSnapshot) -> GateDecision {
    let current = snapshot.current_stage;

    if !snapshot.is_valid_stage(requested) {
        return GateDecision::Reject;
    }
    if requested > current && current < snapshot.total_stages {
        return GateDecision::RedirectTo { stage_id: current };
    }
    if requested < current && current > 1 {
        return GateDecision::RedirectTo { stage_id: current };
    }
    GateDecision::Allow
}
