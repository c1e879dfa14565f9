//! Progress aggregator: pure snapshot transitions.
//!
//! Every function takes the current snapshot and returns a new one; side
//! effects (durable writes, draft cleanup) belong to the dashboard.

use serde_json::Value;

use crate::error::ProgressError;

use super::model::ProgressSnapshot;

/// Recompute derived fields and the `is_current` flags in place.
pub fn recompute(snapshot: &mut ProgressSnapshot) {
    snapshot.refresh_metrics();
    let current = snapshot.current_stage;
    snapshot.set_current(current);
}

/// Record a submitted stage and advance.
///
/// The new current stage is `stage_id + 1` (capped at the last stage), or the
/// lowest incomplete stage when that lies further ahead, as after going back
/// and resubmitting an earlier stage.
pub fn update_stage_data(
    snapshot: &ProgressSnapshot,
    stage_id: u32,
    data: Value,
) -> Result<ProgressSnapshot, ProgressError> {
    check_reachable(snapshot, stage_id)?;

    let mut next = snapshot.clone();
    next.user_data.insert(stage_id, data);
    if let Some(record) = next.stages.get_mut(&stage_id) {
        record.completed = true;
    }
    next.refresh_metrics();
    let advanced = (stage_id + 1).min(next.total_stages);
    let current = advanced.max(next.frontier());
    next.set_current(current);
    Ok(next)
}

/// Move the current-stage marker without touching completion or data.
///
/// Used for explicit back navigation. Jumping past the furthest reachable
/// stage is refused.
pub fn go_to_stage(
    snapshot: &ProgressSnapshot,
    stage_id: u32,
) -> Result<ProgressSnapshot, ProgressError> {
    check_reachable(snapshot, stage_id)?;

    let mut next = snapshot.clone();
    next.set_current(stage_id);
    Ok(next)
}

/// A stage is reachable if it exists and is not beyond both the first
/// incomplete stage and the current marker.
fn check_reachable(snapshot: &ProgressSnapshot, stage_id: u32) -> Result<(), ProgressError> {
    if !snapshot.is_valid_stage(stage_id) {
        return Err(ProgressError::InvalidStage {
            stage: stage_id,
            total: snapshot.total_stages,
        });
    }
    let frontier = snapshot.frontier().max(snapshot.current_stage);
    if stage_id > frontier {
        return Err(ProgressError::StageLocked {
            stage: stage_id,
            frontier,
        });
    }
    Ok(())
}
