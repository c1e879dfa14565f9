//! Progress snapshot, drafts and the wire/cache shapes they are built from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{self, UserType};

/// Per-stage bookkeeping inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage_id: u32,
    pub completed: bool,
    pub is_current: bool,
}

/// Complete in-memory record of one user's progress for a session.
///
/// Invariant: exactly one record has `is_current`, and it is the one for
/// `current_stage`. `completed_stages`/`percentage` are derived; call
/// [`ProgressSnapshot::refresh_metrics`] after touching `completed` flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub user_type: UserType,
    pub stages: BTreeMap<u32, StageRecord>,
    pub current_stage: u32,
    pub user_data: BTreeMap<u32, serde_json::Value>,
    pub total_stages: u32,
    pub completed_stages: u32,
    pub percentage: u8,
    pub is_registration_complete: bool,
    /// Built from the local cache because the progress source was unreachable.
    pub stale: bool,
}

impl ProgressSnapshot {
    /// All stages incomplete, stage 1 current.
    pub fn fresh(user_type: UserType) -> Self {
        let stages = catalog::stages_for(user_type)
            .iter()
            .map(|def| {
                (
                    def.id,
                    StageRecord {
                        stage_id: def.id,
                        completed: false,
                        is_current: def.id == 1,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        Self {
            user_type,
            total_stages: stages.len() as u32,
            stages,
            current_stage: 1,
            user_data: BTreeMap::new(),
            completed_stages: 0,
            percentage: 0,
            is_registration_complete: false,
            stale: false,
        }
    }

    pub fn is_valid_stage(&self, stage_id: u32) -> bool {
        self.stages.contains_key(&stage_id)
    }

    pub fn is_completed(&self, stage_id: u32) -> bool {
        self.stages.get(&stage_id).is_some_and(|r| r.completed)
    }

    /// Lowest incomplete stage, or the last stage when everything is done.
    pub fn frontier(&self) -> u32 {
        (1..=self.total_stages)
            .find(|&id| !self.is_completed(id))
            .unwrap_or(self.total_stages)
    }

    /// Ids of completed stages, ascending.
    pub fn completed_stage_ids(&self) -> Vec<u32> {
        self.stages
            .values()
            .filter(|r| r.completed)
            .map(|r| r.stage_id)
            .collect()
    }

    /// Point the current-stage marker at `stage_id`, clamped into range.
    pub fn set_current(&mut self, stage_id: u32) {
        let stage_id = stage_id.clamp(1, self.total_stages.max(1));
        self.current_stage = stage_id;
        for record in self.stages.values_mut() {
            record.is_current = record.stage_id == stage_id;
        }
    }

    /// Recompute `completed_stages`, `percentage` and completion.
    pub fn refresh_metrics(&mut self) {
        self.completed_stages = self.stages.values().filter(|r| r.completed).count() as u32;
        self.percentage = percentage(self.completed_stages, self.total_stages);
        self.is_registration_complete =
            self.total_stages > 0 && self.completed_stages == self.total_stages;
    }
}

/// `round(100 * completed / total)`, halves rounding up.
pub fn percentage(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((200 * completed + total) / (2 * total)) as u8
}

/// Unsubmitted field edits for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub stage_id: u32,
    pub data: serde_json::Value,
    pub saved_at: DateTime<Utc>,
}

/// Progress as reported by the registration backend.
///
/// Different endpoints name the current stage differently; whichever is
/// present wins in the order `currentStage`, `registrationStage`,
/// `currentStep`. Anything else is kept as domain data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_stage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_steps: Option<Vec<u32>>,
    #[serde(default)]
    pub is_registration_complete: bool,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ServerProgress {
    /// The server's notion of the current stage, if it sent one.
    pub fn reported_stage(&self) -> Option<u32> {
        self.current_stage
            .or(self.registration_stage)
            .or(self.current_step)
    }
}

/// Durable local record of submitted progress for one user type.
///
/// Stored under `"{userType}_registration_data"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRegistration {
    pub current_stage: u32,
    #[serde(default)]
    pub completed_steps: Vec<u32>,
    #[serde(default)]
    pub user_data: BTreeMap<u32, serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl CachedRegistration {
    pub fn from_snapshot(snapshot: &ProgressSnapshot) -> Self {
        Self {
            current_stage: snapshot.current_stage,
            completed_steps: snapshot.completed_stage_ids(),
            user_data: snapshot.user_data.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// Keys used in the local caches.
pub mod storage_keys {
    use super::UserType;

    /// Bearer token for the registration backend.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// Long-lived submitted data for a user type.
    pub fn registration_data(user_type: UserType) -> String {
        format!("{user_type}_registration_data")
    }

    /// Session-scoped draft for a stage.
    pub fn draft(stage_id: u32) -> String {
        format!("draft_stage_{stage_id}")
    }
}
