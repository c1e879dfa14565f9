//! Dashboard: the single entry point pages call to drive registration.
//!
//! Owns the session's [`ProgressSnapshot`] and composes the reconciler,
//! aggregator, gate and draft store. `initialize`, `update_stage_data` and
//! `go_to_stage` run one at a time: a submission that arrives while a
//! reconciliation is in flight waits for it and is applied to its result.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, ProgressError, SourceError};
use crate::store::LocalCache;

use super::aggregator;
use super::catalog::{self, UserType};
use super::drafts::DraftStore;
use super::gate::{self, GateDecision};
use super::model::{CachedRegistration, Draft, ProgressSnapshot, storage_keys};
use super::reconciler::reconcile;
use super::source::ProgressSource;

/// Everything a page needs to render, as a plain value.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub user_type: Option<UserType>,
    pub snapshot: Option<ProgressSnapshot>,
    /// A progress fetch is outstanding.
    pub is_loading: bool,
    /// Set when the last reconciliation had no usable data at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Composition root for the registration progress engine.
pub struct Dashboard {
    source: Arc<dyn ProgressSource>,
    durable: Arc<dyn LocalCache>,
    drafts: DraftStore,
    state: RwLock<DashboardState>,
    /// Serializes reconciliation and snapshot mutations (FIFO).
    ops: Mutex<()>,
}

impl Dashboard {
    /// `durable` holds submitted data and the auth token; `session` holds
    /// drafts and is expected to die with the session.
    pub fn new(
        source: Arc<dyn ProgressSource>,
        durable: Arc<dyn LocalCache>,
        session: Arc<dyn LocalCache>,
        draft_debounce: Duration,
    ) -> Self {
        Self {
            source,
            durable,
            drafts: DraftStore::new(session, draft_debounce),
            state: RwLock::new(DashboardState::default()),
            ops: Mutex::new(()),
        }
    }

    /// Current state without changing anything.
    pub async fn state(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    /// Load progress for `user_type`: fetch from the progress source,
    /// reconcile against the durable cache, recompute derived fields.
    ///
    /// Only an authentication failure is returned as an error; the stored
    /// token has already been cleared by then. Network failures degrade to
    /// the cached record (flagged stale) or to a fresh stage-1 snapshot.
    pub async fn initialize(&self, user_type: UserType) -> Result<DashboardState, Error> {
        let _serial = self.ops.lock().await;

        {
            let mut state = self.state.write().await;
            if state.user_type != Some(user_type) {
                if let Some(previous) = state.user_type {
                    info!(
                        from = %previous,
                        to = %user_type,
                        "User type changed, discarding drafts"
                    );
                    let stage_ids = catalog::stages_for(previous).iter().map(|s| s.id).collect::<Vec<u32>>();
                    self.drafts.discard_all(stage_ids).await;
                }
                state.snapshot = None;
            }
            state.user_type = Some(user_type);
            state.is_loading = true;
            state.error = None;
        }
        info!(user_type = %user_type, "Initializing registration progress");

        let cached = self.load_cached(user_type).await;

        let (server, fetch_error) = match self.source.fetch(user_type).await {
            // No record on the backend is an authoritative "nothing done yet".
            Ok(progress) => (Some(progress.unwrap_or_default()), None),
            Err(SourceError::AuthRequired) => {
                let mut state = self.state.write().await;
                state.snapshot = None;
                state.is_loading = false;
                state.error = Some(SourceError::AuthRequired.to_string());
                info!(user_type = %user_type, "Registration progress requires authentication");
                return Err(SourceError::AuthRequired.into());
            }
            Err(e) => {
                warn!(user_type = %user_type, "Progress fetch failed, using local data: {}", e);
                (None, Some(e))
            }
        };

        let mut snapshot = reconcile(user_type, server.as_ref(), cached.as_ref());
        aggregator::recompute(&mut snapshot);

        if server.is_some() {
            self.persist_registration(&snapshot).await;
        }

        let error = match fetch_error {
            Some(e) if !snapshot.stale => Some(e.to_string()),
            _ => None,
        };

        info!(
            user_type = %user_type,
            current_stage = snapshot.current_stage,
            completed = snapshot.completed_stages,
            stale = snapshot.stale,
            "Registration progress loaded"
        );

        let mut state = self.state.write().await;
        state.snapshot = Some(snapshot);
        state.is_loading = false;
        state.error = error;
        Ok(state.clone())
    }

    /// Submit a stage: record its data, mark it complete, advance, and drop
    /// its draft.
    pub async fn update_stage_data(
        &self,
        stage_id: u32,
        data: Value,
    ) -> Result<DashboardState, Error> {
        let _serial = self.ops.lock().await;

        let current = self.current_snapshot().await?;
        let next = aggregator::update_stage_data(&current, stage_id, data)?;

        self.persist_registration(&next).await;
        self.drafts.clear_draft(stage_id).await;

        info!(
            user_type = %next.user_type,
            stage_id,
            current_stage = next.current_stage,
            percentage = next.percentage,
            "Stage submitted"
        );
        Ok(self.replace_snapshot(next).await)
    }

    /// Explicit back navigation. A draft write still waiting for the stage
    /// being left is dropped.
    pub async fn go_to_stage(&self, stage_id: u32) -> Result<DashboardState, Error> {
        let _serial = self.ops.lock().await;

        let current = self.current_snapshot().await?;
        let next = aggregator::go_to_stage(&current, stage_id)?;
        self.persist_registration(&next).await;

        let leaving = current.current_stage;
        if leaving != stage_id && self.drafts.cancel_pending(leaving) {
            debug!(stage_id = leaving, "Dropped pending draft on navigation");
        }

        info!(user_type = %next.user_type, stage_id, "Moved to stage");
        Ok(self.replace_snapshot(next).await)
    }

    /// Schedule a debounced draft write for a stage.
    ///
    /// Does not wait for an in-flight reconciliation; only the user type has
    /// to be known.
    pub async fn auto_save(&self, stage_id: u32, data: Value) -> Result<DashboardState, Error> {
        let state = self.state().await;
        let user_type = state.user_type.ok_or(ProgressError::NotInitialized)?;
        if catalog::stage(user_type, stage_id).is_none() {
            return Err(ProgressError::InvalidStage {
                stage: stage_id,
                total: catalog::total_stages(user_type),
            }
            .into());
        }

        self.drafts.save_draft(stage_id, data);
        Ok(state)
    }

    /// Check whether a page may render `stage_id`.
    pub async fn authorize(&self, stage_id: u32) -> Result<GateDecision, Error> {
        let snapshot = self.current_snapshot().await?;
        let decision = gate::authorize(stage_id, &snapshot);
        if !decision.is_allowed() {
            debug!(stage_id, ?decision, "Stage navigation refused");
        }
        Ok(decision)
    }

    /// Previously autosaved edits for a stage, if any.
    pub async fn load_draft(&self, stage_id: u32) -> Option<Draft> {
        self.drafts.load_draft(stage_id).await
    }

    async fn current_snapshot(&self) -> Result<ProgressSnapshot, ProgressError> {
        self.state
            .read()
            .await
            .snapshot
            .clone()
            .ok_or(ProgressError::NotInitialized)
    }

    async fn replace_snapshot(&self, snapshot: ProgressSnapshot) -> DashboardState {
        let mut state = self.state.write().await;
        state.snapshot = Some(snapshot);
        state.clone()
    }

    /// Read the durable record for a user type. Unreadable records are
    /// ignored.
    async fn load_cached(&self, user_type: UserType) -> Option<CachedRegistration> {
        let key = storage_keys::registration_data(user_type);
        let raw = match self.durable.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(user_type = %user_type, "Failed to read cached registration: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(cached) => Some(cached),
            Err(e) => {
                warn!(user_type = %user_type, "Ignoring unreadable cached registration: {}", e);
                None
            }
        }
    }

    /// Write the durable record. Failures are logged and swallowed.
    async fn persist_registration(&self, snapshot: &ProgressSnapshot) {
        let record = CachedRegistration::from_snapshot(snapshot);
        let value = match serde_json::to_string(&record) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to serialize registration data: {}", e);
                return;
            }
        };
        let key = storage_keys::registration_data(snapshot.user_type);
        if let Err(e) = self.durable.set(&key, &value).await {
            warn!(user_type = %snapshot.user_type, "Failed to persist registration data: {}", e);
        }
    }
}
