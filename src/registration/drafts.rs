//! Draft store: debounced autosave of unsubmitted stage edits.
//!
//! Each stage has at most one pending write. A new save for the same stage
//! aborts the pending one and restarts the window, so a burst of keystrokes
//! produces a single write. Drafts are a convenience: write failures are
//! logged and dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::LocalCache;

use super::model::{Draft, storage_keys};

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Debounced draft persistence on top of a session-scoped cache.
pub struct DraftStore {
    cache: Arc<dyn LocalCache>,
    debounce: Duration,
    pending: Mutex<HashMap<u32, JoinHandle<()>>>,
}

impl DraftStore {
    pub fn new(cache: Arc<dyn LocalCache>, debounce: Duration) -> Self {
        Self {
            cache,
            debounce,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<u32, JoinHandle<()>>> {
        // Handles stay valid even if a holder panicked.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Schedule a write of `data` for `stage_id` after the debounce window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn save_draft(&self, stage_id: u32, data: Value) {
        let cache = Arc::clone(&self.cache);
        let debounce = self.debounce;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let draft = Draft {
                stage_id,
                data,
                saved_at: Utc::now(),
            };
            write_draft(cache.as_ref(), &draft).await;
        });

        if let Some(previous) = self.pending().insert(stage_id, handle) {
            if !previous.is_finished() {
                debug!(stage_id, "Rescheduling pending draft write");
            }
            previous.abort();
        }
    }

    /// Read the persisted draft for a stage.
    pub async fn load_draft(&self, stage_id: u32) -> Option<Draft> {
        let key = storage_keys::draft(stage_id);
        let raw = match self.cache.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(stage_id, "Failed to read draft: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                warn!(stage_id, "Discarding unreadable draft: {}", e);
                None
            }
        }
    }

    /// Drop any pending write and delete the persisted draft.
    pub async fn clear_draft(&self, stage_id: u32) {
        let pending = self.pending().remove(&stage_id);
        if let Some(handle) = pending {
            handle.abort();
            // Wait for the task to finish or die so its write cannot land
            // after the delete below.
            let _ = handle.await;
        }

        if let Err(e) = self.cache.remove(&storage_keys::draft(stage_id)).await {
            warn!(stage_id, "Failed to clear draft: {}", e);
        }
    }

    /// Cancel a pending write. Returns whether a write was actually stopped.
    ///
    /// Safe to call repeatedly or after the write already happened. A draft
    /// that was already written stays.
    pub fn cancel_pending(&self, stage_id: u32) -> bool {
        match self.pending().remove(&stage_id) {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Cancel every pending write (the session is ending).
    fn cancel_all(&self) {
        let mut pending = self.pending();
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }

    /// Stop every pending write and delete the persisted drafts of
    /// `stage_ids`. Used when the wizard changes hands to another user type,
    /// since draft keys carry only the stage number.
    pub async fn discard_all(&self, stage_ids: impl IntoIterator<Item = u32>) {
        let pending: Vec<_> = self.pending().drain().map(|(_, handle)| handle).collect();
        for handle in pending {
            handle.abort();
            let _ = handle.await;
        }

        for stage_id in stage_ids {
            match self.cache.remove(&storage_keys::draft(stage_id)).await {
                Ok(true) => debug!(stage_id, "Discarded draft"),
                Ok(false) => {}
                Err(e) => warn!(stage_id, "Failed to discard draft: {}", e),
            }
        }
    }

    /// Whether a write for `stage_id` is still waiting on its window.
    #[cfg(test)]
    fn has_pending(&self, stage_id: u32) -> bool {
        self.pending()
            .get(&stage_id)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DraftStore {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn write_draft(cache: &dyn LocalCache, draft: &Draft) {
    let value = match serde_json::to_string(draft) {
        Ok(v) => v,
        Err(e) => {
            warn!(stage_id = draft.stage_id, "Failed to serialize draft: {}", e);
            return;
        }
    };
    match cache.set(&storage_keys::draft(draft.stage_id), &value).await {
        Ok(()) => debug!(stage_id = draft.stage_id, "Draft saved"),
        Err(e) => warn!(stage_id = draft.stage_id, "Failed to persist draft: {}", e),
    }
}
