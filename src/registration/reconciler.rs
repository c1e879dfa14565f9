//! Progress reconciler: builds the canonical snapshot from server and cache.
//!
//! The server is authoritative whenever it answered. The durable local
//! record is only consulted when it did not, and the result is then flagged
//! stale. Reconciliation is a pure function of its inputs.

use super::catalog::UserType;
use super::model::{CachedRegistration, ProgressSnapshot, ServerProgress};

/// Build a snapshot for `user_type`.
///
/// `server` is `None` when the progress source could not be reached (or
/// had nothing for this user); `cached` is the last durable local record.
pub fn reconcile(
    user_type: UserType,
    server: Option<&ServerProgress>,
    cached: Option<&CachedRegistration>,
) -> ProgressSnapshot {
    let mut snapshot = ProgressSnapshot::fresh(user_type);

    // Submitted field data only ever lives locally.
    if let Some(cached) = cached {
        let user_data = cached
            .user_data
            .iter()
            .filter(|(id, _)| snapshot.is_valid_stage(**id))
            .map(|(id, data)| (*id, data.clone()))
            .collect();
        snapshot.user_data = user_data;
    }

    let current = match (server, cached) {
        (Some(server), _) => apply_server(&mut snapshot, server),
        (None, Some(cached)) => {
            mark_completed(&mut snapshot, &cached.completed_steps);
            snapshot.stale = true;
            Some(cached.current_stage)
        }
        (None, None) => None,
    };

    snapshot.refresh_metrics();
    let current = current.unwrap_or_else(|| snapshot.frontier());
    snapshot.set_current(current);
    snapshot
}

/// Copy server completion into the snapshot; returns the server's current
/// stage if it is authoritative.
fn apply_server(snapshot: &mut ProgressSnapshot, server: &ServerProgress) -> Option<u32> {
    if server.is_registration_complete {
        for record in snapshot.stages.values_mut() {
            record.completed = true;
        }
        return Some(snapshot.total_stages);
    }

    let reported = server.reported_stage();
    match (&server.completed_steps, reported) {
        (Some(completed), _) => mark_completed(snapshot, completed),
        (None, Some(stage)) => {
            for record in snapshot.stages.values_mut() {
                record.completed = record.stage_id < stage;
            }
        }
        (None, None) => {}
    }

    reported.filter(|stage| *stage >= 1)
}

fn mark_completed(snapshot: &mut ProgressSnapshot, completed: &[u32]) {
    for id in completed {
        if let Some(record) = snapshot.stages.get_mut(id) {
            record.completed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    fn cached(current_stage: u32, completed_steps: Vec<u32>) -> CachedRegistration {
        CachedRegistration {
            current_stage,
            completed_steps,
            user_data: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    fn server(current_stage: Option<u32>, completed: Option<Vec<u32>>) -> ServerProgress {
        ServerProgress {
            current_stage,
            completed_steps: completed,
            ..Default::default()
        }
    }

    #[test]
    fn fresh_user_without_any_data_starts_at_stage_one() {
        let snapshot = reconcile(UserType::Driver, None, None);
        assert_eq!(snapshot.total_stages, 5);
        assert_eq!(snapshot.current_stage, 1);
        assert_eq!(snapshot.percentage, 0);
        assert!(!snapshot.stale);
    }

    #[test]
    fn server_completion_is_copied() {
        let snapshot = reconcile(
            UserType::Driver,
            Some(&server(None, Some(vec![1, 2]))),
            None,
        );
        assert!(snapshot.is_completed(1));
        assert!(snapshot.is_completed(2));
        assert!(!snapshot.is_completed(3));
        assert_eq!(snapshot.current_stage, 3);
        assert_eq!(snapshot.completed_stages, 2);
        assert_eq!(snapshot.percentage, 40);
        assert!(!snapshot.stale);
    }

    #[test]
    fn server_overrides_cache() {
        let snapshot = reconcile(
            UserType::Driver,
            Some(&server(Some(2), Some(vec![1]))),
            Some(&cached(4, vec![1, 2, 3])),
        );
        assert_eq!(snapshot.current_stage, 2);
        assert_eq!(snapshot.completed_stage_ids(), vec![1]);
        assert!(!snapshot.stale);
    }

    #[test]
    fn server_current_stage_wins_over_completed_steps() {
        // Back-navigation on the server side: steps done, pointer moved back.
        let snapshot = reconcile(
            UserType::Driver,
            Some(&server(Some(2), Some(vec![1, 2, 3]))),
            None,
        );
        assert_eq!(snapshot.current_stage, 2);
        assert_eq!(snapshot.completed_stages, 3);
        assert_eq!(snapshot.stages.values().filter(|r| r.is_current).count(), 1);
    }

    #[test]
    fn stage_without_completed_steps_implies_prior_stages_done() {
        let progress = ServerProgress {
            registration_stage: Some(4),
            ..Default::default()
        };
        let snapshot = reconcile(UserType::Driver, Some(&progress), None);
        assert_eq!(snapshot.completed_stage_ids(), vec![1, 2, 3]);
        assert_eq!(snapshot.current_stage, 4);
    }

    #[test]
    fn registration_complete_marks_everything() {
        let progress = ServerProgress {
            is_registration_complete: true,
            ..Default::default()
        };
        let snapshot = reconcile(UserType::Restaurant, Some(&progress), None);
        assert_eq!(snapshot.completed_stages, 6);
        assert_eq!(snapshot.current_stage, 6);
        assert_eq!(snapshot.percentage, 100);
        assert!(snapshot.is_registration_complete);
    }

    #[test]
    fn unknown_server_stage_ids_are_ignored() {
        let snapshot = reconcile(
            UserType::Driver,
            Some(&server(Some(42), Some(vec![0, 1, 9]))),
            None,
        );
        assert_eq!(snapshot.completed_stage_ids(), vec![1]);
        assert_eq!(snapshot.current_stage, 5);
    }

    #[test]
    fn network_failure_falls_back_to_cache_and_marks_stale() {
        let snapshot = reconcile(UserType::Driver, None, Some(&cached(3, vec![1, 2])));
        assert_eq!(snapshot.current_stage, 3);
        assert!(snapshot.stale);
        assert_eq!(snapshot.completed_stages, 2);
        assert!(snapshot.stages[&3].is_current);
    }

    #[test]
    fn cached_user_data_is_carried() {
        let mut record = cached(2, vec![1]);
        record
            .user_data
            .insert(1, serde_json::json!({"name": "Jane"}));
        record.user_data.insert(99, serde_json::json!({}));

        let snapshot = reconcile(UserType::Driver, Some(&server(Some(2), None)), Some(&record));
        assert_eq!(snapshot.user_data[&1]["name"], "Jane");
        assert!(!snapshot.user_data.contains_key(&99));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let progress = server(Some(3), Some(vec![1, 2]));
        let record = cached(2, vec![1]);

        let first = reconcile(UserType::Driver, Some(&progress), Some(&record));
        let second = reconcile(UserType::Driver, Some(&progress), Some(&record));
        assert_eq!(first, second);

        let offline_first = reconcile(UserType::Driver, None, Some(&record));
        let offline_second = reconcile(UserType::Driver, None, Some(&record));
        assert_eq!(offline_first, offline_second);
    }
}
