//! Applies user decisions on open conflicts.

use crate::RemoteApi;
use std::sync::Arc;
use tandem_engine::{
    plan_resolution, ChangeQueue, DeviceId, FollowUp, Resolution, SyncRecord, Timestamp,
};

/// Plans conflict follow-ups and reports decisions to the remote.
///
/// Holds no state of its own; the orchestrator owns the conflict list and
/// the queue the follow-ups land in.
pub struct ConflictResolver<R> {
    remote: Arc<R>,
    device_id: DeviceId,
}

impl<R: RemoteApi> ConflictResolver<R> {
    pub fn new(remote: Arc<R>, device_id: DeviceId) -> Self {
        Self { remote, device_id }
    }

    /// The local record a conflict competes with.
    ///
    /// A conflict raised on this device is its own counterpart. Otherwise the
    /// newest record of the same type written here wins, queued records
    /// before synced ones.
    pub fn local_counterpart<'a>(
        &self,
        conflict: &'a SyncRecord,
        queue: &'a ChangeQueue,
        synced: &'a [SyncRecord],
    ) -> Option<&'a SyncRecord> {
        if conflict.originated_on(&self.device_id) {
            return Some(conflict);
        }

        queue
            .latest_of(conflict.record_type, &self.device_id)
            .or_else(|| {
                synced
                    .iter()
                    .filter(|r| {
                        r.record_type == conflict.record_type && r.originated_on(&self.device_id)
                    })
                    .max_by_key(|r| r.created_at)
            })
    }

    /// Decide what to enqueue for `resolution`.
    pub fn plan(
        &self,
        conflict: &SyncRecord,
        local: Option<&SyncRecord>,
        resolution: Resolution,
        now: Timestamp,
    ) -> FollowUp {
        plan_resolution(conflict, local, resolution, &self.device_id, now)
    }

    /// Tell the remote authority how a conflict was resolved.
    pub async fn report(&self, conflict_id: &str, resolution: Resolution) -> bool {
        let response = self.remote.resolve_conflict(conflict_id, resolution).await;
        if response.success {
            tracing::info!(conflict_id, %resolution, "Conflict resolved");
        } else {
            tracing::warn!(
                conflict_id,
                %resolution,
                error = response.error.as_deref().unwrap_or_default(),
                "Failed to report conflict resolution"
            );
        }
        response.success
    }
}
