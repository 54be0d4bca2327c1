//! Sync orchestration.
//!
//! [`SyncOrchestrator`] owns the process-wide [`SyncState`], the change queue
//! and the synced-data store. It runs at most one cycle at a time:
//!
//! 1. upload the queued changes (skipped when the queue is empty)
//! 2. download remote changes since the last successful cycle
//! 3. fetch open conflicts, when conflict resolution is enabled
//! 4. report this device's status
//! 5. record the cycle time and persist
//!
//! Cycles start from [`SyncOrchestrator::perform_sync`], from the run loop
//! (timer, reconnect, enqueue) or from a host background wake. Failures never
//! escape; they surface as [`SyncEvent::Completed`] events.
//!
//! Locks are std mutexes held only for short synchronous sections, never
//! across an await. When two are needed the order is queue, then synced.

use crate::transport::AnalyticsEvent;
use crate::{
    now_millis, ApiResponse, ConflictResolver, Connectivity, DeviceRegistry, Error, LocalStore,
    RemoteApi, Result, SyncConfig, SyncEvent, Ticker,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tandem_engine::{
    retain_within, ChangeQueue, DeviceId, DeviceRecord, FollowUp, RecordId, RecordType,
    Resolution, SyncRecord, SyncState,
};
use tokio::sync::{broadcast, mpsc, watch};

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears `is_syncing` when a cycle ends, however it ends.
struct SyncingGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).is_syncing = false;
    }
}

/// Coordinates sync cycles for one device.
///
/// Constructed once per process and shared through `Arc`.
pub struct SyncOrchestrator<R> {
    remote: Arc<R>,
    store: Arc<LocalStore>,
    registry: DeviceRegistry<R>,
    resolver: ConflictResolver<R>,
    connectivity: Connectivity,
    device_id: DeviceId,
    config: watch::Sender<SyncConfig>,
    state: Mutex<SyncState>,
    queue: Mutex<ChangeQueue>,
    synced: Mutex<Vec<SyncRecord>>,
    /// Conflicts resolved since the current conflict fetch started.
    /// Locked only while holding `state`.
    resolved: Mutex<HashSet<RecordId>>,
    events: broadcast::Sender<SyncEvent>,
    triggers: mpsc::Sender<&'static str>,
    trigger_rx: Mutex<Option<mpsc::Receiver<&'static str>>>,
    shutdown: watch::Sender<bool>,
}

impl<R: RemoteApi> SyncOrchestrator<R> {
    /// Restore persisted state from `store` and build the orchestrator.
    pub fn new(
        remote: Arc<R>,
        store: Arc<LocalStore>,
        connectivity: Connectivity,
        config: SyncConfig,
    ) -> Arc<Self> {
        let device_id = store.device_id();
        let queue = store.load_queue();
        let synced = store.load_synced();
        let mut state = store.load_state();
        state.pending_change_count = queue.len();

        remote.set_max_retries(config.max_retries);

        let registry = DeviceRegistry::new(remote.clone(), store.clone(), device_id.clone());
        let resolver = ConflictResolver::new(remote.clone(), device_id.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (triggers, trigger_rx) = mpsc::channel(1);
        let (config, _) = watch::channel(config);
        let (shutdown, _) = watch::channel(false);

        tracing::info!(
            device_id = %device_id,
            pending = queue.len(),
            synced = synced.len(),
            "Sync orchestrator initialized"
        );

        Arc::new(Self {
            remote,
            store,
            registry,
            resolver,
            connectivity,
            device_id,
            config,
            state: Mutex::new(state),
            queue: Mutex::new(queue),
            synced: Mutex::new(synced),
            resolved: Mutex::new(HashSet::new()),
            events,
            triggers,
            trigger_rx: Mutex::new(Some(trigger_rx)),
            shutdown,
        })
    }

    // ==================== Cycles ====================

    /// Run one sync cycle now.
    ///
    /// Returns false without side effects when the network is unreachable or
    /// a cycle is already in flight; otherwise returns the cycle outcome.
    pub async fn perform_sync(&self) -> bool {
        let config = self.config();
        if !self.connectivity.current().is_reachable(config.wifi_only) {
            tracing::debug!("Sync skipped, network unreachable");
            return false;
        }

        let Some(guard) = self.begin_cycle() else {
            tracing::debug!("Sync skipped, a cycle is already running");
            return false;
        };

        self.emit(SyncEvent::Started);
        let result = self.run_cycle(&config).await;
        drop(guard);

        match result {
            Ok(()) => {
                tracing::info!(device_id = %self.device_id, "Sync completed");
                self.emit(SyncEvent::succeeded());
                true
            }
            Err(err) => {
                tracing::warn!(device_id = %self.device_id, error = %err, "Sync failed");
                self.emit(SyncEvent::failed(err.to_string()));
                false
            }
        }
    }

    fn begin_cycle(&self) -> Option<SyncingGuard<'_>> {
        let mut state = lock(&self.state);
        if state.is_syncing {
            return None;
        }
        state.is_syncing = true;
        Some(SyncingGuard { state: &self.state })
    }

    async fn run_cycle(&self, config: &SyncConfig) -> Result<()> {
        let pending = lock(&self.queue).drain();
        if !pending.is_empty() {
            step("upload", self.remote.upload(&pending).await)?;

            let ids: Vec<RecordId> = pending.iter().map(|r| r.id.clone()).collect();
            {
                let mut queue = lock(&self.queue);
                queue.clear_uploaded(&ids);
                self.store.save_queue(&queue);
            }
            tracing::info!(count = ids.len(), "Uploaded pending changes");
            self.absorb(pending);
        }

        // Records the remote stamps after this point land in the next window
        let started = now_millis();
        let since = lock(&self.state).last_sync_time;
        let downloaded = step(
            "download",
            self.remote.download(&self.device_id, since).await,
        )?
        .unwrap_or_default();
        if !downloaded.is_empty() {
            tracing::info!(count = downloaded.len(), "Applied remote changes");
            self.absorb(downloaded);
        }

        if config.conflict_resolution {
            {
                let _state = lock(&self.state);
                lock(&self.resolved).clear();
            }
            let fetched = step("conflict fetch", self.remote.conflicts(&self.device_id).await)?
                .unwrap_or_default();
            let count = {
                let mut state = lock(&self.state);
                let resolved = lock(&self.resolved);
                state.conflicts = fetched
                    .into_iter()
                    .filter(|c| !resolved.contains(&c.id))
                    .collect();
                state.conflicts.len()
            };
            if count > 0 {
                tracing::info!(count, "Conflicts detected");
                self.emit(SyncEvent::ConflictsDetected { count });
            }
        }

        self.registry.update_status(true, started).await;
        let devices = self.registry.cached();
        let pending_count = lock(&self.queue).len();

        let mut state = lock(&self.state);
        state.last_sync_time = Some(started);
        state.pending_change_count = pending_count;
        state.connected_devices = devices;
        self.store.save_state(&state);
        Ok(())
    }

    /// Upsert records into the synced-data store, last write per id wins.
    fn absorb(&self, records: Vec<SyncRecord>) {
        let mut synced = lock(&self.synced);
        for record in records {
            match synced.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => synced.push(record),
            }
        }
        self.store.save_synced(&synced);
    }

    /// Deliver a host background wake. Ignored unless background sync is on.
    pub async fn background_wake(&self) -> bool {
        if !self.config().background_sync {
            tracing::debug!("Background wake ignored, background sync disabled");
            return false;
        }
        self.perform_sync().await
    }

    // ==================== Local changes ====================

    /// Queue a change produced on this device.
    ///
    /// With auto-sync on and the network reachable, a cycle is requested.
    pub fn enqueue(&self, record_type: RecordType, payload: Value) -> SyncRecord {
        let id = uuid::Uuid::new_v4().to_string();
        let (record, pending) = {
            let mut queue = lock(&self.queue);
            let record = queue.enqueue(id, record_type, payload, now_millis(), self.device_id.as_str());
            self.store.save_queue(&queue);
            (record, queue.len())
        };
        self.set_pending(pending);

        tracing::debug!(record_id = %record.id, record_type = %record.record_type, "Change enqueued");
        self.request_sync("enqueue");
        record
    }

    fn set_pending(&self, count: usize) {
        let mut state = lock(&self.state);
        state.pending_change_count = count;
        self.store.save_state(&state);
    }

    fn request_sync(&self, reason: &'static str) {
        if self.config().auto_sync && self.is_reachable() {
            // A full channel already holds a pending request
            let _ = self.triggers.try_send(reason);
        }
    }

    /// Records waiting for upload, oldest first.
    pub fn pending_changes(&self) -> Vec<SyncRecord> {
        lock(&self.queue).drain()
    }

    /// Synced records, optionally of one type.
    pub fn synced_records(&self, record_type: Option<RecordType>) -> Vec<SyncRecord> {
        lock(&self.synced)
            .iter()
            .filter(|r| record_type.map_or(true, |t| r.record_type == t))
            .cloned()
            .collect()
    }

    /// Drop synced records older than the retention window.
    ///
    /// Returns the number of records removed.
    pub fn cleanup_old_data(&self) -> usize {
        let retention_days = self.config().retention_days;
        let mut synced = lock(&self.synced);
        let (kept, removed) = retain_within(std::mem::take(&mut *synced), now_millis(), retention_days);
        *synced = kept;
        if removed > 0 {
            self.store.save_synced(&synced);
            tracing::info!(removed, retention_days, "Removed expired synced records");
        }
        removed
    }

    // ==================== Conflicts ====================

    /// Resolve an open conflict.
    ///
    /// The conflict leaves the state immediately; `local` and `merge` queue a
    /// new record, and the decision is reported to the remote. Returns false
    /// for unknown ids.
    pub async fn resolve_conflict(&self, conflict_id: &str, resolution: Resolution) -> bool {
        let conflict = {
            let mut state = lock(&self.state);
            let conflict = state.take_conflict(conflict_id);
            if let Some(conflict) = &conflict {
                lock(&self.resolved).insert(conflict.id.clone());
                self.store.save_state(&state);
            }
            conflict
        };
        let Some(conflict) = conflict else {
            tracing::debug!(conflict_id, "Unknown conflict, nothing to resolve");
            return false;
        };

        let now = now_millis();
        let follow_up = {
            let queue = lock(&self.queue);
            let synced = lock(&self.synced);
            let local = self.resolver.local_counterpart(&conflict, &queue, &synced);
            self.resolver.plan(&conflict, local, resolution, now)
        };

        if let FollowUp::Requeue {
            record_type,
            payload,
            version,
        } = follow_up
        {
            let id = uuid::Uuid::new_v4().to_string();
            let (record, pending) = {
                let mut queue = lock(&self.queue);
                let record = queue.enqueue_versioned(
                    id,
                    record_type,
                    payload,
                    now,
                    self.device_id.as_str(),
                    version,
                );
                self.store.save_queue(&queue);
                (record, queue.len())
            };
            self.set_pending(pending);
            tracing::info!(
                conflict_id,
                record_id = %record.id,
                version = record.version,
                "Queued conflict follow-up"
            );
            self.request_sync("conflict");
        }

        self.resolver.report(conflict_id, resolution).await;
        true
    }

    // ==================== Devices ====================

    /// Register a device and mirror the cache into the state.
    pub async fn register_device(&self, device: DeviceRecord) -> bool {
        let registered = self.registry.register_device(device).await;
        self.mirror_devices(self.registry.cached());
        registered
    }

    /// Known devices, refreshed from the remote when possible.
    pub async fn list_devices(&self) -> Vec<DeviceRecord> {
        let devices = self.registry.list_devices().await;
        self.mirror_devices(devices.clone());
        devices
    }

    fn mirror_devices(&self, devices: Vec<DeviceRecord>) {
        let mut state = lock(&self.state);
        state.connected_devices = devices;
        self.store.save_state(&state);
    }

    pub fn registry(&self) -> &DeviceRegistry<R> {
        &self.registry
    }

    // ==================== Remote passthrough ====================

    /// Send an analytics event tagged with this device.
    pub async fn send_analytics(&self, event: impl Into<String>, data: Value) -> bool {
        let event = AnalyticsEvent {
            event: event.into(),
            data,
            timestamp: now_millis(),
            device_id: self.device_id.clone(),
        };
        self.remote.send_analytics(&event).await.success
    }

    /// Server-side statistics for this device.
    pub async fn sync_stats(&self) -> ApiResponse<Value> {
        self.remote.sync_stats(&self.device_id).await
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    // ==================== State & config ====================

    /// Snapshot of the current state.
    pub fn sync_state(&self) -> SyncState {
        lock(&self.state).clone()
    }

    pub fn config(&self) -> SyncConfig {
        self.config.borrow().clone()
    }

    /// Replace the whole config. The run loop restarts its timer.
    pub fn update_config(&self, config: SyncConfig) {
        self.remote.set_max_retries(config.max_retries);
        tracing::info!(
            auto_sync = config.auto_sync,
            interval_minutes = config.sync_interval_minutes,
            wifi_only = config.wifi_only,
            "Sync config updated"
        );
        self.config.send_replace(config);
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Reachability under the current config.
    pub fn is_reachable(&self) -> bool {
        self.connectivity
            .current()
            .is_reachable(self.config.borrow().wifi_only)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ==================== Run loop ====================

    /// Drive cycles from `ticker`, reconnects and queued requests until
    /// [`shutdown`](Self::shutdown). Every tick also applies retention. Only the first call runs; later calls
    /// return immediately.
    pub async fn run<T: Ticker>(self: Arc<Self>, mut ticker: T) {
        let Some(mut triggers) = lock(&self.trigger_rx).take() else {
            tracing::warn!("Sync loop already running");
            return;
        };

        let mut shutdown = self.shutdown.subscribe();
        let mut network = self.connectivity.subscribe();
        let mut config = self.config.subscribe();
        let mut reachable = self.is_reachable();

        tracing::info!(device_id = %self.device_id, reachable, "Sync loop started");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => {}
                _ = ticker.tick() => {
                    self.cleanup_old_data();
                    if self.config().auto_sync {
                        self.spawn_sync("timer");
                    }
                }
                Ok(()) = network.changed() => {
                    self.reachability_changed(&mut reachable);
                }
                Ok(()) = config.changed() => {
                    let period = config.borrow_and_update().sync_interval();
                    ticker.reset(period);
                    self.reachability_changed(&mut reachable);
                }
                Some(reason) = triggers.recv() => {
                    self.spawn_sync(reason);
                }
            }
        }

        tracing::info!(device_id = %self.device_id, "Sync loop stopped");
    }

    fn reachability_changed(self: &Arc<Self>, reachable: &mut bool) {
        let now_reachable = self.is_reachable();
        if now_reachable == *reachable {
            return;
        }
        *reachable = now_reachable;
        tracing::info!(reachable = now_reachable, "Reachability changed");
        self.emit(SyncEvent::ConnectivityChanged {
            reachable: now_reachable,
        });

        if now_reachable && self.config().auto_sync {
            self.spawn_sync("reconnect");
        }
    }

    fn spawn_sync(self: &Arc<Self>, reason: &'static str) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tracing::debug!(reason, "Sync triggered");
            this.perform_sync().await;
        });
    }

    /// Stop the run loop and flush everything to the local store.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.store.save_queue(&lock(&self.queue));
        self.store.save_synced(&lock(&self.synced));
        self.store.save_state(&lock(&self.state));
        tracing::info!(device_id = %self.device_id, "Sync orchestrator shut down");
    }
}

/// Unwrap one cycle step, turning a failed response into an error.
fn step<T>(name: &'static str, response: ApiResponse<T>) -> Result<Option<T>> {
    response
        .into_result()
        .map_err(|message| Error::Step { step: name, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkState;
    use serde_json::json;
    use tandem_engine::{DeviceStatus, Timestamp, MS_PER_DAY};

    /// Remote with no data that accepts everything.
    struct EmptyRemote;

    impl RemoteApi for EmptyRemote {
        async fn register_device(&self, _d: &DeviceRecord) -> ApiResponse<()> {
            ApiResponse::done()
        }

        async fn update_device_status(&self, _id: &str, _s: &DeviceStatus) -> ApiResponse<()> {
            ApiResponse::done()
        }

        async fn connected_devices(&self) -> ApiResponse<Vec<DeviceRecord>> {
            ApiResponse::ok(Vec::new())
        }

        async fn upload(&self, _r: &[SyncRecord]) -> ApiResponse<()> {
            ApiResponse::done()
        }

        async fn download(&self, _id: &str, _s: Option<Timestamp>) -> ApiResponse<Vec<SyncRecord>> {
            ApiResponse::ok(Vec::new())
        }

        async fn conflicts(&self, _id: &str) -> ApiResponse<Vec<SyncRecord>> {
            ApiResponse::ok(Vec::new())
        }

        async fn resolve_conflict(&self, _id: &str, _r: Resolution) -> ApiResponse<()> {
            ApiResponse::done()
        }

        async fn user_preferences(&self) -> ApiResponse<Value> {
            ApiResponse::ok(json!({}))
        }

        async fn update_user_preferences(&self, _p: &Value) -> ApiResponse<()> {
            ApiResponse::done()
        }

        async fn send_analytics(&self, _e: &AnalyticsEvent) -> ApiResponse<()> {
            ApiResponse::done()
        }

        async fn sync_stats(&self, _id: &str) -> ApiResponse<Value> {
            ApiResponse::ok(json!({ "uploaded": 0 }))
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn orchestrator(network: NetworkState, config: SyncConfig) -> Arc<SyncOrchestrator<EmptyRemote>> {
        SyncOrchestrator::new(
            Arc::new(EmptyRemote),
            Arc::new(LocalStore::memory()),
            Connectivity::new(network),
            config,
        )
    }

    fn manual() -> SyncConfig {
        SyncConfig {
            auto_sync: false,
            ..SyncConfig::default()
        }
    }

    #[tokio::test]
    async fn wifi_only_blocks_cellular() {
        let orchestrator = orchestrator(NetworkState::cellular(), manual());
        assert!(!orchestrator.is_reachable());
        assert!(!orchestrator.perform_sync().await);
        assert_eq!(orchestrator.sync_state().last_sync_time, None);

        orchestrator.update_config(SyncConfig {
            wifi_only: false,
            ..manual()
        });
        assert!(orchestrator.perform_sync().await);
        assert!(orchestrator.sync_state().last_sync_time.is_some());
    }

    #[tokio::test]
    async fn enqueue_updates_pending_count_and_persists() {
        let store = Arc::new(LocalStore::memory());
        let orchestrator = SyncOrchestrator::new(
            Arc::new(EmptyRemote),
            store.clone(),
            Connectivity::new(NetworkState::offline()),
            manual(),
        );

        let first = orchestrator.enqueue(RecordType::Settings, json!({"theme": "dark"}));
        let second = orchestrator.enqueue(RecordType::Settings, json!({"theme": "dark"}));

        assert_ne!(first.id, second.id);
        assert_eq!(first.checksum, second.checksum);
        assert_eq!(first.version, 1);
        assert_eq!(orchestrator.sync_state().pending_change_count, 2);
        assert_eq!(store.load_queue().len(), 2);
    }

    #[tokio::test]
    async fn successful_cycle_moves_queue_to_synced_store() {
        let orchestrator = orchestrator(NetworkState::wifi(), manual());
        orchestrator.enqueue(RecordType::Memory, json!({"note": "milk"}));

        assert!(orchestrator.perform_sync().await);
        assert!(orchestrator.pending_changes().is_empty());
        assert_eq!(orchestrator.sync_state().pending_change_count, 0);
        assert_eq!(orchestrator.synced_records(Some(RecordType::Memory)).len(), 1);
        assert!(orchestrator.synced_records(Some(RecordType::Settings)).is_empty());
    }

    #[tokio::test]
    async fn events_bracket_a_cycle() {
        let orchestrator = orchestrator(NetworkState::wifi(), manual());
        let mut events = orchestrator.subscribe();

        assert!(orchestrator.perform_sync().await);
        assert_eq!(events.recv().await.unwrap(), SyncEvent::Started);
        assert_eq!(events.recv().await.unwrap(), SyncEvent::succeeded());
        assert!(!orchestrator.sync_state().is_syncing);
    }

    #[tokio::test]
    async fn cleanup_applies_retention_window() {
        let store = Arc::new(LocalStore::memory());
        let now = now_millis();
        store.save_synced(&[
            SyncRecord::new("recent", RecordType::Custom, json!(1), now - 5 * MS_PER_DAY, "x"),
            SyncRecord::new("stale", RecordType::Custom, json!(2), now - 40 * MS_PER_DAY, "x"),
        ]);
        let orchestrator = SyncOrchestrator::new(
            Arc::new(EmptyRemote),
            store.clone(),
            Connectivity::default(),
            manual(),
        );

        assert_eq!(orchestrator.cleanup_old_data(), 1);
        let ids: Vec<_> = orchestrator
            .synced_records(None)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["recent"]);
        assert_eq!(store.load_synced().len(), 1);
    }

    #[tokio::test]
    async fn background_wake_requires_opt_in() {
        let orchestrator = orchestrator(NetworkState::wifi(), manual());
        assert!(!orchestrator.background_wake().await);

        orchestrator.update_config(SyncConfig {
            background_sync: true,
            ..manual()
        });
        assert!(orchestrator.background_wake().await);
    }

    #[tokio::test]
    async fn unknown_conflict_is_a_noop() {
        let orchestrator = orchestrator(NetworkState::wifi(), manual());
        assert!(!orchestrator.resolve_conflict("missing", Resolution::Local).await);
        assert!(orchestrator.pending_changes().is_empty());
    }

    #[tokio::test]
    async fn register_device_mirrors_into_state() {
        let orchestrator = orchestrator(NetworkState::wifi(), manual());
        let device = orchestrator.registry().local_device("Laptop", "linux", "6.8");

        assert!(orchestrator.register_device(device).await);
        let state = orchestrator.sync_state();
        assert_eq!(state.connected_devices.len(), 1);
        assert_eq!(state.connected_devices[0].id, orchestrator.device_id());
    }

    #[tokio::test]
    async fn ticks_apply_retention() {
        let store = Arc::new(LocalStore::memory());
        let orchestrator = SyncOrchestrator::new(
            Arc::new(EmptyRemote),
            store.clone(),
            Connectivity::new(NetworkState::wifi()),
            manual(),
        );
        let (ticker, handle) = crate::ChannelTicker::new();
        let task = tokio::spawn(orchestrator.clone().run(ticker));

        let stale = now_millis() - 40 * MS_PER_DAY;
        orchestrator.absorb(vec![SyncRecord::new("stale", RecordType::Custom, json!(1), stale, "x")]);
        assert_eq!(orchestrator.synced_records(None).len(), 1);

        assert!(handle.tick());
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while !orchestrator.synced_records(None).is_empty() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(store.load_synced().is_empty());

        orchestrator.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn run_returns_after_shutdown() {
        let orchestrator = orchestrator(NetworkState::wifi(), manual());
        let (ticker, _handle) = crate::ChannelTicker::new();
        let task = tokio::spawn(orchestrator.clone().run(ticker));

        tokio::task::yield_now().await;
        orchestrator.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        // A second loop cannot start
        let (ticker, _handle) = crate::ChannelTicker::new();
        orchestrator.clone().run(ticker).await;
    }
}
