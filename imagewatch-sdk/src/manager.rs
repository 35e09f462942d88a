//! Registry of monitors with retention-based eviction.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use imagewatch_types::MonitorReport;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::config::MonitorConfig;
use crate::monitor::Monitor;
use crate::trace::{NoopTraceSink, TraceSink};

/// Process-wide shared manager slot. See [`MonitorManager::shared`].
static SHARED: Mutex<Option<Arc<MonitorManager>>> = Mutex::new(None);

/// Registry of [`Monitor`] instances keyed by id.
///
/// Monitors are created lazily and shared as `Arc`s; a monitor stays
/// registered until it is explicitly removed, swept by [`cleanup`], or the
/// manager is torn down. Monitors that never ended are never evicted by
/// the cleanup path.
///
/// [`cleanup`]: MonitorManager::cleanup
///
/// # Example
///
/// ```rust
/// use imagewatch_sdk::{MonitorConfig, MonitorManager};
///
/// let manager = MonitorManager::new(MonitorConfig::default());
///
/// let monitor = manager.get_or_create("hero.jpg");
/// monitor.mark("mount");
///
/// let reports = manager.reports();
/// assert_eq!(reports.len(), 1);
/// ```
pub struct MonitorManager {
    registry: Arc<Registry>,
    config: MonitorConfig,
    trace: Arc<dyn TraceSink>,
}

impl std::fmt::Debug for MonitorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorManager")
            .field("monitors", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Registry {
    monitors: RwLock<BTreeMap<String, Arc<Monitor>>>,
}

impl Registry {
    /// Evict every ended monitor whose end is older than `retention`.
    fn cleanup(&self, retention: Duration) {
        let mut monitors = self.monitors.write();
        monitors.retain(|id, monitor| {
            let expired = monitor
                .since_end()
                .map(|elapsed| elapsed > retention)
                .unwrap_or(false);
            if expired {
                monitor.dispose();
                debug!(monitor = %id, "evicted expired monitor");
            }
            !expired
        });
    }

    fn dispose_all(&self) {
        let mut monitors = self.monitors.write();
        for monitor in monitors.values() {
            monitor.dispose();
        }
        monitors.clear();
    }
}

impl MonitorManager {
    /// Create a manager whose monitors use `config` and no trace sink.
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_trace_sink(config, Arc::new(NoopTraceSink))
    }

    /// Create a manager whose monitors mirror marks to `trace`.
    pub fn with_trace_sink(config: MonitorConfig, trace: Arc<dyn TraceSink>) -> Self {
        Self {
            registry: Arc::new(Registry::default()),
            config,
            trace,
        }
    }

    /// The configuration handed to created monitors.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Return the monitor for `id`, creating and registering one if none
    /// exists. Repeated calls with the same id return the same instance.
    pub fn get_or_create(&self, id: &str) -> Arc<Monitor> {
        // Fast path: check if it exists
        {
            let monitors = self.registry.monitors.read();
            if let Some(monitor) = monitors.get(id) {
                return monitor.clone();
            }
        }

        // Slow path: create it
        let mut monitors = self.registry.monitors.write();
        monitors
            .entry(id.to_string())
            .or_insert_with(|| {
                Arc::new(Monitor::with_trace_sink(
                    id,
                    self.config.clone(),
                    self.trace.clone(),
                ))
            })
            .clone()
    }

    /// Look up a monitor without creating one.
    pub fn get(&self, id: &str) -> Option<Arc<Monitor>> {
        self.registry.monitors.read().get(id).cloned()
    }

    /// Dispose and remove the monitor for `id`.
    ///
    /// Returns `true` if a monitor was registered under that id.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.registry.monitors.write().remove(id);
        match removed {
            Some(monitor) => {
                monitor.dispose();
                true
            }
            None => false,
        }
    }

    /// Snapshot reports from every registered monitor, in id order.
    pub fn reports(&self) -> Vec<MonitorReport> {
        self.registry
            .monitors
            .read()
            .values()
            .map(|m| m.report())
            .collect()
    }

    /// Dispose and remove every ended monitor whose end time is more than
    /// `retention` ago. Live monitors are never touched.
    pub fn cleanup(&self, retention: Duration) {
        self.registry.cleanup(retention);
    }

    /// Dispose and remove every monitor unconditionally.
    pub fn dispose_all(&self) {
        self.registry.dispose_all();
    }

    /// Number of registered monitors.
    pub fn len(&self) -> usize {
        self.registry.monitors.read().len()
    }

    /// Whether no monitors are registered.
    pub fn is_empty(&self) -> bool {
        self.registry.monitors.read().is_empty()
    }

    /// The process-wide shared manager, lazily constructed with default
    /// configuration on first use.
    ///
    /// Prefer constructing and passing your own manager; this accessor
    /// exists for embeddings where threading a handle through is not
    /// practical.
    pub fn shared() -> Arc<MonitorManager> {
        SHARED
            .lock()
            .get_or_insert_with(|| Arc::new(MonitorManager::new(MonitorConfig::default())))
            .clone()
    }

    /// Tear down the shared manager, disposing all its monitors.
    ///
    /// The next call to [`shared`](MonitorManager::shared) constructs a
    /// fresh instance. Intended for test isolation.
    pub fn reset_shared() {
        if let Some(manager) = SHARED.lock().take() {
            manager.dispose_all();
        }
    }

    /// Start a background task that periodically evicts expired monitors
    /// using the manager's configured retention.
    ///
    /// Returns a handle that stops the sweeper when dropped or when
    /// `stop()` is called. Requires a tokio runtime.
    #[cfg(feature = "tokio")]
    pub fn start_sweeper(&self, interval: Duration) -> SweeperHandle {
        use tokio::sync::watch;

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let registry = self.registry.clone();
        let retention = self.config.retention;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        registry.cleanup(retention);
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        SweeperHandle { stop_tx }
    }
}

/// Handle for controlling the background sweeper.
///
/// Drop this handle to stop the sweeper, or call `stop()` explicitly.
#[cfg(feature = "tokio")]
pub struct SweeperHandle {
    stop_tx: tokio::sync::watch::Sender<bool>,
}

#[cfg(feature = "tokio")]
impl SweeperHandle {
    /// Stop the background sweeper.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::MemoryTraceSink;

    #[test]
    fn get_or_create_returns_same_instance() {
        let manager = MonitorManager::new(MonitorConfig::default());

        let m1 = manager.get_or_create("hero.jpg");
        let m2 = manager.get_or_create("hero.jpg");

        assert!(Arc::ptr_eq(&m1, &m2));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn created_monitors_inherit_manager_config() {
        let manager = MonitorManager::new(MonitorConfig::default().with_enabled(false));
        let monitor = manager.get_or_create("off");

        monitor.mark("a");
        assert!(monitor.report().marks.is_empty());
    }

    #[test]
    fn get_does_not_create() {
        let manager = MonitorManager::new(MonitorConfig::default());
        assert!(manager.get("missing").is_none());
        assert!(manager.is_empty());

        manager.get_or_create("present");
        assert!(manager.get("present").is_some());
    }

    #[test]
    fn reports_snapshot_in_id_order() {
        let manager = MonitorManager::new(MonitorConfig::default());
        manager.get_or_create("b.png").mark("mount");
        manager.get_or_create("a.png").mark("mount");

        let reports = manager.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, "a.png");
        assert_eq!(reports[1].id, "b.png");
    }

    #[test]
    fn cleanup_evicts_only_expired_ended_monitors() {
        let manager = MonitorManager::new(MonitorConfig::default());

        let ended = manager.get_or_create("ended");
        let live = manager.get_or_create("live");
        live.mark("mount");
        ended.end();

        std::thread::sleep(Duration::from_millis(5));

        // Generous retention: nothing is old enough to evict.
        manager.cleanup(Duration::from_secs(300));
        assert_eq!(manager.len(), 2);

        // Tiny retention: the ended monitor goes, the live one stays.
        manager.cleanup(Duration::from_millis(1));
        assert_eq!(manager.len(), 1);
        assert!(manager.get("live").is_some());
        assert!(manager.get("ended").is_none());
    }

    #[test]
    fn cleanup_never_evicts_live_monitors() {
        let manager = MonitorManager::new(MonitorConfig::default());
        manager.get_or_create("live");

        manager.cleanup(Duration::ZERO);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn remove_disposes_and_reports_membership() {
        let sink = Arc::new(MemoryTraceSink::new());
        let manager = MonitorManager::with_trace_sink(MonitorConfig::default(), sink.clone());

        manager.get_or_create("img").mark("mount");
        assert_eq!(sink.len(), 1);

        assert!(manager.remove("img"));
        assert!(!manager.remove("img"));
        assert!(sink.is_empty());
    }

    #[test]
    fn dispose_all_clears_registry_and_traces() {
        let sink = Arc::new(MemoryTraceSink::new());
        let manager = MonitorManager::with_trace_sink(MonitorConfig::default(), sink.clone());

        manager.get_or_create("a").mark("mount");
        manager.get_or_create("b").mark("mount");
        assert_eq!(manager.len(), 2);

        manager.dispose_all();
        assert!(manager.is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn removed_monitor_can_be_recreated_fresh() {
        let manager = MonitorManager::new(MonitorConfig::default());

        manager.get_or_create("img").mark("mount");
        manager.remove("img");

        let fresh = manager.get_or_create("img");
        assert!(fresh.report().marks.is_empty());
    }

    #[test]
    fn shared_manager_is_reused_until_reset() {
        MonitorManager::reset_shared();

        let first = MonitorManager::shared();
        let second = MonitorManager::shared();
        assert!(Arc::ptr_eq(&first, &second));

        first.get_or_create("img");
        MonitorManager::reset_shared();

        let third = MonitorManager::shared();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(third.is_empty());

        MonitorManager::reset_shared();
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn sweeper_evicts_expired_monitors() {
        let manager =
            MonitorManager::new(MonitorConfig::default().with_retention(Duration::ZERO));

        manager.get_or_create("ended").end();
        manager.get_or_create("live");

        let handle = manager.start_sweeper(Duration::from_millis(5));

        // Give the sweeper a couple of ticks.
        tokio::time::sleep(Duration::from_millis(25)).await;

        assert_eq!(manager.len(), 1);
        assert!(manager.get("live").is_some());
        handle.stop();
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn sweeper_stops_when_handle_dropped() {
        let manager = MonitorManager::new(MonitorConfig::default());
        let handle = manager.start_sweeper(Duration::from_millis(5));
        drop(handle);

        // The task exits on its own; nothing observable to assert beyond
        // not hanging, but eviction must no longer run.
        manager.get_or_create("ended").end();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.len(), 1);
    }
}
